//! Countdown engine implementation.
//!
//! The engine is a tick-driven state machine. It does not own a timer - the
//! caller delivers one `tick()` per nominal second while the engine is
//! running (see `session::Session`, which drives it from a Tokio interval).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//! Running | Paused -> Idle   (stop)
//! Running -> Idle            (natural completion)
//! ```
//!
//! Invalid calls (pausing while idle, ticking after stop) are no-ops.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = CountdownEngine::new(10);
//! engine.start();
//! // once per second:
//! match engine.tick() {
//!     Some(Tick::Interval { remaining_secs, total_secs }) => { /* render */ }
//!     Some(Tick::Completed) => { /* end cue, log */ }
//!     None => {}
//! }
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

/// What a single tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Countdown advanced; `remaining_secs` is the new value (never zero).
    Interval { remaining_secs: u64, total_secs: u64 },
    /// The session ran out. Fired exactly once per started session.
    Completed,
}

/// Countdown state machine for a single meditation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownEngine {
    duration_min: u32,
    remaining_secs: u64,
    state: TimerState,
}

impl CountdownEngine {
    /// Create an idle engine with `duration_min` minutes on the clock.
    pub fn new(duration_min: u32) -> Self {
        Self {
            duration_min,
            remaining_secs: u64::from(duration_min) * 60,
            state: TimerState::Idle,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn duration_min(&self) -> u32 {
        self.duration_min
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        u64::from(self.duration_min) * 60
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs().saturating_sub(self.remaining_secs)
    }

    pub fn is_active(&self) -> bool {
        self.state != TimerState::Idle
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    /// 0.0 .. 1.0 progress through the session.
    pub fn progress(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 0.0;
        }
        1.0 - (self.remaining_secs as f64 / total as f64)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Change the session length. Only honoured while idle.
    ///
    /// Returns `true` when the new duration was applied.
    pub fn configure(&mut self, duration_min: u32) -> bool {
        if self.is_active() {
            return false;
        }
        self.duration_min = duration_min;
        self.remaining_secs = self.total_secs();
        true
    }

    pub fn start(&mut self) -> bool {
        match self.state {
            TimerState::Idle => {
                self.state = TimerState::Running;
                true
            }
            TimerState::Running | TimerState::Paused => false,
        }
    }

    pub fn pause(&mut self) -> bool {
        match self.state {
            TimerState::Running => {
                self.state = TimerState::Paused;
                true
            }
            _ => false,
        }
    }

    pub fn resume(&mut self) -> bool {
        match self.state {
            TimerState::Paused => {
                self.state = TimerState::Running;
                true
            }
            _ => false,
        }
    }

    /// Stop and rewind to the full duration.
    pub fn stop(&mut self) {
        self.state = TimerState::Idle;
        self.remaining_secs = self.total_secs();
    }

    /// Advance the countdown by one second.
    ///
    /// A tick that arrives while idle or paused is ignored, which makes a
    /// stale tick racing a `stop()` harmless.
    pub fn tick(&mut self) -> Option<Tick> {
        if self.state != TimerState::Running {
            return None;
        }
        if self.remaining_secs <= 1 {
            self.stop();
            return Some(Tick::Completed);
        }
        self.remaining_secs -= 1;
        Some(Tick::Interval {
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs(),
        })
    }
}
