//! Session orchestrator.
//!
//! Boots a session (wake lock, start bell, countdown), reacts to live track
//! and silence changes, and reports exactly one log when the session ends.
//! Everything runs on one task: a `select!` loop over the one-second ticker,
//! host commands and the preference watch channels.
//!
//! ```text
//! enter -> wake lock -> start cue -> engine.start -> loop {
//!     tick      -> interval cue | completion
//!     command   -> pause/resume | stop | swipe
//!     selection -> play/stop background track
//!     silence   -> mute bells + background track
//!     visible   -> reacquire wake lock
//! } -> end cue? -> log -> teardown
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use super::log::{AudioDetails, SessionLog, SessionLogSink};
use super::swipe::swipe_direction;
use crate::audio::{
    AudioSource, ContextFactory, Direction, EmbeddedPlayerSlot, MediaElement, TrackLibrary,
};
use crate::cues::{BellScheduler, CueBank, CueLoader, CueOutcome};
use crate::error::{Result, SessionError};
use crate::events::Event;
use crate::storage::Preferences;
use crate::timer::{CountdownEngine, IntervalPolicy, Tick};
use crate::wake::{ScreenWake, Visibility, WakeLock};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Setup-screen output. Fixed for the life of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub duration_min: u32,
    #[serde(default)]
    pub interval: IntervalPolicy,
    #[serde(default)]
    pub audio_id: Option<String>,
    #[serde(default)]
    pub note: String,
}

impl SessionConfig {
    pub fn new(duration_min: u32) -> Self {
        Self {
            duration_min,
            interval: IntervalPolicy::None,
            audio_id: None,
            note: String::new(),
        }
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.duration_min == 0 {
            return Err(SessionError::InvalidDuration(self.duration_min));
        }
        if self.interval == IntervalPolicy::EveryMinutes(0) {
            return Err(SessionError::InvalidInterval);
        }
        Ok(())
    }
}

/// Host-side commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    TogglePause,
    Pause,
    Resume,
    /// End early; the partial duration is logged.
    Stop,
    /// Completed horizontal drag of `dx` pixels over the audio button.
    Swipe { dx: f64 },
    /// Step through the track library directly.
    Cycle(Direction),
}

/// Rendering hooks. All methods default to no-ops.
pub trait SessionObserver: Send {
    fn on_interval(&mut self, _remaining_secs: u64, _total_secs: u64) {}
    fn on_complete(&mut self) {}
    fn on_event(&mut self, _event: &Event) {}
}

pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Platform resources a session drives.
pub struct Backends {
    pub media: Box<dyn MediaElement>,
    pub player: EmbeddedPlayerSlot,
    pub audio_context: ContextFactory,
    pub cue_loader: Box<dyn CueLoader + Send>,
    pub wake_lock: Box<dyn WakeLock>,
}

/// Host ends of the session's channels.
#[derive(Clone)]
pub struct SessionControls {
    pub commands: mpsc::Sender<SessionCommand>,
    pub selected: watch::Sender<Option<String>>,
    pub total_silence: watch::Sender<bool>,
    pub visibility: watch::Sender<Visibility>,
}

/// Session ends of the channels, consumed by [`Session::run`].
pub struct SessionInputs {
    commands: mpsc::Receiver<SessionCommand>,
    selected_tx: watch::Sender<Option<String>>,
    selected: watch::Receiver<Option<String>>,
    total_silence: watch::Receiver<bool>,
    visibility: watch::Receiver<Visibility>,
}

impl SessionControls {
    /// The selection starts empty; [`Session::run`] seeds it from
    /// [`SessionConfig::audio_id`].
    pub fn channel(total_silence: bool) -> (Self, SessionInputs) {
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let (selected_tx, selected_rx) = watch::channel(None);
        let (silence_tx, silence_rx) = watch::channel(total_silence);
        let (visibility_tx, visibility_rx) = watch::channel(Visibility::Visible);
        let controls = Self {
            commands: commands_tx,
            selected: selected_tx.clone(),
            total_silence: silence_tx,
            visibility: visibility_tx,
        };
        let inputs = SessionInputs {
            commands: commands_rx,
            selected_tx,
            selected: selected_rx,
            total_silence: silence_rx,
            visibility: visibility_rx,
        };
        (controls, inputs)
    }
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub record_id: i64,
    pub log: SessionLog,
}

enum Ending {
    Completed,
    Stopped,
}

pub struct Session {
    config: SessionConfig,
    engine: CountdownEngine,
    cues: BellScheduler,
    audio: AudioSource,
    wake: ScreenWake,
    library: TrackLibrary,
    sink: Box<dyn SessionLogSink>,
    observer: Box<dyn SessionObserver>,
    torn_down: bool,
}

impl Session {
    /// Guarded entry: a session without a valid configuration never starts.
    pub fn enter(
        config: Option<SessionConfig>,
        prefs: &Preferences,
        library: TrackLibrary,
        mut backends: Backends,
        sink: Box<dyn SessionLogSink>,
        observer: Box<dyn SessionObserver>,
    ) -> Result<Self, SessionError> {
        let config = config.ok_or(SessionError::MissingConfig)?;
        config.validate()?;

        let bank = CueBank::preload(backends.cue_loader.as_mut(), &prefs.bells);
        let audio = AudioSource::new(
            backends.media,
            backends.player,
            backends.audio_context,
            prefs.audio,
        );

        Ok(Self {
            engine: CountdownEngine::new(config.duration_min),
            cues: BellScheduler::new(prefs.bells, config.interval, bank),
            audio,
            wake: ScreenWake::new(backends.wake_lock),
            library,
            sink,
            observer,
            config,
            torn_down: false,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &CountdownEngine {
        &self.engine
    }

    pub fn audio(&self) -> &AudioSource {
        &self.audio
    }

    /// Run the session to completion or manual stop.
    ///
    /// The log is handed to the sink exactly once. Teardown (audio, engine,
    /// wake lock) runs whether or not the sink succeeds, and also on drop if
    /// this future is cancelled.
    pub async fn run(mut self, mut inputs: SessionInputs) -> Result<SessionOutcome> {
        let start_time = Utc::now();

        if self.wake.acquire() {
            self.emit(Event::WakeLockAcquired { at: Utc::now() });
        }

        let silent = *inputs.total_silence.borrow_and_update();
        self.cues.set_total_silence(silent);
        let start_cue = self.cues.on_start();
        self.emit_cue(start_cue);

        self.engine.start();
        info!(
            duration_min = self.config.duration_min,
            interval = %self.config.interval,
            "session started"
        );
        self.emit(Event::SessionStarted {
            duration_min: self.config.duration_min,
            interval: self.config.interval,
            at: start_time,
        });

        inputs.selected_tx.send_replace(self.config.audio_id.clone());
        let selected = inputs.selected.borrow_and_update().clone();
        self.apply_audio(selected.as_deref(), silent);

        let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ending = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.tick() {
                        Some(Tick::Interval { remaining_secs, total_secs }) => {
                            self.observer.on_interval(remaining_secs, total_secs);
                            self.emit(Event::Tick { remaining_secs, total_secs });
                            let cue = self.cues.on_interval(remaining_secs, total_secs);
                            self.emit_cue(cue);
                        }
                        Some(Tick::Completed) => break Ending::Completed,
                        None => {}
                    }
                }
                Some(command) = inputs.commands.recv() => {
                    debug!(?command, "session command");
                    match command {
                        SessionCommand::Stop => break Ending::Stopped,
                        SessionCommand::TogglePause if self.engine.is_paused() => {
                            self.resume(&mut ticker)
                        }
                        SessionCommand::TogglePause | SessionCommand::Pause => self.pause(),
                        SessionCommand::Resume => self.resume(&mut ticker),
                        SessionCommand::Swipe { dx } => {
                            if let Some(direction) = swipe_direction(dx) {
                                self.cycle_track(&inputs, direction);
                            }
                        }
                        SessionCommand::Cycle(direction) => self.cycle_track(&inputs, direction),
                    }
                }
                Ok(()) = inputs.selected.changed() => {
                    let selected = inputs.selected.borrow_and_update().clone();
                    let silent = *inputs.total_silence.borrow();
                    self.apply_audio(selected.as_deref(), silent);
                }
                Ok(()) = inputs.total_silence.changed() => {
                    let silent = *inputs.total_silence.borrow_and_update();
                    self.cues.set_total_silence(silent);
                    let selected = inputs.selected.borrow().clone();
                    self.apply_audio(selected.as_deref(), silent);
                }
                Ok(()) = inputs.visibility.changed() => {
                    let visibility = *inputs.visibility.borrow_and_update();
                    self.on_visibility(visibility);
                }
            }
        };
        drop(ticker);

        let audio = self.audio.current_track().map(AudioDetails::from);
        let (actual_duration_min, completed, elapsed_secs) = match ending {
            Ending::Completed => {
                let end_cue = self.cues.on_complete();
                self.emit_cue(end_cue);
                self.observer.on_complete();
                let total = u64::from(self.config.duration_min) * 60;
                (self.config.duration_min, true, total)
            }
            Ending::Stopped => {
                let elapsed = self.engine.elapsed_secs();
                ((elapsed / 60) as u32, false, elapsed)
            }
        };

        let log = SessionLog {
            start_time,
            end_time: Utc::now(),
            planned_duration_min: self.config.duration_min,
            actual_duration_min,
            completed,
            start_note: self.config.note.clone(),
            end_note: None,
            emotions: Vec::new(),
            causes: Vec::new(),
            audio,
        };
        let recorded = self.sink.record(&log);
        self.teardown();
        drop(inputs);

        let at = Utc::now();
        if completed {
            info!(actual_duration_min, "session completed");
            self.emit(Event::SessionCompleted {
                actual_duration_min,
                at,
            });
        } else {
            info!(elapsed_secs, actual_duration_min, "session stopped early");
            self.emit(Event::SessionStopped {
                elapsed_secs,
                actual_duration_min,
                at,
            });
        }

        match recorded {
            Ok(record_id) => Ok(SessionOutcome { record_id, log }),
            Err(e) => {
                error!("failed to record session log: {e}");
                Err(e)
            }
        }
    }

    fn pause(&mut self) {
        if self.engine.pause() {
            self.audio.pause();
            self.emit(Event::Paused {
                remaining_secs: self.engine.remaining_secs(),
                at: Utc::now(),
            });
        }
    }

    fn resume(&mut self, ticker: &mut tokio::time::Interval) {
        if self.engine.resume() {
            // Next tick a full second from now.
            ticker.reset();
            self.audio.resume();
            self.emit(Event::Resumed {
                remaining_secs: self.engine.remaining_secs(),
                at: Utc::now(),
            });
        }
    }

    /// Move the selection; the selection watcher does the actual switch.
    fn cycle_track(&mut self, inputs: &SessionInputs, direction: Direction) {
        let current = inputs.selected.borrow().clone();
        match self.library.neighbor(current.as_deref(), direction) {
            Some(next) => {
                debug!(track = %next.id, ?direction, "cycling background track");
                inputs.selected_tx.send_replace(Some(next.id.clone()));
            }
            None => debug!("track library is empty, nothing to cycle"),
        }
    }

    fn apply_audio(&mut self, selected: Option<&str>, total_silence: bool) {
        match self.library.resolve(selected, total_silence).cloned() {
            Some(track) => {
                let same = self.audio.current_track().is_some_and(|t| t.id == track.id);
                if same && self.audio.is_playing() {
                    return;
                }
                self.audio.play(&track);
                if self.engine.is_paused() {
                    self.audio.pause();
                }
                self.emit(Event::TrackChanged {
                    track_id: track.id.clone(),
                    name: track.name.clone(),
                    kind: track.kind,
                    at: Utc::now(),
                });
            }
            None => {
                let was_playing = self.audio.is_playing();
                self.audio.stop();
                if was_playing {
                    self.emit(Event::PlaybackStopped { at: Utc::now() });
                }
            }
        }
    }

    fn on_visibility(&mut self, visibility: Visibility) {
        let was_held = self.wake.is_held();
        let reacquired = self.wake.on_visibility(visibility);
        if was_held && !self.wake.is_held() {
            self.emit(Event::WakeLockLost { at: Utc::now() });
        }
        if reacquired {
            self.emit(Event::WakeLockAcquired { at: Utc::now() });
        }
    }

    fn emit_cue(&mut self, outcome: CueOutcome) {
        let event = match outcome {
            CueOutcome::NotDue => return,
            CueOutcome::Suppressed(cue) => Event::CueSuppressed { cue, at: Utc::now() },
            CueOutcome::Fired { kind, asset } => Event::CueFired {
                cue: kind,
                asset: asset.to_string(),
                at: Utc::now(),
            },
        };
        self.emit(event);
    }

    fn emit(&mut self, event: Event) {
        self.observer.on_event(&event);
    }

    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.audio.stop();
        self.engine.stop();
        self.wake.release();
        debug!("session torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}
