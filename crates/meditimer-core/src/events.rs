use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::TrackKind;
use crate::cues::CueKind;
use crate::timer::IntervalPolicy;

/// Every state change in a session produces an Event.
/// Hosts render from them; the CLI can print them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        duration_min: u32,
        interval: IntervalPolicy,
        at: DateTime<Utc>,
    },
    Tick {
        remaining_secs: u64,
        total_secs: u64,
    },
    CueFired {
        cue: CueKind,
        asset: String,
        at: DateTime<Utc>,
    },
    /// Cue was due but muted.
    CueSuppressed {
        cue: CueKind,
        at: DateTime<Utc>,
    },
    Paused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TrackChanged {
        track_id: String,
        name: String,
        kind: TrackKind,
        at: DateTime<Utc>,
    },
    PlaybackStopped {
        at: DateTime<Utc>,
    },
    WakeLockAcquired {
        at: DateTime<Utc>,
    },
    WakeLockLost {
        at: DateTime<Utc>,
    },
    SessionCompleted {
        actual_duration_min: u32,
        at: DateTime<Utc>,
    },
    /// Ended early by the user.
    SessionStopped {
        elapsed_secs: u64,
        actual_duration_min: u32,
        at: DateTime<Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::Tick {
            remaining_secs: 59,
            total_secs: 60,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["remaining_secs"], 59);

        let started = Event::SessionStarted {
            duration_min: 10,
            interval: IntervalPolicy::EveryMinutes(5),
            at: Utc::now(),
        };
        let json = serde_json::to_value(&started).unwrap();
        assert_eq!(json["interval"], "every:5");
    }
}
