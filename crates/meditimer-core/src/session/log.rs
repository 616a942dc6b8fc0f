//! Session log record and the sink it is reported to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::{AudioTrack, TrackKind};
use crate::error::Result;

/// Background track that was playing when the session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDetails {
    pub id: String,
    pub name: String,
    pub kind: TrackKind,
}

impl From<&AudioTrack> for AudioDetails {
    fn from(track: &AudioTrack) -> Self {
        Self {
            id: track.id.clone(),
            name: track.name.clone(),
            kind: track.kind,
        }
    }
}

/// What a session reports when it ends, naturally or early.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLog {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub planned_duration_min: u32,
    /// Full duration on completion, floored elapsed minutes on manual stop.
    pub actual_duration_min: u32,
    pub completed: bool,
    pub start_note: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emotions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioDetails>,
}

/// Receives exactly one log per session.
pub trait SessionLogSink: Send {
    /// Returns the stored record id.
    fn record(&mut self, log: &SessionLog) -> Result<i64>;
}
