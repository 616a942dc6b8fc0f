//! Bell cues: start, interval and end stings.
//!
//! The scheduler decides whether a cue is due and which asset it maps to;
//! the bank owns one reusable handle per asset and restarts it on every
//! trigger, so overlapping cues restart rather than queue.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audio::PlaybackError;
use crate::timer::IntervalPolicy;

/// Asset played at the end of every session. Not user-configurable.
pub const END_BELL_ASSET: &str = "bell-end";

/// User-selectable bell sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum SoundKey {
    None,
    #[default]
    Bell1,
    Bell2,
    Bell3,
}

impl SoundKey {
    pub const ALL: [SoundKey; 4] = [SoundKey::None, SoundKey::Bell1, SoundKey::Bell2, SoundKey::Bell3];

    /// Asset name, or `None` for the silent key.
    pub fn asset(&self) -> Option<&'static str> {
        match self {
            SoundKey::None => None,
            SoundKey::Bell1 => Some("bell-1"),
            SoundKey::Bell2 => Some("bell-2"),
            SoundKey::Bell3 => Some("bell-3"),
        }
    }
}

impl fmt::Display for SoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset().unwrap_or("none"))
    }
}

impl FromStr for SoundKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundKey::ALL
            .into_iter()
            .find(|key| key.to_string() == s.trim())
            .ok_or_else(|| format!("unknown sound '{s}' (expected none, bell-1, bell-2 or bell-3)"))
    }
}

impl From<SoundKey> for String {
    fn from(key: SoundKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for SoundKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueKind {
    Start,
    Interval,
    End,
}

/// Bell preferences the session starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BellConfig {
    pub start_sound: SoundKey,
    pub interval_sound: SoundKey,
    pub total_silence: bool,
}

impl BellConfig {
    pub fn asset_for(&self, kind: CueKind) -> Option<&'static str> {
        match kind {
            CueKind::Start => self.start_sound.asset(),
            CueKind::Interval => self.interval_sound.asset(),
            CueKind::End => Some(END_BELL_ASSET),
        }
    }
}

/// Result of asking the scheduler for a cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueOutcome {
    /// No cue belongs on this tick.
    NotDue,
    /// Due, but muted by total silence or a `none` sound key.
    Suppressed(CueKind),
    Fired {
        kind: CueKind,
        asset: &'static str,
    },
}

/// A preloaded, rewindable sound.
pub trait CueHandle: Send {
    fn rewind(&mut self);
    fn play(&mut self) -> Result<(), PlaybackError>;
}

/// Loads a bell asset into a reusable handle.
pub trait CueLoader {
    fn load(&mut self, asset: &str) -> Result<Box<dyn CueHandle>, PlaybackError>;
}

/// One handle per distinct bell asset.
#[derive(Default)]
pub struct CueBank {
    handles: HashMap<&'static str, Box<dyn CueHandle>>,
}

impl CueBank {
    /// Preload the assets `config` can reach. Assets that fail to load stay
    /// silent for the session.
    pub fn preload(loader: &mut dyn CueLoader, config: &BellConfig) -> Self {
        let mut handles = HashMap::new();
        let assets = [CueKind::Start, CueKind::Interval, CueKind::End]
            .into_iter()
            .filter_map(|kind| config.asset_for(kind));
        for asset in assets {
            if handles.contains_key(asset) {
                continue;
            }
            match loader.load(asset) {
                Ok(handle) => {
                    handles.insert(asset, handle);
                }
                Err(e) => warn!(asset, "bell preload failed: {e}"),
            }
        }
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Restart `asset` from position zero.
    pub fn trigger(&mut self, asset: &str) {
        let Some(handle) = self.handles.get_mut(asset) else {
            debug!(asset, "no handle loaded for bell");
            return;
        };
        handle.rewind();
        if let Err(e) = handle.play() {
            warn!(asset, "bell playback failed: {e}");
        }
    }
}

pub struct BellScheduler {
    config: BellConfig,
    policy: IntervalPolicy,
    bank: CueBank,
}

impl BellScheduler {
    pub fn new(config: BellConfig, policy: IntervalPolicy, bank: CueBank) -> Self {
        Self {
            config,
            policy,
            bank,
        }
    }

    pub fn config(&self) -> &BellConfig {
        &self.config
    }

    pub fn policy(&self) -> IntervalPolicy {
        self.policy
    }

    pub fn set_total_silence(&mut self, total_silence: bool) {
        self.config.total_silence = total_silence;
    }

    pub fn on_start(&mut self) -> CueOutcome {
        self.fire(CueKind::Start)
    }

    pub fn on_interval(&mut self, remaining_secs: u64, total_secs: u64) -> CueOutcome {
        if !self.policy.should_fire(remaining_secs, total_secs) {
            return CueOutcome::NotDue;
        }
        self.fire(CueKind::Interval)
    }

    pub fn on_complete(&mut self) -> CueOutcome {
        self.fire(CueKind::End)
    }

    fn fire(&mut self, kind: CueKind) -> CueOutcome {
        if self.config.total_silence {
            return CueOutcome::Suppressed(kind);
        }
        let Some(asset) = self.config.asset_for(kind) else {
            return CueOutcome::Suppressed(kind);
        };
        self.bank.trigger(asset);
        CueOutcome::Fired { kind, asset }
    }
}
