//! Playback backends the audio source drives.
//!
//! Hosts implement these traits over whatever the platform provides: a media
//! element, a remote-controlled video player, an audio-processing context.

use std::sync::{Arc, RwLock};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Platform refused to start playback (autoplay policy, no gesture).
    #[error("playback rejected: {0}")]
    Rejected(String),

    /// Source could not be fetched or decoded.
    #[error("media unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("embedded player is not ready")]
    NotReady,

    #[error("embedded player command '{command}' failed: {message}")]
    Command {
        command: &'static str,
        message: String,
    },
}

/// Single reusable media element for direct tracks.
pub trait MediaElement: Send {
    fn set_source(&mut self, url: &str);
    fn set_looping(&mut self, looping: bool);
    /// 0.0 ..= 1.0
    fn set_volume(&mut self, volume: f32);
    fn play(&mut self) -> Result<(), PlaybackError>;
    fn pause(&mut self);
    /// Seek back to position zero.
    fn rewind(&mut self);
}

/// Remote-control surface of the embedded video player.
pub trait EmbeddedPlayer: Send + Sync {
    /// Whether `load_video_by_id` can be called yet.
    fn is_ready(&self) -> bool;
    fn load_video_by_id(&self, video_id: &str) -> Result<(), PlayerError>;
    /// 0 ..= 100
    fn set_volume(&self, volume: u8) -> Result<(), PlayerError>;
    fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn stop(&self) -> Result<(), PlayerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// Process-wide audio-processing context, unlocked on first user gesture.
pub trait AudioContext: Send {
    fn state(&self) -> ContextState;
    fn resume(&mut self) -> Result<(), PlaybackError>;
}

pub type ContextFactory = Box<dyn FnMut() -> Box<dyn AudioContext> + Send>;

/// Shared handle to the process-wide embedded player.
///
/// The platform bootstrap installs the player whenever its script finishes
/// loading; everything else only looks it up. Cloning shares the slot.
#[derive(Clone, Default)]
pub struct EmbeddedPlayerSlot {
    inner: Arc<RwLock<Option<Arc<dyn EmbeddedPlayer>>>>,
}

impl EmbeddedPlayerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&self, player: Arc<dyn EmbeddedPlayer>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(player);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = None;
        }
    }

    pub fn get(&self) -> Option<Arc<dyn EmbeddedPlayer>> {
        self.inner.read().ok()?.clone()
    }

    /// The player, if installed and able to take a load command.
    pub fn ready(&self) -> Option<Arc<dyn EmbeddedPlayer>> {
        self.get().filter(|player| player.is_ready())
    }
}

impl std::fmt::Debug for EmbeddedPlayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedPlayerSlot")
            .field("installed", &self.get().is_some())
            .finish()
    }
}
