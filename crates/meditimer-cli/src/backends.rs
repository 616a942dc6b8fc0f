//! Terminal stand-ins for the platform pieces a session drives.
//!
//! Bells ring the terminal bell. The media element and the embedded player
//! are remotes that log what they are told to do; the embedded player
//! becomes ready a little after startup, the way a real bootstrap would.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use meditimer_core::audio::{
    AudioContext, ContextState, EmbeddedPlayer, EmbeddedPlayerSlot, MediaElement, PlaybackError,
    PlayerError,
};
use meditimer_core::cues::{CueHandle, CueLoader};
use meditimer_core::session::Backends;
use meditimer_core::wake::{WakeLock, WakeLockError};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay before the embedded player reports ready.
pub const PLAYER_BOOT_DELAY: Duration = Duration::from_millis(800);

/// Backends for a terminal session plus the task that boots the player.
pub fn terminal(player_boot_delay: Duration) -> (Backends, JoinHandle<()>) {
    let slot = EmbeddedPlayerSlot::new();
    let bootstrap = spawn_player_bootstrap(slot.clone(), player_boot_delay);
    let backends = Backends {
        media: Box::new(LoggingMedia::default()),
        player: slot,
        audio_context: Box::new(|| Box::new(TerminalContext::default()) as Box<dyn AudioContext>),
        cue_loader: Box::new(TerminalBells),
        wake_lock: Box::new(InhibitLock::default()),
    };
    (backends, bootstrap)
}

fn spawn_player_bootstrap(slot: EmbeddedPlayerSlot, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        slot.install(Arc::new(RemotePlayer::default()));
        debug!("embedded player ready");
    })
}

pub struct TerminalBells;

impl CueLoader for TerminalBells {
    fn load(&mut self, asset: &str) -> Result<Box<dyn CueHandle>, PlaybackError> {
        Ok(Box::new(TerminalBell {
            asset: asset.to_string(),
        }))
    }
}

struct TerminalBell {
    asset: String,
}

impl CueHandle for TerminalBell {
    fn rewind(&mut self) {}

    fn play(&mut self) -> Result<(), PlaybackError> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| PlaybackError::Unavailable(format!("{}: {e}", self.asset)))?;
        debug!(asset = %self.asset, "bell");
        Ok(())
    }
}

#[derive(Default)]
pub struct LoggingMedia {
    source: Option<String>,
    looping: bool,
    volume: f32,
}

impl MediaElement for LoggingMedia {
    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let source = self
            .source
            .as_deref()
            .ok_or_else(|| PlaybackError::Unavailable("no source set".into()))?;
        info!(source, looping = self.looping, volume = self.volume, "media playing");
        Ok(())
    }

    fn pause(&mut self) {
        debug!("media paused");
    }

    fn rewind(&mut self) {}
}

#[derive(Default)]
pub struct RemotePlayer {
    video: Mutex<Option<String>>,
}

impl RemotePlayer {
    fn current(&self) -> Result<String, PlayerError> {
        let video = self.video.lock().map_err(|_| PlayerError::Command {
            command: "state",
            message: "player state poisoned".into(),
        })?;
        Ok(video.clone().unwrap_or_default())
    }
}

impl EmbeddedPlayer for RemotePlayer {
    fn is_ready(&self) -> bool {
        true
    }

    fn load_video_by_id(&self, video_id: &str) -> Result<(), PlayerError> {
        let mut video = self.video.lock().map_err(|_| PlayerError::Command {
            command: "loadVideoById",
            message: "player state poisoned".into(),
        })?;
        *video = Some(video_id.to_string());
        info!(video_id, "embedded player loading video");
        Ok(())
    }

    fn set_volume(&self, volume: u8) -> Result<(), PlayerError> {
        debug!(volume, "embedded player volume");
        Ok(())
    }

    fn play(&self) -> Result<(), PlayerError> {
        info!(video_id = %self.current()?, "embedded player playing");
        Ok(())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        debug!(video_id = %self.current()?, "embedded player paused");
        Ok(())
    }

    fn stop(&self) -> Result<(), PlayerError> {
        debug!("embedded player stopped");
        Ok(())
    }
}

/// Audio output needs no unlocking in a terminal; it starts suspended
/// only so the first play exercises the resume path.
pub struct TerminalContext {
    state: ContextState,
}

impl Default for TerminalContext {
    fn default() -> Self {
        Self {
            state: ContextState::Suspended,
        }
    }
}

impl AudioContext for TerminalContext {
    fn state(&self) -> ContextState {
        self.state
    }

    fn resume(&mut self) -> Result<(), PlaybackError> {
        self.state = ContextState::Running;
        Ok(())
    }
}

/// Holds a `systemd-inhibit` child for as long as the lock is wanted.
#[derive(Default)]
pub struct InhibitLock {
    child: Option<Child>,
}

impl WakeLock for InhibitLock {
    fn request(&mut self) -> Result<(), WakeLockError> {
        if self.child.is_some() {
            return Ok(());
        }
        let child = Command::new("systemd-inhibit")
            .args([
                "--what=idle:sleep",
                "--who=meditimer",
                "--why=Meditation session in progress",
                "--mode=block",
                "sleep",
                "infinity",
            ])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => WakeLockError::Unsupported,
                _ => WakeLockError::Denied(e.to_string()),
            })?;
        self.child = Some(child);
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                warn!("failed to end systemd-inhibit: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_without_source_is_unavailable() {
        let mut media = LoggingMedia::default();
        assert!(matches!(media.play(), Err(PlaybackError::Unavailable(_))));
        media.set_source("https://cdn.example.com/rain.mp3");
        assert!(media.play().is_ok());
    }

    #[test]
    fn context_resumes() {
        let mut context = TerminalContext::default();
        assert_eq!(context.state(), ContextState::Suspended);
        context.resume().unwrap();
        assert_eq!(context.state(), ContextState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn player_installs_after_delay() {
        let slot = EmbeddedPlayerSlot::new();
        let bootstrap = spawn_player_bootstrap(slot.clone(), Duration::from_millis(800));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(slot.ready().is_none());
        bootstrap.await.unwrap();
        assert!(slot.ready().is_some());
    }

    #[test]
    fn release_without_request_is_harmless() {
        let mut lock = InhibitLock::default();
        lock.release();
        assert!(lock.child.is_none());
    }
}
