//! Background audio source.
//!
//! One play/pause/resume/stop surface over two backends: the shared media
//! element for direct tracks and the shared embedded player for YouTube
//! tracks. At most one of them is ever producing sound; `play` always stops
//! the previous track first.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::{
    AudioContext, ContextFactory, ContextState, EmbeddedPlayer, EmbeddedPlayerSlot, MediaElement,
};
use super::readiness::{await_player, Readiness, RetryPolicy};
use super::track::{AudioTrack, TrackKind};

/// Fixed playback levels and the readiness budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioSettings {
    /// Media element volume, 0.0 ..= 1.0.
    pub direct_volume: f32,
    /// Embedded player volume, 0 ..= 100.
    pub embedded_volume: u8,
    pub retry: RetryPolicy,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            direct_volume: 0.3,
            embedded_volume: 50,
            retry: RetryPolicy::default(),
        }
    }
}

/// Observable playback state for a host UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub track_id: Option<String>,
    pub kind: Option<TrackKind>,
}

pub struct AudioSource {
    media: Box<dyn MediaElement>,
    player: EmbeddedPlayerSlot,
    context_factory: ContextFactory,
    context: Option<Box<dyn AudioContext>>,
    settings: AudioSettings,
    current: Option<AudioTrack>,
    is_playing: bool,
    pending_load: Option<JoinHandle<()>>,
    /// Embedded load withheld by a pause; `resume` issues it.
    deferred_load: bool,
}

impl AudioSource {
    pub fn new(
        media: Box<dyn MediaElement>,
        player: EmbeddedPlayerSlot,
        context_factory: ContextFactory,
        settings: AudioSettings,
    ) -> Self {
        Self {
            media,
            player,
            context_factory,
            context: None,
            settings,
            current: None,
            is_playing: false,
            pending_load: None,
            deferred_load: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_track(&self) -> Option<&AudioTrack> {
        self.current.as_ref()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            track_id: self.current.as_ref().map(|t| t.id.clone()),
            kind: self.current.as_ref().map(|t| t.kind),
        }
    }

    /// Whether a superseded or in-flight embedded load is still waiting.
    pub fn has_pending_load(&self) -> bool {
        self.pending_load
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Switch to `track`. Must be reached from a user gesture the first
    /// time, since it unlocks the audio context.
    pub fn play(&mut self, track: &AudioTrack) {
        self.stop();
        if track.kind == TrackKind::None {
            self.current = None;
            return;
        }

        self.current = Some(track.clone());
        self.is_playing = true;
        self.unlock_context();

        match track.kind {
            TrackKind::Direct => self.play_direct(track),
            TrackKind::Youtube => self.play_embedded(track.id.clone()),
            TrackKind::None => {}
        }
    }

    pub fn stop(&mut self) {
        self.is_playing = false;
        self.deferred_load = false;
        self.cancel_pending_load();
        self.media.pause();
        self.media.rewind();
        if let Some(player) = self.player.get() {
            if let Err(e) = player.stop() {
                debug!("embedded player stop ignored: {e}");
            }
        }
    }

    pub fn pause(&mut self) {
        let Some(kind) = self.current.as_ref().map(|t| t.kind) else {
            return;
        };
        self.is_playing = false;
        match kind {
            TrackKind::Direct => self.media.pause(),
            // A load still waiting on readiness would start audibly after
            // this pause, so it is withheld until resume.
            TrackKind::Youtube if self.has_pending_load() => {
                self.cancel_pending_load();
                self.deferred_load = true;
            }
            TrackKind::Youtube => {
                if let Some(player) = self.player.get() {
                    if let Err(e) = player.pause() {
                        debug!("embedded player pause ignored: {e}");
                    }
                }
            }
            TrackKind::None => {}
        }
    }

    pub fn resume(&mut self) {
        let Some(kind) = self.current.as_ref().map(|t| t.kind) else {
            return;
        };
        self.is_playing = true;
        match kind {
            TrackKind::Direct => {
                if let Err(e) = self.media.play() {
                    warn!("direct playback resume failed: {e}");
                }
            }
            TrackKind::Youtube if self.deferred_load => {
                self.deferred_load = false;
                if let Some(video_id) = self.current.as_ref().map(|t| t.id.clone()) {
                    self.play_embedded(video_id);
                }
            }
            TrackKind::Youtube => {
                if let Some(player) = self.player.get() {
                    if let Err(e) = player.play() {
                        debug!("embedded player resume ignored: {e}");
                    }
                }
            }
            TrackKind::None => {}
        }
    }

    fn play_direct(&mut self, track: &AudioTrack) {
        let Some(url) = track.url.as_deref() else {
            warn!(track = %track.id, "direct track has no url, nothing to play");
            return;
        };
        self.media.set_source(url);
        self.media.set_looping(true);
        self.media.set_volume(self.settings.direct_volume);
        match self.media.play() {
            Ok(()) => info!(track = %track.id, "direct playback started"),
            // is_playing stays optimistic; the session carries on in silence.
            Err(e) => warn!(track = %track.id, "direct playback failed: {e}"),
        }
    }

    fn play_embedded(&mut self, video_id: String) {
        let slot = self.player.clone();
        let policy = self.settings.retry;
        let volume = self.settings.embedded_volume;

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                self.pending_load = Some(runtime.spawn(async move {
                    match await_player(&slot, policy).await {
                        Readiness::Ready { player, attempts } => {
                            debug!(attempts, "embedded player ready");
                            load_embedded(player.as_ref(), &video_id, volume);
                        }
                        Readiness::Exhausted { attempts } => {
                            warn!(
                                video = %video_id,
                                attempts,
                                "embedded player never became ready, playback abandoned"
                            );
                        }
                    }
                }));
            }
            Err(_) => match slot.ready() {
                Some(player) => load_embedded(player.as_ref(), &video_id, volume),
                None => warn!(video = %video_id, "embedded player not ready and no runtime to wait on"),
            },
        }
    }

    fn cancel_pending_load(&mut self) {
        if let Some(handle) = self.pending_load.take() {
            if !handle.is_finished() {
                debug!("cancelling superseded embedded load");
            }
            handle.abort();
        }
    }

    fn unlock_context(&mut self) {
        let context = self
            .context
            .get_or_insert_with(|| (self.context_factory)());
        if context.state() == ContextState::Suspended {
            if let Err(e) = context.resume() {
                warn!("audio context resume failed: {e}");
            }
        }
    }
}

impl Drop for AudioSource {
    fn drop(&mut self) {
        self.cancel_pending_load();
    }
}

fn load_embedded(player: &dyn EmbeddedPlayer, video_id: &str, volume: u8) {
    if let Err(e) = player.load_video_by_id(video_id) {
        warn!(video = %video_id, "embedded load failed: {e}");
        return;
    }
    if let Err(e) = player.set_volume(volume) {
        debug!("embedded set_volume ignored: {e}");
    }
    info!(video = %video_id, "embedded playback started");
}
