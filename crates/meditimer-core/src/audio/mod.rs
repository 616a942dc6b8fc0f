//! Background audio: tracks, playback backends and the audio source that
//! switches between them.

mod backend;
mod readiness;
mod source;
mod track;

pub use backend::{
    AudioContext, ContextFactory, ContextState, EmbeddedPlayer, EmbeddedPlayerSlot, MediaElement,
    PlaybackError, PlayerError,
};
pub use readiness::{await_player, Readiness, RetryPolicy};
pub use source::{AudioSettings, AudioSource, PlaybackSnapshot};
pub use track::{AudioTrack, Direction, TrackKind, TrackLibrary, SILENCE_TRACK_ID};
