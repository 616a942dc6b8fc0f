//! Background audio tracks and the saved-track library.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::ValidationError;

/// Playback backend a track needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Explicit silence entry in the library.
    None,
    /// Streamable media file addressed by URL.
    Direct,
    /// Video played through the embedded YouTube player.
    Youtube,
}

impl TrackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackKind::None => "none",
            TrackKind::Direct => "direct",
            TrackKind::Youtube => "youtube",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(TrackKind::None),
            "direct" => Some(TrackKind::Direct),
            "youtube" => Some(TrackKind::Youtube),
            _ => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTrack {
    /// YouTube video id for `youtube` tracks, generated otherwise.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TrackKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Required for `direct` tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

pub const SILENCE_TRACK_ID: &str = "none";

impl AudioTrack {
    pub fn silence() -> Self {
        Self {
            id: SILENCE_TRACK_ID.to_string(),
            kind: TrackKind::None,
            name: "Silence".to_string(),
            creator: None,
            url: None,
            thumbnail: None,
        }
    }

    pub fn direct(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: TrackKind::Direct,
            name: name.into(),
            creator: None,
            url: Some(url.into()),
            thumbnail: None,
        }
    }

    pub fn youtube(video_id: impl Into<String>, name: impl Into<String>) -> Self {
        let video_id = video_id.into();
        Self {
            thumbnail: Some(format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")),
            id: video_id,
            kind: TrackKind::Youtube,
            name: name.into(),
            creator: None,
            url: None,
        }
    }

    /// Build a track from a pasted link.
    ///
    /// YouTube watch, short, shorts and embed links become `youtube` tracks
    /// keyed by video id; any other http(s) link is treated as direct media.
    pub fn from_url(raw: &str, name: Option<String>) -> Result<Self, ValidationError> {
        let url = Url::parse(raw.trim()).map_err(|e| ValidationError::UnsupportedUrl {
            url: raw.to_string(),
            message: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ValidationError::UnsupportedUrl {
                url: raw.to_string(),
                message: format!("scheme '{}' is not playable", url.scheme()),
            });
        }

        if let Some(video_id) = youtube_video_id(&url) {
            let name = name.unwrap_or_else(|| format!("YouTube {video_id}"));
            return Ok(Self::youtube(video_id, name));
        }

        let name = name.unwrap_or_else(|| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
                .filter(|segment| !segment.is_empty())
                .unwrap_or_else(|| url.host_str().unwrap_or("track").to_string())
        });
        Ok(Self::direct(name, url.as_str()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "id".into(),
                message: "track id must not be empty".into(),
            });
        }
        if self.kind == TrackKind::Direct && self.url.as_deref().map_or(true, str::is_empty) {
            return Err(ValidationError::InvalidValue {
                field: "url".into(),
                message: format!("direct track '{}' has no url", self.id),
            });
        }
        Ok(())
    }
}

fn youtube_video_id(url: &Url) -> Option<String> {
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let id = match host {
        "youtu.be" => url.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" | "youtube-nocookie.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("embed") | Some("shorts") | Some("live") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// Swipe/cycle direction through the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Ordered list of the user's saved tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackLibrary {
    tracks: Vec<AudioTrack>,
}

impl Default for TrackLibrary {
    fn default() -> Self {
        Self {
            tracks: vec![AudioTrack::silence()],
        }
    }
}

impl TrackLibrary {
    pub fn new(tracks: Vec<AudioTrack>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[AudioTrack] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AudioTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn add(&mut self, track: AudioTrack) -> Result<(), ValidationError> {
        track.validate()?;
        if self.get(&track.id).is_some() {
            return Err(ValidationError::DuplicateId {
                collection: "track library".into(),
                id: track.id,
            });
        }
        self.tracks.push(track);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<AudioTrack, ValidationError> {
        let index = self
            .tracks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ValidationError::NotFound {
                collection: "track library".into(),
                id: id.to_string(),
            })?;
        Ok(self.tracks.remove(index))
    }

    /// Track next to `current` in `direction`, wrapping at both ends.
    ///
    /// An unknown or absent `current` starts from the front (for `Next`) or
    /// the back (for `Previous`).
    pub fn neighbor(&self, current: Option<&str>, direction: Direction) -> Option<&AudioTrack> {
        let len = self.tracks.len();
        if len == 0 {
            return None;
        }
        let position = current.and_then(|id| self.tracks.iter().position(|t| t.id == id));
        let index = match (position, direction) {
            (Some(i), Direction::Next) => (i + 1) % len,
            (Some(i), Direction::Previous) => (i + len - 1) % len,
            (None, Direction::Next) => 0,
            (None, Direction::Previous) => len - 1,
        };
        self.tracks.get(index)
    }

    /// Concrete track to play for the current selection, or `None` to stop.
    pub fn resolve(&self, selected: Option<&str>, total_silence: bool) -> Option<&AudioTrack> {
        if total_silence {
            return None;
        }
        self.get(selected?).filter(|t| t.kind != TrackKind::None)
    }
}
