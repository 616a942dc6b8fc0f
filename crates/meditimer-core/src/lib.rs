//! # Meditimer Core Library
//!
//! This library provides the session engine behind the Meditimer meditation
//! timer: the countdown, the bell cues, the background-audio switching and
//! the bookkeeping around them. Hosts (the CLI, or any other shell) supply
//! the platform pieces through traits and render from events.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: A tick-driven state machine; one `tick()` per second
//! - **Bell Scheduler**: Start, interval and end cues with a total-silence override
//! - **Audio Source**: One play/pause/stop surface over a media element and an
//!   asynchronously-initialized embedded video player
//! - **Session**: Orchestrates the above on a single Tokio task and logs the result
//! - **Storage**: SQLite session logs and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`CountdownEngine`]: Core timer state machine
//! - [`BellScheduler`]: Cue decisions and playback
//! - [`AudioSource`]: Background track playback
//! - [`Session`]: Session orchestrator
//! - [`Database`]: Session log persistence
//! - [`Config`]: Application configuration management

pub mod audio;
pub mod cues;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;
pub mod timer;
pub mod wake;

pub use audio::{AudioSource, AudioTrack, EmbeddedPlayerSlot, TrackKind, TrackLibrary};
pub use cues::{BellConfig, BellScheduler, CueKind, SoundKey};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, ValidationError};
pub use events::Event;
pub use session::{Session, SessionConfig, SessionControls, SessionLog, SessionObserver};
pub use storage::{Config, Database, Preferences};
pub use timer::{CountdownEngine, IntervalPolicy, Tick, TimerState};
pub use wake::{ScreenWake, Visibility, WakeLock};
