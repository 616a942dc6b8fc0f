//! A single meditation session, from entry to teardown.

mod log;
mod orchestrator;
mod swipe;

pub use log::{AudioDetails, SessionLog, SessionLogSink};
pub use orchestrator::{
    Backends, NoopObserver, Session, SessionCommand, SessionConfig, SessionControls, SessionInputs,
    SessionObserver, SessionOutcome,
};
pub use swipe::{swipe_direction, SwipeGesture, SWIPE_THRESHOLD_PX};
