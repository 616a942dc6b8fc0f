//! Screen wake lock held for the length of a session.
//!
//! Platforms drop the lock whenever the page (or terminal) is hidden, so the
//! session reacquires it when visibility returns. Failures never end the
//! session: without a lock the screen may simply dim.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WakeLockError {
    #[error("wake lock not supported on this platform")]
    Unsupported,

    #[error("wake lock request denied: {0}")]
    Denied(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Platform wake-lock primitive.
pub trait WakeLock: Send {
    fn request(&mut self) -> Result<(), WakeLockError>;
    fn release(&mut self);
}

/// Tracks whether the session wants the lock and whether it is held.
pub struct ScreenWake {
    lock: Box<dyn WakeLock>,
    wanted: bool,
    held: bool,
}

impl ScreenWake {
    pub fn new(lock: Box<dyn WakeLock>) -> Self {
        Self {
            lock,
            wanted: false,
            held: false,
        }
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Request the lock. Returns whether it is now held.
    pub fn acquire(&mut self) -> bool {
        self.wanted = true;
        self.request()
    }

    pub fn release(&mut self) {
        self.wanted = false;
        if self.held {
            self.lock.release();
            self.held = false;
            debug!("wake lock released");
        }
    }

    /// React to a visibility change. Returns `true` if the lock was
    /// reacquired by this call.
    pub fn on_visibility(&mut self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Hidden => {
                // The platform has already let go of it.
                if self.held {
                    debug!("wake lock lost while hidden");
                }
                self.held = false;
                false
            }
            Visibility::Visible if self.wanted && !self.held => self.request(),
            Visibility::Visible => false,
        }
    }

    fn request(&mut self) -> bool {
        if self.held {
            return true;
        }
        match self.lock.request() {
            Ok(()) => {
                self.held = true;
                info!("wake lock acquired");
                true
            }
            Err(e) => {
                warn!("continuing without wake lock: {e}");
                false
            }
        }
    }
}

impl Drop for ScreenWake {
    fn drop(&mut self) {
        self.release();
    }
}
