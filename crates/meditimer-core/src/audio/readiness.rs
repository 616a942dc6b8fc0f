//! Bounded wait for the embedded player to come up.
//!
//! The player script loads asynchronously, so a load request can arrive
//! before the player exists. We poll the slot on a fixed delay and give up
//! after `max_retries` retries. The caller runs this on a spawned task and
//! aborts it when a newer request supersedes it.

use std::sync::Arc;
use std::time::Duration;

use super::backend::{EmbeddedPlayer, EmbeddedPlayerSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(200),
            max_retries: 30,
        }
    }
}

pub enum Readiness {
    Ready {
        player: Arc<dyn EmbeddedPlayer>,
        /// Checks made, including the successful one.
        attempts: u32,
    },
    Exhausted {
        attempts: u32,
    },
}

impl Readiness {
    pub fn attempts(&self) -> u32 {
        match self {
            Readiness::Ready { attempts, .. } | Readiness::Exhausted { attempts } => *attempts,
        }
    }
}

/// Poll `slot` until the player is ready or the retry budget runs out.
pub async fn await_player(slot: &EmbeddedPlayerSlot, policy: RetryPolicy) -> Readiness {
    let mut retry = 0;
    loop {
        if let Some(player) = slot.ready() {
            return Readiness::Ready {
                player,
                attempts: retry + 1,
            };
        }
        if retry >= policy.max_retries {
            return Readiness::Exhausted {
                attempts: retry + 1,
            };
        }
        retry += 1;
        tracing::trace!(retry, "embedded player not ready, retrying");
        tokio::time::sleep(policy.delay).await;
    }
}
