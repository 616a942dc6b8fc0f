//! Interval-bell policy.
//!
//! Decides, per tick, whether the interval cue is due. Pure: no audio here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// When the interval bell rings during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum IntervalPolicy {
    #[default]
    None,
    /// Once, at the exact halfway second.
    Half,
    /// At every whole multiple of N minutes elapsed.
    EveryMinutes(u32),
}

impl IntervalPolicy {
    /// Whether a tick reporting `remaining_secs` of `total_secs` is an
    /// interval point.
    ///
    /// `Half` compares against `total_secs / 2` with integer equality, so an
    /// odd total never rings. Minute-based sessions always have an even total.
    pub fn should_fire(&self, remaining_secs: u64, total_secs: u64) -> bool {
        match *self {
            IntervalPolicy::None => false,
            IntervalPolicy::Half => total_secs % 2 == 0 && remaining_secs == total_secs / 2,
            IntervalPolicy::EveryMinutes(n) => {
                let period = u64::from(n) * 60;
                if period == 0 {
                    return false;
                }
                let elapsed = total_secs.saturating_sub(remaining_secs);
                elapsed > 0 && elapsed % period == 0
            }
        }
    }
}

impl fmt::Display for IntervalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalPolicy::None => write!(f, "none"),
            IntervalPolicy::Half => write!(f, "half"),
            IntervalPolicy::EveryMinutes(n) => write!(f, "every:{n}"),
        }
    }
}

impl FromStr for IntervalPolicy {
    type Err = String;

    /// Parses `none`, `half` or `every:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "" => Ok(IntervalPolicy::None),
            "half" => Ok(IntervalPolicy::Half),
            other => {
                let minutes = other
                    .strip_prefix("every:")
                    .ok_or_else(|| format!("unknown interval policy '{other}'"))?;
                let n: u32 = minutes
                    .parse()
                    .map_err(|_| format!("invalid minute count '{minutes}'"))?;
                if n == 0 {
                    return Err("interval period must be at least one minute".into());
                }
                Ok(IntervalPolicy::EveryMinutes(n))
            }
        }
    }
}

impl From<IntervalPolicy> for String {
    fn from(policy: IntervalPolicy) -> Self {
        policy.to_string()
    }
}

impl TryFrom<String> for IntervalPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
