mod engine;
mod interval;

pub use engine::{CountdownEngine, Tick, TimerState};
pub use interval::IntervalPolicy;
