pub mod config;
pub mod logs;
pub mod session;
pub mod tracks;
