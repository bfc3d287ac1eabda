//! CLI command implementations

pub mod config;
pub mod watch;

pub use config::execute as config;
pub use watch::execute as watch;
