pub mod cli;
pub mod config;
pub mod service;
pub mod signals;

pub use cli::{Args, Commands};
pub use config::load_config;
pub use service::{run_resync, run_watch};
