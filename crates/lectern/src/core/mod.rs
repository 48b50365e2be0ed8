//! Core pipeline: routing, orchestration, configuration and file input.

pub mod config;
pub mod io;
pub mod orchestrator;
pub mod routing;

pub use config::LecternConfig;
pub use orchestrator::{Orchestrator, Submitted};
pub use routing::{format_for_file_name, route};
