// Command-line adapter: argument parsing, log sinks, and the wiring that
// hands infra implementations to the core services.

#[path = "config.rs"]
pub mod config;

#[path = "logging.rs"]
pub mod logging;

#[path = "publish_command.rs"]
pub mod publish_command;
