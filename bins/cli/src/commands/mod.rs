//! CLI command handlers.

pub mod config;
pub mod info;
pub mod publish;

pub use config::{ShowFormat, run_config_check, run_config_show};
pub use info::run_info;
pub use publish::{PublishArgs, run_publish_command};
