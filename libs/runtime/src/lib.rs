pub mod config;
pub mod logging;

pub use config::{
    default_logging_config, AppConfig, CliArgs, LoggingConfig, PolicyConfig, QueryConfig,
    Section, TiebreakerConfig,
};
pub use logging::init_logging_from_config;
