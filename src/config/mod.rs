pub mod cli;
pub mod toml_config;

pub use cli::CliArgs;
pub use toml_config::{
    BrokerConfig, BulbConfig, LoggingConfig, MonitorConfig, ScheduleConfig, ThresholdConfig,
    TokenSource,
};
