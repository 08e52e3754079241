//! Service configuration and calibration data

pub mod power_model;
mod service_config;

pub use power_model::{CurrentKind, PowerEntry, PowerModel};
pub use service_config::{default_config_path, ConfigError, LogLevel, ServiceConfig};
