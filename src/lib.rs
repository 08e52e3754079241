// Root module exports
pub mod client;
pub mod config;
pub mod dump;
pub mod error;
pub mod events;
pub mod ipc;
pub mod logging;
pub mod stats;

// Re-export common items for convenience
pub use client::{BatteryStatsClient, RemoteStats, UnixSocketRemote};
pub use config::{PowerModel, ServiceConfig};
pub use error::{Result, StatsCode, StatsError};
pub use events::{EventBroker, EventFilter, Normalizer, RawEvent};
pub use ipc::StatsServer;
pub use logging::configure_logging;
pub use stats::{
    BatteryStatsInfo, BatteryStatsService, ConsumptionType, StatsState, StatsType,
};
