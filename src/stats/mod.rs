//! Aggregation engine: virtual clock, state tracking, ledger, service facade

pub mod clock;
pub mod ledger;
pub mod service;
pub mod tracker;
pub mod types;

pub use clock::{OnBatteryClock, SystemTimeSource, TimeSource};
pub use ledger::ConsumptionLedger;
pub use service::BatteryStatsService;
pub use tracker::StateTracker;
pub use types::{BatteryStatsInfo, ConsumptionDelta, ConsumptionType, StatsState, StatsType};
