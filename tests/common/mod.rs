//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use powerstats::config::{PowerModel, ServiceConfig};
use powerstats::events::RawEvent;
use powerstats::stats::clock::TimeSource;
use powerstats::stats::BatteryStatsService;

pub const US_PER_HOUR: u64 = 3_600_000_000;

/// Time source the tests advance by hand
pub struct ManualTime(AtomicU64);

impl ManualTime {
    pub fn set(&self, us: u64) {
        self.0.store(us, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTime {
    fn now_us(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Service on the default power model with a manual clock
pub fn test_service() -> (BatteryStatsService, Arc<ManualTime>) {
    let time = Arc::new(ManualTime(AtomicU64::new(0)));
    let service = BatteryStatsService::with_time_source(
        &ServiceConfig::default(),
        PowerModel::default(),
        time.clone(),
    );
    (service, time)
}

pub fn stateful_event(
    domain: &str,
    name: &str,
    uid: i32,
    state: i32,
    at_us: u64,
) -> RawEvent {
    RawEvent::new(domain, name)
        .with("UID", uid)
        .with("PID", 3_458)
        .with("STATE", state)
        .at(at_us)
}
