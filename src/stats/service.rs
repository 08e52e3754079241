//! Battery stats service core
//!
//! Owns the single-writer aggregation state behind one lock: the on-battery
//! clock, the state tracker, the ledger and the dump log. Event ingestion and
//! queries are both methods here; the IPC server is a thin shell over this
//! type.

use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{PowerModel, ServiceConfig};
use crate::dump::DumpLog;
use crate::events::{Normalizer, RawEvent};
use crate::stats::clock::{OnBatteryClock, SystemTimeSource, TimeSource};
use crate::stats::ledger::ConsumptionLedger;
use crate::stats::tracker::StateTracker;
use crate::stats::types::{BatteryStatsInfo, ConsumptionType, StatsType, DEFAULT_VALUE};

struct Core {
    clock: OnBatteryClock,
    tracker: StateTracker,
    ledger: ConsumptionLedger,
    dump_log: DumpLog,
}

/// The aggregation engine
pub struct BatteryStatsService {
    model: Arc<PowerModel>,
    normalizer: Normalizer,
    time_source: Arc<dyn TimeSource>,
    core: Mutex<Core>,
}

impl BatteryStatsService {
    pub fn new(config: &ServiceConfig, model: PowerModel) -> Self {
        Self::with_time_source(config, model, Arc::new(SystemTimeSource))
    }

    /// Build with an injected time source, used by tests to drive the clock
    pub fn with_time_source(
        config: &ServiceConfig,
        model: PowerModel,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            model: Arc::new(model),
            normalizer: Normalizer::new(),
            time_source,
            core: Mutex::new(Core {
                clock: OnBatteryClock::new(config.on_battery_at_boot),
                tracker: StateTracker::new(),
                ledger: ConsumptionLedger::new(),
                dump_log: DumpLog::new(config.dump_log_capacity),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ingest one raw event.
    ///
    /// Unrecognized events still reach the dump log when they have a dump
    /// rendering; only tracked ones touch the ledger.
    pub fn handle_event(&self, raw: &RawEvent) {
        let real_us = raw
            .timestamp_us
            .unwrap_or_else(|| self.time_source.now_us());

        let mut core = self.lock();
        core.clock.advance(real_us);
        core.dump_log.record(raw);

        let Some(event) = self.normalizer.normalize(raw) else {
            return;
        };
        crate::debug_log!(
            "Handling {:?} {:?} uid={}",
            event.stats_type,
            event.state,
            event.uid
        );

        if event.traffic > 0 {
            // Single-shot counters only accrue while discharging
            if core.clock.is_on_battery() {
                let Core { ledger, .. } = &mut *core;
                ledger.credit_count(event.stats_type, event.uid, event.traffic, &self.model);
            }
            return;
        }

        let now_virtual = core.clock.now_virtual();
        let Core { tracker, ledger, .. } = &mut *core;
        for delta in tracker.on_event(&event, now_virtual) {
            ledger.credit(&delta, &self.model);
        }
    }

    /// Flip the charging gate
    pub fn set_on_battery(&self, on_battery: bool) {
        let real_us = self.time_source.now_us();
        let mut core = self.lock();
        core.clock.set_on_battery(on_battery, real_us);
        log::info!("On-battery state changed to {}", on_battery);
    }

    pub fn is_on_battery(&self) -> bool {
        self.lock().clock.is_on_battery()
    }

    /// Zero all accumulated totals and restart open intervals from now
    pub fn reset(&self) {
        let real_us = self.time_source.now_us();
        let mut core = self.lock();
        core.clock.advance(real_us);
        let now_virtual = core.clock.now_virtual();
        core.tracker.rebase(now_virtual);
        core.ledger.reset();
        core.dump_log.clear();
        log::info!("Battery stats have been reset");
    }

    pub fn get_battery_stats(&self) -> Vec<BatteryStatsInfo> {
        self.lock().ledger.snapshot()
    }

    pub fn get_app_stats_mah(&self, uid: i32) -> f64 {
        self.lock().ledger.app_stats_mah(uid)
    }

    pub fn get_app_stats_percent(&self, uid: i32) -> f64 {
        let core = self.lock();
        percent_of(core.ledger.app_stats_mah(uid), core.ledger.total_power_mah())
    }

    pub fn get_part_stats_mah(&self, consumption_type: ConsumptionType) -> f64 {
        self.lock().ledger.part_stats_mah(consumption_type)
    }

    pub fn get_part_stats_percent(&self, consumption_type: ConsumptionType) -> f64 {
        let core = self.lock();
        percent_of(
            core.ledger.part_stats_mah(consumption_type),
            core.ledger.total_power_mah(),
        )
    }

    /// Closed on-battery time in whole seconds; open intervals are not
    /// included until their closing event arrives
    pub fn get_total_time_second(&self, stats_type: StatsType, uid: i32) -> u64 {
        self.lock().ledger.total_time_second(stats_type, uid)
    }

    pub fn get_total_data_bytes(&self, stats_type: StatsType, uid: i32) -> u64 {
        self.lock().ledger.total_data_bytes(stats_type, uid)
    }

    pub fn get_total_count(&self, stats_type: StatsType, uid: i32) -> u64 {
        self.lock().ledger.total_count(stats_type, uid)
    }

    /// Render the shell dump; args are accepted for interface parity but do
    /// not change the output
    pub fn shell_dump(&self, _args: &[String]) -> String {
        let core = self.lock();
        core.dump_log.render(&core.ledger)
    }
}

/// Share of the grand total, clamped to `[0, 1]`
fn percent_of(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        return DEFAULT_VALUE;
    }
    (part / total).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct ManualTime(AtomicU64);

    impl TimeSource for ManualTime {
        fn now_us(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn service() -> (BatteryStatsService, Arc<ManualTime>) {
        let time = Arc::new(ManualTime(AtomicU64::new(0)));
        let config = ServiceConfig::default();
        let svc =
            BatteryStatsService::with_time_source(&config, PowerModel::default(), time.clone());
        (svc, time)
    }

    fn gnss(state: &str, at_us: u64) -> RawEvent {
        RawEvent::new("LOCATION", "GNSS_STATE")
            .with("UID", 10_003)
            .with("STATE", state)
            .at(at_us)
    }

    #[test]
    fn test_bracketed_interval_accrues() {
        let (svc, _) = service();
        svc.handle_event(&gnss("start", 0));
        svc.handle_event(&gnss("stop", 3_600_000_000));

        assert!((svc.get_app_stats_mah(10_003) - 130.0).abs() < 1e-9);
        assert_eq!(svc.get_total_time_second(StatsType::GnssOn, 10_003), 3_600);
    }

    #[test]
    fn test_open_interval_reports_nothing() {
        let (svc, _) = service();
        svc.handle_event(&gnss("start", 0));
        assert_eq!(svc.get_app_stats_mah(10_003), 0.0);
        assert_eq!(svc.get_total_time_second(StatsType::GnssOn, 10_003), 0);
    }

    #[test]
    fn test_charge_gap_is_skipped() {
        let (svc, time) = service();
        svc.handle_event(&gnss("start", 0));

        time.0.store(1_000_000, Ordering::SeqCst);
        svc.set_on_battery(false);
        time.0.store(5_000_000, Ordering::SeqCst);
        svc.set_on_battery(true);

        // 1 s before the charger, 1 s after
        svc.handle_event(&gnss("stop", 6_000_000));
        assert_eq!(svc.get_total_time_second(StatsType::GnssOn, 10_003), 2);
    }

    #[test]
    fn test_counter_gated_by_charging() {
        let (svc, time) = service();
        let scan = || {
            RawEvent::new("COMMUNICATION", "WIFI_SCAN")
                .with("UID", 10_003)
                .at(0)
        };

        svc.handle_event(&scan());
        time.0.store(1_000, Ordering::SeqCst);
        svc.set_on_battery(false);
        svc.handle_event(&scan().at(2_000));
        assert_eq!(svc.get_total_count(StatsType::WifiScan, 10_003), 1);
    }

    #[test]
    fn test_percent_is_clamped_share() {
        let (svc, _) = service();
        // Nothing recorded: percent degrades to 0 rather than NaN
        assert_eq!(svc.get_app_stats_percent(10_003), 0.0);

        svc.handle_event(&gnss("start", 0));
        svc.handle_event(&gnss("stop", 3_600_000_000));
        let percent = svc.get_app_stats_percent(10_003);
        assert!((percent - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_rebases_open_intervals() {
        let (svc, time) = service();
        svc.handle_event(&gnss("start", 0));

        time.0.store(5_000_000, Ordering::SeqCst);
        svc.reset();
        assert_eq!(svc.get_app_stats_mah(10_003), 0.0);

        // Only post-reset time counts; no re-signaled start is needed
        svc.handle_event(&gnss("stop", 8_000_000));
        assert_eq!(svc.get_total_time_second(StatsType::GnssOn, 10_003), 3);
    }

    #[test]
    fn test_dump_collects_event_lines() {
        let (svc, _) = service();
        svc.handle_event(
            &RawEvent::new("BATTERY", "BATTERY_CHANGED")
                .with("LEVEL", 60)
                .with("CHARGER", 2)
                .at(100),
        );
        let dump = svc.shell_dump(&[]);
        assert!(dump.contains("Battery level = 60, Charger type = 2"));

        svc.reset();
        let dump = svc.shell_dump(&[]);
        assert!(!dump.contains("Battery level"));
    }
}
