//! Gnss, sensor, audio, wakelock and alarm accounting, plus the query
//! aggregation invariants

mod common;

use common::{stateful_event, test_service, US_PER_HOUR};
use powerstats::{ConsumptionType, RawEvent, StatsType};
use pretty_assertions::assert_eq;

#[test]
fn test_gnss_session() {
    let (svc, _) = test_service();
    let start = RawEvent::new("LOCATION", "GNSS_STATE")
        .with("UID", 10_003)
        .with("STATE", "start")
        .at(0);
    let stop = RawEvent::new("LOCATION", "GNSS_STATE")
        .with("UID", 10_003)
        .with("STATE", "stop")
        .at(US_PER_HOUR);
    svc.handle_event(&start);
    svc.handle_event(&stop);

    assert!((svc.get_app_stats_mah(10_003) - 130.0).abs() < 1e-9);
    assert_eq!(svc.get_total_time_second(StatsType::GnssOn, 10_003), 3_600);
}

#[test]
fn test_sensors_price_separately() {
    let (svc, _) = test_service();
    svc.handle_event(&stateful_event("POWER", "POWER_SENSOR_GRAVITY", 10_003, 1, 0));
    svc.handle_event(&stateful_event("POWER", "POWER_SENSOR_PROXIMITY", 10_003, 1, 0));
    svc.handle_event(&stateful_event(
        "POWER", "POWER_SENSOR_GRAVITY", 10_003, 0, US_PER_HOUR,
    ));
    svc.handle_event(&stateful_event(
        "POWER", "POWER_SENSOR_PROXIMITY", 10_003, 0, US_PER_HOUR,
    ));

    // 15 mA gravity + 10 mA proximity, both into the sensor bucket
    assert!((svc.get_app_stats_mah(10_003) - 25.0).abs() < 1e-9);
}

#[test]
fn test_audio_pause_closes_interval() {
    let (svc, _) = test_service();
    const RUNNING: i32 = 2;
    const PAUSED: i32 = 5;
    svc.handle_event(&stateful_event("AUDIO", "AUDIO_STREAM_CHANGE", 10_006, RUNNING, 0));
    svc.handle_event(&stateful_event(
        "AUDIO", "AUDIO_STREAM_CHANGE", 10_006, PAUSED, US_PER_HOUR,
    ));

    assert!((svc.get_app_stats_mah(10_006) - 85.0).abs() < 1e-9);
}

#[test]
fn test_wakelock_hold_time() {
    let (svc, _) = test_service();
    let lock = RawEvent::new("POWER", "POWER_RUNNINGLOCK")
        .with("UID", 10_001)
        .with("PID", 3_456)
        .with("STATE", 1)
        .with("TYPE", 1)
        .with("NAME", "test_lock")
        .at(0);
    let unlock = lock.clone().with("STATE", 0).at(US_PER_HOUR / 2);
    svc.handle_event(&lock);
    svc.handle_event(&unlock);

    // Half an hour at the cpu-awake rate of 30 mA
    assert!((svc.get_app_stats_mah(10_001) - 15.0).abs() < 1e-9);
    assert_eq!(svc.get_total_time_second(StatsType::WakelockHold, 10_001), 1_800);
}

#[test]
fn test_alarm_counter() {
    let (svc, _) = test_service();
    for i in 0..4 {
        let report = RawEvent::new("TIME", "MISC_TIME_STATISTIC_REPORT")
            .with("CALLER_UID", 10_005)
            .with("CALLER_PID", 3_460)
            .at(i * 1_000);
        svc.handle_event(&report);
    }

    // Four firings at 2 mAh each
    assert!((svc.get_app_stats_mah(10_005) - 8.0).abs() < 1e-9);
}

#[test]
fn test_stats_list_contains_apps_users_and_parts() {
    let (svc, _) = test_service();
    svc.handle_event(
        &RawEvent::new("LOCATION", "GNSS_STATE").with("UID", 10_003).with("STATE", "start").at(0),
    );
    svc.handle_event(
        &RawEvent::new("LOCATION", "GNSS_STATE")
            .with("UID", 10_003)
            .with("STATE", "stop")
            .at(US_PER_HOUR),
    );
    svc.handle_event(&RawEvent::new("COMMUNICATION", "WIFI_CONNECTION").with("TYPE", 0).at(0));
    svc.handle_event(
        &RawEvent::new("COMMUNICATION", "WIFI_CONNECTION").with("TYPE", 1).at(US_PER_HOUR),
    );

    let stats = svc.get_battery_stats();
    assert_eq!(stats.len(), 3);
    assert!(stats
        .iter()
        .any(|e| e.consumption_type == ConsumptionType::App && e.uid == 10_003));
    assert!(stats
        .iter()
        .any(|e| e.consumption_type == ConsumptionType::User && e.user_id == 0));
    assert!(stats
        .iter()
        .any(|e| e.consumption_type == ConsumptionType::Wifi));
}

#[test]
fn test_percents_are_shares_of_the_total() {
    let (svc, _) = test_service();
    svc.handle_event(
        &RawEvent::new("LOCATION", "GNSS_STATE").with("UID", 10_003).with("STATE", "start").at(0),
    );
    svc.handle_event(
        &RawEvent::new("LOCATION", "GNSS_STATE")
            .with("UID", 10_003)
            .with("STATE", "stop")
            .at(US_PER_HOUR),
    );
    svc.handle_event(&RawEvent::new("COMMUNICATION", "WIFI_CONNECTION").with("TYPE", 0).at(0));
    svc.handle_event(
        &RawEvent::new("COMMUNICATION", "WIFI_CONNECTION").with("TYPE", 1).at(US_PER_HOUR),
    );

    let app = svc.get_app_stats_percent(10_003);
    let wifi = svc.get_part_stats_percent(ConsumptionType::Wifi);
    assert!((app - 130.0 / 213.0).abs() < 1e-9);
    assert!((wifi - 83.0 / 213.0).abs() < 1e-9);
    assert!((app + wifi - 1.0).abs() < 1e-9);

    // Unknown entities read as zero share
    assert_eq!(svc.get_app_stats_percent(99_999), 0.0);
}
