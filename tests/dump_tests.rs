//! Shell dump rendering against the event templates

mod common;

use common::{test_service, US_PER_HOUR};
use powerstats::RawEvent;

#[test]
fn test_wakelock_template() {
    let (svc, _) = test_service();
    let lock = RawEvent::new("POWER", "POWER_RUNNINGLOCK")
        .with("UID", 10_001)
        .with("PID", 3_456)
        .with("STATE", 1)
        .with("TYPE", 1)
        .with("NAME", "dump_test_lock")
        .at(0);
    svc.handle_event(&lock);
    svc.handle_event(&lock.clone().with("STATE", 0).at(1_000_000));

    let dump = svc.shell_dump(&[]);
    assert!(dump.contains(
        "UID = 10001, PID = 3456, wakelock type = 1, wakelock name = dump_test_lock, \
         wakelock state = UNLOCK"
    ));
    assert!(dump.contains("wakelock state = LOCK"));
}

#[test]
fn test_dump_only_events_are_recorded() {
    let (svc, _) = test_service();
    svc.handle_event(
        &RawEvent::new("BATTERY", "BATTERY_CHANGED")
            .with("LEVEL", 60)
            .with("CHARGER", 2)
            .at(0),
    );
    svc.handle_event(
        &RawEvent::new("THERMAL", "POWER_TEMPERATURE")
            .with("NAME", "Battery")
            .with("TEMPERATURE", 40)
            .at(1_000),
    );
    svc.handle_event(
        &RawEvent::new("POWERMGR", "POWER_WORKSCHEDULER")
            .with("UID", 10_002)
            .with("PID", 3_457)
            .with("TYPE", 1)
            .with("INTERVAL", 30_000)
            .with("STATE", 5)
            .at(2_000),
    );

    let dump = svc.shell_dump(&[]);
    assert!(dump.contains("Battery level = 60, Charger type = 2"));
    assert!(dump.contains("Additional debug info: Event name = POWER_TEMPERATURE Name = Battery"));
    assert!(dump.contains(
        "UID = 10002, PID = 3457, work type = 1, work interval = 30000, work state = 5"
    ));
    // None of these touch the ledger
    assert!(dump.contains("Total power: 0.000000 mAh"));
}

#[test]
fn test_screen_events_render_debug_info() {
    let (svc, _) = test_service();
    svc.handle_event(&RawEvent::new("DISPLAY", "SCREEN_STATE").with("STATE", 2).at(0));

    let dump = svc.shell_dump(&[]);
    assert!(dump.contains("Additional debug info: Event name = SCREEN_STATE Screen state = 2"));
}

#[test]
fn test_dump_includes_consumption_totals() {
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

    let dump = svc.shell_dump(&[]);
    assert!(dump.contains("BATTERY STATS DUMP"));
    assert!(dump.contains("uid: 10003, power: 130.000000"));
    assert!(dump.contains("Total power: 130.000000 mAh"));
}

#[test]
fn test_reset_clears_the_event_log() {
    let (svc, _) = test_service();
    svc.handle_event(
        &RawEvent::new("BATTERY", "BATTERY_CHANGED")
            .with("LEVEL", 60)
            .with("CHARGER", 2)
            .at(0),
    );
    assert!(svc.shell_dump(&[]).contains("Battery level = 60"));

    svc.reset();
    let dump = svc.shell_dump(&[]);
    assert!(!dump.contains("Battery level"));
    assert!(dump.contains("Misc stats info dump:"));
}
