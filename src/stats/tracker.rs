//! Per-entity active-state tracking
//!
//! Keeps one open bracket per `(StatsType, entityKey)` and emits consumption
//! deltas when brackets close. Re-entrant activations are idempotent and
//! spurious deactivations are absorbed. Timestamps are virtual (on-battery)
//! time supplied by the caller.

use std::collections::{HashMap, HashSet};

use crate::events::NormalizedEvent;
use crate::stats::types::{
    ConsumptionDelta, StatsState, StatsType, INVALID_VALUE, SCREEN_BRIGHTNESS_BIN,
};

/// Key of one active timer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TimerKey {
    stats_type: StatsType,
    uid: i32,
    level: i16,
}

impl TimerKey {
    fn global(stats_type: StatsType) -> Self {
        Self {
            stats_type,
            uid: INVALID_VALUE,
            level: INVALID_VALUE as i16,
        }
    }

    fn for_uid(stats_type: StatsType, uid: i32) -> Self {
        Self {
            stats_type,
            uid,
            level: INVALID_VALUE as i16,
        }
    }

    fn leveled(stats_type: StatsType, level: i16) -> Self {
        Self {
            stats_type,
            uid: INVALID_VALUE,
            level,
        }
    }
}

/// Union of concurrently connected camera devices for one uid
#[derive(Debug)]
struct CameraSession {
    devices: HashSet<String>,
    since_virtual_us: u64,
}

/// The per-entity state tracker
#[derive(Debug, Default)]
pub struct StateTracker {
    /// Open brackets: key -> virtual start time
    timers: HashMap<TimerKey, u64>,
    /// Camera sessions keyed by owning uid
    camera_sessions: HashMap<i32, CameraSession>,
    /// Which uid opened each camera device id
    camera_device_owner: HashMap<String, i32>,
    /// Uid of the most recent camera activation, for flashlight attribution
    last_camera_uid: i32,
    /// Brightness level retained across screen-off periods
    last_brightness: i16,
    screen_on: bool,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            camera_sessions: HashMap::new(),
            camera_device_owner: HashMap::new(),
            last_camera_uid: INVALID_VALUE,
            last_brightness: INVALID_VALUE as i16,
            screen_on: false,
        }
    }

    /// Apply one normalized event at a virtual timestamp.
    ///
    /// Counter events (`traffic > 0`) are not handled here; the service
    /// credits them to the ledger directly.
    pub fn on_event(&mut self, event: &NormalizedEvent, now_virtual_us: u64) -> Vec<ConsumptionDelta> {
        match event.stats_type {
            StatsType::ScreenOn => self.on_screen_event(event.state, now_virtual_us),
            StatsType::ScreenBrightness => self.on_brightness_event(event.level, now_virtual_us),
            StatsType::CameraOn => self.on_camera_event(event, now_virtual_us),
            StatsType::CameraFlashlightOn => self.on_camera_flashlight(event.state, now_virtual_us),
            StatsType::PhoneActive | StatsType::PhoneData => {
                let key = TimerKey::leveled(event.stats_type, event.level.max(0));
                self.apply(key, event.state, now_virtual_us)
            }
            stats_type if stats_type.is_counter() => Vec::new(),
            stats_type => {
                let key = if stats_type.is_app_scoped() {
                    TimerKey::for_uid(stats_type, event.uid)
                } else {
                    TimerKey::global(stats_type)
                };
                self.apply(key, event.state, now_virtual_us)
            }
        }
    }

    /// Rebase every open bracket to the reset instant so accounting
    /// restarts from zero without requiring re-signaled events
    pub fn rebase(&mut self, now_virtual_us: u64) {
        for start in self.timers.values_mut() {
            *start = now_virtual_us;
        }
        for session in self.camera_sessions.values_mut() {
            session.since_virtual_us = now_virtual_us;
        }
    }

    fn apply(&mut self, key: TimerKey, state: StatsState, now: u64) -> Vec<ConsumptionDelta> {
        match state {
            StatsState::Activated => {
                // Re-entrant activation keeps the original start time
                self.timers.entry(key).or_insert(now);
                Vec::new()
            }
            StatsState::Deactivated => self.close(key, now).into_iter().collect(),
            StatsState::Invalid => Vec::new(),
        }
    }

    fn close(&mut self, key: TimerKey, now: u64) -> Option<ConsumptionDelta> {
        let start = self.timers.remove(&key)?;
        Some(ConsumptionDelta {
            stats_type: key.stats_type,
            uid: key.uid,
            level: key.level,
            duration_us: now.saturating_sub(start),
        })
    }

    fn on_screen_event(&mut self, state: StatsState, now: u64) -> Vec<ConsumptionDelta> {
        let mut deltas = Vec::new();
        match state {
            StatsState::Activated => {
                self.timers.entry(TimerKey::global(StatsType::ScreenOn)).or_insert(now);
                if self.last_brightness > INVALID_VALUE as i16 {
                    self.timers
                        .entry(TimerKey::leveled(StatsType::ScreenBrightness, self.last_brightness))
                        .or_insert(now);
                }
                self.screen_on = true;
            }
            StatsState::Deactivated => {
                deltas.extend(self.close(TimerKey::global(StatsType::ScreenOn), now));
                if self.last_brightness > INVALID_VALUE as i16 {
                    deltas.extend(self.close(
                        TimerKey::leveled(StatsType::ScreenBrightness, self.last_brightness),
                        now,
                    ));
                }
                self.screen_on = false;
            }
            StatsState::Invalid => {}
        }
        deltas
    }

    fn on_brightness_event(&mut self, level: i16, now: u64) -> Vec<ConsumptionDelta> {
        if level < 0 || level > SCREEN_BRIGHTNESS_BIN {
            log::warn!("Screen brightness level {} is out of range", level);
            return Vec::new();
        }

        let mut deltas = Vec::new();
        if self.screen_on && level != self.last_brightness {
            if self.last_brightness > INVALID_VALUE as i16 {
                deltas.extend(self.close(
                    TimerKey::leveled(StatsType::ScreenBrightness, self.last_brightness),
                    now,
                ));
            }
            self.timers
                .entry(TimerKey::leveled(StatsType::ScreenBrightness, level))
                .or_insert(now);
        } else if self.screen_on {
            self.timers
                .entry(TimerKey::leveled(StatsType::ScreenBrightness, level))
                .or_insert(now);
        }
        // With the screen off the level is only retained for the next
        // activation
        self.last_brightness = level;
        deltas
    }

    fn on_camera_event(&mut self, event: &NormalizedEvent, now: u64) -> Vec<ConsumptionDelta> {
        let device = event.device_id.clone().unwrap_or_default();
        match event.state {
            StatsState::Activated => {
                let session = self
                    .camera_sessions
                    .entry(event.uid)
                    .or_insert_with(|| CameraSession {
                        devices: HashSet::new(),
                        since_virtual_us: now,
                    });
                session.devices.insert(device.clone());
                self.camera_device_owner.insert(device, event.uid);
                self.last_camera_uid = event.uid;
                Vec::new()
            }
            StatsState::Deactivated => {
                // Disconnects may omit the uid; route by device owner
                let uid = if event.uid > INVALID_VALUE {
                    event.uid
                } else {
                    match self.camera_device_owner.get(&device) {
                        Some(uid) => *uid,
                        None => return Vec::new(),
                    }
                };
                self.camera_device_owner.remove(&device);

                let mut deltas = Vec::new();
                let closed = match self.camera_sessions.get_mut(&uid) {
                    Some(session) => {
                        session.devices.remove(&device);
                        session.devices.is_empty()
                    }
                    None => false,
                };
                if closed {
                    if let Some(session) = self.camera_sessions.remove(&uid) {
                        deltas.push(ConsumptionDelta {
                            stats_type: StatsType::CameraOn,
                            uid,
                            level: INVALID_VALUE as i16,
                            duration_us: now.saturating_sub(session.since_virtual_us),
                        });
                    }
                    // A closing camera takes its flashlight with it
                    deltas.extend(self.close(TimerKey::for_uid(StatsType::FlashlightOn, uid), now));
                    if self.last_camera_uid == uid {
                        self.last_camera_uid = self
                            .camera_sessions
                            .keys()
                            .next()
                            .copied()
                            .unwrap_or(INVALID_VALUE);
                    }
                }
                deltas
            }
            StatsState::Invalid => Vec::new(),
        }
    }

    fn on_camera_flashlight(&mut self, state: StatsState, now: u64) -> Vec<ConsumptionDelta> {
        if self.camera_sessions.is_empty() {
            log::warn!("Camera is off, dropping camera flashlight event");
            return Vec::new();
        }
        let key = TimerKey::for_uid(StatsType::FlashlightOn, self.last_camera_uid);
        self.apply(key, state, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stats_type: StatsType, state: StatsState, uid: i32) -> NormalizedEvent {
        NormalizedEvent {
            stats_type,
            state,
            uid,
            pid: INVALID_VALUE,
            level: INVALID_VALUE as i16,
            device_id: None,
            traffic: 0,
        }
    }

    #[test]
    fn test_bracket_emits_single_delta() {
        let mut tracker = StateTracker::new();
        let on = event(StatsType::GnssOn, StatsState::Activated, 10_003);
        let off = event(StatsType::GnssOn, StatsState::Deactivated, 10_003);

        assert!(tracker.on_event(&on, 1_000).is_empty());
        let deltas = tracker.on_event(&off, 4_000);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].duration_us, 3_000);
        assert_eq!(deltas[0].uid, 10_003);
    }

    #[test]
    fn test_reactivation_is_idempotent() {
        let mut tracker = StateTracker::new();
        let on = event(StatsType::AudioOn, StatsState::Activated, 10_003);
        let off = event(StatsType::AudioOn, StatsState::Deactivated, 10_003);

        tracker.on_event(&on, 1_000);
        // Second ON must not restart the timer
        tracker.on_event(&on, 2_000);
        let deltas = tracker.on_event(&off, 3_000);
        assert_eq!(deltas[0].duration_us, 2_000);
        // Second OFF is spurious
        assert!(tracker.on_event(&off, 4_000).is_empty());
    }

    #[test]
    fn test_part_scoped_ignores_uid() {
        let mut tracker = StateTracker::new();
        let on = event(StatsType::BluetoothBrOn, StatsState::Activated, 10_003);
        // Closed by an event with a different uid
        let off = event(StatsType::BluetoothBrOn, StatsState::Deactivated, 10_007);

        tracker.on_event(&on, 0);
        let deltas = tracker.on_event(&off, 2_000);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].uid, INVALID_VALUE);
    }

    #[test]
    fn test_brightness_persists_across_screen_off() {
        let mut tracker = StateTracker::new();
        let mut brightness = event(StatsType::ScreenBrightness, StatsState::Invalid, INVALID_VALUE);
        brightness.level = 120;

        // Brightness with the screen off has no effect of its own
        assert!(tracker.on_event(&brightness, 0).is_empty());

        let screen_on = event(StatsType::ScreenOn, StatsState::Activated, INVALID_VALUE);
        let screen_off = event(StatsType::ScreenOn, StatsState::Deactivated, INVALID_VALUE);
        tracker.on_event(&screen_on, 1_000);
        let deltas = tracker.on_event(&screen_off, 4_000);

        // Screen-on delta plus the retained brightness level delta
        assert_eq!(deltas.len(), 2);
        let brightness_delta = deltas
            .iter()
            .find(|d| d.stats_type == StatsType::ScreenBrightness)
            .unwrap();
        assert_eq!(brightness_delta.level, 120);
        assert_eq!(brightness_delta.duration_us, 3_000);
    }

    #[test]
    fn test_brightness_change_splits_levels() {
        let mut tracker = StateTracker::new();
        let screen_on = event(StatsType::ScreenOn, StatsState::Activated, INVALID_VALUE);
        let screen_off = event(StatsType::ScreenOn, StatsState::Deactivated, INVALID_VALUE);
        let mut level_a = event(StatsType::ScreenBrightness, StatsState::Invalid, INVALID_VALUE);
        level_a.level = 100;
        let mut level_b = level_a.clone();
        level_b.level = 200;

        tracker.on_event(&screen_on, 0);
        tracker.on_event(&level_a, 0);
        let mid = tracker.on_event(&level_b, 5_000);
        assert_eq!(mid.len(), 1);
        assert_eq!(mid[0].level, 100);
        assert_eq!(mid[0].duration_us, 5_000);

        let end = tracker.on_event(&screen_off, 8_000);
        let brightness_delta = end
            .iter()
            .find(|d| d.stats_type == StatsType::ScreenBrightness)
            .unwrap();
        assert_eq!(brightness_delta.level, 200);
        assert_eq!(brightness_delta.duration_us, 3_000);
    }

    #[test]
    fn test_camera_union_of_devices() {
        let mut tracker = StateTracker::new();
        let mut connect0 = event(StatsType::CameraOn, StatsState::Activated, 10_004);
        connect0.device_id = Some("camera0".to_string());
        let mut connect1 = connect0.clone();
        connect1.device_id = Some("camera1".to_string());
        let mut disconnect1 = event(StatsType::CameraOn, StatsState::Deactivated, 10_004);
        disconnect1.device_id = Some("camera1".to_string());
        let mut disconnect0 = disconnect1.clone();
        disconnect0.device_id = Some("camera0".to_string());

        tracker.on_event(&connect0, 0);
        tracker.on_event(&connect1, 1_000);
        // First disconnect leaves one device active, nothing closes
        assert!(tracker.on_event(&disconnect1, 2_000).is_empty());
        let deltas = tracker.on_event(&disconnect0, 3_000);
        assert_eq!(deltas.len(), 1);
        // Union covers the full window of "at least one device active"
        assert_eq!(deltas[0].duration_us, 3_000);
        assert_eq!(deltas[0].uid, 10_004);
    }

    #[test]
    fn test_camera_flashlight_needs_open_camera() {
        let mut tracker = StateTracker::new();
        let flash_on = event(StatsType::CameraFlashlightOn, StatsState::Activated, INVALID_VALUE);
        let flash_off = event(StatsType::CameraFlashlightOn, StatsState::Deactivated, INVALID_VALUE);

        // No camera session, dropped
        assert!(tracker.on_event(&flash_on, 0).is_empty());

        let mut connect = event(StatsType::CameraOn, StatsState::Activated, 10_004);
        connect.device_id = Some("camera0".to_string());
        tracker.on_event(&connect, 0);
        tracker.on_event(&flash_on, 1_000);
        let deltas = tracker.on_event(&flash_off, 3_000);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0].stats_type, StatsType::FlashlightOn);
        assert_eq!(deltas[0].uid, 10_004);
        assert_eq!(deltas[0].duration_us, 2_000);
    }

    #[test]
    fn test_camera_close_closes_flashlight() {
        let mut tracker = StateTracker::new();
        let mut connect = event(StatsType::CameraOn, StatsState::Activated, 10_004);
        connect.device_id = Some("camera0".to_string());
        let mut disconnect = event(StatsType::CameraOn, StatsState::Deactivated, 10_004);
        disconnect.device_id = Some("camera0".to_string());
        let flash_on = event(StatsType::CameraFlashlightOn, StatsState::Activated, INVALID_VALUE);

        tracker.on_event(&connect, 0);
        tracker.on_event(&flash_on, 1_000);
        let deltas = tracker.on_event(&disconnect, 4_000);
        assert_eq!(deltas.len(), 2);
        let flash = deltas
            .iter()
            .find(|d| d.stats_type == StatsType::FlashlightOn)
            .unwrap();
        assert_eq!(flash.duration_us, 3_000);
    }

    #[test]
    fn test_rebase_discards_elapsed_time() {
        let mut tracker = StateTracker::new();
        let on = event(StatsType::WifiOn, StatsState::Activated, INVALID_VALUE);
        let off = event(StatsType::WifiOn, StatsState::Deactivated, INVALID_VALUE);

        tracker.on_event(&on, 0);
        tracker.rebase(5_000);
        let deltas = tracker.on_event(&off, 7_000);
        assert_eq!(deltas[0].duration_us, 2_000);
    }
}
