//! Event normalization
//!
//! Converts subsystem-specific raw events into canonical tuples the state
//! tracker understands. Each `(domain, name)` pair has a registered handler;
//! events without one, and events carrying state codes outside the known
//! enumeration, normalize to `None` and are dropped without side effects.

use std::collections::HashMap;

use crate::events::RawEvent;
use crate::stats::types::{StatsState, StatsType, INVALID_VALUE};

/// Canonical form of a power-relevant event
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub stats_type: StatsType,
    pub state: StatsState,
    pub uid: i32,
    pub pid: i32,
    /// Signal or brightness level, `-1` when not applicable
    pub level: i16,
    /// Device instance id for multi-instance stats (camera)
    pub device_id: Option<String>,
    /// Occurrence count for counter stats
    pub traffic: u64,
}

impl NormalizedEvent {
    fn new(stats_type: StatsType, state: StatsState) -> Self {
        Self {
            stats_type,
            state,
            uid: INVALID_VALUE,
            pid: INVALID_VALUE,
            level: INVALID_VALUE as i16,
            device_id: None,
            traffic: 0,
        }
    }

    fn with_caller(mut self, raw: &RawEvent) -> Self {
        if let Some(uid) = raw.get_i32("UID") {
            self.uid = uid;
        }
        if let Some(pid) = raw.get_i32("PID") {
            self.pid = pid;
        }
        self
    }
}

// Bluetooth switch state codes (BR and BLE share them). Transitional states
// bracket an interval the same way the settled states do.
const BT_STATE_TURNING_ON: i32 = 0;
const BT_STATE_TURN_ON: i32 = 1;
const BT_STATE_TURNING_OFF: i32 = 2;
const BT_STATE_TURN_OFF: i32 = 3;

// Bluetooth discovery codes
const BT_DISCOVERY_STARTED: i32 = 1;
const BT_DISCOVERY_STOPPED: i32 = 3;

// Audio stream states
const AUDIO_STATE_RUNNING: i32 = 2;
const AUDIO_STATE_STOPPED: i32 = 3;
const AUDIO_STATE_RELEASED: i32 = 4;
const AUDIO_STATE_PAUSED: i32 = 5;

// Display states
const DISPLAY_STATE_OFF: i32 = 0;
const DISPLAY_STATE_ON: i32 = 2;

// Call states
const CALL_STATE_ACTIVE: i32 = 0;
const CALL_STATE_DISCONNECTED: i32 = 6;

// Wifi connection types
const WIFI_CONNECT: i32 = 0;
const WIFI_DISCONNECT: i32 = 1;

type Handler = fn(&RawEvent) -> Option<NormalizedEvent>;

/// Registry of `(domain, name)` handlers
pub struct Normalizer {
    handlers: HashMap<(&'static str, &'static str), Handler>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        let mut handlers: HashMap<(&'static str, &'static str), Handler> = HashMap::new();

        handlers.insert(("BLUETOOTH", "BLUETOOTH_BR_SWITCH_STATE"), bluetooth_switch);
        handlers.insert(("BLUETOOTH", "BLUETOOTH_BLE_STATE"), bluetooth_switch);
        handlers.insert(("BLUETOOTH", "BLUETOOTH_DISCOVERY_STATE"), bluetooth_discovery);
        handlers.insert(("BLUETOOTH", "BLUETOOTH_BLE_SCAN_START"), ble_scan);
        handlers.insert(("BLUETOOTH", "BLUETOOTH_BLE_SCAN_STOP"), ble_scan);
        handlers.insert(("COMMUNICATION", "WIFI_CONNECTION"), wifi_connection);
        handlers.insert(("COMMUNICATION", "WIFI_SCAN"), wifi_scan);
        handlers.insert(("TELEPHONY", "CALL_STATE"), call_state);
        handlers.insert(("TELEPHONY", "DATA_CONNECTION_STATE"), data_connection);
        handlers.insert(("CAMERA", "CAMERA_CONNECT"), camera_connect);
        handlers.insert(("CAMERA", "CAMERA_DISCONNECT"), camera_connect);
        handlers.insert(("CAMERA", "FLASHLIGHT_ON"), camera_flashlight);
        handlers.insert(("CAMERA", "FLASHLIGHT_OFF"), camera_flashlight);
        handlers.insert(("CAMERA", "TORCH_STATE"), torch_state);
        handlers.insert(("DISPLAY", "SCREEN_STATE"), screen_state);
        handlers.insert(("DISPLAY", "BRIGHTNESS_NIT"), brightness_nit);
        handlers.insert(("LOCATION", "GNSS_STATE"), gnss_state);
        // Power events arrive under either domain spelling
        for domain in ["POWER", "POWERMGR"] {
            handlers.insert((domain, "POWER_SENSOR_GRAVITY"), sensor_state);
            handlers.insert((domain, "POWER_SENSOR_PROXIMITY"), sensor_state);
            handlers.insert((domain, "POWER_RUNNINGLOCK"), wakelock_state);
        }
        handlers.insert(("AUDIO", "AUDIO_STREAM_CHANGE"), audio_stream);
        handlers.insert(("TIME", "MISC_TIME_STATISTIC_REPORT"), alarm_report);

        Self { handlers }
    }

    /// Normalize a raw event; `None` for unknown events, unknown state
    /// codes and malformed records
    pub fn normalize(&self, raw: &RawEvent) -> Option<NormalizedEvent> {
        let handler = self
            .handlers
            .get(&(raw.domain.as_str(), raw.name.as_str()))?;
        let normalized = handler(raw);
        if normalized.is_none() {
            crate::debug_log!(
                "Dropped {}::{} with unusable state",
                raw.domain,
                raw.name
            );
        }
        normalized
    }
}

fn switch_state_of(code: i32) -> Option<StatsState> {
    match code {
        BT_STATE_TURNING_ON | BT_STATE_TURN_ON => Some(StatsState::Activated),
        BT_STATE_TURNING_OFF | BT_STATE_TURN_OFF => Some(StatsState::Deactivated),
        _ => None,
    }
}

fn bluetooth_switch(raw: &RawEvent) -> Option<NormalizedEvent> {
    let stats_type = if raw.name == "BLUETOOTH_BR_SWITCH_STATE" {
        StatsType::BluetoothBrOn
    } else {
        StatsType::BluetoothBleOn
    };
    let state = switch_state_of(raw.get_i32("STATE")?)?;
    Some(NormalizedEvent::new(stats_type, state).with_caller(raw))
}

fn bluetooth_discovery(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        BT_DISCOVERY_STARTED => StatsState::Activated,
        BT_DISCOVERY_STOPPED => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::BluetoothBrScan, state).with_caller(raw))
}

fn ble_scan(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = if raw.name == "BLUETOOTH_BLE_SCAN_START" {
        StatsState::Activated
    } else {
        StatsState::Deactivated
    };
    Some(NormalizedEvent::new(StatsType::BluetoothBleScan, state).with_caller(raw))
}

fn wifi_connection(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("TYPE")? {
        WIFI_CONNECT => StatsState::Activated,
        WIFI_DISCONNECT => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::WifiOn, state))
}

fn wifi_scan(raw: &RawEvent) -> Option<NormalizedEvent> {
    let mut event = NormalizedEvent::new(StatsType::WifiScan, StatsState::Invalid).with_caller(raw);
    event.traffic = 1;
    Some(event)
}

fn call_state(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        CALL_STATE_ACTIVE => StatsState::Activated,
        CALL_STATE_DISCONNECTED => StatsState::Deactivated,
        _ => return None,
    };
    // Telephony events carry no signal level information, use level 0
    let mut event = NormalizedEvent::new(StatsType::PhoneActive, state);
    event.level = 0;
    Some(event)
}

fn data_connection(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        1 => StatsState::Activated,
        0 => StatsState::Deactivated,
        _ => return None,
    };
    let mut event = NormalizedEvent::new(StatsType::PhoneData, state);
    event.level = 0;
    Some(event)
}

fn camera_connect(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = if raw.name == "CAMERA_CONNECT" {
        StatsState::Activated
    } else {
        StatsState::Deactivated
    };
    let mut event = NormalizedEvent::new(StatsType::CameraOn, state).with_caller(raw);
    event.device_id = raw.get_str("ID").map(str::to_string);
    Some(event)
}

fn camera_flashlight(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = if raw.name == "FLASHLIGHT_ON" {
        StatsState::Activated
    } else {
        StatsState::Deactivated
    };
    Some(NormalizedEvent::new(StatsType::CameraFlashlightOn, state))
}

fn torch_state(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        1 => StatsState::Activated,
        0 => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::FlashlightOn, state).with_caller(raw))
}

fn screen_state(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        DISPLAY_STATE_ON => StatsState::Activated,
        DISPLAY_STATE_OFF => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::ScreenOn, state))
}

fn brightness_nit(raw: &RawEvent) -> Option<NormalizedEvent> {
    let mut event = NormalizedEvent::new(StatsType::ScreenBrightness, StatsState::Invalid);
    event.level = raw.get_i16("BRIGHTNESS")?;
    Some(event)
}

fn gnss_state(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_str("STATE")? {
        "start" => StatsState::Activated,
        "stop" => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::GnssOn, state).with_caller(raw))
}

fn sensor_state(raw: &RawEvent) -> Option<NormalizedEvent> {
    let stats_type = if raw.name == "POWER_SENSOR_GRAVITY" {
        StatsType::SensorGravityOn
    } else {
        StatsType::SensorProximityOn
    };
    let state = match raw.get_i32("STATE")? {
        1 => StatsState::Activated,
        0 => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(stats_type, state).with_caller(raw))
}

fn wakelock_state(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        1 => StatsState::Activated,
        0 => StatsState::Deactivated,
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::WakelockHold, state).with_caller(raw))
}

fn audio_stream(raw: &RawEvent) -> Option<NormalizedEvent> {
    let state = match raw.get_i32("STATE")? {
        AUDIO_STATE_RUNNING => StatsState::Activated,
        AUDIO_STATE_STOPPED | AUDIO_STATE_RELEASED | AUDIO_STATE_PAUSED => {
            StatsState::Deactivated
        }
        _ => return None,
    };
    Some(NormalizedEvent::new(StatsType::AudioOn, state).with_caller(raw))
}

fn alarm_report(raw: &RawEvent) -> Option<NormalizedEvent> {
    let mut event = NormalizedEvent::new(StatsType::Alarm, StatsState::Invalid);
    if let Some(uid) = raw.get_i32("CALLER_UID") {
        event.uid = uid;
    }
    if let Some(pid) = raw.get_i32("CALLER_PID") {
        event.pid = pid;
    }
    event.traffic = 1;
    Some(event)
}
