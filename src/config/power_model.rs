//! Calibrated average-current model
//!
//! Maps a current kind (one per monitored power rail) to an average draw in
//! mA, optionally binned by level (radio signal strength). The table is read
//! once at startup and never mutated afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Named current kinds the model can be queried for.
///
/// Counter kinds (`WifiScan`, `AlarmOn`) hold a charge per occurrence rather
/// than a continuous draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurrentKind {
    BluetoothBrOn,
    BluetoothBrScan,
    BluetoothBleOn,
    BluetoothBleScan,
    WifiOn,
    WifiScan,
    RadioOn,
    RadioData,
    CameraOn,
    FlashlightOn,
    GnssOn,
    SensorGravityOn,
    SensorProximityOn,
    AudioOn,
    ScreenOn,
    ScreenBrightness,
    CpuAwake,
    AlarmOn,
}

impl CurrentKind {
    /// Key used in the power model file
    pub fn key(&self) -> &'static str {
        match self {
            Self::BluetoothBrOn => "bluetooth_br_on",
            Self::BluetoothBrScan => "bluetooth_br_scan",
            Self::BluetoothBleOn => "bluetooth_ble_on",
            Self::BluetoothBleScan => "bluetooth_ble_scan",
            Self::WifiOn => "wifi_on",
            Self::WifiScan => "wifi_scan",
            Self::RadioOn => "radio_on",
            Self::RadioData => "radio_data",
            Self::CameraOn => "camera_on",
            Self::FlashlightOn => "flashlight_on",
            Self::GnssOn => "gnss_on",
            Self::SensorGravityOn => "sensor_gravity_on",
            Self::SensorProximityOn => "sensor_proximity_on",
            Self::AudioOn => "audio_on",
            Self::ScreenOn => "screen_on",
            Self::ScreenBrightness => "screen_brightness",
            Self::CpuAwake => "cpu_awake",
            Self::AlarmOn => "alarm_on",
        }
    }
}

/// One model entry: a flat draw or a per-level bin array
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PowerEntry {
    Scalar(f64),
    Leveled(Vec<f64>),
}

/// The average power lookup table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerModel {
    #[serde(flatten)]
    entries: HashMap<String, PowerEntry>,
}

impl Default for PowerModel {
    fn default() -> Self {
        let mut entries = HashMap::new();
        let scalar = |v: f64| PowerEntry::Scalar(v);
        entries.insert("bluetooth_br_on".to_string(), scalar(3.0));
        entries.insert("bluetooth_br_scan".to_string(), scalar(60.0));
        entries.insert("bluetooth_ble_on".to_string(), scalar(2.0));
        entries.insert("bluetooth_ble_scan".to_string(), scalar(30.0));
        entries.insert("wifi_on".to_string(), scalar(83.0));
        entries.insert("wifi_scan".to_string(), scalar(0.2));
        entries.insert(
            "radio_on".to_string(),
            PowerEntry::Leveled(vec![90.0, 80.0, 70.0, 60.0, 50.0]),
        );
        entries.insert(
            "radio_data".to_string(),
            PowerEntry::Leveled(vec![180.0, 170.0, 160.0, 150.0, 140.0]),
        );
        entries.insert("camera_on".to_string(), scalar(810.0));
        entries.insert("flashlight_on".to_string(), scalar(320.0));
        entries.insert("gnss_on".to_string(), scalar(130.0));
        entries.insert("sensor_gravity_on".to_string(), scalar(15.0));
        entries.insert("sensor_proximity_on".to_string(), scalar(10.0));
        entries.insert("audio_on".to_string(), scalar(85.0));
        entries.insert("screen_on".to_string(), scalar(90.0));
        entries.insert("screen_brightness".to_string(), scalar(0.5));
        entries.insert("cpu_awake".to_string(), scalar(30.0));
        entries.insert("alarm_on".to_string(), scalar(2.0));
        Self { entries }
    }
}

impl PowerModel {
    /// Load a model file, falling back to built-in defaults when missing
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!(
                "Power model file {} missing, using built-in averages",
                path.display()
            );
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&contents)?;
        Ok(model)
    }

    /// Average current in mA for a kind, level 0 for leveled kinds
    pub fn average_ma(&self, kind: CurrentKind) -> f64 {
        self.average_ma_at(kind, 0)
    }

    /// Average current in mA for a kind at a level.
    ///
    /// Unknown kinds and out-of-range levels read as 0.0 so a stale model
    /// file degrades accrual to zero instead of failing queries.
    pub fn average_ma_at(&self, kind: CurrentKind, level: i16) -> f64 {
        match self.entries.get(kind.key()) {
            Some(PowerEntry::Scalar(value)) => *value,
            Some(PowerEntry::Leveled(bins)) => {
                if level >= 0 {
                    bins.get(level as usize).copied().unwrap_or(0.0)
                } else {
                    0.0
                }
            }
            None => 0.0,
        }
    }
}
