//! Core data model for battery statistics

use serde::{Deserialize, Serialize};

use crate::config::PowerModel;
use crate::config::power_model::CurrentKind;

/// Sentinel for "no uid / no level / not applicable"
pub const INVALID_VALUE: i32 = -1;

/// Default value returned by queries with nothing recorded
pub const DEFAULT_VALUE: f64 = 0.0;

/// Microseconds per hour, the divisor of the energy formula
pub const US_PER_HOUR: f64 = 3_600_000_000.0;

/// Microseconds per second
pub const US_PER_SECOND: f64 = 1_000_000.0;

/// Highest accepted screen brightness level
pub const SCREEN_BRIGHTNESS_BIN: i16 = 255;

/// Number of radio signal-strength bins
pub const RADIO_SIGNAL_BIN: i16 = 5;

/// Uids per user; a uid's owning user id is `uid / USER_ID_RANGE`
pub const USER_ID_RANGE: i32 = 200_000;

/// Canonical identifier for one trackable power-relevant activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum StatsType {
    BluetoothBrOn = 0,
    BluetoothBrScan = 1,
    BluetoothBleOn = 2,
    BluetoothBleScan = 3,
    WifiOn = 4,
    WifiScan = 5,
    PhoneActive = 6,
    PhoneData = 7,
    CameraOn = 8,
    CameraFlashlightOn = 9,
    FlashlightOn = 10,
    GnssOn = 11,
    SensorGravityOn = 12,
    SensorProximityOn = 13,
    AudioOn = 14,
    ScreenOn = 15,
    ScreenBrightness = 16,
    WakelockHold = 17,
    Alarm = 18,
}

impl StatsType {
    /// All trackable types, for iteration in dump rendering
    pub const ALL: [StatsType; 19] = [
        Self::BluetoothBrOn,
        Self::BluetoothBrScan,
        Self::BluetoothBleOn,
        Self::BluetoothBleScan,
        Self::WifiOn,
        Self::WifiScan,
        Self::PhoneActive,
        Self::PhoneData,
        Self::CameraOn,
        Self::CameraFlashlightOn,
        Self::FlashlightOn,
        Self::GnssOn,
        Self::SensorGravityOn,
        Self::SensorProximityOn,
        Self::AudioOn,
        Self::ScreenOn,
        Self::ScreenBrightness,
        Self::WakelockHold,
        Self::Alarm,
    ];

    /// Decode a wire value
    pub fn from_wire(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| *t as u32 == value)
    }

    /// The current kind used to price this activity
    pub fn current_kind(&self) -> CurrentKind {
        match self {
            Self::BluetoothBrOn => CurrentKind::BluetoothBrOn,
            Self::BluetoothBrScan => CurrentKind::BluetoothBrScan,
            Self::BluetoothBleOn => CurrentKind::BluetoothBleOn,
            Self::BluetoothBleScan => CurrentKind::BluetoothBleScan,
            Self::WifiOn => CurrentKind::WifiOn,
            Self::WifiScan => CurrentKind::WifiScan,
            Self::PhoneActive => CurrentKind::RadioOn,
            Self::PhoneData => CurrentKind::RadioData,
            Self::CameraOn => CurrentKind::CameraOn,
            Self::CameraFlashlightOn | Self::FlashlightOn => CurrentKind::FlashlightOn,
            Self::GnssOn => CurrentKind::GnssOn,
            Self::SensorGravityOn => CurrentKind::SensorGravityOn,
            Self::SensorProximityOn => CurrentKind::SensorProximityOn,
            Self::AudioOn => CurrentKind::AudioOn,
            Self::ScreenOn => CurrentKind::ScreenOn,
            Self::ScreenBrightness => CurrentKind::ScreenBrightness,
            Self::WakelockHold => CurrentKind::CpuAwake,
            Self::Alarm => CurrentKind::AlarmOn,
        }
    }

    /// The part bucket this activity rolls up into
    pub fn consumption_type(&self) -> ConsumptionType {
        match self {
            Self::BluetoothBrOn
            | Self::BluetoothBrScan
            | Self::BluetoothBleOn
            | Self::BluetoothBleScan => ConsumptionType::Bluetooth,
            Self::WifiOn | Self::WifiScan => ConsumptionType::Wifi,
            Self::PhoneActive | Self::PhoneData => ConsumptionType::Phone,
            Self::CameraOn => ConsumptionType::Camera,
            Self::CameraFlashlightOn | Self::FlashlightOn => ConsumptionType::Flashlight,
            Self::GnssOn => ConsumptionType::Gnss,
            Self::SensorGravityOn | Self::SensorProximityOn => ConsumptionType::Sensor,
            Self::AudioOn => ConsumptionType::Audio,
            Self::ScreenOn | Self::ScreenBrightness => ConsumptionType::Screen,
            Self::WakelockHold => ConsumptionType::Wakelock,
            Self::Alarm => ConsumptionType::Alarm,
        }
    }

    /// Whether energy is attributed to the triggering app uid ("soft" stat).
    ///
    /// Part-scoped types accrue to their hardware bucket even when the
    /// originating event happens to carry a uid.
    pub fn is_app_scoped(&self) -> bool {
        !matches!(
            self,
            Self::BluetoothBrOn
                | Self::BluetoothBleOn
                | Self::WifiOn
                | Self::PhoneActive
                | Self::PhoneData
                | Self::ScreenOn
                | Self::ScreenBrightness
        )
    }

    /// Whether this type counts single-shot occurrences instead of a
    /// bracketed on/off interval
    pub fn is_counter(&self) -> bool {
        matches!(self, Self::WifiScan | Self::Alarm)
    }
}

/// State carried by a normalized event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsState {
    /// No on/off transition (auxiliary or counter events)
    Invalid,
    Activated,
    Deactivated,
}

/// The hardware-part/category bucket used by part-level queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConsumptionType {
    Invalid = -17,
    App = -16,
    Bluetooth = -15,
    Idle = -14,
    Phone = -13,
    Radio = -12,
    Screen = -11,
    User = -10,
    Wifi = -9,
    Camera = -8,
    Flashlight = -7,
    Audio = -6,
    Sensor = -5,
    Gnss = -4,
    Cpu = -3,
    Wakelock = -2,
    Alarm = -1,
}

impl ConsumptionType {
    /// Decode a wire value
    pub fn from_wire(value: i32) -> Self {
        match value {
            -16 => Self::App,
            -15 => Self::Bluetooth,
            -14 => Self::Idle,
            -13 => Self::Phone,
            -12 => Self::Radio,
            -11 => Self::Screen,
            -10 => Self::User,
            -9 => Self::Wifi,
            -8 => Self::Camera,
            -7 => Self::Flashlight,
            -6 => Self::Audio,
            -5 => Self::Sensor,
            -4 => Self::Gnss,
            -3 => Self::Cpu,
            -2 => Self::Wakelock,
            -1 => Self::Alarm,
            _ => Self::Invalid,
        }
    }

    /// Human-readable name used in dump output
    pub fn name(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::App => "app",
            Self::Bluetooth => "bluetooth",
            Self::Idle => "idle",
            Self::Phone => "phone",
            Self::Radio => "radio",
            Self::Screen => "screen",
            Self::User => "user",
            Self::Wifi => "wifi",
            Self::Camera => "camera",
            Self::Flashlight => "flashlight",
            Self::Audio => "audio",
            Self::Sensor => "sensor",
            Self::Gnss => "gnss",
            Self::Cpu => "cpu",
            Self::Wakelock => "wakelock",
            Self::Alarm => "alarm",
        }
    }
}

/// One entry of a battery stats snapshot.
///
/// Entries with an invalid uid represent hardware-part or user aggregates
/// rather than per-app ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryStatsInfo {
    pub uid: i32,
    pub user_id: i32,
    pub consumption_type: ConsumptionType,
    pub total_power_mah: f64,
}

impl BatteryStatsInfo {
    /// Build a per-app entry
    pub fn for_app(uid: i32, total_power_mah: f64) -> Self {
        Self {
            uid,
            user_id: INVALID_VALUE,
            consumption_type: ConsumptionType::App,
            total_power_mah,
        }
    }

    /// Build a per-user aggregate entry
    pub fn for_user(user_id: i32, total_power_mah: f64) -> Self {
        Self {
            uid: INVALID_VALUE,
            user_id,
            consumption_type: ConsumptionType::User,
            total_power_mah,
        }
    }

    /// Build a hardware-part entry
    pub fn for_part(consumption_type: ConsumptionType, total_power_mah: f64) -> Self {
        Self {
            uid: INVALID_VALUE,
            user_id: INVALID_VALUE,
            consumption_type,
            total_power_mah,
        }
    }
}

/// The mAh credited to the ledger when a bracket closes or a counter fires
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionDelta {
    pub stats_type: StatsType,
    /// Responsible uid, `INVALID_VALUE` for part-scoped stats
    pub uid: i32,
    /// Level the interval ran at, `INVALID_VALUE as i16` when not leveled
    pub level: i16,
    /// Active duration in microseconds of on-battery time
    pub duration_us: u64,
}

impl ConsumptionDelta {
    /// Price this delta with the average current model
    pub fn power_mah(&self, model: &PowerModel) -> f64 {
        let kind = self.stats_type.current_kind();
        let ma = match self.stats_type {
            // Brightness prices per brightness unit
            StatsType::ScreenBrightness => {
                if self.level >= 0 {
                    model.average_ma(kind) * f64::from(self.level)
                } else {
                    0.0
                }
            }
            StatsType::PhoneActive | StatsType::PhoneData => {
                model.average_ma_at(kind, self.level.max(0))
            }
            _ => model.average_ma(kind),
        };
        self.duration_us as f64 * ma / US_PER_HOUR
    }
}
