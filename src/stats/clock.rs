//! On-battery virtual clock
//!
//! Active intervals are priced in a virtual timebase that advances only
//! while the device runs off battery. A charge/discharge toggle in the
//! middle of an open bracket therefore skips the plugged-in gap without
//! closing the bracket, and activity that happens entirely while plugged in
//! accrues nothing.

/// Source of real timestamps, injectable for tests
pub trait TimeSource: Send + Sync {
    /// Microseconds since an arbitrary fixed origin, monotonic
    fn now_us(&self) -> u64;
}

/// Wall-clock time source used by the daemon
#[derive(Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_us(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0)
    }
}

/// Virtual clock gated by the on-battery flag
#[derive(Debug)]
pub struct OnBatteryClock {
    on_battery: bool,
    /// Accumulated on-battery microseconds up to `last_real_us`
    virtual_us: u64,
    last_real_us: u64,
}

impl OnBatteryClock {
    pub fn new(on_battery: bool) -> Self {
        Self {
            on_battery,
            virtual_us: 0,
            last_real_us: 0,
        }
    }

    /// Fold real time up to `real_us` into the virtual timebase.
    /// Out-of-order timestamps are clamped, never rewound.
    pub fn advance(&mut self, real_us: u64) {
        if real_us > self.last_real_us {
            if self.on_battery {
                self.virtual_us += real_us - self.last_real_us;
            }
            self.last_real_us = real_us;
        }
    }

    /// Current virtual time; call `advance` first
    pub fn now_virtual(&self) -> u64 {
        self.virtual_us
    }

    pub fn is_on_battery(&self) -> bool {
        self.on_battery
    }

    /// Toggle the gate at a real timestamp
    pub fn set_on_battery(&mut self, on_battery: bool, real_us: u64) {
        self.advance(real_us);
        self.on_battery = on_battery;
    }
}
