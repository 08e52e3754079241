//! Shell dump rendering
//!
//! Keeps a bounded log of human-readable lines derived from incoming raw
//! events and renders the full dump text: accumulated totals first, then the
//! per-event debug log. The log is cleared by a stats reset.

use std::collections::VecDeque;

use crate::events::RawEvent;
use crate::stats::ConsumptionLedger;
use crate::stats::types::{ConsumptionType, StatsType, INVALID_VALUE};

const WAKELOCK_STATE_LOCK: i32 = 1;

/// Bounded ring of formatted event lines
#[derive(Debug)]
pub struct DumpLog {
    capacity: usize,
    lines: VecDeque<String>,
}

impl DumpLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            lines: VecDeque::new(),
        }
    }

    /// Record a raw event if it has a dump rendering; oldest lines fall off
    pub fn record(&mut self, raw: &RawEvent) {
        if let Some(line) = format_debug_line(raw) {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
            }
            self.lines.push_back(line);
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render the complete dump text
    pub fn render(&self, ledger: &ConsumptionLedger) -> String {
        let mut out = String::new();
        out.push_str("BATTERY STATS DUMP (power in mAh):\n\n");

        out.push_str("Consumption stats:\n");
        for info in ledger.snapshot() {
            match info.consumption_type {
                ConsumptionType::App => out.push_str(&format!(
                    "  uid: {}, power: {:.6}\n",
                    info.uid, info.total_power_mah
                )),
                ConsumptionType::User => out.push_str(&format!(
                    "  user: {}, power: {:.6}\n",
                    info.user_id, info.total_power_mah
                )),
                other => out.push_str(&format!(
                    "  {}, power: {:.6}\n",
                    other.name(),
                    info.total_power_mah
                )),
            }
        }

        out.push_str(&format!(
            "\nTotal power: {:.6} mAh\n",
            ledger.total_power_mah()
        ));
        let wifi_scans = ledger.total_count(StatsType::WifiScan, INVALID_VALUE);
        if wifi_scans > 0 {
            out.push_str(&format!("Wifi scans: {}\n", wifi_scans));
        }

        out.push_str("\nMisc stats info dump:\n");
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

fn field<'a>(raw: &'a RawEvent, key: &str) -> &'a str {
    raw.get_str(key).unwrap_or("")
}

/// Render a raw event into its dump line; events without one yield `None`
pub fn format_debug_line(raw: &RawEvent) -> Option<String> {
    match raw.name.as_str() {
        "POWER_RUNNINGLOCK" => {
            let state = if raw.get_i32("STATE") == Some(WAKELOCK_STATE_LOCK) {
                "LOCK"
            } else {
                "UNLOCK"
            };
            Some(format!(
                "UID = {}, PID = {}, wakelock type = {}, wakelock name = {}, wakelock state = {}",
                field(raw, "UID"),
                field(raw, "PID"),
                field(raw, "TYPE"),
                field(raw, "NAME"),
                state
            ))
        }
        "BATTERY_CHANGED" => {
            let mut line = format!(
                "Battery level = {}, Charger type = {}",
                field(raw, "LEVEL"),
                field(raw, "CHARGER")
            );
            append_field(&mut line, raw, "VOLTAGE", " Voltage = ");
            append_field(&mut line, raw, "HEALTH", " Health = ");
            append_field(&mut line, raw, "TEMPERATURE", " Temperature = ");
            Some(line)
        }
        "POWER_WORKSCHEDULER" => Some(format!(
            "UID = {}, PID = {}, work type = {}, work interval = {}, work state = {}",
            field(raw, "UID"),
            field(raw, "PID"),
            field(raw, "TYPE"),
            field(raw, "INTERVAL"),
            field(raw, "STATE")
        )),
        "WORK_ADD" | "WORK_REMOVE" | "WORK_START" | "WORK_STOP" => {
            let mut line = format!("{}:", raw.name);
            append_field(&mut line, raw, "NAME", " Bundle name = ");
            append_field(&mut line, raw, "WORKID", " Work ID = ");
            append_field(&mut line, raw, "TRIGGER", " Trigger conditions = ");
            append_field(&mut line, raw, "TYPE", " Work type = ");
            append_field(&mut line, raw, "INTERVAL", " Interval = ");
            Some(line)
        }
        "POWER_TEMPERATURE" | "THERMAL_LEVEL_CHANGED" | "THERMAL_ACTION_TRIGGERED" => {
            let mut line = debug_header(&raw.name);
            append_field(&mut line, raw, "NAME", " Name = ");
            append_field(&mut line, raw, "TEMPERATURE", " Temperature = ");
            append_field(&mut line, raw, "LEVEL", " Temperature level = ");
            append_field(&mut line, raw, "ACTION", " Action name = ");
            append_field(&mut line, raw, "VALUE", " Value = ");
            Some(line)
        }
        "SCREEN_STATE" | "BRIGHTNESS_NIT" | "AMBIENT_LIGHT" => {
            let mut line = debug_header(&raw.name);
            append_field(&mut line, raw, "STATE", " Screen state = ");
            append_field(&mut line, raw, "BRIGHTNESS", " Screen brightness = ");
            append_field(&mut line, raw, "REASON", " Brightness reason = ");
            append_field(&mut line, raw, "NIT", " Brightness nit = ");
            append_field(&mut line, raw, "RATIO", " Ratio = ");
            append_field(&mut line, raw, "TYPE", " Ambient type = ");
            append_field(&mut line, raw, "LEVEL", " Ambient brightness = ");
            Some(line)
        }
        "CALL_STATE" | "DATA_CONNECTION_STATE" => {
            let mut line = debug_header(&raw.name);
            append_field(&mut line, raw, "STATE", " State = ");
            append_field(&mut line, raw, "SLOT_ID", " Slot ID = ");
            append_field(&mut line, raw, "INDEX_ID", " Index ID = ");
            Some(line)
        }
        "START_REMOTE_ABILITY" => {
            let mut line = debug_header(&raw.name);
            append_field(&mut line, raw, "CALLING_TYPE", " Calling Type = ");
            append_field(&mut line, raw, "CALLING_UID", " Calling Uid = ");
            append_field(&mut line, raw, "CALLING_PID", " Calling Pid = ");
            append_field(&mut line, raw, "TARGET_BUNDLE", " Target Bundle Name = ");
            append_field(&mut line, raw, "TARGET_ABILITY", " Target Ability Name = ");
            append_field(&mut line, raw, "CALLING_APP_UID", " Calling App Uid = ");
            append_field(&mut line, raw, "RESULT", " RESULT = ");
            Some(line)
        }
        _ => None,
    }
}

fn debug_header(name: &str) -> String {
    format!("Additional debug info: Event name = {}", name)
}

fn append_field(line: &mut String, raw: &RawEvent, key: &str, label: &str) {
    if let Some(value) = raw.get_str(key) {
        line.push_str(label);
        line.push_str(value);
    }
}
