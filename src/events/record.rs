//! Raw event records delivered by the system event feed

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Category of a raw event, mirroring the feed's event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventKind {
    Fault,
    #[default]
    Statistic,
    Security,
    Behavior,
}

/// A raw event as delivered by the external event bus.
///
/// Fields arrive stringly typed; the normalizer is responsible for parsing
/// and for dropping records with malformed values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub domain: String,
    pub name: String,
    #[serde(default)]
    pub event_type: EventKind,
    #[serde(default)]
    pub fields: HashMap<String, String>,
    /// Event time in microseconds; stamped at ingestion when absent
    #[serde(default)]
    pub timestamp_us: Option<u64>,
}

impl RawEvent {
    pub fn new(domain: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            event_type: EventKind::Statistic,
            fields: HashMap::new(),
            timestamp_us: None,
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.fields.insert(key.into(), value.to_string());
        self
    }

    /// Builder-style timestamp setter
    pub fn at(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = Some(timestamp_us);
        self
    }

    /// Fetch a field as a string slice, empty fields read as absent
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Fetch and parse a field as i32, unparseable values read as absent
    pub fn get_i32(&self, key: &str) -> Option<i32> {
        self.get_str(key).and_then(|s| s.trim().parse().ok())
    }

    /// Fetch and parse a field as i16
    pub fn get_i16(&self, key: &str) -> Option<i16> {
        self.get_str(key).and_then(|s| s.trim().parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let event = RawEvent::new("BLUETOOTH", "BLUETOOTH_BR_SWITCH_STATE")
            .with("UID", 10_003)
            .with("PID", 3_458)
            .with("STATE", 1)
            .at(5_000_000);

        assert_eq!(event.get_i32("UID"), Some(10_003));
        assert_eq!(event.get_i32("STATE"), Some(1));
        assert_eq!(event.timestamp_us, Some(5_000_000));
        assert_eq!(event.get_i32("MISSING"), None);
    }

    #[test]
    fn test_malformed_fields_read_as_absent() {
        let event = RawEvent::new("LOCATION", "GNSS_STATE")
            .with("UID", "not-a-number")
            .with("STATE", "");

        assert_eq!(event.get_i32("UID"), None);
        assert_eq!(event.get_str("STATE"), None);
    }

    #[test]
    fn test_json_line_decoding() {
        let json = r#"{"domain":"DISPLAY","name":"SCREEN_STATE","fields":{"STATE":"2"},"timestamp_us":42}"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.domain, "DISPLAY");
        assert_eq!(event.get_i32("STATE"), Some(2));
        assert_eq!(event.event_type, EventKind::Statistic);
        assert_eq!(event.timestamp_us, Some(42));
    }
}
