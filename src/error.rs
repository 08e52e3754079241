//! Error types for the powerstats service

use thiserror::Error;

/// Service error type
#[derive(Debug, Error)]
pub enum StatsError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Event feed error
    #[error("Event feed error: {0}")]
    Feed(String),

    /// Wire codec error
    #[error("Parcel error: {0}")]
    Parcel(String),

    /// Remote service error
    #[error("Remote error: {0:?}")]
    Remote(StatsCode),

    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StatsError>;

impl From<String> for StatsError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for StatsError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// Numeric error codes surfaced at the IPC boundary.
///
/// These are returned in reply parcels and recorded by the client as
/// `last_error`; they never propagate as panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum StatsCode {
    /// Success
    Ok = 0,
    /// Reply parcel could not be decoded
    ReadParcelError = 1,
    /// Request parcel could not be written
    WriteParcelError = 2,
    /// Request carried more parameters than the stub accepts
    ExceedParamLimit = 3,
    /// Remote service unreachable
    GetServiceFailed = 4,
}

impl StatsCode {
    /// Decode a wire value, mapping unknown codes to a read failure
    pub fn from_wire(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::ReadParcelError,
            2 => Self::WriteParcelError,
            3 => Self::ExceedParamLimit,
            4 => Self::GetServiceFailed,
            _ => Self::ReadParcelError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_error_display() {
        let err = StatsError::Init("power model missing".to_string());
        assert_eq!(err.to_string(), "Initialization error: power model missing");

        let err = StatsError::Parcel("short reply".to_string());
        assert_eq!(err.to_string(), "Parcel error: short reply");
    }

    #[test]
    fn test_stats_code_wire_round_trip() {
        for code in [
            StatsCode::Ok,
            StatsCode::ReadParcelError,
            StatsCode::WriteParcelError,
            StatsCode::ExceedParamLimit,
            StatsCode::GetServiceFailed,
        ] {
            assert_eq!(StatsCode::from_wire(code as i32), code);
        }
        // Unknown codes degrade to a decode failure
        assert_eq!(StatsCode::from_wire(42), StatsCode::ReadParcelError);
    }
}
