//! Battery stats client
//!
//! Caller-facing facade over the socket protocol. Query failures never
//! propagate: the call returns its type's default value and the failure
//! code is retrievable through `last_error`. Only `shell_dump` surfaces the
//! degradation in its output text.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::net::UnixStream;

use crate::error::{Result, StatsCode, StatsError};
use crate::ipc::codec::{
    decode_response, encode_request, read_frame, write_frame, Request, Response,
};
use crate::stats::types::{BatteryStatsInfo, ConsumptionType, StatsType, DEFAULT_VALUE};

/// Dump text when no connection could be established
pub const DUMP_CONNECT_ERROR: &str = "can't connect service";

/// Dump text when the service replied but the call failed
pub const DUMP_REMOTE_ERROR: &str = "remote error";

/// Transport seam, mocked in tests
#[async_trait]
pub trait RemoteStats: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response>;
}

/// Connect-per-call transport over the daemon's unix socket
pub struct UnixSocketRemote {
    socket_path: PathBuf,
}

impl UnixSocketRemote {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }
}

#[async_trait]
impl RemoteStats for UnixSocketRemote {
    async fn call(&self, request: Request) -> Result<Response> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| StatsError::Remote(StatsCode::GetServiceFailed))?;
        write_frame(&mut stream, &encode_request(&request)).await?;
        let mut reply = read_frame(&mut stream).await?;
        decode_response(&mut reply)
    }
}

pub struct BatteryStatsClient {
    remote: Option<Arc<dyn RemoteStats>>,
    last_error: Mutex<StatsCode>,
}

impl BatteryStatsClient {
    /// Client over the daemon socket
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self::with_remote(Arc::new(UnixSocketRemote::new(socket_path)))
    }

    /// Client over an arbitrary transport
    pub fn with_remote(remote: Arc<dyn RemoteStats>) -> Self {
        Self {
            remote: Some(remote),
            last_error: Mutex::new(StatsCode::Ok),
        }
    }

    /// Client with no transport at all; every call degrades
    pub fn disconnected() -> Self {
        Self {
            remote: None,
            last_error: Mutex::new(StatsCode::Ok),
        }
    }

    /// Failure code of the most recent call
    pub fn last_error(&self) -> StatsCode {
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, code: StatsCode) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = code;
    }

    async fn call(&self, request: Request) -> Option<Response> {
        let Some(remote) = &self.remote else {
            self.record(StatsCode::GetServiceFailed);
            return None;
        };
        match remote.call(request).await {
            Ok(response) => {
                let code = response.code();
                self.record(code);
                (code == StatsCode::Ok).then_some(response)
            }
            Err(StatsError::Remote(code)) => {
                self.record(code);
                None
            }
            Err(e) => {
                log::warn!("Stats call failed: {}", e);
                self.record(StatsCode::ReadParcelError);
                None
            }
        }
    }

    async fn call_value(&self, request: Request) -> f64 {
        match self.call(request).await {
            Some(Response::Value { value, .. }) => value,
            Some(_) => {
                self.record(StatsCode::ReadParcelError);
                DEFAULT_VALUE
            }
            None => DEFAULT_VALUE,
        }
    }

    async fn call_count(&self, request: Request) -> u64 {
        match self.call(request).await {
            Some(Response::Count { value, .. }) => value,
            Some(_) => {
                self.record(StatsCode::ReadParcelError);
                0
            }
            None => 0,
        }
    }

    /// Full stats list; empty on failure
    pub async fn get_battery_stats(&self) -> Vec<BatteryStatsInfo> {
        match self.call(Request::GetBatteryStats).await {
            Some(Response::Stats { infos, .. }) => infos,
            Some(_) => {
                self.record(StatsCode::ReadParcelError);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    pub async fn set_on_battery(&self, on_battery: bool) {
        self.call(Request::SetOnBattery { on_battery }).await;
    }

    pub async fn get_app_stats_mah(&self, uid: i32) -> f64 {
        self.call_value(Request::GetAppStatsMah { uid }).await
    }

    pub async fn get_app_stats_percent(&self, uid: i32) -> f64 {
        self.call_value(Request::GetAppStatsPercent { uid }).await
    }

    pub async fn get_part_stats_mah(&self, consumption_type: ConsumptionType) -> f64 {
        self.call_value(Request::GetPartStatsMah { consumption_type })
            .await
    }

    pub async fn get_part_stats_percent(&self, consumption_type: ConsumptionType) -> f64 {
        self.call_value(Request::GetPartStatsPercent { consumption_type })
            .await
    }

    /// Closed on-battery seconds for one activity; part-scoped activities
    /// ignore the uid
    pub async fn get_total_time_second(&self, stats_type: StatsType, uid: i32) -> u64 {
        self.call_count(Request::GetTotalTimeSecond {
            stats_type: stats_type as u32,
            uid,
        })
        .await
    }

    pub async fn get_total_data_bytes(&self, stats_type: StatsType, uid: i32) -> u64 {
        self.call_count(Request::GetTotalDataBytes {
            stats_type: stats_type as u32,
            uid,
        })
        .await
    }

    pub async fn reset(&self) {
        self.call(Request::Reset).await;
    }

    /// Dump text, or a degradation marker when the call fails
    pub async fn shell_dump(&self, args: &[String]) -> String {
        let Some(remote) = &self.remote else {
            self.record(StatsCode::GetServiceFailed);
            return DUMP_CONNECT_ERROR.to_string();
        };
        let request = Request::ShellDump {
            args: args.to_vec(),
        };
        match remote.call(request).await {
            Ok(Response::Text { code: StatsCode::Ok, text }) => {
                self.record(StatsCode::Ok);
                text
            }
            Ok(response) => {
                self.record(response.code());
                DUMP_REMOTE_ERROR.to_string()
            }
            Err(StatsError::Remote(code)) => {
                self.record(code);
                if code == StatsCode::GetServiceFailed {
                    DUMP_CONNECT_ERROR.to_string()
                } else {
                    DUMP_REMOTE_ERROR.to_string()
                }
            }
            Err(e) => {
                log::warn!("Dump call failed: {}", e);
                self.record(StatsCode::ReadParcelError);
                DUMP_REMOTE_ERROR.to_string()
            }
        }
    }
}
