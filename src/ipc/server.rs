//! Unix-socket stats server
//!
//! Accepts connections on the configured socket and serves request frames
//! against the shared service. One task per connection; a malformed request
//! gets an error reply and closes the stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::{UnixListener, UnixStream};

use crate::error::{Result, StatsCode, StatsError};
use crate::ipc::codec::{
    decode_request, encode_response, read_frame, write_frame, Request, Response,
};
use crate::stats::types::StatsType;
use crate::stats::BatteryStatsService;

pub struct StatsServer {
    service: Arc<BatteryStatsService>,
    socket_path: PathBuf,
}

impl StatsServer {
    pub fn new(service: Arc<BatteryStatsService>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            service,
            socket_path: socket_path.into(),
        }
    }

    /// Bind the socket and serve until the task is cancelled
    pub async fn run(self) -> Result<()> {
        // A stale socket file from a previous run blocks the bind
        if Path::new(&self.socket_path).exists() {
            std::fs::remove_file(&self.socket_path)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        log::info!("Stats server listening on {}", self.socket_path.display());

        loop {
            let (stream, _) = listener.accept().await?;
            let service = self.service.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, service).await {
                    crate::debug_log!("Connection closed: {}", e);
                }
            });
        }
    }
}

async fn serve_connection(
    mut stream: UnixStream,
    service: Arc<BatteryStatsService>,
) -> Result<()> {
    loop {
        let mut frame = match read_frame(&mut stream).await {
            Ok(frame) => frame,
            // Peer hung up
            Err(StatsError::Io(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        let response = match decode_request(&mut frame) {
            Ok(request) => dispatch(&service, request),
            Err(StatsError::Remote(code)) => Response::Ack { code },
            Err(e) => {
                log::warn!("Undecodable request: {}", e);
                Response::Ack {
                    code: StatsCode::ReadParcelError,
                }
            }
        };
        write_frame(&mut stream, &encode_response(&response)).await?;
    }
}

fn dispatch(service: &BatteryStatsService, request: Request) -> Response {
    let ok = StatsCode::Ok;
    match request {
        Request::GetBatteryStats => Response::Stats {
            code: ok,
            infos: service.get_battery_stats(),
        },
        Request::SetOnBattery { on_battery } => {
            service.set_on_battery(on_battery);
            Response::Ack { code: ok }
        }
        Request::GetAppStatsMah { uid } => Response::Value {
            code: ok,
            value: service.get_app_stats_mah(uid),
        },
        Request::GetAppStatsPercent { uid } => Response::Value {
            code: ok,
            value: service.get_app_stats_percent(uid),
        },
        Request::GetPartStatsMah { consumption_type } => Response::Value {
            code: ok,
            value: service.get_part_stats_mah(consumption_type),
        },
        Request::GetPartStatsPercent { consumption_type } => Response::Value {
            code: ok,
            value: service.get_part_stats_percent(consumption_type),
        },
        Request::GetTotalTimeSecond { stats_type, uid } => match StatsType::from_wire(stats_type) {
            Some(stats_type) => Response::Count {
                code: ok,
                value: service.get_total_time_second(stats_type, uid),
            },
            None => Response::Ack {
                code: StatsCode::ReadParcelError,
            },
        },
        Request::GetTotalDataBytes { stats_type, uid } => match StatsType::from_wire(stats_type) {
            Some(stats_type) => Response::Count {
                code: ok,
                value: service.get_total_data_bytes(stats_type, uid),
            },
            None => Response::Ack {
                code: StatsCode::ReadParcelError,
            },
        },
        Request::Reset => {
            service.reset();
            Response::Ack { code: ok }
        }
        Request::ShellDump { args } => Response::Text {
            code: ok,
            text: service.shell_dump(&args),
        },
    }
}
