//! Wire codec for the stats socket protocol
//!
//! Frames are a `u32` little-endian length prefix followed by the payload.
//! Requests start with a one-byte opcode, responses with a one-byte payload
//! tag after the `i32` status code. All integers are little endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, StatsCode, StatsError};
use crate::stats::types::{BatteryStatsInfo, ConsumptionType};

/// Upper bound on one frame, requests and replies alike
pub const MAX_FRAME_LEN: u32 = 1 << 20;

/// Most dump arguments one request may carry
pub const DUMP_ARG_LIMIT: usize = 32;

const OP_GET_BATTERY_STATS: u8 = 0;
const OP_SET_ON_BATTERY: u8 = 1;
const OP_GET_APP_STATS_MAH: u8 = 2;
const OP_GET_APP_STATS_PERCENT: u8 = 3;
const OP_GET_PART_STATS_MAH: u8 = 4;
const OP_GET_PART_STATS_PERCENT: u8 = 5;
const OP_GET_TOTAL_TIME_SECOND: u8 = 6;
const OP_GET_TOTAL_DATA_BYTES: u8 = 7;
const OP_RESET: u8 = 8;
const OP_SHELL_DUMP: u8 = 9;

const TAG_ACK: u8 = 0;
const TAG_VALUE: u8 = 1;
const TAG_COUNT: u8 = 2;
const TAG_STATS: u8 = 3;
const TAG_TEXT: u8 = 4;

/// One request parcel
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetBatteryStats,
    SetOnBattery { on_battery: bool },
    GetAppStatsMah { uid: i32 },
    GetAppStatsPercent { uid: i32 },
    GetPartStatsMah { consumption_type: ConsumptionType },
    GetPartStatsPercent { consumption_type: ConsumptionType },
    GetTotalTimeSecond { stats_type: u32, uid: i32 },
    GetTotalDataBytes { stats_type: u32, uid: i32 },
    Reset,
    ShellDump { args: Vec<String> },
}

/// One reply parcel
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ack { code: StatsCode },
    Value { code: StatsCode, value: f64 },
    Count { code: StatsCode, value: u64 },
    Stats { code: StatsCode, infos: Vec<BatteryStatsInfo> },
    Text { code: StatsCode, text: String },
}

impl Response {
    pub fn code(&self) -> StatsCode {
        match self {
            Self::Ack { code }
            | Self::Value { code, .. }
            | Self::Count { code, .. }
            | Self::Stats { code, .. }
            | Self::Text { code, .. } => *code,
        }
    }
}

pub fn encode_request(request: &Request) -> Bytes {
    let mut buf = BytesMut::new();
    match request {
        Request::GetBatteryStats => buf.put_u8(OP_GET_BATTERY_STATS),
        Request::SetOnBattery { on_battery } => {
            buf.put_u8(OP_SET_ON_BATTERY);
            buf.put_u8(u8::from(*on_battery));
        }
        Request::GetAppStatsMah { uid } => {
            buf.put_u8(OP_GET_APP_STATS_MAH);
            buf.put_i32_le(*uid);
        }
        Request::GetAppStatsPercent { uid } => {
            buf.put_u8(OP_GET_APP_STATS_PERCENT);
            buf.put_i32_le(*uid);
        }
        Request::GetPartStatsMah { consumption_type } => {
            buf.put_u8(OP_GET_PART_STATS_MAH);
            buf.put_i32_le(*consumption_type as i32);
        }
        Request::GetPartStatsPercent { consumption_type } => {
            buf.put_u8(OP_GET_PART_STATS_PERCENT);
            buf.put_i32_le(*consumption_type as i32);
        }
        Request::GetTotalTimeSecond { stats_type, uid } => {
            buf.put_u8(OP_GET_TOTAL_TIME_SECOND);
            buf.put_u32_le(*stats_type);
            buf.put_i32_le(*uid);
        }
        Request::GetTotalDataBytes { stats_type, uid } => {
            buf.put_u8(OP_GET_TOTAL_DATA_BYTES);
            buf.put_u32_le(*stats_type);
            buf.put_i32_le(*uid);
        }
        Request::Reset => buf.put_u8(OP_RESET),
        Request::ShellDump { args } => {
            buf.put_u8(OP_SHELL_DUMP);
            buf.put_u32_le(args.len() as u32);
            for arg in args {
                put_string(&mut buf, arg);
            }
        }
    }
    buf.freeze()
}

pub fn decode_request(buf: &mut Bytes) -> Result<Request> {
    let opcode = get_u8(buf)?;
    let request = match opcode {
        OP_GET_BATTERY_STATS => Request::GetBatteryStats,
        OP_SET_ON_BATTERY => Request::SetOnBattery {
            on_battery: get_u8(buf)? != 0,
        },
        OP_GET_APP_STATS_MAH => Request::GetAppStatsMah { uid: get_i32(buf)? },
        OP_GET_APP_STATS_PERCENT => Request::GetAppStatsPercent { uid: get_i32(buf)? },
        OP_GET_PART_STATS_MAH => Request::GetPartStatsMah {
            consumption_type: ConsumptionType::from_wire(get_i32(buf)?),
        },
        OP_GET_PART_STATS_PERCENT => Request::GetPartStatsPercent {
            consumption_type: ConsumptionType::from_wire(get_i32(buf)?),
        },
        OP_GET_TOTAL_TIME_SECOND => Request::GetTotalTimeSecond {
            stats_type: get_u32(buf)?,
            uid: get_i32(buf)?,
        },
        OP_GET_TOTAL_DATA_BYTES => Request::GetTotalDataBytes {
            stats_type: get_u32(buf)?,
            uid: get_i32(buf)?,
        },
        OP_RESET => Request::Reset,
        OP_SHELL_DUMP => {
            let count = get_u32(buf)? as usize;
            if count > DUMP_ARG_LIMIT {
                return Err(StatsError::Remote(StatsCode::ExceedParamLimit));
            }
            let mut args = Vec::with_capacity(count);
            for _ in 0..count {
                args.push(get_string(buf)?);
            }
            Request::ShellDump { args }
        }
        other => {
            return Err(StatsError::Parcel(format!("unknown opcode {}", other)));
        }
    };
    Ok(request)
}

pub fn encode_response(response: &Response) -> Bytes {
    let mut buf = BytesMut::new();
    buf.put_i32_le(response.code() as i32);
    match response {
        Response::Ack { .. } => buf.put_u8(TAG_ACK),
        Response::Value { value, .. } => {
            buf.put_u8(TAG_VALUE);
            buf.put_f64_le(*value);
        }
        Response::Count { value, .. } => {
            buf.put_u8(TAG_COUNT);
            buf.put_u64_le(*value);
        }
        Response::Stats { infos, .. } => {
            buf.put_u8(TAG_STATS);
            buf.put_u32_le(infos.len() as u32);
            for info in infos {
                buf.put_i32_le(info.uid);
                buf.put_i32_le(info.user_id);
                buf.put_i32_le(info.consumption_type as i32);
                buf.put_f64_le(info.total_power_mah);
            }
        }
        Response::Text { text, .. } => {
            buf.put_u8(TAG_TEXT);
            put_string(&mut buf, text);
        }
    }
    buf.freeze()
}

pub fn decode_response(buf: &mut Bytes) -> Result<Response> {
    let code = StatsCode::from_wire(get_i32(buf)?);
    let tag = get_u8(buf)?;
    let response = match tag {
        TAG_ACK => Response::Ack { code },
        TAG_VALUE => Response::Value {
            code,
            value: get_f64(buf)?,
        },
        TAG_COUNT => Response::Count {
            code,
            value: get_u64(buf)?,
        },
        TAG_STATS => {
            let count = get_u32(buf)? as usize;
            let mut infos = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                infos.push(BatteryStatsInfo {
                    uid: get_i32(buf)?,
                    user_id: get_i32(buf)?,
                    consumption_type: ConsumptionType::from_wire(get_i32(buf)?),
                    total_power_mah: get_f64(buf)?,
                });
            }
            Response::Stats { code, infos }
        }
        TAG_TEXT => Response::Text {
            code,
            text: get_string(buf)?,
        },
        other => {
            return Err(StatsError::Parcel(format!("unknown reply tag {}", other)));
        }
    };
    Ok(response)
}

/// Write one length-prefixed frame
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() as u64 > u64::from(MAX_FRAME_LEN) {
        return Err(StatsError::Parcel("frame too large".to_string()));
    }
    writer.write_u32_le(payload.len() as u32).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame
pub async fn read_frame<R>(reader: &mut R) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32_le().await?;
    if len > MAX_FRAME_LEN {
        return Err(StatsError::Parcel(format!("oversized frame: {} bytes", len)));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    Ok(Bytes::from(payload))
}

fn ensure(buf: &Bytes, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(StatsError::Parcel(format!(
            "short parcel: need {} bytes, have {}",
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn get_u8(buf: &mut Bytes) -> Result<u8> {
    ensure(buf, 1)?;
    Ok(buf.get_u8())
}

fn get_i32(buf: &mut Bytes) -> Result<i32> {
    ensure(buf, 4)?;
    Ok(buf.get_i32_le())
}

fn get_u32(buf: &mut Bytes) -> Result<u32> {
    ensure(buf, 4)?;
    Ok(buf.get_u32_le())
}

fn get_u64(buf: &mut Bytes) -> Result<u64> {
    ensure(buf, 8)?;
    Ok(buf.get_u64_le())
}

fn get_f64(buf: &mut Bytes) -> Result<f64> {
    ensure(buf, 8)?;
    Ok(buf.get_f64_le())
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_u32_le(s.len() as u32);
    buf.put_slice(s.as_bytes());
}

fn get_string(buf: &mut Bytes) -> Result<String> {
    let len = get_u32(buf)? as usize;
    ensure(buf, len)?;
    let raw = buf.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| StatsError::Parcel("string field is not utf-8".to_string()))
}
