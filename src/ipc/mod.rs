//! Socket protocol: codec and server

pub mod codec;
pub mod server;

pub use codec::{Request, Response, DUMP_ARG_LIMIT, MAX_FRAME_LEN};
pub use server::StatsServer;
