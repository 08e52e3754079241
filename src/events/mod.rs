//! Event ingestion: raw records, normalization, fan-out

pub mod broker;
pub mod normalizer;
pub mod record;

pub use broker::{EventBroker, EventFilter, SubscriberId};
pub use normalizer::{NormalizedEvent, Normalizer};
pub use record::{EventKind, RawEvent};
