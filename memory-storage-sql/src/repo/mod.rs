//! Repository trait implementations for [`crate::SqlStorage`], one
//! module per store.

mod core_memory;
mod observational;
mod skills;
mod strategic;
mod topics;

use chrono::{DateTime, Utc};
use memory_core::{Error, Result};

/// `created_at`/`updated_at`/... columns are stored as unix seconds.
pub(crate) fn to_unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

/// Inverse of [`to_unix`]; missing/invalid timestamps fall back to the
/// epoch rather than panicking (no row we write ever omits these, but a
/// hand-edited database might).
pub(crate) fn from_unix(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Error::Serialization)
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(Error::Serialization)
}

pub(crate) fn store_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::StoreFailure(format!("{context}: {e}"))
}
