// Admin back-office handlers, one module per resource. Every route in this
// tree sits behind the JWT + admin-role middleware layers.
pub mod activity;
pub mod courses;
pub mod overview;
pub mod reports;
pub mod settings;
pub mod students;
pub mod teachers;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::ApiError;

/// Parse a raw id into a UUID, mapping failure to the contract's 400 message.
pub(crate) fn parse_id(raw: &str, message: &str) -> Result<Uuid, ApiError> {
    raw.trim()
        .parse::<Uuid>()
        .map_err(|_| ApiError::bad_request(message))
}

/// Distinguishes an absent JSON field (`Ok(None)` via serde default) from an
/// explicit `null` (`Ok(Some(None))`), for nullable patch fields.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
