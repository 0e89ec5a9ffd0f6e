//! # Inbound detection delta.
//!
//! A [`DetectionEvent`] is a `{baik, cacat}` delta sent by the producer.
//! Deserialization is lenient the way producers in the field expect:
//!
//! | Input                          | Result                  |
//! |--------------------------------|-------------------------|
//! | field missing / `null`         | `0`                     |
//! | string, bool, array, object    | `0`                     |
//! | integer (any sign)             | kept as-is              |
//! | integral float (`3.0`)         | converted to integer    |
//! | fractional / out-of-range num  | deserialization error   |
//!
//! Sign is **not** checked here; negative counts are rejected by the aggregator
//! so the rejection carries a typed [`HubError::InvalidDetection`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::HubError;

/// Count delta to fold into the live session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionEvent {
    #[serde(default, deserialize_with = "lenient_count")]
    pub baik: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub cacat: i64,
}

impl DetectionEvent {
    pub fn new(baik: i64, cacat: i64) -> Self {
        Self { baik, cacat }
    }

    /// Parses a JSON payload, mapping malformed counts to [`HubError::InvalidDetection`].
    ///
    /// A non-object payload (e.g. `null`) counts as an empty delta.
    pub fn from_json(payload: &Value) -> Result<Self, HubError> {
        let Some(obj) = payload.as_object() else {
            return Ok(Self::default());
        };
        Ok(Self {
            baik: count_field(obj.get("baik"), "baik")?,
            cacat: count_field(obj.get("cacat"), "cacat")?,
        })
    }
}

fn count_field(value: Option<&Value>, field: &'static str) -> Result<i64, HubError> {
    match value {
        None => Ok(0),
        Some(v) => coerce_count(v).ok_or_else(|| HubError::InvalidDetection {
            field,
            value: v.to_string(),
        }),
    }
}

/// `None` means "numeric but not a representable whole count".
fn coerce_count(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return Some(0);
    };
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    if n.is_u64() {
        return None;
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    coerce_count(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("malformed count: {value}")))
}
