//! Tolerant field decoders for model output
//!
//! Models are told the schema but do not always keep to it: numbers arrive
//! as strings, strings as null. Any JSON value is accepted here; values that
//! cannot be read as the wanted type become `None`.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn value<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer)
}

/// Free text; non-string scalars and containers keep their JSON text
pub(crate) fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match value(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

/// Like [`text`] but null reads as an empty string
pub(crate) fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(deserializer)?.unwrap_or_default())
}

/// Label enum built from its display string
pub(crate) fn label<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    Ok(text(deserializer)?.map(T::from))
}

/// Number, or a string holding one
pub(crate) fn number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match value(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Non-negative whole number, from an integer, integral float or string
pub(crate) fn index<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let whole = |f: f64| {
        (f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX)).then_some(f as u32)
    };

    Ok(match value(deserializer)? {
        Value::Number(n) => match n.as_u64() {
            Some(i) => u32::try_from(i).ok(),
            None => n.as_f64().and_then(whole),
        },
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(whole),
        _ => None,
    })
}

/// Consume the value and keep the default; for fields that are recomputed
pub(crate) fn ignored<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default,
{
    IgnoredAny::deserialize(deserializer)?;
    Ok(T::default())
}
