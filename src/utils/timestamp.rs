//! Serde adapter for `DateTime<Utc>` fields on stored documents.
//!
//! Documents are written with a native BSON date. Reading accepts a BSON date
//! or an RFC 3339 string, so records written by earlier versions still load.
//! Human-readable formats (API responses) get an RFC 3339 string.

use chrono::{DateTime, Utc};
use mongodb::bson::{self, Bson};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if serializer.is_human_readable() {
        value.serialize(serializer)
    } else {
        bson::DateTime::from_millis(value.timestamp_millis()).serialize(serializer)
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    from_bson(Bson::deserialize(deserializer)?).map_err(D::Error::custom)
}

fn from_bson(value: Bson) -> Result<DateTime<Utc>, String> {
    match value {
        Bson::DateTime(date) => DateTime::from_timestamp_millis(date.timestamp_millis())
            .ok_or_else(|| format!("date out of range: {}", date)),
        Bson::String(text) => DateTime::parse_from_rfc3339(&text)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp {:?}: {}", text, e)),
        other => Err(format!("expected a date, found {}", other)),
    }
}

/// Same as the parent module for `Option<DateTime<Utc>>`; null reads as `None`.
pub mod option {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => super::serialize(value, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Bson::deserialize(deserializer)? {
            Bson::Null | Bson::Undefined => Ok(None),
            value => from_bson(value).map(Some).map_err(D::Error::custom),
        }
    }
}
