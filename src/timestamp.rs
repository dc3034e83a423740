//! Serde adapter for persisted timestamps.
//!
//! Writes RFC 3339 in UTC. Reads RFC 3339 with any offset, ISO 8601 without
//! an offset (taken as UTC) and integer unix seconds, so older documents
//! written in either shape come back as the same `OffsetDateTime`.

use serde::{de, Deserialize, Deserializer, Serializer};
use time::{
    format_description::well_known::{Iso8601, Rfc3339},
    OffsetDateTime, PrimitiveDateTime, UtcOffset,
};

pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    if let Ok(ts) = OffsetDateTime::parse(raw, &Iso8601::DEFAULT) {
        return Ok(ts.to_offset(UtcOffset::UTC));
    }
    PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT).map(PrimitiveDateTime::assume_utc)
}

pub fn serialize<S: Serializer>(ts: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let text = ts
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Raw {
    Text(String),
    Unix(i64),
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => parse(&s).map_err(de::Error::custom),
        Raw::Unix(secs) => OffsetDateTime::from_unix_timestamp(secs).map_err(de::Error::custom),
    }
}
