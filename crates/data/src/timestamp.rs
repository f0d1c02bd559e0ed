//! Fixed-width RFC 3339 timestamps, so stored dates sort lexically.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|date| date.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "crate::timestamp")]
        at: DateTime<Utc>,
    }

    #[test]
    fn serializes_with_nanosecond_precision() {
        let at = Utc.with_ymd_and_hms(2016, 7, 9, 12, 30, 0).unwrap();
        let json = serde_json::to_value(Stamped { at }).unwrap();
        assert_eq!(json["at"], "2016-07-09T12:30:00.000000000Z");

        let back: Stamped = serde_json::from_value(json).unwrap();
        assert_eq!(back.at, at);
    }
}
