//! Millisecond-precision timestamp serialization.
//!
//! Message timestamps travel as `i64` Unix milliseconds rather than a
//! structured date representation, so both peers agree on precision and
//! the catch-up comparison is a plain integer compare.

/// Serde adapter: `DateTime<Utc>` as `i64` Unix milliseconds.
///
/// Use with `#[serde(with = "farcast_proto::timestamp::millis")]`.
pub mod millis {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a timestamp as milliseconds since the Unix epoch.
    pub fn serialize<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(timestamp.timestamp_millis())
    }

    /// Deserialize a timestamp from milliseconds since the Unix epoch.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Stamped {
        #[serde(with = "super::millis")]
        at: DateTime<Utc>,
    }

    #[test]
    fn round_trips_at_millisecond_precision() {
        let original = Stamped { at: Utc.timestamp_millis_opt(1_700_000_123_456).unwrap() };

        let mut wire = Vec::new();
        ciborium::ser::into_writer(&original, &mut wire).unwrap();
        let decoded: Stamped = ciborium::de::from_reader(wire.as_slice()).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn sub_millisecond_precision_is_dropped() {
        let original = Stamped {
            at: Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(), // 123.456789 ms
        };

        let mut wire = Vec::new();
        ciborium::ser::into_writer(&original, &mut wire).unwrap();
        let decoded: Stamped = ciborium::de::from_reader(wire.as_slice()).unwrap();

        assert_eq!(decoded.at.timestamp_millis(), original.at.timestamp_millis());
        assert_ne!(decoded.at, original.at);
    }
}
