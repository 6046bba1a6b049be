use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

/// `YYYYMMDDTHHMMSS.nnnnnnnnnZ`
const COMPACT: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second].[subsecond digits:9]Z");

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        Self::from_offset_datetime(parsed).map_err(|_| ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        })
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Result<Self, ValidationError> {
        if value.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: value
                    .format(&Rfc3339)
                    .unwrap_or_else(|_| String::from("<unformattable>")),
            });
        }

        Ok(Self(value))
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }

    /// Fixed-width, filename-safe form whose lexicographic order is
    /// chronological for years 0000..=9999.
    pub fn format_compact(self) -> Result<String, ValidationError> {
        self.0
            .format(COMPACT)
            .map_err(|error| ValidationError::Unformattable {
                value: error.to_string(),
            })
    }

    /// Inverse of [`format_compact`](Self::format_compact). Only the
    /// canonical form is accepted.
    pub fn parse_compact(input: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        };

        let parsed = PrimitiveDateTime::parse(input, COMPACT)
            .map(PrimitiveDateTime::assume_utc)
            .map(Self)
            .map_err(|_| invalid())?;
        if parsed.format_compact()? != input {
            return Err(invalid());
        }
        Ok(parsed)
    }

    pub fn plus_nanos(self, nanos: i64) -> Self {
        Self(self.0 + Duration::nanoseconds(nanos))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_utc_timestamp() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn rejects_non_utc_timestamp() {
        let err = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn compact_form_is_fixed_width_and_reversible() {
        let parsed = UtcDateTime::parse("2024-03-08T14:05:09.000000042Z").expect("must parse");
        let compact = parsed.format_compact().expect("must format");
        assert_eq!(compact, "20240308T140509.000000042Z");
        assert_eq!(compact.len(), 26);
        assert_eq!(UtcDateTime::parse_compact(&compact).expect("must parse"), parsed);
    }

    #[test]
    fn compact_order_is_chronological() {
        let earlier = UtcDateTime::parse("2024-03-08T09:59:59.999999999Z").expect("must parse");
        let later = earlier.plus_nanos(1);
        assert!(
            earlier.format_compact().expect("must format")
                < later.format_compact().expect("must format")
        );
    }

    #[test]
    fn rejects_malformed_compact_form() {
        assert!(UtcDateTime::parse_compact("2024-03-08T14:05:09Z").is_err());
        assert!(UtcDateTime::parse_compact("20241308T140509.000000000Z").is_err());
        assert!(UtcDateTime::parse_compact("20240308T140509.000000000").is_err());
        assert!(UtcDateTime::parse_compact("20240308T140509.000000000Zx").is_err());
        assert!(UtcDateTime::parse_compact("20240230T000000.000000000Z").is_err());
    }

    #[test]
    fn compact_form_rejects_non_canonical_spellings() {
        assert!(UtcDateTime::parse_compact("+20240308T140509.000000000Z").is_err());
        assert!(UtcDateTime::parse_compact("20240308T140509.42Z").is_err());
    }
}
