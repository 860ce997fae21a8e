//! Common GraphQL types

use async_graphql::{InputValueError, InputValueResult, Scalar, ScalarType, Value};
use chrono::{DateTime as ChronoDateTime, SecondsFormat, Utc};

/// DateTime scalar
///
/// Accepts any RFC 3339 string and serializes as UTC with millisecond
/// precision, e.g. `2024-03-01T08:00:00.000Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTime(pub ChronoDateTime<Utc>);

impl DateTime {
    pub fn now() -> Self {
        DateTime(Utc::now())
    }
}

impl From<ChronoDateTime<Utc>> for DateTime {
    fn from(value: ChronoDateTime<Utc>) -> Self {
        DateTime(value)
    }
}

#[Scalar]
impl ScalarType for DateTime {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(s) = &value {
            Ok(DateTime(
                ChronoDateTime::parse_from_rfc3339(s)
                    .map_err(|e| InputValueError::custom(format!("Invalid DateTime: {}", e)))?
                    .with_timezone(&Utc),
            ))
        } else {
            Err(InputValueError::expected_type(value))
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_datetime_to_value() {
        let dt = DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
        assert_eq!(dt.to_value(), Value::String("2024-03-01T08:00:00.000Z".into()));
    }

    #[test]
    fn test_datetime_parse_normalizes_offset() {
        let parsed = DateTime::parse(Value::String("2024-03-01T10:00:00+02:00".into())).unwrap();
        assert_eq!(parsed.0, Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_datetime_rejects_garbage() {
        assert!(DateTime::parse(Value::String("next tuesday".into())).is_err());
        assert!(DateTime::parse(Value::Boolean(true)).is_err());
    }
}
