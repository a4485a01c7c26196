//! Compiled date and number formats.
//!
//! Format customizations are compiled once at chain-build time, so format
//! errors surface as configuration errors and the per-call path only
//! formats or parses.

use time::format_description::OwnedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::desc::{DateFormat, NumberFormat};
use crate::error::BindError;

// -----------------------------------------------------------------------------
// Dates

/// A date/time value on its way to the generator.
pub(crate) enum DateOut {
    Text(String),
    Millis(i64),
}

/// A [`DateFormat`] compiled for repeated use.
#[derive(Debug)]
pub(crate) enum CompiledDateFormat {
    Rfc3339,
    UnixMillis,
    Pattern(OwnedFormatItem),
}

impl CompiledDateFormat {
    pub(crate) fn compile(format: &DateFormat) -> Result<Self, BindError> {
        match format {
            DateFormat::Rfc3339 => Ok(Self::Rfc3339),
            DateFormat::UnixMillis => Ok(Self::UnixMillis),
            DateFormat::Pattern(pattern) => {
                let items = time::format_description::parse_owned::<2>(pattern).map_err(
                    |err| BindError::InvalidDateFormat {
                        pattern: pattern.to_string(),
                        reason: err.to_string(),
                    },
                )?;
                Ok(Self::Pattern(items))
            }
        }
    }

    pub(crate) fn format(&self, value: &OffsetDateTime) -> Result<DateOut, BindError> {
        match self {
            Self::Rfc3339 => value
                .format(&Rfc3339)
                .map(DateOut::Text)
                .map_err(|err| invalid_date(value.to_string(), err)),
            Self::UnixMillis => {
                Ok(DateOut::Millis((value.unix_timestamp_nanos() / 1_000_000) as i64))
            }
            Self::Pattern(items) => value
                .format(items)
                .map(DateOut::Text)
                .map_err(|err| invalid_date(value.to_string(), err)),
        }
    }

    pub(crate) fn parse(&self, text: &str) -> Result<OffsetDateTime, BindError> {
        match self {
            Self::Rfc3339 => OffsetDateTime::parse(text, &Rfc3339)
                .map_err(|err| invalid_date(text.to_string(), err)),
            Self::UnixMillis => {
                let millis: i128 = text
                    .parse()
                    .map_err(|_| invalid_date(text.to_string(), "not a millisecond count"))?;
                OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000)
                    .map_err(|err| invalid_date(text.to_string(), err))
            }
            Self::Pattern(items) => {
                // Patterns without an offset produce civil timestamps;
                // those are taken as UTC.
                if let Ok(value) = OffsetDateTime::parse(text, items) {
                    return Ok(value);
                }
                if let Ok(value) = PrimitiveDateTime::parse(text, items) {
                    return Ok(value.assume_utc());
                }
                Date::parse(text, items)
                    .map(|date| date.midnight().assume_utc())
                    .map_err(|err| invalid_date(text.to_string(), err))
            }
        }
    }
}

fn invalid_date(text: String, reason: impl ToString) -> BindError {
    BindError::InvalidDate {
        text,
        reason: reason.to_string(),
    }
}

// -----------------------------------------------------------------------------
// Numbers

/// A [`NumberFormat`] compiled for repeated use.
///
/// Formatted numbers travel as JSON strings with a fixed fraction-digit
/// count.
pub(crate) struct CompiledNumberFormat {
    digits: usize,
}

impl CompiledNumberFormat {
    pub(crate) fn compile(format: &NumberFormat) -> Self {
        Self {
            digits: format.fraction_digits(),
        }
    }

    pub(crate) fn format(&self, value: f64) -> String {
        format!("{value:.prec$}", prec = self.digits)
    }

    pub(crate) fn parse(&self, text: &str, target: &'static str) -> Result<f64, BindError> {
        text.trim().parse().map_err(|_| BindError::InvalidScalar {
            text: text.to_string(),
            target,
        })
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn rfc3339_round_trip() {
        let format = CompiledDateFormat::compile(&DateFormat::Rfc3339).unwrap();
        let value = datetime!(2026-08-06 12:30:00 UTC);
        let DateOut::Text(text) = format.format(&value).unwrap() else {
            panic!("expected text");
        };
        assert_eq!(format.parse(&text).unwrap(), value);
    }

    #[test]
    fn unix_millis_round_trip() {
        let format = CompiledDateFormat::compile(&DateFormat::UnixMillis).unwrap();
        let value = datetime!(2026-08-06 12:30:00.250 UTC);
        let DateOut::Millis(millis) = format.format(&value).unwrap() else {
            panic!("expected millis");
        };
        assert_eq!(format.parse(&millis.to_string()).unwrap(), value);
    }

    #[test]
    fn pattern_without_offset_is_utc() {
        let format =
            CompiledDateFormat::compile(&DateFormat::pattern("[year]-[month]-[day]")).unwrap();
        let parsed = format.parse("2026-08-06").unwrap();
        assert_eq!(parsed, datetime!(2026-08-06 00:00:00 UTC));
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let err = CompiledDateFormat::compile(&DateFormat::pattern("[nope]")).unwrap_err();
        assert!(matches!(err, BindError::InvalidDateFormat { .. }));
    }

    #[test]
    fn number_format_fixes_fraction_digits() {
        let format = CompiledNumberFormat::compile(&NumberFormat::new("#0.00"));
        assert_eq!(format.format(1.5), "1.50");
        assert_eq!(format.parse("1.50", "f64").unwrap(), 1.5);
    }
}
