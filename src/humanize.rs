//! Human-readable size parsing for the free-space threshold
//!
//! Sizes use decimal multipliers (`1KB = 1000 bytes`). A value is either
//! `<number> <unit>` or `<number><unit>`; without a space the last two
//! characters are taken as the unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid size format: {0}")]
    InvalidFormat(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid unit: {0}")]
    InvalidUnit(String),
}

const UNITS: &[(&str, u64)] = &[
    ("B", 1),
    ("KB", 1_000),
    ("MB", 1_000_000),
    ("GB", 1_000_000_000),
    ("TB", 1_000_000_000_000),
];

/// Parse a threshold string such as `"10GB"` or `"10 MB"` into bytes.
///
/// Failure is reported as `Err`, never as a magic number, so a legitimate
/// `"0 B"` threshold stays distinguishable from garbage input.
pub fn parse_threshold(size: &str) -> Result<u64, ParseError> {
    let size = size.trim().to_uppercase();

    let (number, unit) = if size.contains(char::is_whitespace) {
        let mut parts = size.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(number), Some(unit), None) => (number, unit),
            _ => return Err(ParseError::InvalidFormat(size.clone())),
        }
    } else {
        // last two characters are the unit
        let split = size
            .char_indices()
            .rev()
            .nth(1)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        size.split_at(split)
    };

    let value: f64 = number
        .parse()
        .map_err(|_| ParseError::InvalidNumber(number.to_string()))?;
    if !value.is_finite() || value < 0.0 {
        return Err(ParseError::InvalidNumber(number.to_string()));
    }

    let multiplier = UNITS
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, multiplier)| *multiplier)
        .ok_or_else(|| ParseError::InvalidUnit(unit.to_string()))?;

    Ok((value * multiplier as f64) as u64)
}

/// Byte size wrapper with human-readable parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn to_human_readable(&self) -> String {
        for &(unit, divisor) in UNITS.iter().rev() {
            if self.0 >= divisor {
                let value = self.0 / divisor;
                let decimal = (self.0 % divisor) * 10 / divisor;

                if decimal > 0 {
                    return format!("{}.{}{}", value, decimal, unit);
                }
                return format!("{}{}", value, unit);
            }
        }

        format!("{}B", self.0)
    }
}

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ByteSizeVisitor;

        impl<'de> serde::de::Visitor<'de> for ByteSizeVisitor {
            type Value = ByteSize;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a byte size as string (e.g., \"10GB\", \"10 MB\") or integer")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(ByteSize(v))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .map(ByteSize)
                    .map_err(|_| E::custom(format!("negative byte size: {}", v)))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                v.parse::<ByteSize>().map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(ByteSizeVisitor)
    }
}

impl FromStr for ByteSize {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // config/env sources hand plain integers over as strings
        if let Ok(num) = s.trim().parse::<u64>() {
            return Ok(ByteSize(num));
        }

        parse_threshold(s).map(ByteSize)
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human_readable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_space() {
        assert_eq!(parse_threshold("10MB"), Ok(10_000_000));
        assert_eq!(parse_threshold("1111MB"), Ok(1_111_000_000));
        assert_eq!(parse_threshold("100GB"), Ok(100_000_000_000));
    }

    #[test]
    fn test_parse_with_space() {
        assert_eq!(parse_threshold("10 MB"), Ok(10_000_000));
        assert_eq!(parse_threshold("10 B"), Ok(10));
        assert_eq!(parse_threshold("2 tb"), Ok(2_000_000_000_000));
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_threshold("1.5GB"), Ok(1_500_000_000));
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        assert!(matches!(
            parse_threshold("1PB"),
            Err(ParseError::InvalidUnit(_))
        ));
    }

    #[test]
    fn test_long_unit_is_rejected() {
        // "1Megabyte" splits into "1MEGABY" + "TE"
        assert!(parse_threshold("1Megabyte").is_err());
    }

    #[test]
    fn test_single_char_unit_needs_space() {
        assert!(parse_threshold("10B").is_err());
    }

    #[test]
    fn test_zero_is_distinct_from_failure() {
        assert_eq!(parse_threshold("0 KB"), Ok(0));
        assert!(parse_threshold("KB").is_err());
        assert!(parse_threshold("").is_err());
    }

    #[test]
    fn test_negative_and_garbage_numbers() {
        assert!(parse_threshold("-1GB").is_err());
        assert!(parse_threshold("infGB").is_err());
        assert!(parse_threshold("1 2 GB").is_err());
    }

    #[test]
    fn test_to_human_readable() {
        assert_eq!(ByteSize(1000).to_human_readable(), "1KB");
        assert_eq!(ByteSize(10_000_000).to_human_readable(), "10MB");
        assert_eq!(ByteSize(1_500_000_000).to_human_readable(), "1.5GB");
        assert_eq!(ByteSize(12).to_human_readable(), "12B");
    }

    #[test]
    fn test_deserialize_string() {
        let json = r#"{"size": "10GB"}"#;
        #[derive(Deserialize)]
        struct TestStruct {
            size: ByteSize,
        }
        let parsed: TestStruct = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.size.as_u64(), 10_000_000_000);
    }

    #[test]
    fn test_deserialize_number() {
        let json = r#"{"size": 1024}"#;
        #[derive(Deserialize)]
        struct TestStruct {
            size: ByteSize,
        }
        let parsed: TestStruct = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.size.as_u64(), 1024);
    }

    #[test]
    fn test_deserialize_rejects_bad_unit() {
        #[derive(Debug, Deserialize)]
        struct TestStruct {
            #[allow(dead_code)]
            size: ByteSize,
        }
        let parsed: Result<TestStruct, _> = serde_json::from_str(r#"{"size": "1PB"}"#);
        assert!(parsed.is_err());
    }
}
