//! Memory & disk quantities as printed by condor (`"512.0 MB"`), turned into byte counts.

use std::{fmt, str::FromStr};

use serde::Serialize;
use thiserror::Error;

use crate::status::RawJobRecord;

/// The four resource columns of a status line, in line order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceColumn {
    MemoryRequest,
    MemoryUsage,
    DiskRequest,
    DiskUsage,
}

impl ResourceColumn {
    pub const ALL: [ResourceColumn; 4] = [
        ResourceColumn::MemoryRequest,
        ResourceColumn::MemoryUsage,
        ResourceColumn::DiskRequest,
        ResourceColumn::DiskUsage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceColumn::MemoryRequest => "memory_request",
            ResourceColumn::MemoryUsage => "memory_usage",
            ResourceColumn::DiskRequest => "disk_request",
            ResourceColumn::DiskUsage => "disk_usage",
        }
    }

    /// `<name>_readable`, `<name>_decimal`, `<name>_unit`, `<name>_bytes`
    pub fn sub_columns(self) -> [String; 4] {
        ["readable", "decimal", "unit", "bytes"].map(|suffix| format!("{}_{suffix}", self.name()))
    }

    /// The raw text of this column in `record`.
    pub fn raw(self, record: &RawJobRecord) -> &str {
        match self {
            ResourceColumn::MemoryRequest => &record.memory_request,
            ResourceColumn::MemoryUsage => &record.memory_usage,
            ResourceColumn::DiskRequest => &record.disk_request,
            ResourceColumn::DiskUsage => &record.disk_usage,
        }
    }
}

impl fmt::Display for ResourceColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decimal (SI) units, the only ones `condor_q` prints for these columns.
// TODO check real reports for `TB`/`B` before widening this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Unit {
    GB,
    MB,
    KB,
}

impl Unit {
    pub fn scale(self) -> f64 {
        match self {
            Unit::GB => 1e9,
            Unit::MB => 1e6,
            Unit::KB => 1e3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Unit::GB => "GB",
            Unit::MB => "MB",
            Unit::KB => "KB",
        }
    }
}

impl FromStr for Unit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GB" => Ok(Unit::GB),
            "MB" => Ok(Unit::MB),
            "KB" => Ok(Unit::KB),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceParseError {
    #[error("resource `{readable}`: expected `<value> <unit>`")]
    Shape { readable: String },
    #[error("resource `{readable}`: `{value}` is not a finite number")]
    InvalidValue { readable: String, value: String },
    #[error("resource `{readable}`: unknown unit `{unit}` (expected GB, MB or KB)")]
    UnknownUnit { readable: String, unit: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceQuantity {
    pub readable: String,
    #[serde(rename = "decimal")]
    pub decimal_value: f64,
    pub unit: Unit,
    /// `decimal_value * unit.scale()`, truncated toward zero
    pub bytes: i64,
}

impl ResourceQuantity {
    pub fn parse(readable: &str) -> Result<Self, ResourceParseError> {
        let (value, unit) = readable.split_once(' ').ok_or_else(|| ResourceParseError::Shape {
            readable: readable.to_owned(),
        })?;
        let decimal_value = value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ResourceParseError::InvalidValue {
                readable: readable.to_owned(),
                value: value.to_owned(),
            })?;
        let unit = unit.parse::<Unit>().map_err(|()| ResourceParseError::UnknownUnit {
            readable: readable.to_owned(),
            unit: unit.to_owned(),
        })?;

        Ok(Self {
            readable: readable.to_owned(),
            decimal_value,
            unit,
            // `as` saturates, and the product is finite here
            bytes: (decimal_value * unit.scale()).trunc() as i64,
        })
    }
}

impl FromStr for ResourceQuantity {
    type Err = ResourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.readable)
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ResourceQuantity__parse() {
        let q = ResourceQuantity::parse("1.5 GB").unwrap();
        assert_eq!(q.readable, "1.5 GB");
        assert_eq!(q.decimal_value, 1.5);
        assert_eq!(q.unit, Unit::GB);
        assert_eq!(q.bytes, 1_500_000_000);

        assert_eq!(ResourceQuantity::parse("512.0 MB").unwrap().bytes, 512_000_000);
        assert_eq!(ResourceQuantity::parse("0.25 KB").unwrap().bytes, 250);
        assert_eq!(ResourceQuantity::parse("0.0 KB").unwrap().bytes, 0);
    }

    #[test]
    fn ResourceQuantity__truncates() {
        // 0.0015 KB = 1.5 bytes
        assert_eq!(ResourceQuantity::parse("0.0015 KB").unwrap().bytes, 1);
        assert_eq!(ResourceQuantity::parse("0.0009 KB").unwrap().bytes, 0);
    }

    #[test]
    fn ResourceQuantity__unknown_unit() {
        for unit in ["TB", "B", "gb", "MiB", "M B", ""] {
            let readable = format!("1.0 {unit}");
            assert_eq!(
                ResourceQuantity::parse(&readable),
                Err(ResourceParseError::UnknownUnit {
                    readable: readable.clone(),
                    unit: unit.to_owned()
                })
            );
        }
    }

    #[test]
    fn ResourceQuantity__invalid_value_and_shape() {
        assert!(matches!(
            ResourceQuantity::parse("abc MB"),
            Err(ResourceParseError::InvalidValue { value, .. }) if value == "abc"
        ));
        for readable in ["inf MB", "NaN MB"] {
            assert!(matches!(
                ResourceQuantity::parse(readable),
                Err(ResourceParseError::InvalidValue { .. })
            ));
        }
        assert!(matches!(ResourceQuantity::parse("12.0MB"), Err(ResourceParseError::Shape { .. })));
    }

    #[test]
    fn ResourceQuantity__reparse_readable_is_stable() {
        for readable in ["1.5 GB", "512.0 MB", "3.75 KB", "0.1 GB"] {
            let first = ResourceQuantity::parse(readable).unwrap();
            let second: ResourceQuantity = first.readable.parse().unwrap();
            assert_eq!(first, second);
            assert_eq!(second.to_string(), readable);
        }
    }

    #[test]
    fn ResourceColumn__sub_columns() {
        assert_eq!(
            ResourceColumn::DiskUsage.sub_columns(),
            ["disk_usage_readable", "disk_usage_decimal", "disk_usage_unit", "disk_usage_bytes"]
        );
    }
}
