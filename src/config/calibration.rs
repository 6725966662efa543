//! Brightness-to-lux calibration table.
//!
//! Each point maps a mean gray level measured by the camera to the
//! illuminance observed at that level. Points are kept sorted descending
//! by brightness so the lux mapper can scan from the brightest bucket down.

use std::collections::BTreeMap;
use std::fmt;

/// A single calibration point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationPoint {
    /// Mean gray level threshold (0-255).
    pub brightness: u8,
    /// Human-readable name of the lighting condition.
    pub label: String,
    /// Illuminance at this threshold.
    pub lux: u64,
}

impl CalibrationPoint {
    /// Creates a new calibration point.
    pub fn new(brightness: u8, label: impl Into<String>, lux: u64) -> Self {
        Self {
            brightness,
            label: label.into(),
            lux,
        }
    }

    /// Formats the value half of a `label = "<brightness> <lux>"` entry.
    pub fn entry_value(&self) -> String {
        format!("{} {}", self.brightness, self.lux)
    }

    /// Parses the value half of a `label = "<brightness> <lux>"` entry.
    pub fn parse_entry(label: &str, value: &str) -> Result<Self, CalibrationError> {
        let malformed = || CalibrationError::Malformed {
            label: label.to_owned(),
            value: value.to_owned(),
        };

        let mut fields = value.split_whitespace();
        let brightness = fields
            .next()
            .and_then(|b| b.parse::<u8>().ok())
            .ok_or_else(malformed)?;
        let lux = fields
            .next()
            .and_then(|l| l.parse::<u64>().ok())
            .ok_or_else(malformed)?;
        if fields.next().is_some() {
            return Err(malformed());
        }

        Ok(Self::new(brightness, label, lux))
    }
}

/// Calibration table errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalibrationError {
    /// No entries at all.
    #[error("calibration table has no entries")]
    Empty,
    /// An entry is not `"<brightness> <lux>"`.
    #[error("malformed calibration entry {label} = {value:?} (expected \"<brightness 0-255> <lux>\")")]
    Malformed {
        /// Entry name.
        label: String,
        /// Raw entry value.
        value: String,
    },
    /// Two entries share a brightness.
    #[error("brightness {brightness} is used by both {first} and {second}")]
    DuplicateBrightness {
        /// Shared brightness.
        brightness: u8,
        /// First entry name.
        first: String,
        /// Second entry name.
        second: String,
    },
}

/// Ordered calibration points, sorted descending by brightness.
///
/// Always holds at least one point and no two points share a brightness.
/// A table is immutable once built; a reload builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationTable {
    points: Vec<CalibrationPoint>,
}

impl CalibrationTable {
    /// Builds a table from points in any order.
    pub fn new(mut points: Vec<CalibrationPoint>) -> Result<Self, CalibrationError> {
        if points.is_empty() {
            return Err(CalibrationError::Empty);
        }

        points.sort_by(|a, b| b.brightness.cmp(&a.brightness));

        if let Some(pair) = points
            .windows(2)
            .find(|pair| pair[0].brightness == pair[1].brightness)
        {
            return Err(CalibrationError::DuplicateBrightness {
                brightness: pair[0].brightness,
                first: pair[0].label.clone(),
                second: pair[1].label.clone(),
            });
        }

        Ok(Self { points })
    }

    /// Builds a table from `label -> "<brightness> <lux>"` entries.
    pub fn from_entries<'a, I>(entries: I) -> Result<Self, CalibrationError>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let points = entries
            .into_iter()
            .map(|(label, value)| CalibrationPoint::parse_entry(label, value))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(points)
    }

    /// Converts the table back into `label -> "<brightness> <lux>"` entries.
    pub fn to_entries(&self) -> BTreeMap<String, String> {
        self.points
            .iter()
            .map(|p| (p.label.clone(), p.entry_value()))
            .collect()
    }

    /// Points sorted descending by brightness.
    #[inline]
    pub fn points(&self) -> &[CalibrationPoint] {
        &self.points
    }

    /// Number of points (never zero).
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Default for CalibrationTable {
    /// Logitech C270 in a study, the table the meter ships with.
    fn default() -> Self {
        Self {
            points: vec![
                CalibrationPoint::new(250, "sunlight", 100_000),
                CalibrationPoint::new(160, "daylight", 10_000),
                CalibrationPoint::new(110, "overcast", 1_000),
                CalibrationPoint::new(50, "sunrise_sunset", 400),
                CalibrationPoint::new(20, "dark_overcast", 100),
                CalibrationPoint::new(5, "living_room", 50),
                CalibrationPoint::new(0, "night", 5),
            ],
        }
    }
}

impl fmt::Display for CalibrationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for p in &self.points {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{}={}:{}", p.label, p.brightness, p.lux)?;
        }
        Ok(())
    }
}
