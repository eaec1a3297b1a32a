//! Slot model — the named, typed attributes the controller collects
//! before it may execute a planning tool.
//!
//! Canonical slot values are the only form that ever reaches the planning
//! pipeline or the persistence layer. Raw user text is normalized by the
//! extractor crate; this module only defines the closed vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slot names
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A named attribute the controller may require before executing.
///
/// Ordered (`Ord`) so that slot maps serialize deterministically and
/// "first missing slot" is stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    RaceDistance,
    RaceDate,
    TargetTime,
    WeeklyMileage,
}

impl SlotName {
    /// All known slots, in canonical ask order.
    pub const ALL: [SlotName; 4] = [
        SlotName::RaceDistance,
        SlotName::RaceDate,
        SlotName::TargetTime,
        SlotName::WeeklyMileage,
    ];

    /// The single clarifying question the controller asks for this slot.
    pub fn question(&self) -> &'static str {
        match self {
            SlotName::RaceDistance => "What race distance are you training for?",
            SlotName::RaceDate => "What date is your race?",
            SlotName::TargetTime => "What finish time are you targeting?",
            SlotName::WeeklyMileage => "How many miles per week are you currently running?",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotName::RaceDistance => "race_distance",
            SlotName::RaceDate => "race_date",
            SlotName::TargetTime => "target_time",
            SlotName::WeeklyMileage => "weekly_mileage",
        };
        f.write_str(s)
    }
}

impl FromStr for SlotName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "race_distance" => Ok(SlotName::RaceDistance),
            "race_date" => Ok(SlotName::RaceDate),
            "target_time" => Ok(SlotName::TargetTime),
            "weekly_mileage" => Ok(SlotName::WeeklyMileage),
            other => Err(format!("unknown slot name: {other}")),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Race distances
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Canonical race distance enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceDistance {
    #[serde(rename = "5k")]
    FiveK,
    #[serde(rename = "10k")]
    TenK,
    Half,
    Marathon,
    Ultra,
}

impl RaceDistance {
    /// Race distance in meters (ultra uses the 50k floor).
    pub fn meters(&self) -> f64 {
        match self {
            RaceDistance::FiveK => 5_000.0,
            RaceDistance::TenK => 10_000.0,
            RaceDistance::Half => 21_097.5,
            RaceDistance::Marathon => 42_195.0,
            RaceDistance::Ultra => 50_000.0,
        }
    }

    /// Corpus `race_types` key for this distance.
    pub fn race_type(&self) -> &'static str {
        match self {
            RaceDistance::FiveK => "5k",
            RaceDistance::TenK => "10k",
            RaceDistance::Half => "half",
            RaceDistance::Marathon => "marathon",
            RaceDistance::Ultra => "ultra",
        }
    }
}

impl fmt::Display for RaceDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.race_type())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slot values
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A canonical, validated slot value.
///
/// Serialized with an explicit tag so that progress JSON round-trips
/// byte-for-byte (the progress store relies on this).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    Distance(RaceDistance),
    Date(chrono::NaiveDate),
    /// Target finish time in whole seconds.
    Time(u32),
    /// Weekly mileage in miles.
    Mileage(f64),
}

impl SlotValue {
    /// Human-readable rendering used in assistant responses.
    pub fn render(&self) -> String {
        match self {
            SlotValue::Distance(d) => d.to_string(),
            SlotValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            SlotValue::Time(secs) => format_hms(*secs),
            SlotValue::Mileage(mi) => format!("{mi} mi/week"),
        }
    }

    pub fn as_distance(&self) -> Option<RaceDistance> {
        match self {
            SlotValue::Distance(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<chrono::NaiveDate> {
        match self {
            SlotValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_time_secs(&self) -> Option<u32> {
        match self {
            SlotValue::Time(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_mileage(&self) -> Option<f64> {
        match self {
            SlotValue::Mileage(m) => Some(*m),
            _ => None,
        }
    }
}

/// Format seconds as `HH:MM:SS`.
pub fn format_hms(secs: u32) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
