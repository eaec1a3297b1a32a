//! Athlete profile — stable identity plus training preferences.
//!
//! Immutable for the lifetime of a conversation; the controller loads it
//! once per turn through the tool boundary.

use serde::{Deserialize, Serialize};

/// Preferred units for distances shown to the athlete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Miles,
    Kilometers,
}

/// An athlete's stable profile and training preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub units: Units,
    /// IANA timezone name, carried opaquely.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Race-goal pace in seconds per mile. All derived paces come from
    /// this value, never from free text.
    #[serde(default)]
    pub goal_pace_secs_per_mile: Option<u32>,
    /// Free-form tags consumed by philosophy gating predicates
    /// (e.g. `"injury_prone"`, `"masters"`, `"high_mileage"`).
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_timezone() -> String {
    "UTC".to_owned()
}

impl AthleteProfile {
    /// A minimal profile for an unknown athlete.
    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: String::new(),
            units: Units::Miles,
            timezone: default_timezone(),
            goal_pace_secs_per_mile: None,
            tags: Vec::new(),
        }
    }
}
