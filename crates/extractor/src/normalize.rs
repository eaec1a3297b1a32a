//! Slot normalizers — raw text in, tagged result out.
//!
//! No exceptions, no panics: every outcome is a [`Normalized`] variant.
//! Ambiguity is data, not an error; the controller turns it into a
//! re-ask.

use chrono::{Datelike, NaiveDate};

use pl_domain::slots::{RaceDistance, SlotName, SlotValue};

/// Context a normalizer may need beyond the raw text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext {
    /// The conversation's "today" — anchors all relative date math.
    pub today: Option<NaiveDate>,
    /// Race distance already known from prior slots, used to
    /// disambiguate duration forms.
    pub known_distance: Option<RaceDistance>,
    /// The slot the previous assistant prompt explicitly asked for.
    pub prompted_slot: Option<SlotName>,
}

/// The tagged outcome of normalizing one raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Value(SlotValue),
    Ambiguous(String),
    Missing,
}

/// Normalize a raw extracted string for the given slot.
pub fn normalize_slot(slot: SlotName, raw: &str, ctx: &NormalizeContext) -> Normalized {
    let raw = raw.trim();
    if raw.is_empty() {
        return Normalized::Missing;
    }
    match slot {
        SlotName::RaceDistance => normalize_distance(raw),
        SlotName::RaceDate => normalize_date(raw, ctx),
        SlotName::TargetTime => normalize_target_time(raw, ctx),
        SlotName::WeeklyMileage => normalize_mileage(raw, ctx),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Race distance
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Canonical distance from a synonym. Bare mileage numbers are never a
/// distance — "26 miles" could be a training week, not a race.
pub fn normalize_distance(raw: &str) -> Normalized {
    let lowered = raw.to_lowercase();
    let compact: String = lowered
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let distance = match compact.as_str() {
        "5k" | "5000" | "5km" => Some(RaceDistance::FiveK),
        "10k" | "10000" | "10km" => Some(RaceDistance::TenK),
        "half" | "halfmarathon" | "13.1" | "21k" | "21.1k" => Some(RaceDistance::Half),
        "marathon" | "full" | "fullmarathon" | "26.2" | "42k" | "42.2k" => {
            Some(RaceDistance::Marathon)
        }
        "ultra" | "ultramarathon" | "50k" | "100k" | "50miler" | "100miler" => {
            Some(RaceDistance::Ultra)
        }
        _ => None,
    };

    match distance {
        Some(d) => Normalized::Value(SlotValue::Distance(d)),
        None if compact.chars().all(|c| c.is_ascii_digit() || c == '.') => {
            Normalized::Ambiguous(format!("bare number {raw:?} is not a race distance"))
        }
        None => Normalized::Ambiguous(format!("unrecognized race distance {raw:?}")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Race date
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const SEASON_WORDS: &[&str] = &["spring", "summer", "fall", "autumn", "winter"];
const OPEN_RANGE_WORDS: &[&str] = &["sometime", "someday", "eventually", "later"];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

/// Parse relative and absolute date forms against the conversation's
/// "today". Bare month-days take the next occurrence; season words and
/// open-ended phrasing are ambiguous; past dates are rejected.
pub fn normalize_date(raw: &str, ctx: &NormalizeContext) -> Normalized {
    let Some(today) = ctx.today else {
        return Normalized::Ambiguous("no reference date available".into());
    };

    let lowered = raw.to_lowercase();
    if SEASON_WORDS.iter().any(|s| lowered.contains(s)) {
        return Normalized::Ambiguous(format!("{raw:?} is a season, not a date"));
    }
    if OPEN_RANGE_WORDS.iter().any(|s| lowered.contains(s)) {
        return Normalized::Ambiguous(format!("{raw:?} is open-ended"));
    }

    // Absolute ISO form carries its own year: past dates are invalid.
    if let Ok(date) = lowered.parse::<NaiveDate>() {
        return if date > today {
            Normalized::Value(SlotValue::Date(date))
        } else {
            Normalized::Ambiguous(format!("{date} is not in the future"))
        };
    }

    // Month-day forms ("April 25th", "apr 25", "4/25") take the next
    // occurrence after today.
    if let Some((month, day)) = parse_month_day(&lowered) {
        let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
        let next_year = NaiveDate::from_ymd_opt(today.year() + 1, month, day);
        let candidate = match this_year {
            Some(d) if d > today => Some(d),
            _ => next_year,
        };
        return match candidate {
            Some(d) => Normalized::Value(SlotValue::Date(d)),
            None => Normalized::Ambiguous(format!("{raw:?} is not a calendar day")),
        };
    }

    Normalized::Ambiguous(format!("could not read a date from {raw:?}"))
}

fn parse_month_day(lowered: &str) -> Option<(u32, u32)> {
    // Numeric M/D.
    if let Some((m, d)) = lowered.split_once('/') {
        if let (Ok(month), Ok(day)) = (m.trim().parse::<u32>(), d.trim().parse::<u32>()) {
            if (1..=12).contains(&month) {
                return Some((month, day));
            }
        }
    }

    // "april 25th" / "25 april".
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut month = None;
    let mut day = None;
    for token in tokens {
        if let Some((_, m)) = MONTHS
            .iter()
            .find(|(name, _)| name.starts_with(token) && token.len() >= 3)
        {
            month = Some(*m);
        } else if let Ok(n) = token.trim_end_matches(['s', 't', 'n', 'd', 'r', 'h']).parse::<u32>()
        {
            if (1..=31).contains(&n) {
                day = Some(n);
            }
        }
    }
    month.zip(day)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Target time
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Plausible finish-time windows per distance, in seconds.
fn plausible_window(distance: RaceDistance) -> (u32, u32) {
    match distance {
        RaceDistance::FiveK => (13 * 60, 60 * 60),
        RaceDistance::TenK => (26 * 60, 2 * 3600),
        RaceDistance::Half => (58 * 60, 4 * 3600),
        RaceDistance::Marathon => (2 * 3600, 8 * 3600),
        RaceDistance::Ultra => (5 * 3600 / 2, 20 * 3600),
    }
}

/// `sub-3` → `03:00:00`; `3:15` read as HH:MM when plausible for the
/// known race target, else rejected as ambiguous.
pub fn normalize_target_time(raw: &str, ctx: &NormalizeContext) -> Normalized {
    let lowered = raw.to_lowercase().replace(' ', "");

    // "sub-3", "sub3", "sub-3:30".
    if let Some(rest) = lowered.strip_prefix("sub").map(|r| r.trim_start_matches('-')) {
        let parts: Vec<&str> = rest.split(':').collect();
        let secs = match parts.as_slice() {
            [h] => h.parse::<u32>().ok().map(|h| h * 3600),
            [h, m] => match (h.parse::<u32>(), m.parse::<u32>()) {
                (Ok(h), Ok(m)) if m < 60 => Some(h * 3600 + m * 60),
                _ => None,
            },
            _ => None,
        };
        return match secs {
            Some(s) if s > 0 => Normalized::Value(SlotValue::Time(s)),
            _ => Normalized::Ambiguous(format!("unreadable sub-goal {raw:?}")),
        };
    }

    let parts: Vec<&str> = lowered.split(':').collect();
    match parts.as_slice() {
        [h, m, s] => match (h.parse::<u32>(), m.parse::<u32>(), s.parse::<u32>()) {
            (Ok(h), Ok(m), Ok(s)) if m < 60 && s < 60 => {
                Normalized::Value(SlotValue::Time(h * 3600 + m * 60 + s))
            }
            _ => Normalized::Ambiguous(format!("unreadable time {raw:?}")),
        },
        [a, b] => {
            let (Ok(a), Ok(b)) = (a.parse::<u32>(), b.parse::<u32>()) else {
                return Normalized::Ambiguous(format!("unreadable time {raw:?}"));
            };
            if b >= 60 {
                return Normalized::Ambiguous(format!("{raw:?} has invalid minutes"));
            }
            let Some(distance) = ctx.known_distance else {
                return Normalized::Ambiguous(format!(
                    "{raw:?} could be H:MM or MM:SS without a known distance"
                ));
            };
            let (lo, hi) = plausible_window(distance);
            let as_hours = a * 3600 + b * 60;
            let as_minutes = a * 60 + b;
            if (lo..=hi).contains(&as_hours) {
                Normalized::Value(SlotValue::Time(as_hours))
            } else if (lo..=hi).contains(&as_minutes) {
                Normalized::Value(SlotValue::Time(as_minutes))
            } else {
                Normalized::Ambiguous(format!(
                    "{raw:?} is not a plausible {} finish time",
                    distance.race_type()
                ))
            }
        }
        _ => Normalized::Ambiguous(format!("unreadable time {raw:?}")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Weekly mileage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn mileage_re() -> &'static regex::Regex {
    static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^(\d+(?:\.\d+)?)(mpw|mi/wk|mi/week|miles/week|milesperweek|milesaweek)?$")
            .expect("mileage regex")
    })
}

/// Numeric with a weekly unit. A unitless integer only counts when the
/// preceding prompt explicitly asked for weekly mileage.
pub fn normalize_mileage(raw: &str, ctx: &NormalizeContext) -> Normalized {
    let lowered = raw.to_lowercase().replace(['~', ','], "");
    let compact: String = lowered.split_whitespace().collect();

    let Some(caps) = mileage_re().captures(&compact) else {
        return Normalized::Ambiguous(format!("unreadable mileage {raw:?}"));
    };
    let has_unit = caps.get(2).is_some();
    let Ok(value) = caps[1].parse::<f64>() else {
        return Normalized::Ambiguous(format!("unreadable mileage {raw:?}"));
    };
    if value <= 0.0 || value > 300.0 {
        return Normalized::Ambiguous(format!("{value} is not a plausible weekly mileage"));
    }

    if has_unit || ctx.prompted_slot == Some(SlotName::WeeklyMileage) {
        Normalized::Value(SlotValue::Mileage(value))
    } else {
        Normalized::Ambiguous(format!("{raw:?} has no weekly unit"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(today: &str) -> NormalizeContext {
        NormalizeContext {
            today: Some(today.parse().unwrap()),
            known_distance: None,
            prompted_slot: None,
        }
    }

    // ── distances ────────────────────────────────────────────────────

    #[test]
    fn distance_synonyms_canonicalize() {
        for raw in ["26.2", "full", "Marathon", "marathon"] {
            assert_eq!(
                normalize_distance(raw),
                Normalized::Value(SlotValue::Distance(RaceDistance::Marathon)),
                "{raw}"
            );
        }
        assert_eq!(
            normalize_distance("half marathon"),
            Normalized::Value(SlotValue::Distance(RaceDistance::Half))
        );
        assert_eq!(
            normalize_distance("50k"),
            Normalized::Value(SlotValue::Distance(RaceDistance::Ultra))
        );
    }

    #[test]
    fn bare_mileage_is_not_a_distance() {
        assert!(matches!(normalize_distance("30"), Normalized::Ambiguous(_)));
        assert!(matches!(normalize_distance("26"), Normalized::Ambiguous(_)));
    }

    // ── dates ────────────────────────────────────────────────────────

    #[test]
    fn bare_month_day_takes_next_occurrence() {
        let got = normalize_date("April 25th", &ctx("2026-01-10"));
        assert_eq!(
            got,
            Normalized::Value(SlotValue::Date("2026-04-25".parse().unwrap()))
        );

        // Already past this year → next year.
        let got = normalize_date("April 25", &ctx("2026-06-01"));
        assert_eq!(
            got,
            Normalized::Value(SlotValue::Date("2027-04-25".parse().unwrap()))
        );
    }

    #[test]
    fn numeric_month_day_parses() {
        let got = normalize_date("4/25", &ctx("2026-01-10"));
        assert_eq!(
            got,
            Normalized::Value(SlotValue::Date("2026-04-25".parse().unwrap()))
        );
    }

    #[test]
    fn season_words_are_ambiguous() {
        assert!(matches!(
            normalize_date("in the spring", &ctx("2026-01-10")),
            Normalized::Ambiguous(_)
        ));
        assert!(matches!(
            normalize_date("sometime next fall", &ctx("2026-01-10")),
            Normalized::Ambiguous(_)
        ));
    }

    #[test]
    fn past_iso_date_is_rejected() {
        assert!(matches!(
            normalize_date("2025-04-25", &ctx("2026-01-10")),
            Normalized::Ambiguous(_)
        ));
    }

    // ── target times ─────────────────────────────────────────────────

    #[test]
    fn sub_three_is_three_hours() {
        assert_eq!(
            normalize_target_time("sub-3", &NormalizeContext::default()),
            Normalized::Value(SlotValue::Time(3 * 3600))
        );
        assert_eq!(
            normalize_target_time("sub 3:30", &NormalizeContext::default()),
            Normalized::Value(SlotValue::Time(3 * 3600 + 30 * 60))
        );
    }

    #[test]
    fn two_part_time_uses_known_distance() {
        let marathon = NormalizeContext {
            known_distance: Some(RaceDistance::Marathon),
            ..Default::default()
        };
        assert_eq!(
            normalize_target_time("3:15", &marathon),
            Normalized::Value(SlotValue::Time(3 * 3600 + 15 * 60))
        );

        let five_k = NormalizeContext {
            known_distance: Some(RaceDistance::FiveK),
            ..Default::default()
        };
        assert_eq!(
            normalize_target_time("19:30", &five_k),
            Normalized::Value(SlotValue::Time(19 * 60 + 30))
        );
    }

    #[test]
    fn two_part_time_without_distance_is_ambiguous() {
        assert!(matches!(
            normalize_target_time("3:15", &NormalizeContext::default()),
            Normalized::Ambiguous(_)
        ));
    }

    #[test]
    fn implausible_time_is_ambiguous() {
        let marathon = NormalizeContext {
            known_distance: Some(RaceDistance::Marathon),
            ..Default::default()
        };
        assert!(matches!(
            normalize_target_time("19:30", &marathon),
            Normalized::Ambiguous(_)
        ));
    }

    // ── weekly mileage ───────────────────────────────────────────────

    #[test]
    fn mileage_with_unit_parses() {
        assert_eq!(
            normalize_mileage("~55 mpw", &NormalizeContext::default()),
            Normalized::Value(SlotValue::Mileage(55.0))
        );
        assert_eq!(
            normalize_mileage("40 miles/week", &NormalizeContext::default()),
            Normalized::Value(SlotValue::Mileage(40.0))
        );
    }

    #[test]
    fn unitless_mileage_needs_a_prompt() {
        assert!(matches!(
            normalize_mileage("55", &NormalizeContext::default()),
            Normalized::Ambiguous(_)
        ));

        let prompted = NormalizeContext {
            prompted_slot: Some(SlotName::WeeklyMileage),
            ..Default::default()
        };
        assert_eq!(
            normalize_mileage("55", &prompted),
            Normalized::Value(SlotValue::Mileage(55.0))
        );
    }

    #[test]
    fn empty_input_is_missing() {
        assert_eq!(
            normalize_slot(SlotName::RaceDate, "  ", &NormalizeContext::default()),
            Normalized::Missing
        );
    }
}
