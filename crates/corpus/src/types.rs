//! Typed corpus views built from parsed documents at load time.

use std::collections::{BTreeMap, BTreeSet};

use pl_domain::error::{Error, Result};
use pl_domain::session::Intent;

use crate::document::{Document, DocumentDomain, GatingSpec, StructureRules, TemplateSpec};
use crate::embedding;

/// Weekday order used by `week_pattern` keys.
pub const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Philosophy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A training doctrine with gating metadata and a ranking embedding.
#[derive(Debug, Clone)]
pub struct PhilosophyDoc {
    pub id: String,
    pub race_types: Vec<String>,
    pub audience: Vec<String>,
    pub phase: Option<String>,
    pub priority: i64,
    pub intensity_distribution: BTreeMap<String, [f64; 2]>,
    pub hard_days_max: u32,
    pub gating: GatingSpec,
    pub embedding: Vec<f32>,
}

impl PhilosophyDoc {
    pub fn from_document(doc: &Document) -> Result<Self> {
        if doc.meta.domain != DocumentDomain::Philosophy {
            return Err(Error::Validation(format!(
                "document {} is not a philosophy",
                doc.meta.id
            )));
        }
        Ok(Self {
            id: doc.meta.id.clone(),
            race_types: doc.meta.race_types.clone(),
            audience: doc.meta.audience.clone(),
            phase: doc.meta.phase.clone(),
            priority: doc.meta.priority,
            intensity_distribution: doc.meta.intensity_distribution.clone().unwrap_or_default(),
            hard_days_max: doc.meta.hard_days_max.unwrap_or(2),
            gating: doc.meta.gating.clone().unwrap_or_default(),
            embedding: doc
                .meta
                .embedding
                .clone()
                .unwrap_or_else(|| embedding::embed(&doc.body)),
        })
    }

    /// Gating check: `requires` must all be present in the athlete's
    /// tags, `prohibits` must not intersect them.
    pub fn admits(&self, athlete_tags: &[String]) -> bool {
        let tags: BTreeSet<&str> = athlete_tags.iter().map(String::as_str).collect();
        self.gating.requires.iter().all(|r| tags.contains(r.as_str()))
            && !self.gating.prohibits.iter().any(|p| tags.contains(p.as_str()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Week structure
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A 7-day week pattern plus rules, resolved for ranking and intent.
///
/// Hard-group members are mapped to intent `quality` here, at load time:
/// intent is the canonical definition of a hard day everywhere downstream.
#[derive(Debug, Clone)]
pub struct WeekStructure {
    pub id: String,
    pub philosophy_id: String,
    pub race_types: Vec<String>,
    pub audience: Vec<String>,
    pub phase: String,
    pub priority: i64,
    pub days_to_race_range: [i64; 2],
    pub taper_days_to_race_le: Option<i64>,
    /// Session type per weekday, `mon` first.
    pub pattern: [String; 7],
    pub rules: StructureRules,
    long_types: BTreeSet<String>,
    hard_types: BTreeSet<String>,
}

impl WeekStructure {
    pub fn from_document(doc: &Document) -> Result<Self> {
        let spec = doc.meta.structure_spec.as_ref().ok_or_else(|| {
            Error::Validation(format!("document {} has no structure_spec", doc.meta.id))
        })?;

        let mut pattern: [String; 7] = Default::default();
        for (i, day) in WEEKDAYS.iter().enumerate() {
            let session_type = spec.week_pattern.get(*day).ok_or_else(|| {
                Error::Validation(format!(
                    "structure {} is missing week_pattern.{day}",
                    doc.meta.id
                ))
            })?;
            pattern[i] = session_type.clone();
        }

        let group = |name: &str| -> BTreeSet<String> {
            spec.session_groups
                .get(name)
                .map(|v| v.iter().cloned().collect())
                .unwrap_or_default()
        };

        Ok(Self {
            id: doc.meta.id.clone(),
            philosophy_id: spec.philosophy_id.clone(),
            race_types: doc.meta.race_types.clone(),
            audience: doc.meta.audience.clone(),
            phase: doc.meta.phase.clone().unwrap_or_default(),
            priority: doc.meta.priority,
            days_to_race_range: spec.days_to_race_range,
            taper_days_to_race_le: spec.taper_days_to_race_le,
            pattern,
            rules: spec.rules.clone(),
            long_types: group("long"),
            hard_types: group("hard"),
        })
    }

    /// Canonical intent for a session type within this structure.
    pub fn intent_for(&self, session_type: &str) -> Intent {
        if session_type == "rest" {
            Intent::Rest
        } else if self.hard_types.contains(session_type) {
            Intent::Quality
        } else if self.long_types.contains(session_type) {
            Intent::Long
        } else {
            Intent::Easy
        }
    }

    /// Whether this structure covers the given distance-to-race.
    pub fn covers(&self, days_to_race: i64) -> bool {
        days_to_race >= self.days_to_race_range[0] && days_to_race <= self.days_to_race_range[1]
    }

    /// Taper preference: true when the structure declares a taper bound
    /// and the week is inside it.
    pub fn prefers_taper(&self, days_to_race: i64) -> bool {
        self.taper_days_to_race_le
            .is_some_and(|le| days_to_race <= le)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session template
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One parameter-bounded session description.
#[derive(Debug, Clone)]
pub struct SessionTemplate {
    pub id: String,
    pub philosophy_id: String,
    pub race_types: Vec<String>,
    pub audience: Vec<String>,
    pub phase: String,
    pub session_type: String,
    pub priority: i64,
    pub params: BTreeMap<String, [f64; 2]>,
    pub constraints: BTreeMap<String, f64>,
    pub body: String,
}

impl SessionTemplate {
    /// Expand a template document into its specs (single `template_spec`
    /// or a `template_sets` list).
    pub fn from_document(doc: &Document) -> Result<Vec<Self>> {
        let mut specs: Vec<(usize, &TemplateSpec)> = Vec::new();
        if let Some(spec) = &doc.meta.template_spec {
            specs.push((0, spec));
        }
        for (i, spec) in doc.meta.template_sets.iter().enumerate() {
            specs.push((i, spec));
        }
        if specs.is_empty() {
            return Err(Error::Validation(format!(
                "document {} has no template_spec or template_sets",
                doc.meta.id
            )));
        }

        Ok(specs
            .into_iter()
            .map(|(i, spec)| Self {
                id: spec
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("{}:{}", doc.meta.id, i)),
                philosophy_id: spec.philosophy_id.clone(),
                race_types: doc.meta.race_types.clone(),
                audience: doc.meta.audience.clone(),
                phase: doc.meta.phase.clone().unwrap_or_default(),
                session_type: spec.session_type.clone(),
                priority: spec.priority,
                params: spec.params.clone(),
                constraints: spec.constraints.clone(),
                body: doc.body.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_document;

    const STRUCTURE: &str = r#"---
id: s1
domain: structure
race_types: [marathon]
audience: [intermediate]
phase: build
structure_spec:
  philosophy_id: p1
  days_to_race_range: [22, 84]
  taper_days_to_race_le: 21
  week_pattern:
    mon: rest
    tue: intervals
    wed: easy_run
    thu: tempo
    fri: easy_run
    sat: long_run
    sun: easy_run
  rules:
    hard_days_max: 2
    no_consecutive_hard_days: true
    long_run:
      required_count: 1
  session_groups:
    hard: [intervals, tempo]
    easy: [easy_run]
    long: [long_run]
---
body
"#;

    #[test]
    fn hard_group_maps_to_quality_intent() {
        let doc = parse_document(STRUCTURE).unwrap();
        let ws = WeekStructure::from_document(&doc).unwrap();
        assert_eq!(ws.intent_for("intervals"), Intent::Quality);
        assert_eq!(ws.intent_for("tempo"), Intent::Quality);
        assert_eq!(ws.intent_for("long_run"), Intent::Long);
        assert_eq!(ws.intent_for("easy_run"), Intent::Easy);
        assert_eq!(ws.intent_for("rest"), Intent::Rest);
    }

    #[test]
    fn covers_and_taper_preference() {
        let doc = parse_document(STRUCTURE).unwrap();
        let ws = WeekStructure::from_document(&doc).unwrap();
        assert!(ws.covers(30));
        assert!(!ws.covers(90));
        assert!(ws.prefers_taper(14));
        assert!(!ws.prefers_taper(40));
    }

    #[test]
    fn gating_requires_and_prohibits() {
        let doc = parse_document(
            r#"---
id: p1
domain: philosophy
race_types: [marathon]
audience: [advanced]
gating:
  requires: [high_mileage]
  prohibits: [injury_prone]
---
body
"#,
        )
        .unwrap();
        let p = PhilosophyDoc::from_document(&doc).unwrap();
        assert!(p.admits(&["high_mileage".into()]));
        assert!(!p.admits(&[]));
        assert!(!p.admits(&["high_mileage".into(), "injury_prone".into()]));
    }
}
