//! Corpus document parsing — YAML front-matter delimited by `---`,
//! followed by a free-text body.
//!
//! Required front-matter keys: `id`, `domain`. Common metadata:
//! `race_types`, `audience`, `phase`, `priority`, `version`,
//! `last_reviewed`. Domain-specific blocks: `intensity_distribution` /
//! `gating` (philosophies), `structure_spec` (structures), and
//! `template_spec` / `template_sets` (templates — both spellings are
//! accepted).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pl_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Front-matter model
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Document domain discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentDomain {
    Philosophy,
    Structure,
    Template,
}

/// Parsed front-matter of a corpus document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub domain: DocumentDomain,
    #[serde(default)]
    pub race_types: Vec<String>,
    #[serde(default)]
    pub audience: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reviewed: Option<String>,

    /// Precomputed embedding vector; derived on load when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    // ── philosophy blocks ────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity_distribution: Option<BTreeMap<String, [f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_days_max: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gating: Option<GatingSpec>,

    // ── structure block ──────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_spec: Option<StructureSpec>,

    // ── template blocks (both spellings accepted) ────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_spec: Option<TemplateSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_sets: Vec<TemplateSpec>,
}

/// Gating predicates over athlete tags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatingSpec {
    /// Tags the athlete must carry for this document to apply.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Tags that disqualify this document.
    #[serde(default)]
    pub prohibits: Vec<String>,
}

/// The `structure_spec` block of a week-structure document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSpec {
    pub philosophy_id: String,
    /// Inclusive `[min, max]` days-to-race this structure covers.
    pub days_to_race_range: [i64; 2],
    /// Prefer this structure once days-to-race drops to this value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taper_days_to_race_le: Option<i64>,
    /// Weekday (`mon`..`sun`) → session type.
    pub week_pattern: BTreeMap<String, String>,
    pub rules: StructureRules,
    /// Named groups of session types (`hard`, `easy`, `long`).
    #[serde(default)]
    pub session_groups: BTreeMap<String, Vec<String>>,
}

/// The `rules` block of a structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRules {
    #[serde(default = "d_hard_days_max")]
    pub hard_days_max: u32,
    #[serde(default = "d_true")]
    pub no_consecutive_hard_days: bool,
    #[serde(default)]
    pub long_run: LongRunRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRunRule {
    #[serde(default = "d_one")]
    pub required_count: u32,
}

impl Default for LongRunRule {
    fn default() -> Self {
        Self {
            required_count: d_one(),
        }
    }
}

fn d_hard_days_max() -> u32 {
    2
}

fn d_true() -> bool {
    true
}

fn d_one() -> u32 {
    1
}

/// A `template_spec` / `template_sets` entry of a template document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Defaults to the document id when a document holds a single spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub philosophy_id: String,
    pub session_type: String,
    #[serde(default)]
    pub priority: i64,
    /// Bounded numeric parameters, e.g. `easy_mi_range: [3, 10]`.
    #[serde(default)]
    pub params: BTreeMap<String, [f64; 2]>,
    /// Scalar constraints, e.g. `hard_minutes_max: 45`.
    #[serde(default)]
    pub constraints: BTreeMap<String, f64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Document
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A parsed corpus document: front-matter plus body text.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub meta: DocumentMeta,
    pub body: String,
}

impl Document {
    /// Re-emit the document as markdown with YAML front-matter.
    ///
    /// `parse(doc.to_markdown())` yields a structurally equal document.
    pub fn to_markdown(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.meta)
            .map_err(|e| Error::Other(format!("serializing front-matter: {e}")))?;
        Ok(format!("---\n{yaml}---\n{}", self.body))
    }
}

/// Parse a corpus document from raw markdown.
pub fn parse_document(raw: &str) -> Result<Document> {
    let trimmed = raw.trim_start();
    if !trimmed.starts_with("---") {
        return Err(Error::Validation(
            "corpus document is missing front-matter".into(),
        ));
    }

    let after_open = &trimmed[3..];
    let close_idx = after_open
        .find("\n---")
        .ok_or_else(|| Error::Validation("unterminated front-matter block".into()))?;

    let yaml_str = &after_open[..close_idx];
    let body = after_open[close_idx + 4..]
        .trim_start_matches('\n')
        .to_string();

    let meta: DocumentMeta = serde_yaml::from_str(yaml_str)
        .map_err(|e| Error::Validation(format!("invalid front-matter: {e}")))?;

    Ok(Document { meta, body })
}
