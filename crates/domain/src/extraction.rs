//! Extraction result — the typed output of the stage-2 attribute
//! extractor, merged into slot progress by the controller.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::slots::{SlotName, SlotValue};

/// The outcome of extracting requested attributes from one user message.
///
/// `values` holds only canonical, validator-approved values. A value that
/// failed its validator lands in `ambiguous_fields` instead; the
/// controller treats ambiguous as missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub values: BTreeMap<SlotName, SlotValue>,
    /// Aggregate self-assessment in `[0, 1]`.
    #[serde(default)]
    pub confidence: f64,
    /// Per-field source substring the value was read from.
    #[serde(default)]
    pub evidence: BTreeMap<SlotName, String>,
    #[serde(default)]
    pub missing_fields: BTreeSet<SlotName>,
    #[serde(default)]
    pub ambiguous_fields: BTreeSet<SlotName>,
}

impl ExtractionResult {
    /// A no-op extraction: everything requested is missing.
    pub fn empty(requested: &[SlotName]) -> Self {
        Self {
            missing_fields: requested.iter().copied().collect(),
            ..Self::default()
        }
    }
}
