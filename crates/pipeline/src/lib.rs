//! `pl-pipeline` — deterministic plan materialization.
//!
//! Each stage is a pure function of its inputs plus the retrieval
//! corpus; stages never mutate earlier outputs. Guards run between
//! stages and abort the pipeline with the first violation — there is no
//! retry and no repair loop. The only side effects are in the final
//! persistence stage, which writes through the tool boundary in one
//! idempotent call.
//!
//! Stage order:
//! 1. [`macro_plan`] — week records with phase and target volume
//! 2. [`philosophy`] — deterministic doctrine selection
//! 3. [`structure`] — week-structure loading per macro week
//! 4. [`volume`] — day-level volume allocation
//! 5. [`template`] — session-template selection + parameter fit
//! 6. [`session_text`] — description + workout steps (validated
//!    completion with deterministic fallback)
//! 7. [`persist`] — idempotent calendar persistence

pub mod guards;
pub mod macro_plan;
pub mod persist;
pub mod philosophy;
pub mod pipeline;
pub mod session_text;
pub mod structure;
pub mod template;
pub mod volume;

pub use pipeline::{PlanOutcome, PlanningPipeline};
