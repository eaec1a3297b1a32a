//! `pl-extractor` — stage-2 attribute extraction.
//!
//! Two layers with a hard boundary between them:
//! - [`normalize`] — pure slot normalizers returning a tagged
//!   [`normalize::Normalized`] (`Value` / `Ambiguous` / `Missing`).
//!   These encode every acceptance rule: season words are ambiguous,
//!   `sub-3` is `03:00:00`, `26.2` is a marathon, unitless mileage only
//!   counts when it was explicitly asked for.
//! - [`extractor`] — the agent that asks the structured-completion
//!   capability to read the message, then runs every returned value
//!   back through the normalizers. Model output is never trusted raw.

pub mod extractor;
pub mod normalize;

pub use extractor::AttributeExtractor;
pub use normalize::{normalize_slot, Normalized};
