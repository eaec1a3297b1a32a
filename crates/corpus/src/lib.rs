//! `pl-corpus` — the read-only retrieval corpus of training doctrine.
//!
//! Corpus documents are markdown files with YAML front-matter. Three
//! document domains exist:
//! - **philosophy** — a training doctrine with intensity-distribution
//!   ranges, hard-day caps, and gating predicates.
//! - **structure** — a 7-day week pattern plus rules, keyed by phase and
//!   days-to-race range.
//! - **template** — parameter-bounded session descriptions keyed by
//!   session type.
//!
//! The [`store::CorpusStore`] is initialized once per process and read
//! concurrently by every pipeline invocation; readers never block.

pub mod document;
pub mod embedding;
pub mod store;
pub mod types;

pub use document::{parse_document, Document, DocumentMeta};
pub use store::CorpusStore;
pub use types::{PhilosophyDoc, SessionTemplate, WeekStructure};
