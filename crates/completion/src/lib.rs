//! `pl-completion` — the abstract structured-completion capability.
//!
//! The controller, extractor, and session-text stage never talk to a
//! model provider directly. They describe the shape they need with a
//! [`schema::Schema`], call a [`CompletionProvider`], and get back JSON
//! that has already passed schema validation. Provider mechanics
//! (transport, models, keys) live behind the trait and out of scope.

pub mod provider;
pub mod schema;
pub mod scripted;

pub use provider::{complete_validated, CompletionProvider, StructuredRequest};
pub use schema::{FieldType, Schema};
pub use scripted::ScriptedProvider;
