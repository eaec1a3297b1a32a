//! `pl-controller` — the execution controller.
//!
//! A constrained agent: for every user turn, exactly one of three
//! outcomes holds — fill-and-ask (one question for the first missing
//! slot), execute (invoke the planning pipeline), or an informational
//! reply when no target action exists. Schema-level response validators
//! enforce the constraint; a validator rejection is recovered locally
//! with a deterministic fallback question.
//!
//! Turns for one conversation are strictly serialized; everything the
//! controller reads or writes travels through the tool boundary.

pub mod classify;
pub mod execute;
pub mod locks;
pub mod machine;
pub mod store;
pub mod turn;
pub mod validate;

pub use machine::{Decision, TurnDecision};
pub use turn::{TurnInput, TurnKind, TurnOutcome, TurnRunner};
