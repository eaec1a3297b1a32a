//! `pl-domain` — shared types for the Paceline coaching backend.
//!
//! This crate holds everything the other crates agree on:
//! - The shared [`error::Error`] type and `Result` alias.
//! - Structured [`trace::TraceEvent`]s emitted across all crates.
//! - The [`config::Config`] tree with serde defaults and validation.
//! - The core data model: slots, conversations, progress, extraction
//!   results, planning context, and materialized sessions.
//! - The tool-call wire envelope and the closed error-code taxonomy
//!   spoken across the MCP boundary.

pub mod athlete;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extraction;
pub mod plan;
pub mod session;
pub mod slots;
pub mod tool;
pub mod trace;

pub use error::{Error, Result};
