//! `pl-gateway` — the `paceline` binary: config loading and validation,
//! subsystem bootstrap, and the small HTTP surface that feeds user
//! turns into the controller.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod heuristics;
pub mod state;
