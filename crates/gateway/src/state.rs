//! Shared application state passed to all API handlers.

use std::sync::Arc;

use pl_controller::TurnRunner;
use pl_domain::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runner: Arc<TurnRunner>,
}
