//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use proposal_core::ports::{DatabaseService, ProposalGenerationService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Collaborators live behind the core port traits so tests can
/// substitute fakes.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub generator: Arc<dyn ProposalGenerationService>,
    pub config: Arc<Config>,
}
