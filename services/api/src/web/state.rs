//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::ai::AiPipeline;
use crate::config::Config;
use careprep_core::ports::{FileStore, RecordStore, TokenVerifier};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Everything in here is an injected handle; no per-request
/// mutable state lives at this level.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub files: Arc<dyn FileStore>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub ai: Arc<AiPipeline>,
    pub config: Arc<Config>,
}
