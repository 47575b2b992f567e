//! HTTP interface.
//!
//! This module provides:
//! - The three JSON endpoints the web front end calls (`/api/analyze`,
//!   `/api/chat`, `/api/progress`) plus a health check
//! - Shared application state management
//!
//! The server is stateless per request: session state lives in the client,
//! which sends the transcript with every call.

mod handlers;
mod http;

pub use handlers::*;
pub use http::*;

use std::sync::Arc;

use crate::config::Config;
use crate::llm::TextGenerator;
use crate::modes::{ChatMode, IdeaAnalyzer, ModeCore, StageEvaluator};

/// Application state shared across handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Idea analysis handler.
    pub analyzer: IdeaAnalyzer,
    /// Progress evaluation handler.
    pub evaluator: StageEvaluator,
    /// Mentor chat handler.
    pub chat: ChatMode,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        tracing::info!(
            model = %config.gemini.model,
            chat_max_output_tokens = config.generation.chat_max_output_tokens,
            "Building application state"
        );

        let core = ModeCore::new(generator, config.generation.clone());
        Self {
            analyzer: IdeaAnalyzer::new(core.clone()),
            evaluator: StageEvaluator::new(core.clone()),
            chat: ChatMode::new(core),
            config,
        }
    }
}

/// Thread-safe shared state
pub type SharedState = Arc<AppState>;
