//! # Stage-Gate Mentor
//!
//! A conversational business-idea validator over a generative model. An idea
//! is analyzed once, then coached through the five Stage-Gate stages
//! (Discovery, Scoping, Business Case, Development, Validation) in a
//! streamed mentor dialogue that is re-evaluated after every turn.
//!
//! ## Features
//!
//! - **Idea analysis**: classification, required skills, starting stage and,
//!   in autopilot mode, a simulated market-research bundle
//! - **Streamed mentor replies** with a live preview of the reply's
//!   `message` field and layered recovery from malformed JSON
//! - **Stage evaluation**: best-effort post-turn assessment that moves the
//!   session between stages
//! - **Front ends**: an HTTP API and an interactive terminal chat
//!
//! ## Architecture
//!
//! ```text
//! HTTP / CLI → ConversationOrchestrator → modes → TextGenerator → Gemini (HTTP)
//!                      ↓
//!              Session (caller-owned)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stagegate_mentor::{Config, ConversationOrchestrator, Session, StartRequest};
//! use stagegate_mentor::llm::GeminiClient;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = GeminiClient::new(&config.gemini, config.request.clone())?;
//!     let orchestrator = ConversationOrchestrator::new(Arc::new(client), &config);
//!
//!     let mut session = Session::new();
//!     let cancel = CancellationToken::new();
//!     orchestrator
//!         .start(&mut session, StartRequest::new("Meal kits for students"), &cancel, |_| {})
//!         .await?;
//!     orchestrator
//!         .send(&mut session, "I interviewed 12 students", &cancel, |_| {})
//!         .await?;
//!     Ok(())
//! }
//! ```

/// Interactive terminal front end.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Generative model boundary and the Gemini client.
pub mod llm;
/// Model-backed operations: analysis, evaluation, mentor chat.
pub mod modes;
/// Session orchestration.
pub mod orchestrator;
/// System prompts and prompt directives.
pub mod prompts;
/// HTTP server and request handling.
pub mod server;
/// Session state, transcript and the stage state machine.
pub mod session;
/// Streamed reply preview and finalization.
pub mod stream;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use orchestrator::{ConversationOrchestrator, SessionEvent, StartRequest};
pub use server::{AppState, SharedState};
pub use session::{Phase, Session, Stage};
