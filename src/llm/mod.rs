//! Boundary to the generative model service.
//!
//! The rest of the crate only sees [`TextGenerator`]: something that turns a
//! prompt into text, either in one piece or as a lazy sequence of fragments.
//! [`GeminiClient`] is the production implementation.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{LlmError, LlmResult};

/// Finite, non-restartable sequence of text fragments from a live reply.
pub type TextStream = BoxStream<'static, LlmResult<String>>;

/// Sampling parameters for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Ask the model for JSON-shaped output
    pub json_output: bool,
}

impl GenerationOptions {
    /// Options for the conversational mentor reply
    pub fn chat(config: &GenerationConfig) -> Self {
        Self {
            max_output_tokens: Some(config.chat_max_output_tokens),
            temperature: Some(config.chat_temperature),
            json_output: true,
        }
    }

    /// Options for one-shot structured calls (analysis, progress)
    pub fn json(config: &GenerationConfig) -> Self {
        Self {
            max_output_tokens: None,
            temperature: Some(config.json_temperature),
            json_output: true,
        }
    }
}

/// A request to the model: conversation entries plus instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Alternating user/model entries; the last one is the live turn
    pub contents: Vec<Content>,
    pub system_instruction: Option<String>,
    pub options: GenerationOptions,
}

impl GenerateRequest {
    /// Single user prompt with no history
    pub fn prompt(text: impl Into<String>, options: GenerationOptions) -> Self {
        Self {
            contents: vec![Content::user(text)],
            system_instruction: None,
            options,
        }
    }

    /// Set the system instruction
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }
}

/// Opaque text generator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce the whole reply at once.
    async fn generate(&self, request: GenerateRequest) -> LlmResult<String>;

    /// Produce the reply incrementally.
    ///
    /// Errors returned here mean no fragment was produced; errors inside the
    /// stream mean the transport failed part-way.
    async fn generate_stream(&self, request: GenerateRequest) -> LlmResult<TextStream>;
}

/// Run `future`, failing with [`LlmError::Timeout`] if it takes longer than `limit`.
pub async fn within<T, Fut>(limit: Duration, future: Fut) -> LlmResult<T>
where
    Fut: Future<Output = LlmResult<T>>,
{
    tokio::time::timeout(limit, future)
        .await
        .unwrap_or_else(|_| Err(timeout_error(limit)))
}

/// End `stream` with [`LlmError::Timeout`] once no fragment arrives for `idle`.
pub fn with_idle_timeout(stream: TextStream, idle: Duration) -> TextStream {
    futures::stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout(idle, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => Some((Err(timeout_error(idle)), None)),
        }
    })
    .boxed()
}

fn timeout_error(limit: Duration) -> LlmError {
    LlmError::Timeout {
        timeout_ms: limit.as_millis() as u64,
    }
}
