//! Core infrastructure shared by the model-backed operations.
//!
//! This module provides the [`ModeCore`] struct that centralizes the text
//! generator and sampling configuration used by every mode.

use std::sync::Arc;

use crate::config::GenerationConfig;
use crate::llm::TextGenerator;

/// Core infrastructure shared by the analyzer, evaluator and chat mode.
///
/// Composed into each mode so they all talk to the same generator with the
/// same sampling parameters.
///
/// # Example
///
/// ```ignore
/// pub struct MyMode {
///     core: ModeCore,
/// }
///
/// impl MyMode {
///     pub async fn process(&self, text: &str) -> AppResult<String> {
///         let options = GenerationOptions::json(self.core.generation());
///         let request = GenerateRequest::prompt(text, options);
///         Ok(self.core.generator().generate(request).await?)
///     }
/// }
/// ```
#[derive(Clone)]
pub struct ModeCore {
    /// Model service used for every call.
    generator: Arc<dyn TextGenerator>,
    /// Sampling parameters for chat and JSON calls.
    generation: GenerationConfig,
}

impl ModeCore {
    /// Create a new mode core.
    pub fn new(generator: Arc<dyn TextGenerator>, generation: GenerationConfig) -> Self {
        Self {
            generator,
            generation,
        }
    }

    /// Get a reference to the text generator.
    #[inline]
    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    /// Get the sampling configuration.
    #[inline]
    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }
}

impl std::fmt::Debug for ModeCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeCore")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
