use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::ModeCore;
use crate::error::{AppResult, SessionError};
use crate::llm::{GenerateRequest, GenerationOptions};
use crate::prompts::{autopilot_analysis_directive, ANALYSIS_PROMPT};
use crate::session::{IdeaAnalysis, Mode, Stage};
use crate::stream::decode_json;

/// Input parameters for idea analysis
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeParams {
    /// The idea text; blank is rejected
    #[serde(default)]
    pub idea: String,
    #[serde(default)]
    pub mode: Mode,
    /// Target market for autopilot research
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl AnalyzeParams {
    /// Create new params for a guided analysis
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            ..Self::default()
        }
    }

    /// Set the mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the target region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Classifies an idea and, in autopilot mode, fabricates the market research
/// bundle.
#[derive(Debug, Clone)]
pub struct IdeaAnalyzer {
    core: ModeCore,
}

impl IdeaAnalyzer {
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Analyze an idea.
    ///
    /// A reply that does not decode is an error; there is nothing partial to
    /// fall back to for a one-shot call.
    pub async fn analyze(&self, params: &AnalyzeParams) -> AppResult<IdeaAnalysis> {
        let start = Instant::now();

        let idea = params.idea.trim();
        if idea.is_empty() {
            return Err(SessionError::Validation {
                field: "idea".to_string(),
                reason: "Idea is required".to_string(),
            }
            .into());
        }

        debug!(mode = %params.mode, region = ?params.region, "Analyzing idea");

        let prompt = build_analysis_prompt(idea, params.mode, params.region.as_deref());
        let request = GenerateRequest::prompt(prompt, GenerationOptions::json(self.core.generation()));
        let completion = self.core.generator().generate(request).await?;

        let mut analysis: IdeaAnalysis = decode_json(&completion, "analysis results")?;
        if params.mode == Mode::Autopilot && analysis.reported_starting_stage.is_none() {
            analysis.reported_starting_stage = Some(i64::from(Stage::FINAL.number()));
        }

        info!(
            idea_type = ?analysis.idea_type,
            starting_stage = analysis.starting_stage().number(),
            market_intelligence = analysis.has_market_intelligence(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Idea analysis completed"
        );

        Ok(analysis)
    }
}

/// Analysis prompt for an idea, with the autopilot addendum when requested.
pub fn build_analysis_prompt(idea: &str, mode: Mode, region: Option<&str>) -> String {
    let mut prompt = format!("{}\n\nUser Idea: \"{}\"", ANALYSIS_PROMPT, idea);
    if mode == Mode::Autopilot {
        prompt.push_str("\n\n");
        prompt.push_str(&autopilot_analysis_directive(region));
    }
    prompt
}
