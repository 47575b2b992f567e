use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use super::ModeCore;
use crate::error::AppResult;
use crate::llm::{GenerateRequest, GenerationOptions};
use crate::prompts::PROGRESS_PROMPT;
use crate::session::{flatten_transcript, Message, Stage, ValidationReport};
use crate::stream::decode_json;

/// Input parameters for a progress evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressParams {
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default)]
    pub idea: String,
    /// Stage currently recorded for the session
    #[serde(default)]
    pub stage: Stage,
}

/// Re-assesses a transcript against the five-stage rubric.
#[derive(Debug, Clone)]
pub struct StageEvaluator {
    core: ModeCore,
}

impl StageEvaluator {
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Ask the model which stage the transcript supports.
    pub async fn evaluate(
        &self,
        history: &[Message],
        idea: &str,
        stage: Stage,
    ) -> AppResult<ValidationReport> {
        let start = Instant::now();
        debug!(turns = history.len(), stage = %stage, "Evaluating progress");

        let prompt = build_progress_prompt(history, idea, stage);
        let request = GenerateRequest::prompt(prompt, GenerationOptions::json(self.core.generation()));
        let completion = self.core.generator().generate(request).await?;
        let report: ValidationReport = decode_json(&completion, "progress results")?;

        info!(
            recorded_stage = stage.number(),
            reported_stage = report.stage.number(),
            gating_decision = ?report.gating_decision,
            idea_score = ?report.idea_score,
            latency_ms = start.elapsed().as_millis() as u64,
            "Progress evaluation completed"
        );

        Ok(report)
    }
}

/// Progress prompt: rubric, recorded stage, idea and the flattened transcript.
pub fn build_progress_prompt(history: &[Message], idea: &str, stage: Stage) -> String {
    format!(
        "{}\n\nCurrent Stage: {}\nOriginal Idea: \"{}\"\n\nConversation History:\n{}\n",
        PROGRESS_PROMPT,
        stage.number(),
        idea,
        flatten_transcript(history)
    )
}
