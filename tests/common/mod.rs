//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stagegate_mentor::error::{LlmError, LlmResult};
use stagegate_mentor::llm::{GenerateRequest, TextGenerator, TextStream};

/// One scripted stream: its fragments, then optionally a mid-stream failure.
pub struct StreamScript {
    pub fragments: Vec<String>,
    pub failure: Option<LlmError>,
    /// How long opening the stream takes
    pub open_delay: Option<Duration>,
}

impl StreamScript {
    pub fn chunks(parts: &[&str]) -> Self {
        Self {
            fragments: parts.iter().map(|p| p.to_string()).collect(),
            failure: None,
            open_delay: None,
        }
    }

    pub fn failing_after(parts: &[&str], failure: LlmError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::chunks(parts)
        }
    }

    /// A stream whose opening request does not answer for `delay`.
    pub fn stalled(delay: Duration) -> Self {
        Self {
            open_delay: Some(delay),
            ..Self::chunks(&[])
        }
    }
}

/// A [`TextGenerator`] that plays back queued replies in order and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<LlmResult<String>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, text: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn reply_err(&self, err: LlmError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn stream(&self, script: StreamScript) -> &Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> GenerateRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: GenerateRequest) -> LlmResult<String> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidResponse {
                    message: "no scripted reply".to_string(),
                })
            })
    }

    async fn generate_stream(&self, request: GenerateRequest) -> LlmResult<TextStream> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "no scripted stream".to_string(),
            })?;

        if let Some(delay) = script.open_delay {
            tokio::time::sleep(delay).await;
        }

        let mut items: Vec<LlmResult<String>> = script.fragments.into_iter().map(Ok).collect();
        if let Some(failure) = script.failure {
            items.push(Err(failure));
        }
        Ok(futures::stream::iter(items).boxed())
    }
}

pub fn analysis_json(starting_stage: u8) -> String {
    format!(
        r#"{{"ideaType": "service", "initialAssessment": "Promising but unproven.", "requiredSkills": ["Sales"], "mentors": [{{"name": "Ada", "role": "Operator", "expertise": "Logistics"}}], "startingStage": {}}}"#,
        starting_stage
    )
}

pub fn report_json(stage: u8) -> String {
    format!(
        r#"{{"stage": {}, "stageName": "Stage", "ideaScore": 62, "confidence": 70, "gatingDecision": "proceed", "summary": "Moving along."}}"#,
        stage
    )
}

pub fn mentor_reply(message: &str, suggestions: &[&str]) -> String {
    serde_json::json!({ "message": message, "suggestions": suggestions }).to_string()
}
