use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ModeCore;
use crate::error::LlmResult;
use crate::llm::{Content, ContentRole, GenerateRequest, GenerationOptions, TextStream};
use crate::prompts::MENTOR_SYSTEM_PROMPT;
use crate::session::{merge_history, Message, MERGE_SEPARATOR};

/// Input parameters for one mentor turn
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatParams {
    /// The live user turn
    #[serde(default)]
    pub message: String,
    /// Prior transcript, not including `message`
    #[serde(default)]
    pub history: Vec<Message>,
}

/// Streams mentor replies.
#[derive(Debug, Clone)]
pub struct ChatMode {
    core: ModeCore,
}

impl ChatMode {
    pub fn new(core: ModeCore) -> Self {
        Self { core }
    }

    /// Open a streamed reply to `message` given the prior `history`.
    pub async fn stream_reply(&self, message: &str, history: &[Message]) -> LlmResult<TextStream> {
        let request = self.build_request(message, history);
        debug!(
            history_turns = history.len(),
            contents = request.contents.len(),
            "Opening mentor reply stream"
        );
        self.core.generator().generate_stream(request).await
    }

    /// Mentor request: merged history, then the live turn.
    ///
    /// A history that already ends with a user turn (an earlier reply that
    /// never arrived) absorbs the live turn so roles still alternate.
    pub fn build_request(&self, message: &str, history: &[Message]) -> GenerateRequest {
        let mut contents = merge_history(history);
        match contents.last_mut() {
            Some(last) if last.role == ContentRole::User => {
                last.text.push_str(MERGE_SEPARATOR);
                last.text.push_str(message);
            }
            _ => contents.push(Content::user(message)),
        }

        GenerateRequest {
            contents,
            system_instruction: Some(MENTOR_SYSTEM_PROMPT.to_string()),
            options: GenerationOptions::chat(self.core.generation()),
        }
    }
}
