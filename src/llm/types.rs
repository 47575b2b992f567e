use serde::{Deserialize, Serialize};

/// Role tag of one conversation entry as the model API expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRole {
    User,
    Model,
}

/// One conversation entry sent to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: ContentRole,
    pub text: String,
}

impl Content {
    /// Create a user entry
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::User,
            text: text.into(),
        }
    }

    /// Create a model entry
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ContentRole::Model,
            text: text.into(),
        }
    }
}

// ============================================================================
// Gemini wire format
// ============================================================================

/// Body of `generateContent` / `streamGenerateContent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,
    pub generation_config: WireGenerationConfig,
}

/// A role-tagged list of parts
#[derive(Debug, Clone, Serialize)]
pub struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<WirePart>,
}

/// A text part
#[derive(Debug, Clone, Serialize)]
pub struct WirePart {
    pub text: String,
}

/// Sampling parameters
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

/// Response (or one streamed event) from the Gemini API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartResponse {
    #[serde(default)]
    pub text: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

/// Error envelope returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorWrapper {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl WireContent {
    pub fn from_content(content: &Content) -> Self {
        let role = match content.role {
            ContentRole::User => "user",
            ContentRole::Model => "model",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![WirePart {
                text: content.text.clone(),
            }],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![WirePart { text: text.into() }],
        }
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, `None` if it carries no text
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.as_ref()?.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl ErrorBody {
    /// Human readable summary (`STATUS: message`)
    pub fn describe(&self) -> String {
        match (&self.status, &self.message) {
            (Some(status), Some(message)) => format!("{}: {}", status, message),
            (None, Some(message)) => message.clone(),
            (Some(status), None) => status.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}
