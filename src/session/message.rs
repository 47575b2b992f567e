use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The entrepreneur.
    User,
    /// The mentor model (or a synthetic announcement).
    Assistant,
}

impl Role {
    /// Upper-case label used when flattening a transcript into prompt text.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    #[serde(default = "new_message_id")]
    pub id: String,
    /// Author of the turn.
    pub role: Role,
    /// Display text. Only the in-flight assistant message changes after creation.
    pub content: String,
    /// Short suggested replies, set on assistant turns once finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    /// When the turn was created.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_message_id(),
            role,
            content: content.into(),
            suggestions: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant turn
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Synthetic assistant turn announcing a stage change.
    pub fn stage_announcement(from: Stage, to: Stage) -> Self {
        let content = if to > from {
            format!(
                "\u{1f389} **Congratulations!** You've moved forward to the **{}** stage.",
                to.name()
            )
        } else {
            format!(
                "\u{1f504} **Back to the {} stage.** The latest evidence points to gaps in earlier work; let's revisit it before moving on.",
                to.name()
            )
        };
        Self::assistant(content)
    }

    /// Set the suggested replies
    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = Some(suggestions);
        self
    }
}

/// How a session validates the idea.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Step-by-step Socratic coaching.
    #[default]
    Guided,
    /// One-shot simulated research and team matching.
    Autopilot,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Guided => "guided",
            Mode::Autopilot => "autopilot",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guided" => Ok(Mode::Guided),
            "autopilot" => Ok(Mode::Autopilot),
            _ => Err(format!("Unknown mode: {}", s)),
        }
    }
}

/// A Stage-Gate stage, always in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Stage(u8);

const STAGE_NAMES: [&str; 5] = [
    "Discovery",
    "Scoping",
    "Business Case",
    "Development",
    "Validation",
];

const STAGE_FOCUS: [&str; 5] = [
    "Problem validation: who is the customer, what is the pain, what evidence exists",
    "Solution validation: what is the MVP and how will it be prototyped",
    "Market validation: market size, pricing, competitors",
    "Business model: cost structure, operations, go-to-market",
    "Traction: real metrics, sales, retention",
];

impl Stage {
    /// Discovery
    pub const FIRST: Stage = Stage(1);
    /// Validation; reaching it completes the session
    pub const FINAL: Stage = Stage(5);

    /// `None` unless `number` is in 1..=5
    pub fn new(number: u8) -> Option<Self> {
        (1..=5).contains(&number).then_some(Stage(number))
    }

    /// Lenient conversion from any integer the model might report
    pub fn from_reported(number: i64) -> Option<Self> {
        u8::try_from(number).ok().and_then(Stage::new)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn name(&self) -> &'static str {
        STAGE_NAMES[usize::from(self.0 - 1)]
    }

    /// What this stage asks the entrepreneur to validate
    pub fn focus(&self) -> &'static str {
        STAGE_FOCUS[usize::from(self.0 - 1)]
    }

    pub fn is_final(&self) -> bool {
        *self == Stage::FINAL
    }

    /// All five stages in order
    pub fn all() -> impl Iterator<Item = Stage> {
        (1..=5).map(Stage)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::FIRST
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Stage::new(value).ok_or_else(|| format!("Stage must be between 1 and 5, got {}", value))
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.0
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}
