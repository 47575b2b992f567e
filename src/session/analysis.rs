use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::Stage;

/// Broad category of the idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdeaType {
    Tech,
    Physical,
    Service,
}

/// Coarse High/Medium/Low rating used across the market-intelligence fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

/// Initial structured analysis of an idea, produced once per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaAnalysis {
    pub idea_type: IdeaType,
    pub initial_assessment: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub mentors: Vec<Mentor>,
    /// As reported by the model; see [`IdeaAnalysis::starting_stage`]
    #[serde(default, rename = "startingStage")]
    pub reported_starting_stage: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_snapshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<Risk>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitors: Option<Vec<Competitor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_gaps: Option<Vec<MarketGap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_size: Option<MarketSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_segments: Option<Vec<CustomerSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_model: Option<RevenueModel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gtm_strategy: Option<GtmStrategy>,
}

impl IdeaAnalysis {
    /// Starting stage, falling back to Discovery when absent or out of range.
    pub fn starting_stage(&self) -> Stage {
        self.reported_starting_stage
            .and_then(Stage::from_reported)
            .unwrap_or(Stage::FIRST)
    }

    /// Whether the autopilot market-intelligence bundle is present.
    pub fn has_market_intelligence(&self) -> bool {
        self.market_snapshot.is_some()
            || self.competitors.is_some()
            || self.market_size.is_some()
            || self.market_gaps.is_some()
    }
}

/// Candidate team member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mentor {
    pub name: String,
    /// Role on the team, e.g. "Technical Lead"
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub expertise: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f64>,
}

/// A risk as the model reported it: either a bare sentence or a full record.
///
/// The shape is decided once here, so rendering never has to inspect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Risk {
    Simple(String),
    Detailed(DetailedRisk),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedRisk {
    pub risk: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub impact: Option<Level>,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub mitigation_strategy: String,
}

impl Risk {
    /// The one-line headline of the risk
    pub fn headline(&self) -> &str {
        match self {
            Risk::Simple(text) => text,
            Risk::Detailed(detail) => &detail.risk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub name: String,
    #[serde(default)]
    pub strength: String,
    #[serde(default)]
    pub weakness: String,
    #[serde(default)]
    pub price_point: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketGap {
    pub gap: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub demand_level: Option<Level>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub existing_poor_solution: String,
    #[serde(default)]
    pub source: String,
}

/// TAM / SAM / SOM breakdown with growth rate, as free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSize {
    pub tam: String,
    pub sam: String,
    pub som: String,
    pub cagr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSegment {
    pub segment: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pain: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub willingness_to_pay: Option<Level>,
    #[serde(default)]
    pub acquisition_channels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueModel {
    pub model: String,
    #[serde(default)]
    pub pricing_strategy: String,
    #[serde(default)]
    pub margin_estimate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GtmStrategy {
    pub strategy: String,
    #[serde(default)]
    pub tactics: Vec<String>,
}

/// The evaluator's recommendation for the stage gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatingDecision {
    #[serde(alias = "Proceed", alias = "PROCEED")]
    Proceed,
    #[serde(alias = "Iterate", alias = "ITERATE")]
    Iterate,
    #[serde(alias = "Pause", alias = "PAUSE")]
    Pause,
}

/// Relative effort of an action item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effort {
    #[serde(alias = "s")]
    S,
    #[serde(alias = "m")]
    M,
    #[serde(alias = "l")]
    L,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner_role: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub effort: Option<Effort>,
    #[serde(default)]
    pub due_in_days: u32,
}

/// One Stage-Gate re-assessment of the transcript.
///
/// Only `stage` is required; the rest is display material and decodes
/// leniently so a sloppy field never costs the stage update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub stage: Stage,
    #[serde(default)]
    pub stage_name: String,
    /// 0-100
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub idea_score: Option<f64>,
    /// 0-100
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gating_decision: Option<GatingDecision>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_assumptions: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default)]
    pub evidence_needed: Vec<String>,
    #[serde(default)]
    pub next_actions: Vec<ActionItem>,
}

/// Decode an optional display field, treating a value of the wrong shape
/// as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}
