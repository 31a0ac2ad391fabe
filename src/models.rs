use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Flexible integer deserializer to handle string, float, or int inputs from different MCP clients
fn deserialize_flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        String(String),
    }

    let value = match FlexibleInt::deserialize(deserializer)? {
        FlexibleInt::Int(i) => i,
        FlexibleInt::Float(f) => f as i64,
        FlexibleInt::String(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom)?,
    };
    // Negative durations are clamped to zero and then rejected by validation
    u32::try_from(value.max(0)).map_err(serde::de::Error::custom)
}

/// The six tools the assistant offers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    #[default]
    Search,
    SpeechGenerator,
    Interpellation,
    SpeechCorrection,
    TopicBreakdown,
    PositionPaper,
}

impl FeatureId {
    /// Navigation order.
    pub const ALL: [FeatureId; 6] = [
        FeatureId::Search,
        FeatureId::SpeechGenerator,
        FeatureId::Interpellation,
        FeatureId::SpeechCorrection,
        FeatureId::TopicBreakdown,
        FeatureId::PositionPaper,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            FeatureId::Search => "search",
            FeatureId::SpeechGenerator => "speech_generator",
            FeatureId::Interpellation => "interpellation",
            FeatureId::SpeechCorrection => "speech_correction",
            FeatureId::TopicBreakdown => "topic_breakdown",
            FeatureId::PositionPaper => "position_paper",
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            FeatureId::Search => "Diplomatic Search",
            FeatureId::SpeechGenerator => "Speech Generator",
            FeatureId::Interpellation => "Interpellation",
            FeatureId::SpeechCorrection => "Speech Correction",
            FeatureId::TopicBreakdown => "Topic Breakdown",
            FeatureId::PositionPaper => "Position Paper Review",
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            FeatureId::Search => "Find recent, reliable resources (.org, government, UN) for a research question",
            FeatureId::SpeechGenerator => "Write a timed three-part speech for a country and topic",
            FeatureId::Interpellation => "Receive a hostile point of information, draft a reply, and get the chair's verdict",
            FeatureId::SpeechCorrection => "Check a speech against the global / national / proposals structure",
            FeatureId::TopicBreakdown => "Turn a topic into a guide of research questions",
            FeatureId::PositionPaper => "Review a position paper for length, structure, tone and coherence",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureId {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match norm.as_str() {
            "search" | "smart_search" => Ok(FeatureId::Search),
            "speech_generator" | "generate_speech" | "speech" => Ok(FeatureId::SpeechGenerator),
            "interpellation" => Ok(FeatureId::Interpellation),
            "speech_correction" | "correction" => Ok(FeatureId::SpeechCorrection),
            "topic_breakdown" | "breakdown" => Ok(FeatureId::TopicBreakdown),
            "position_paper" | "position_paper_review" => Ok(FeatureId::PositionPaper),
            _ => Err(format!("unknown feature: {s}")),
        }
    }
}

/// A delegate's position paper as submitted for review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(default)]
pub struct PositionPaperRecord {
    pub topic: String,
    pub committee: String,
    pub delegation: String,
    pub delegate_name: String,
    pub content: String,
}

/// A web source attached to a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// Text returned by the generation service, plus citations for grounded requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
}

impl GenerationResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sources: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Gemini generateContent wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl GeminiContent {
    pub fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    pub fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiTool {
    pub google_search: serde_json::Value,
}

impl GeminiTool {
    pub fn google_search() -> Self {
        Self {
            google_search: serde_json::json!({}),
        }
    }
}

// Gemini API request format
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub system_instruction: GeminiContent,
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<GeminiTool>,
}

// Gemini API response format
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct WebChunk {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// MCP tool parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SelectFeatureParams {
    #[schemars(description = "Feature to activate: 'search', 'speech_generator', 'interpellation', 'speech_correction', 'topic_breakdown', 'position_paper'")]
    pub feature: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Research question typed in the persistent query box")]
    pub query: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateSpeechParams {
    #[schemars(description = "Topic of the committee session")]
    pub topic: String,

    #[schemars(description = "Country the delegate represents")]
    pub country: String,

    #[schemars(description = "Total speaking time in seconds (must be greater than 10)")]
    #[serde(deserialize_with = "deserialize_flexible_u32")]
    pub seconds: u32,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InterpellateParams {
    #[schemars(description = "Stage: 'challenge' (needs speech), 'suggest_defense', or 'reply' (needs reply)")]
    pub stage: String,

    #[schemars(description = "The delegate's speech; starting a challenge resets the exchange")]
    pub speech: Option<String>,

    #[schemars(description = "The delegate's answer to the challenge, submitted to the chair")]
    pub reply: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SpeechParams {
    #[schemars(description = "Full text of the speech")]
    pub speech: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TopicParams {
    #[schemars(description = "Topic to break down into research questions")]
    pub topic: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct WordCountParams {
    #[schemars(description = "Text to count words in")]
    pub content: String,
}
