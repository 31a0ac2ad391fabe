use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::models::FeatureId;
use crate::prompts::{POSITION_PAPER_MAX_WORDS, POSITION_PAPER_MIN_WORDS};

/// Parameters for the mun_help tool
#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct MunHelpParams {
    #[schemars(description = "Optional feature to get help for ('search', 'speech_generator', 'interpellation', 'speech_correction', 'topic_breakdown', 'position_paper', or leave empty for general help)")]
    pub tool: Option<String>,
}

/// Response structure for help requests
#[derive(Debug, Serialize)]
pub struct HelpResponse {
    pub overview: String,
    pub tools: serde_json::Value,
    pub examples: serde_json::Value,
    pub tips: Vec<String>,
}

/// Handler for help operations
pub struct HelpHandler;

impl HelpHandler {
    pub fn help(params: MunHelpParams) -> HelpResponse {
        tracing::debug!(tool = ?params.tool, "Processing help request");

        match params.tool.as_deref().map(str::parse::<FeatureId>) {
            Some(Ok(feature)) => Self::feature_help(feature),
            Some(Err(e)) => {
                tracing::debug!("{e}; falling back to general help");
                Self::general_help()
            }
            None => Self::general_help(),
        }
    }

    fn overview() -> String {
        let mut overview = String::from(
            "MUN Assistant - coaching tools for Model United Nations delegates.\n\nFeatures:",
        );
        for feature in FeatureId::ALL {
            overview.push_str(&format!(
                "\n• {} ({}) - {}",
                feature.label(),
                feature,
                feature.description()
            ));
        }
        overview
    }

    fn general_help() -> HelpResponse {
        HelpResponse {
            overview: Self::overview(),

            tools: json!({
                "mun_select_feature": "Switch the active view; the view you leave is cleared",
                "mun_search": "Grounded research with a numbered list of web sources",
                "mun_generate_speech": "Timed speech in three parts for a country and topic",
                "mun_interpellate": "Three stages: 'challenge', then optionally 'suggest_defense', then 'reply'",
                "mun_correct_speech": "Structure check for an existing speech",
                "mun_topic_breakdown": "Research guide of questions for a topic",
                "mun_review_position_paper": "Position paper review with a word-count check",
                "mun_word_count": "Word count and length range for a position paper draft",
                "mun_cancel": "Drop a feature's pending request and clear its view",
                "mun_state": "Snapshot of every view in this session",
                "mun_help": "This help"
            }),

            examples: json!({
                "search": { "query": "UNHCR funding gaps 2024" },
                "speech": { "topic": "Climate migration", "country": "Bangladesh", "seconds": 90 },
                "interpellation": { "stage": "challenge", "speech": "Honorable chair, fellow delegates..." }
            }),

            tips: vec![
                "Repeating the same search query reuses the current results".to_string(),
                "Speeches are timed at 2.3 words per second with a 10-second safety margin".to_string(),
                "Starting a new interpellation clears the previous reply and verdict".to_string(),
                format!(
                    "Position papers should be between {POSITION_PAPER_MIN_WORDS} and {POSITION_PAPER_MAX_WORDS} words"
                ),
            ],
        }
    }

    fn feature_help(feature: FeatureId) -> HelpResponse {
        let (tools, examples) = match feature {
            FeatureId::Search => (
                json!({ "mun_search": { "required_params": { "query": "Research question (string)" } } }),
                json!({ "query": "Resolutions on nuclear disarmament since 2015" }),
            ),
            FeatureId::SpeechGenerator => (
                json!({ "mun_generate_speech": { "required_params": {
                    "topic": "Committee topic (string)",
                    "country": "Delegation (string)",
                    "seconds": "Speaking time, greater than 10 (integer)"
                } } }),
                json!({ "topic": "Food security", "country": "Kenya", "seconds": 60 }),
            ),
            FeatureId::Interpellation => (
                json!({ "mun_interpellate": {
                    "stages": {
                        "challenge": "Requires 'speech'; starts a new exchange",
                        "suggest_defense": "Drafts a reply to the current challenge",
                        "reply": "Sends 'reply' (or the drafted one) to the chair for a verdict"
                    }
                } }),
                json!([
                    { "stage": "challenge", "speech": "Honorable chair..." },
                    { "stage": "suggest_defense" },
                    { "stage": "reply", "reply": "This delegation thanks the question..." }
                ]),
            ),
            FeatureId::SpeechCorrection => (
                json!({ "mun_correct_speech": { "required_params": { "speech": "Full speech text (string)" } } }),
                json!({ "speech": "Honorable chair, fellow delegates..." }),
            ),
            FeatureId::TopicBreakdown => (
                json!({ "mun_topic_breakdown": { "required_params": { "topic": "Topic (string)" } } }),
                json!({ "topic": "Artificial intelligence in warfare" }),
            ),
            FeatureId::PositionPaper => (
                json!({ "mun_review_position_paper": {
                    "required_params": { "topic": "Topic (string)", "content": "Paper body (string)" },
                    "optional_params": {
                        "committee": "Committee (string)",
                        "delegation": "Country (string)",
                        "delegate_name": "Delegate (string)"
                    }
                } }),
                json!({ "topic": "Ocean plastics", "committee": "UNEP", "delegation": "Japan", "content": "..." }),
            ),
        };

        HelpResponse {
            overview: format!("{}: {}", feature.label(), feature.description()),
            tools,
            examples,
            tips: vec![format!("Select this view with mun_select_feature {{\"feature\": \"{feature}\"}}")],
        }
    }
}
