use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, ErrorData, ServerCapabilities, ServerInfo},
};
use rmcp_macros::{tool, tool_handler, tool_router};
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::error::MunAssistantError;
use crate::generation::GenerationClient;
use crate::handlers::{HelpHandler, MunHelpParams, json_result, text_result, to_error_data};
use crate::models::{
    FeatureId, GenerateSpeechParams, InterpellateParams, PositionPaperRecord, SearchParams,
    SelectFeatureParams, SpeechParams, TopicParams, WordCountParams,
};
use crate::prompts::{SpeechRequest, WordCountStatus};
use crate::render::{render_result, render_word_count};
use crate::shell::Shell;

/// MCP server exposing the delegate tools. Each instance owns one session's views.
#[derive(Clone)]
pub struct MunAssistantService {
    tool_router: ToolRouter<Self>,
    shell: Arc<Shell>,
    client: Arc<dyn GenerationClient>,
    config: Arc<Config>,
    session_id: String,
}

impl MunAssistantService {
    pub fn new(config: Arc<Config>, client: Arc<dyn GenerationClient>) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(%session_id, "Starting MUN assistant session");
        Self {
            tool_router: Self::tool_router(),
            shell: Arc::new(Shell::new(Arc::clone(&client))),
            client,
            config,
            session_id,
        }
    }

    /// A service with fresh views that shares this one's generation client.
    pub fn new_session(&self) -> Self {
        Self::new(Arc::clone(&self.config), Arc::clone(&self.client))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[tool_router]
impl MunAssistantService {
    #[tool(description = "Switch the active feature view; the view being left is cleared")]
    pub async fn mun_select_feature(
        &self,
        params: Parameters<SelectFeatureParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let feature: FeatureId = params
            .0
            .feature
            .parse()
            .map_err(|e: String| ErrorData::invalid_params(e, None))?;
        self.shell.select(feature);
        Ok(text_result(format!("Active feature: {}", feature.label())))
    }

    #[tool(description = "Search recent, reliable diplomatic sources for a research question")]
    pub async fn mun_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let query = params.0.query;
        tracing::info!(session_id = %self.session_id, "mun_search");
        match self.shell.submit_query(&query).await {
            Ok(Some(result)) => Ok(text_result(render_result(&result))),
            Ok(None) => Err(to_error_data(
                "mun_search",
                MunAssistantError::validation("query", "cannot be empty"),
            )),
            Err(e) => Err(to_error_data("mun_search", e)),
        }
    }

    #[tool(description = "Write a timed three-part speech for a country on a topic")]
    pub async fn mun_generate_speech(
        &self,
        params: Parameters<GenerateSpeechParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        let request = SpeechRequest {
            topic: p.topic,
            country: p.country,
            requested_seconds: p.seconds,
        };
        self.shell
            .generate_speech(request)
            .await
            .map(|r| text_result(render_result(&r)))
            .map_err(|e| to_error_data("mun_generate_speech", e))
    }

    #[tool(
        description = "Interpellation practice: stage 'challenge' (with speech), 'suggest_defense', or 'reply' (with reply)"
    )]
    pub async fn mun_interpellate(
        &self,
        params: Parameters<InterpellateParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let p = params.0;
        let outcome = match p.stage.trim().to_ascii_lowercase().as_str() {
            "challenge" => {
                let speech = p.speech.unwrap_or_default();
                self.shell.interpellate(&speech).await
            }
            "suggest_defense" | "defense" => self.shell.suggest_defense().await,
            "reply" | "verdict" => self.shell.reply_to_interpellation(p.reply.as_deref()).await,
            other => {
                return Err(ErrorData::invalid_params(
                    format!("Unknown stage '{other}'. Use 'challenge', 'suggest_defense' or 'reply'"),
                    None,
                ));
            }
        };
        outcome
            .map(text_result)
            .map_err(|e| to_error_data("mun_interpellate", e))
    }

    #[tool(description = "Check a speech against the global / national / proposals structure")]
    pub async fn mun_correct_speech(
        &self,
        params: Parameters<SpeechParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.shell
            .correct_speech(&params.0.speech)
            .await
            .map(|r| text_result(render_result(&r)))
            .map_err(|e| to_error_data("mun_correct_speech", e))
    }

    #[tool(description = "Turn a topic into a guide of research questions")]
    pub async fn mun_topic_breakdown(
        &self,
        params: Parameters<TopicParams>,
    ) -> Result<CallToolResult, ErrorData> {
        self.shell
            .breakdown_topic(&params.0.topic)
            .await
            .map(|r| text_result(render_result(&r)))
            .map_err(|e| to_error_data("mun_topic_breakdown", e))
    }

    #[tool(description = "Review a position paper for length, structure, tone and coherence")]
    pub async fn mun_review_position_paper(
        &self,
        params: Parameters<PositionPaperRecord>,
    ) -> Result<CallToolResult, ErrorData> {
        let (status, result) = self
            .shell
            .review_position_paper(params.0)
            .await
            .map_err(|e| to_error_data("mun_review_position_paper", e))?;
        Ok(text_result(format!(
            "{}\n\n{}",
            render_word_count(&status),
            render_result(&result)
        )))
    }

    #[tool(description = "Count the words of a position paper draft and check the 500-800 range")]
    pub async fn mun_word_count(
        &self,
        params: Parameters<WordCountParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let status = WordCountStatus::of(&params.0.content);
        Ok(text_result(render_word_count(&status)))
    }

    #[tool(description = "Cancel a feature's pending request and clear its view")]
    pub async fn mun_cancel(
        &self,
        params: Parameters<SelectFeatureParams>,
    ) -> Result<CallToolResult, ErrorData> {
        let feature: FeatureId = params
            .0
            .feature
            .parse()
            .map_err(|e: String| ErrorData::invalid_params(e, None))?;
        let message = if self.shell.cancel(feature) {
            format!("{} request cancelled", feature.label())
        } else {
            format!("{} cleared", feature.label())
        };
        Ok(text_result(message))
    }

    #[tool(description = "Show the active feature and the state of every view in this session")]
    pub async fn mun_state(&self) -> Result<CallToolResult, ErrorData> {
        json_result(self.shell.snapshot())
    }

    #[tool(description = "Get help information about available tools and their usage")]
    pub async fn mun_help(
        &self,
        params: Parameters<MunHelpParams>,
    ) -> Result<CallToolResult, ErrorData> {
        json_result(HelpHandler::help(params.0))
    }
}

#[tool_handler]
impl ServerHandler for MunAssistantService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: rmcp::model::ProtocolVersion::V_2024_11_05,
            server_info: rmcp::model::Implementation {
                name: self.config.server.name.clone(),
                version: self.config.server.version.clone(),
            },
            capabilities: ServerCapabilities {
                tools: Some(Default::default()),
                ..Default::default()
            },
            instructions: Some(
                "MUN Assistant: research, speech writing, interpellation practice and position paper review for Model United Nations delegates".into(),
            ),
        }
    }
}
