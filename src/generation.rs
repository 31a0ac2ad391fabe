use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::models::{
    Citation, GeminiContent, GeminiRequest, GeminiResponse, GeminiTool, GenerationResult,
};
use crate::prompts::{PromptForm, SYSTEM_INSTRUCTION};
use crate::transport::Transport;

#[cfg(test)]
use mockall::automock;

/// Title used for grounding sources the model returns without one.
pub const DEFAULT_SOURCE_TITLE: &str = "External source";

/// Everything one generation call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub prompt: String,
    pub use_web_grounding: bool,
    /// Returned as the text when the model answers with nothing.
    pub empty_placeholder: String,
}

impl GenerateRequest {
    /// Builds the request for a validated form using the shared persona.
    pub fn from_form(form: &dyn PromptForm) -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            prompt: form.task_prompt(),
            use_web_grounding: form.use_web_grounding(),
            empty_placeholder: form.empty_placeholder().to_string(),
        }
    }
}

/// Single integration boundary to the remote text-generation capability.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerationResult>;
}

pub struct GeminiClient {
    tx: Arc<dyn Transport>,
    model: String,
}

impl GeminiClient {
    pub fn new(tx: Arc<dyn Transport>, model: String) -> Self {
        Self { tx, model }
    }
}

/// Concatenated text parts of the first candidate.
fn response_text(response: &GeminiResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Web sources of the first candidate, in the model's order. Entries without a URI are dropped.
fn response_citations(response: &GeminiResponse) -> Vec<Citation> {
    response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|meta| {
            meta.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.as_ref())
                .filter_map(|web| {
                    let uri = web.uri.as_deref().unwrap_or_default();
                    if uri.is_empty() {
                        return None;
                    }
                    let title = web
                        .title
                        .as_deref()
                        .filter(|t| !t.is_empty())
                        .unwrap_or(DEFAULT_SOURCE_TITLE);
                    Some(Citation {
                        uri: uri.to_string(),
                        title: title.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerationResult> {
        tracing::info!(
            model = %self.model,
            grounding = req.use_web_grounding,
            prompt_chars = req.prompt.len(),
            "Generating content with Gemini"
        );

        let request = GeminiRequest {
            system_instruction: GeminiContent::system(&req.system_instruction),
            contents: vec![GeminiContent::user(&req.prompt)],
            tools: if req.use_web_grounding {
                vec![GeminiTool::google_search()]
            } else {
                vec![]
            },
        };

        let response = self.tx.generate_content(&self.model, &request).await?;

        let mut text = response_text(&response);
        if text.is_empty() {
            tracing::warn!("Gemini returned empty text, using placeholder");
            text = req.empty_placeholder.clone();
        }

        let sources = req.use_web_grounding.then(|| response_citations(&response));

        Ok(GenerationResult { text, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MunAssistantError;
    use crate::models::{Candidate, GroundingChunk, GroundingMetadata, Part, WebChunk};
    use crate::prompts::{BreakdownRequest, SearchRequest};
    use crate::transport::MockTransport;

    fn text_response(text: &str) -> GeminiResponse {
        GeminiResponse {
            candidates: vec![Candidate {
                content: Some(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![Part {
                        text: Some(text.to_string()),
                    }],
                }),
                grounding_metadata: None,
            }],
        }
    }

    fn search_request() -> GenerateRequest {
        GenerateRequest::from_form(&SearchRequest {
            query: "UN water conferences".to_string(),
        })
    }

    #[tokio::test]
    async fn test_generate_returns_text() {
        let mut tx = MockTransport::new();
        tx.expect_generate_content()
            .withf(|model, req| {
                model == "gemini-2.5-flash"
                    && req.tools.is_empty()
                    && req.system_instruction.parts[0].text.as_deref() == Some(SYSTEM_INSTRUCTION)
            })
            .times(1)
            .returning(|_, _| Ok(text_response("Research questions.")));

        let client = GeminiClient::new(Arc::new(tx), "gemini-2.5-flash".to_string());
        let req = GenerateRequest::from_form(&BreakdownRequest {
            topic: "Arctic sovereignty".to_string(),
        });
        let result = client.generate(&req).await.unwrap();
        assert_eq!(result.text, "Research questions.");
        assert_eq!(result.sources, None);
    }

    #[tokio::test]
    async fn test_empty_text_uses_placeholder() {
        let mut tx = MockTransport::new();
        tx.expect_generate_content()
            .times(1)
            .returning(|_, _| Ok(GeminiResponse::default()));

        let client = GeminiClient::new(Arc::new(tx), "m".to_string());
        let result = client.generate(&search_request()).await.unwrap();
        assert_eq!(result.text, "No results were found.");
        assert_eq!(result.sources, Some(vec![]));
    }

    #[tokio::test]
    async fn test_whitespace_text_is_kept() {
        let mut tx = MockTransport::new();
        tx.expect_generate_content()
            .times(1)
            .returning(|_, _| Ok(text_response("\n  ")));

        let client = GeminiClient::new(Arc::new(tx), "m".to_string());
        let req = GenerateRequest::from_form(&BreakdownRequest {
            topic: "Arctic sovereignty".to_string(),
        });
        let result = client.generate(&req).await.unwrap();
        assert_eq!(result.text, "\n  ");
    }

    #[tokio::test]
    async fn test_grounded_request_filters_citations() {
        let mut tx = MockTransport::new();
        tx.expect_generate_content()
            .withf(|_, req| req.tools.len() == 1)
            .times(1)
            .returning(|_, _| {
                let mut response = text_response("https://un.org\nWhy it matters.");
                response.candidates[0].grounding_metadata = Some(GroundingMetadata {
                    grounding_chunks: vec![
                        GroundingChunk {
                            web: Some(WebChunk {
                                uri: Some(String::new()),
                                title: Some("X".to_string()),
                            }),
                        },
                        GroundingChunk {
                            web: Some(WebChunk {
                                uri: Some("http://u".to_string()),
                                title: None,
                            }),
                        },
                        GroundingChunk { web: None },
                    ],
                });
                Ok(response)
            });

        let client = GeminiClient::new(Arc::new(tx), "m".to_string());
        let result = client.generate(&search_request()).await.unwrap();
        assert_eq!(
            result.sources,
            Some(vec![Citation {
                uri: "http://u".to_string(),
                title: DEFAULT_SOURCE_TITLE.to_string(),
            }])
        );
    }

    #[tokio::test]
    async fn test_citations_ignored_without_grounding() {
        let mut tx = MockTransport::new();
        tx.expect_generate_content().times(1).returning(|_, _| {
            let mut response = text_response("Answer");
            response.candidates[0].grounding_metadata = Some(GroundingMetadata {
                grounding_chunks: vec![GroundingChunk {
                    web: Some(WebChunk {
                        uri: Some("http://u".to_string()),
                        title: Some("U".to_string()),
                    }),
                }],
            });
            Ok(response)
        });

        let client = GeminiClient::new(Arc::new(tx), "m".to_string());
        let req = GenerateRequest::from_form(&BreakdownRequest {
            topic: "t".to_string(),
        });
        let result = client.generate(&req).await.unwrap();
        assert_eq!(result.sources, None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_retried() {
        let mut tx = MockTransport::new();
        tx.expect_generate_content()
            .times(1)
            .returning(|_, _| Err(MunAssistantError::Service("connection reset".to_string())));

        let client = GeminiClient::new(Arc::new(tx), "m".to_string());
        let err = client.generate(&search_request()).await.unwrap_err();
        assert!(matches!(err, MunAssistantError::Service(_)));
    }

    #[test]
    fn test_multi_part_text_is_concatenated() {
        let response = GeminiResponse {
            candidates: vec![Candidate {
                content: Some(GeminiContent {
                    role: None,
                    parts: vec![
                        Part {
                            text: Some("Line one\n".to_string()),
                        },
                        Part { text: None },
                        Part {
                            text: Some("Line two".to_string()),
                        },
                    ],
                }),
                grounding_metadata: None,
            }],
        };
        assert_eq!(response_text(&response), "Line one\nLine two");
    }
}
