//! Generic prompt-driven form: validate, build the prompt, make one generation call, keep the
//! result. Every feature view is an instance of [`FormController`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{MunAssistantError, Result};
use crate::generation::{GenerateRequest, GenerationClient};
use crate::models::{FeatureId, GenerationResult};
use crate::prompts::PromptForm;

/// Lifecycle of one feature view.
///
/// A failed call returns the form to `Idle`; the error goes back to the caller and the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FormState {
    Idle,
    Loading {
        ticket: u64,
        started_at: DateTime<Utc>,
    },
    Ready {
        result: GenerationResult,
        completed_at: DateTime<Utc>,
    },
}

impl FormState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FormState::Loading { .. })
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match self {
            FormState::Ready { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Immutable snapshot of a form for the outer surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormView {
    pub feature: FeatureId,
    #[serde(flatten)]
    pub state: FormState,
}

struct FormInner {
    // Bumped by every submit and every teardown; a response is applied only if its ticket
    // still matches.
    epoch: u64,
    state: FormState,
}

pub struct FormController<F: PromptForm> {
    feature: FeatureId,
    client: Arc<dyn GenerationClient>,
    inner: Mutex<FormInner>,
    _form: PhantomData<fn(F)>,
}

impl<F: PromptForm> FormController<F> {
    pub fn new(feature: FeatureId, client: Arc<dyn GenerationClient>) -> Self {
        Self {
            feature,
            client,
            inner: Mutex::new(FormInner {
                epoch: 0,
                state: FormState::Idle,
            }),
            _form: PhantomData,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn feature(&self) -> FeatureId {
        self.feature
    }

    pub fn is_loading(&self) -> bool {
        self.lock().state.is_loading()
    }

    pub fn result(&self) -> Option<GenerationResult> {
        self.lock().state.result().cloned()
    }

    pub fn snapshot(&self) -> FormView {
        FormView {
            feature: self.feature,
            state: self.lock().state.clone(),
        }
    }

    /// Validates `form` and, if no request is in flight, performs exactly one generation call.
    pub async fn submit(&self, form: F) -> Result<GenerationResult> {
        if let Err(e) = form.validate() {
            tracing::warn!(feature = %self.feature, "Rejected submission: {}", e);
            return Err(e);
        }
        let ticket = self.begin()?;
        self.run(ticket, &form).await
    }

    /// Moves the form to Loading and returns its ticket, or `Busy` if a request is in flight.
    /// The check and the transition happen under one lock.
    pub fn begin(&self) -> Result<u64> {
        let mut inner = self.lock();
        if inner.state.is_loading() {
            return Err(MunAssistantError::Busy {
                feature: self.feature.to_string(),
            });
        }
        inner.epoch += 1;
        inner.state = FormState::Loading {
            ticket: inner.epoch,
            started_at: Utc::now(),
        };
        Ok(inner.epoch)
    }

    /// Performs the call for a ticket taken with [`begin`](Self::begin). `form` must already be
    /// validated.
    pub async fn run(&self, ticket: u64, form: &F) -> Result<GenerationResult> {
        let request = GenerateRequest::from_form(form);
        let outcome = self.client.generate(&request).await;

        let mut inner = self.lock();
        if inner.epoch != ticket {
            tracing::warn!(
                feature = %self.feature,
                ticket,
                "Discarding response for a view that was torn down"
            );
            return Err(MunAssistantError::Cancelled {
                feature: self.feature.to_string(),
            });
        }

        match outcome {
            Ok(result) => {
                tracing::info!(feature = %self.feature, chars = result.text.len(), "Generation complete");
                inner.state = FormState::Ready {
                    result: result.clone(),
                    completed_at: Utc::now(),
                };
                Ok(result)
            }
            Err(e) => {
                tracing::error!(feature = %self.feature, "Generation failed: {}", e);
                inner.state = FormState::Idle;
                Err(e)
            }
        }
    }

    /// Tears the view down: any in-flight response will be discarded and the form is cleared.
    /// Returns true if a request was in flight.
    pub fn reset(&self) -> bool {
        let mut inner = self.lock();
        inner.epoch += 1;
        let was_loading = inner.state.is_loading();
        inner.state = FormState::Idle;
        was_loading
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::generation::MockGenerationClient;
    use crate::prompts::{BreakdownRequest, SpeechRequest};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Scripted client that counts calls and records the requests it saw.
    pub(crate) struct ScriptedClient {
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<GenerateRequest>>,
        responses: Mutex<VecDeque<Result<GenerationResult>>>,
    }

    impl ScriptedClient {
        pub fn new(responses: Vec<Result<GenerationResult>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into()),
            }
        }

        pub fn texts(texts: &[&str]) -> Self {
            Self::new(texts.iter().map(|t| Ok(GenerationResult::text(*t))).collect())
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn last_prompt(&self) -> String {
            self.requests
                .lock()
                .expect("Scripted client mutex should not be poisoned")
                .last()
                .map(|r| r.prompt.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedClient {
        async fn generate(&self, req: &GenerateRequest) -> Result<GenerationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .expect("Scripted client mutex should not be poisoned")
                .push(req.clone());
            self.responses
                .lock()
                .expect("Scripted client mutex should not be poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(MunAssistantError::Service("No more scripted responses".to_string())))
        }
    }

    /// Client that blocks until released, to observe the Loading state.
    pub(crate) struct GatedClient {
        pub release: Notify,
        pub started: Notify,
        pub text: String,
    }

    #[async_trait]
    impl GenerationClient for GatedClient {
        async fn generate(&self, _req: &GenerateRequest) -> Result<GenerationResult> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(GenerationResult::text(self.text.clone()))
        }
    }

    fn speech(seconds: u32) -> SpeechRequest {
        SpeechRequest {
            topic: "Food security".to_string(),
            country: "Kenya".to_string(),
            requested_seconds: seconds,
        }
    }

    #[tokio::test]
    async fn test_submit_success_reaches_ready() {
        let client = Arc::new(ScriptedClient::texts(&["A speech."]));
        let form = FormController::<SpeechRequest>::new(FeatureId::SpeechGenerator, client.clone());

        let result = form.submit(speech(60)).await.unwrap();
        assert_eq!(result.text, "A speech.");
        assert_eq!(form.result(), Some(GenerationResult::text("A speech.")));
        assert!(!form.is_loading());
        assert_eq!(client.call_count(), 1);
        assert!(client.last_prompt().contains("about 115 words"));
    }

    #[tokio::test]
    async fn test_validation_blocks_network_call() {
        let mut client = MockGenerationClient::new();
        client.expect_generate().never();
        let form = FormController::<SpeechRequest>::new(FeatureId::SpeechGenerator, Arc::new(client));

        let err = form.submit(speech(10)).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(form.snapshot().state, FormState::Idle);
    }

    #[tokio::test]
    async fn test_failure_returns_to_idle_without_retry() {
        let mut client = MockGenerationClient::new();
        client
            .expect_generate()
            .times(1)
            .returning(|_| Err(MunAssistantError::Service("network down".to_string())));
        let form = FormController::<BreakdownRequest>::new(FeatureId::TopicBreakdown, Arc::new(client));

        let err = form
            .submit(BreakdownRequest {
                topic: "Nuclear disarmament".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MunAssistantError::Service(_)));
        assert_eq!(form.snapshot().state, FormState::Idle);
        assert_eq!(form.result(), None);
    }

    #[tokio::test]
    async fn test_second_submit_while_loading_is_busy() {
        let client = Arc::new(GatedClient {
            release: Notify::new(),
            started: Notify::new(),
            text: "done".to_string(),
        });
        let form = Arc::new(FormController::<SpeechRequest>::new(
            FeatureId::SpeechGenerator,
            client.clone(),
        ));

        let first = {
            let form = Arc::clone(&form);
            tokio::spawn(async move { form.submit(speech(60)).await })
        };
        client.started.notified().await;
        assert!(form.is_loading());

        let err = form.submit(speech(90)).await.unwrap_err();
        assert!(matches!(err, MunAssistantError::Busy { .. }));

        client.release.notify_one();
        let result = first.await.expect("task should not panic").unwrap();
        assert_eq!(result.text, "done");
    }

    #[tokio::test]
    async fn test_begin_claims_the_form_once() {
        let client = Arc::new(ScriptedClient::texts(&["guide"]));
        let form = FormController::<BreakdownRequest>::new(FeatureId::TopicBreakdown, client.clone());

        let ticket = form.begin().unwrap();
        assert!(form.is_loading());
        assert!(matches!(form.begin().unwrap_err(), MunAssistantError::Busy { .. }));

        let request = BreakdownRequest {
            topic: "Space debris".to_string(),
        };
        assert_eq!(form.run(ticket, &request).await.unwrap().text, "guide");
        assert_eq!(client.call_count(), 1);
        assert!(form.begin().is_ok());
    }

    #[tokio::test]
    async fn test_reset_discards_late_response() {
        let client = Arc::new(GatedClient {
            release: Notify::new(),
            started: Notify::new(),
            text: "stale".to_string(),
        });
        let form = Arc::new(FormController::<SpeechRequest>::new(
            FeatureId::SpeechGenerator,
            client.clone(),
        ));

        let pending = {
            let form = Arc::clone(&form);
            tokio::spawn(async move { form.submit(speech(60)).await })
        };
        client.started.notified().await;

        assert!(form.reset());
        client.release.notify_one();

        let err = pending.await.expect("task should not panic").unwrap_err();
        assert!(matches!(err, MunAssistantError::Cancelled { .. }));
        assert_eq!(form.snapshot().state, FormState::Idle);
    }

    #[test]
    fn test_form_view_serializes_state_tag() {
        let view = FormView {
            feature: FeatureId::TopicBreakdown,
            state: FormState::Idle,
        };
        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["feature"], "topic_breakdown");
        assert_eq!(v["state"], "idle");
    }
}
