//! Per-session application state: the active feature, the persistent query box and one
//! controller per feature.

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::controller::{FormController, FormView};
use crate::error::Result;
use crate::generation::GenerationClient;
use crate::interpellation::{InterpellationController, InterpellationView};
use crate::models::{FeatureId, GenerationResult, PositionPaperRecord};
use crate::prompts::{BreakdownRequest, CorrectionRequest, SpeechRequest, WordCountStatus};
use crate::search::SearchController;

#[derive(Debug, Clone, Default)]
struct ShellState {
    active: FeatureId,
    query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellView {
    pub active: FeatureId,
    pub query: String,
    pub search: FormView,
    pub speech_generator: FormView,
    pub interpellation: InterpellationView,
    pub speech_correction: FormView,
    pub topic_breakdown: FormView,
    pub position_paper: FormView,
}

pub struct Shell {
    state: Mutex<ShellState>,
    search: SearchController,
    speech: FormController<SpeechRequest>,
    interpellation: InterpellationController,
    correction: FormController<CorrectionRequest>,
    breakdown: FormController<BreakdownRequest>,
    position_paper: FormController<PositionPaperRecord>,
}

impl Shell {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            state: Mutex::new(ShellState::default()),
            search: SearchController::new(Arc::clone(&client)),
            speech: FormController::new(FeatureId::SpeechGenerator, Arc::clone(&client)),
            interpellation: InterpellationController::new(Arc::clone(&client)),
            correction: FormController::new(FeatureId::SpeechCorrection, Arc::clone(&client)),
            breakdown: FormController::new(FeatureId::TopicBreakdown, Arc::clone(&client)),
            position_paper: FormController::new(FeatureId::PositionPaper, client),
        }
    }

    fn state(&self) -> MutexGuard<'_, ShellState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn active(&self) -> FeatureId {
        self.state().active
    }

    /// Drops a view's result and any request in flight, leaving the active feature alone.
    pub fn cancel(&self, feature: FeatureId) -> bool {
        self.teardown(feature)
    }

    fn teardown(&self, feature: FeatureId) -> bool {
        let was_loading = match feature {
            FeatureId::Search => self.search.reset(),
            FeatureId::SpeechGenerator => self.speech.reset(),
            FeatureId::Interpellation => self.interpellation.reset(),
            FeatureId::SpeechCorrection => self.correction.reset(),
            FeatureId::TopicBreakdown => self.breakdown.reset(),
            FeatureId::PositionPaper => self.position_paper.reset(),
        };
        if was_loading {
            tracing::info!(%feature, "View torn down with a request in flight; its result will be ignored");
        }
        was_loading
    }

    /// Switches the active view. Leaving a view tears it down.
    pub fn select(&self, feature: FeatureId) {
        let previous = {
            let mut state = self.state();
            std::mem::replace(&mut state.active, feature)
        };
        if previous != feature {
            tracing::debug!(from = %previous, to = %feature, "Switching feature");
            self.teardown(previous);
        }
    }

    /// Persistent query box. Blank input is ignored; anything else activates search.
    pub async fn submit_query(&self, query: &str) -> Result<Option<GenerationResult>> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        self.state().query = query.to_string();
        self.select(FeatureId::Search);
        self.search.run(query).await
    }

    pub async fn generate_speech(&self, request: SpeechRequest) -> Result<GenerationResult> {
        self.select(FeatureId::SpeechGenerator);
        self.speech.submit(request).await
    }

    pub async fn interpellate(&self, speech: &str) -> Result<String> {
        self.select(FeatureId::Interpellation);
        self.interpellation.challenge(speech).await
    }

    pub async fn suggest_defense(&self) -> Result<String> {
        self.select(FeatureId::Interpellation);
        self.interpellation.suggest_defense().await
    }

    pub async fn reply_to_interpellation(&self, reply: Option<&str>) -> Result<String> {
        self.select(FeatureId::Interpellation);
        self.interpellation.submit_reply(reply).await
    }

    pub async fn correct_speech(&self, speech: &str) -> Result<GenerationResult> {
        self.select(FeatureId::SpeechCorrection);
        self.correction
            .submit(CorrectionRequest {
                speech: speech.to_string(),
            })
            .await
    }

    pub async fn breakdown_topic(&self, topic: &str) -> Result<GenerationResult> {
        self.select(FeatureId::TopicBreakdown);
        self.breakdown
            .submit(BreakdownRequest {
                topic: topic.to_string(),
            })
            .await
    }

    pub async fn review_position_paper(
        &self,
        record: PositionPaperRecord,
    ) -> Result<(WordCountStatus, GenerationResult)> {
        self.select(FeatureId::PositionPaper);
        let status = WordCountStatus::of(&record.content);
        if !status.within_bounds {
            tracing::info!(count = status.count, "Position paper outside the recommended length");
        }
        let result = self.position_paper.submit(record).await?;
        Ok((status, result))
    }

    pub fn snapshot(&self) -> ShellView {
        let state = self.state().clone();
        ShellView {
            active: state.active,
            query: state.query,
            search: self.search.snapshot(),
            speech_generator: self.speech.snapshot(),
            interpellation: self.interpellation.snapshot(),
            speech_correction: self.correction.snapshot(),
            topic_breakdown: self.breakdown.snapshot(),
            position_paper: self.position_paper.snapshot(),
        }
    }
}
