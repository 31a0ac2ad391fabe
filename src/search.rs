use std::sync::{Arc, Mutex, MutexGuard};

use crate::controller::{FormController, FormView};
use crate::error::Result;
use crate::generation::GenerationClient;
use crate::models::{FeatureId, GenerationResult};
use crate::prompts::SearchRequest;

/// Search view, driven by the shell's persistent query box.
///
/// Only queries that differ from the last one served reach the network, so re-submitting the
/// same text does not cost a second call.
pub struct SearchController {
    form: FormController<SearchRequest>,
    last_served: Mutex<Option<String>>,
}

impl SearchController {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            form: FormController::new(FeatureId::Search, client),
            last_served: Mutex::new(None),
        }
    }

    fn last_served(&self) -> MutexGuard<'_, Option<String>> {
        self.last_served
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `query` unless it is blank or already served. Returns the result now on display.
    pub async fn run(&self, query: &str) -> Result<Option<GenerationResult>> {
        if query.trim().is_empty() {
            return Ok(None);
        }
        if self.last_served().as_deref() == Some(query) {
            tracing::debug!("Search query unchanged, reusing result");
            return Ok(self.form.result());
        }

        let result = self
            .form
            .submit(SearchRequest {
                query: query.to_string(),
            })
            .await?;
        *self.last_served() = Some(query.to_string());
        Ok(Some(result))
    }

    pub fn last_query(&self) -> Option<String> {
        self.last_served().clone()
    }

    pub fn snapshot(&self) -> FormView {
        self.form.snapshot()
    }

    /// Clears the view and forgets the last served query.
    pub fn reset(&self) -> bool {
        *self.last_served() = None;
        self.form.reset()
    }
}
