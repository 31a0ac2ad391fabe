pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod handlers;
pub mod interpellation;
pub mod models;
pub mod prompts;
pub mod render;
pub mod search;
pub mod service;
pub mod shell;
pub mod transport;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::generation::{GeminiClient, GenerationClient};
use crate::transport::{GeminiTransport, Transport};

/// Wires the Gemini transport into the generation client every session shares.
pub fn build_client(cfg: &Config) -> Result<Arc<dyn GenerationClient>> {
    let transport = Arc::new(GeminiTransport::new(&cfg.gemini)?);
    tracing::info!(model = %cfg.gemini.model, "Generation client ready");

    Ok(Arc::new(GeminiClient::new(
        transport as Arc<dyn Transport>,
        cfg.gemini.model.clone(),
    )))
}
