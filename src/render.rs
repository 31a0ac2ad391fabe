//! Plain-text rendering of generation results. Text is passed through untouched; sources are
//! appended as a numbered list in the order the model returned them.

use std::fmt::Write;

use crate::models::{Citation, GenerationResult};
use crate::prompts::WordCountStatus;

pub fn render_sources(sources: &[Citation]) -> String {
    let mut out = String::from("Sources:\n");
    for (idx, source) in sources.iter().enumerate() {
        let _ = writeln!(out, "{}. {}\n   {}", idx + 1, source.title, source.uri);
    }
    out
}

pub fn render_result(result: &GenerationResult) -> String {
    match result.sources.as_deref() {
        Some(sources) if !sources.is_empty() => {
            format!("{}\n\n{}", result.text, render_sources(sources))
        }
        _ => result.text.clone(),
    }
}

pub fn render_word_count(status: &WordCountStatus) -> String {
    let verdict = if status.within_bounds {
        "within range"
    } else {
        "out of range"
    };
    format!(
        "Word count: {} ({}-{} required, {})",
        status.count, status.min, status.max, verdict
    )
}
