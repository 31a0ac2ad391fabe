pub mod help;

use rmcp::model::{CallToolResult, Content, ErrorData};
use serde::Serialize;

use crate::error::MunAssistantError;

pub use help::{HelpHandler, HelpResponse, MunHelpParams};

/// Maps a feature error onto the MCP error the client sees.
pub fn to_error_data(tool: &str, e: MunAssistantError) -> ErrorData {
    match &e {
        MunAssistantError::Validation { .. } => {
            tracing::warn!("{tool} rejected input: {e}");
            ErrorData::invalid_params(e.to_string(), None)
        }
        MunAssistantError::Busy { .. } | MunAssistantError::Cancelled { .. } => {
            tracing::info!("{tool}: {e}");
            ErrorData::invalid_request(e.to_string(), None)
        }
        _ => {
            tracing::error!("{tool} error: {e}");
            ErrorData::internal_error(e.to_string(), None)
        }
    }
}

pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}

pub fn json_result(value: impl Serialize) -> Result<CallToolResult, ErrorData> {
    let content = Content::json(value).map_err(|e| {
        ErrorData::internal_error(format!("Failed to create JSON content: {e}"), None)
    })?;
    Ok(CallToolResult::success(vec![content]))
}
