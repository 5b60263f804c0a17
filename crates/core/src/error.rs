use crate::tools::calculator::CalcError;
use serde_json::{Value, json};

/// Failures raised while running a tool call.
///
/// None of these escape the tool executor; they are folded into an
/// `{"error": ...}` result so the agent can carry on with the turn.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("{0}")]
    MissingCredential(String),
    #[error("{0}")]
    Search(String),
    #[error(transparent)]
    Calculation(#[from] CalcError),
}

impl ToolError {
    /// The JSON result object reported back to the agent.
    pub fn to_payload(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Search(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_display_text() {
        let err = ToolError::UnknownTool("teleport".into());
        assert_eq!(err.to_payload(), json!({"error": "Unknown tool: teleport"}));

        let err = ToolError::MissingCredential("Tavily API key not configured".into());
        assert_eq!(
            err.to_payload(),
            json!({"error": "Tavily API key not configured"})
        );
    }
}
