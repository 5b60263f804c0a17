//! The tools the agent can call during a turn.
//!
//! Tool schemas are advertised in `session.update`; calls arrive as
//! `response.function_call_arguments.done` and are answered through a
//! [`ToolExecutor`]. Execution never fails outward: every outcome, including
//! bad arguments and network errors, is a JSON object the agent can read.

pub mod calculator;
pub mod datetime;
pub mod web_search;

use crate::error::ToolError;
use async_trait::async_trait;
use openai_realtime_types::{FunctionTool, ToolDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{fmt, sync::Arc};
use tracing::{info, warn};

/// Search results are clipped to this many characters per hit.
const MAX_HIT_CONTENT_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "web_search")]
    WebSearch,
    #[serde(rename = "get_current_datetime")]
    CurrentDatetime,
    #[serde(rename = "calculator")]
    Calculator,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::WebSearch,
        ToolKind::CurrentDatetime,
        ToolKind::Calculator,
    ];

    /// The function name the agent uses to call this tool.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::WebSearch => "web_search",
            ToolKind::CurrentDatetime => "get_current_datetime",
            ToolKind::Calculator => "calculator",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// The function schema advertised to the agent.
    pub fn definition(self) -> ToolDefinition {
        let (description, parameters) = match self {
            ToolKind::WebSearch => (
                "Search for information on the internet. Use when you need to find current information, news, facts.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query" }
                    },
                    "required": ["query"]
                }),
            ),
            ToolKind::CurrentDatetime => (
                "Get current date and time. Use when asked what time it is, what day it is, the date.",
                json!({ "type": "object", "properties": {}, "required": [] }),
            ),
            ToolKind::Calculator => (
                "Perform mathematical calculations. Use for complex calculations.",
                json!({
                    "type": "object",
                    "properties": {
                        "expression": {
                            "type": "string",
                            "description": "Mathematical expression to calculate (e.g.: \"2 + 2 * 3\", \"sqrt(16)\", \"sin(45)\")"
                        }
                    },
                    "required": ["expression"]
                }),
            ),
        };
        ToolDefinition::Function(FunctionTool {
            name: self.name().to_string(),
            description: description.to_string(),
            parameters,
        })
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which tools the user wants advertised to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolToggles {
    pub web_search: bool,
    pub date_time: bool,
    pub calculator: bool,
}

impl Default for ToolToggles {
    fn default() -> Self {
        Self {
            web_search: true,
            date_time: true,
            calculator: true,
        }
    }
}

impl ToolToggles {
    pub fn is_enabled(&self, kind: ToolKind) -> bool {
        match kind {
            ToolKind::WebSearch => self.web_search,
            ToolKind::CurrentDatetime => self.date_time,
            ToolKind::Calculator => self.calculator,
        }
    }

    pub fn set(&mut self, kind: ToolKind, enabled: bool) {
        match kind {
            ToolKind::WebSearch => self.web_search = enabled,
            ToolKind::CurrentDatetime => self.date_time = enabled,
            ToolKind::Calculator => self.calculator = enabled,
        }
    }
}

/// Runs a named tool against a parsed arguments object.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Always yields a JSON object: domain fields, or a single `error` field.
    async fn execute(&self, name: &str, args: Value) -> Value;
}

/// One web search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub content: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    /// A short synthesized answer, when the provider offers one.
    pub answer: Option<String>,
    pub hits: Vec<SearchHit>,
}

/// A web search backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse, ToolError>;
}

/// The built-in tool set: web search, date/time and calculator.
#[derive(Default, Clone)]
pub struct Toolbox {
    search: Option<Arc<dyn SearchProvider>>,
}

impl Toolbox {
    /// A toolbox whose web search reports a missing credential.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(provider);
        self
    }

    async fn web_search(&self, args: &Value) -> Result<Value, ToolError> {
        let provider = self
            .search
            .as_ref()
            .ok_or_else(|| ToolError::MissingCredential("Tavily API key not configured".into()))?;
        let query = required_str(args, "query")?;
        let response = provider.search(query).await?;
        let results: Vec<Value> = response
            .hits
            .into_iter()
            .map(|hit| {
                json!({
                    "title": hit.title,
                    "content": hit.content.map(|c| c.chars().take(MAX_HIT_CONTENT_CHARS).collect::<String>()),
                    "url": hit.url,
                })
            })
            .collect();
        Ok(json!({
            "query": query,
            "results": results,
            "answer": response.answer,
        }))
    }

    fn calculator(&self, args: &Value) -> Result<Value, ToolError> {
        let expression = required_str(args, "expression")?;
        Ok(match calculator::evaluate(expression) {
            Ok(result) => json!({ "expression": expression, "result": result }),
            Err(e) => json!({ "expression": expression, "error": e.to_string() }),
        })
    }
}

#[async_trait]
impl ToolExecutor for Toolbox {
    async fn execute(&self, name: &str, args: Value) -> Value {
        info!(tool = %name, "Executing tool");
        let outcome = match ToolKind::from_name(name) {
            Some(ToolKind::WebSearch) => self.web_search(&args).await,
            Some(ToolKind::CurrentDatetime) => Ok(datetime::current_datetime()),
            Some(ToolKind::Calculator) => self.calculator(&args),
            None => Err(ToolError::UnknownTool(name.to_string())),
        };
        outcome.unwrap_or_else(|e| {
            warn!(tool = %name, error = %e, "Tool call failed");
            e.to_payload()
        })
    }
}

fn required_str<'a>(args: &'a Value, field: &str) -> Result<&'a str, ToolError> {
    args.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string field `{field}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn names_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
            assert_eq!(kind.definition().name(), kind.name());
        }
        assert_eq!(ToolKind::from_name("teleport"), None);
    }

    #[test]
    fn calculator_schema_requires_expression() {
        let ToolDefinition::Function(tool) = ToolKind::Calculator.definition();
        assert_eq!(tool.parameters["required"], json!(["expression"]));
    }

    #[test]
    fn toggles_default_on_and_fill_missing_fields() {
        let mut toggles = ToolToggles::default();
        assert!(ToolKind::ALL.into_iter().all(|k| toggles.is_enabled(k)));
        toggles.set(ToolKind::WebSearch, false);
        assert!(!toggles.is_enabled(ToolKind::WebSearch));

        let parsed: ToolToggles = serde_json::from_str(r#"{"calculator": false}"#).unwrap();
        assert!(parsed.web_search && parsed.date_time && !parsed.calculator);
    }

    #[tokio::test]
    async fn unknown_tool_reports_error() {
        let result = Toolbox::new().execute("teleport", json!({})).await;
        assert_eq!(result, json!({"error": "Unknown tool: teleport"}));
    }

    #[tokio::test]
    async fn calculator_success_and_failure() {
        let toolbox = Toolbox::new();
        let ok = toolbox
            .execute("calculator", json!({"expression": "2 + 2 * 3"}))
            .await;
        assert_eq!(ok, json!({"expression": "2 + 2 * 3", "result": 8.0}));

        let bad = toolbox
            .execute("calculator", json!({"expression": "2 +* 3"}))
            .await;
        assert_eq!(bad["expression"], "2 +* 3");
        assert!(bad["error"].is_string());

        let missing = toolbox.execute("calculator", json!({})).await;
        assert!(missing["error"].as_str().unwrap().contains("expression"));
    }

    #[tokio::test]
    async fn datetime_ignores_arguments() {
        let result = Toolbox::new()
            .execute("get_current_datetime", json!({"anything": 1}))
            .await;
        assert!(result["datetime"].is_string());
        assert!(result.get("error").is_none());
    }

    #[tokio::test]
    async fn web_search_without_credential() {
        let result = Toolbox::new()
            .execute("web_search", json!({"query": "rust"}))
            .await;
        assert_eq!(result, json!({"error": "Tavily API key not configured"}));
    }

    #[tokio::test]
    async fn web_search_formats_and_clips_hits() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .with(eq("rust 2024"))
            .times(1)
            .returning(|_| {
                Ok(SearchResponse {
                    answer: Some("Rust 2024 shipped.".into()),
                    hits: vec![SearchHit {
                        title: "Edition guide".into(),
                        content: Some("x".repeat(500)),
                        url: "https://example.test/edition".into(),
                    }],
                })
            });
        let toolbox = Toolbox::new().with_search(Arc::new(provider));

        let result = toolbox
            .execute("web_search", json!({"query": "rust 2024"}))
            .await;
        assert_eq!(result["query"], "rust 2024");
        assert_eq!(result["answer"], "Rust 2024 shipped.");
        let hit = &result["results"][0];
        assert_eq!(hit["title"], "Edition guide");
        assert_eq!(hit["content"].as_str().unwrap().len(), 300);
        assert_eq!(hit["url"], "https://example.test/edition");
    }

    #[tokio::test]
    async fn web_search_failure_becomes_error_result() {
        let mut provider = MockSearchProvider::new();
        provider
            .expect_search()
            .returning(|_| Err(ToolError::Search("Tavily API error: 500".into())));
        let toolbox = Toolbox::new().with_search(Arc::new(provider));

        let result = toolbox.execute("web_search", json!({"query": "q"})).await;
        assert_eq!(result, json!({"error": "Tavily API error: 500"}));
    }
}
