// ABOUTME: Tools the agent backend can call during a prompt.
// ABOUTME: Web search, arithmetic, and encyclopedia lookup behind one dispatcher.

pub mod calculator;
pub mod search;
pub mod wikipedia;

use crate::openai::{FunctionDefinition, ToolDefinition};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

pub const SEARCH: &str = "search";
pub const CALCULATOR: &str = "calculator";
pub const WIKIPEDIA: &str = "wikipedia";

/// Shared state needed to execute tools
#[derive(Clone)]
pub struct ToolContext {
    pub http: reqwest::Client,
    /// Search is only offered when a key is configured
    pub serpapi_api_key: Option<String>,
}

impl ToolContext {
    pub fn new(serpapi_api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("aibot/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build tool HTTP client")?;
        Ok(Self {
            http,
            serpapi_api_key,
        })
    }

    /// Tool definitions for the function-calling API
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut tools = Vec::with_capacity(3);
        if self.serpapi_api_key.is_some() {
            tools.push(definition(
                SEARCH,
                "Search the web. Useful for current events and facts that change over time. \
                 Input should be a search query.",
                "query",
                "The search query",
            ));
        }
        tools.push(definition(
            CALCULATOR,
            "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses, \
             sqrt(), abs(), and the constants pi and e.",
            "expression",
            "The expression to evaluate, e.g. (3 + 4) * 2 ^ 3",
        ));
        tools.push(definition(
            WIKIPEDIA,
            "Look up general knowledge about people, places, companies, historical events, \
             or other subjects on Wikipedia.",
            "query",
            "The subject to look up",
        ));
        tools
    }
}

fn definition(name: &str, description: &str, param: &str, param_description: &str) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    param: {
                        "type": "string",
                        "description": param_description
                    }
                },
                "required": [param]
            }),
        },
    }
}

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
struct ExpressionArgs {
    expression: String,
}

/// Dispatcher for tool calls
pub struct ToolExecutor;

impl ToolExecutor {
    /// Execute a tool by name with the given JSON arguments
    pub async fn execute(name: &str, arguments: &str, ctx: &ToolContext) -> Result<String> {
        tracing::debug!(tool = %name, arguments = %arguments, "Executing tool");

        match name {
            SEARCH => {
                let args: QueryArgs =
                    serde_json::from_str(arguments).context("Invalid search arguments")?;
                let key = ctx
                    .serpapi_api_key
                    .as_deref()
                    .context("Search is not configured")?;
                search::search(&ctx.http, key, &args.query).await
            }
            CALCULATOR => {
                let args: ExpressionArgs =
                    serde_json::from_str(arguments).context("Invalid calculator arguments")?;
                let value = calculator::evaluate(&args.expression)?;
                Ok(calculator::format_number(value))
            }
            WIKIPEDIA => {
                let args: QueryArgs =
                    serde_json::from_str(arguments).context("Invalid wikipedia arguments")?;
                wikipedia::lookup(&ctx.http, &args.query).await
            }
            _ => {
                tracing::warn!(tool = %name, "Unknown tool requested");
                bail!("Unknown tool: {}", name)
            }
        }
    }
}
