//! Tool server: JSON-RPC lines on stdin, replies on stdout.

use crate::services::fetch::Location;
use crate::services::protocol::*;
use crate::services::tools::{ToolBackend, ToolError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

pub struct ToolServer {
    tools: Arc<dyn ToolBackend>,
}

#[derive(Debug, Deserialize)]
struct AirQualityArgs {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct RateArgs {
    title: String,
    description: String,
}

pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "check_air_quality".into(),
            description: "Current air quality index and pollutant levels for a location".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"}
                },
                "required": ["latitude", "longitude"]
            }),
        },
        ToolDefinition {
            name: "get_news".into(),
            description: "Recent environmental news articles".into(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "rate_news_sentiment".into(),
            description: "Rate how positive an environmental article is, 0 to 10".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"}
                },
                "required": ["title", "description"]
            }),
        },
    ]
}

impl ToolServer {
    pub fn new(tools: Arc<dyn ToolBackend>) -> Self {
        Self { tools }
    }

    /// Serve until stdin closes
    pub async fn serve_stdio(&self) -> std::io::Result<()> {
        self.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
    }

    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("tool server started");
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            tracing::debug!(request = %line, "<-");
            let Some(response) = self.handle(&line).await else {
                continue;
            };
            let out = serde_json::to_string(&response)?;
            tracing::debug!(response = %out, "->");
            writer.write_all(out.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        tracing::info!("tool server shutting down");
        Ok(())
    }

    /// Handle one message. Notifications get no reply.
    pub async fn handle(&self, msg: &str) -> Option<JsonRpcResponse> {
        let req: JsonRpcRequest = match serde_json::from_str(msg) {
            Ok(r) => r,
            Err(e) => return Some(JsonRpcResponse::error(None, PARSE_ERROR, e.to_string())),
        };
        if req.id.is_none() {
            tracing::debug!(method = %req.method, "notification");
            return None;
        }
        let id = req.id.clone();
        let result = match req.method.as_str() {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {"listChanged": false}, "resources": {"listChanged": false}},
                "serverInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}
            })),
            "tools/list" => Ok(json!({"tools": tool_definitions()})),
            "tools/call" => match serde_json::from_value::<ToolCallParams>(req.params) {
                Ok(params) => Ok(to_value(self.call_tool(&params.name, params.arguments).await)),
                Err(e) => Err((INVALID_PARAMS, e.to_string())),
            },
            "resources/list" => match self.tools.list_resources().await {
                Ok(templates) => Ok(json!({"resources": templates})),
                Err(e) => Err((INTERNAL_ERROR, e.to_string())),
            },
            "resources/read" => match serde_json::from_value::<ReadResourceParams>(req.params) {
                Ok(params) => match self.tools.read_resource(&params.uri).await {
                    Ok(text) => Ok(to_value(ReadResourceResult {
                        contents: vec![ResourceContents {
                            uri: params.uri,
                            mime_type: "application/json".into(),
                            text,
                        }],
                    })),
                    Err(e) => Err((INVALID_PARAMS, e.to_string())),
                },
                Err(e) => Err((INVALID_PARAMS, e.to_string())),
            },
            other => Err((METHOD_NOT_FOUND, format!("Unknown method: {other}"))),
        };
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        tracing::info!(tool = name, "tool call");
        let outcome = match name {
            "check_air_quality" => match serde_json::from_value::<AirQualityArgs>(arguments) {
                Ok(args) => {
                    let location = Location {
                        lat: args.latitude,
                        lon: args.longitude,
                    };
                    self.tools.check_air_quality(location).await
                }
                Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
            },
            "get_news" => self.tools.get_news().await,
            "rate_news_sentiment" => match serde_json::from_value::<RateArgs>(arguments) {
                Ok(args) => self
                    .tools
                    .rate_news_sentiment(&args.title, &args.description)
                    .await
                    .map(|r| r.to_string()),
                Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
            },
            other => Err(ToolError::UnknownTool(other.to_string())),
        };
        match outcome {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool call failed");
                ToolCallResult::error(e.to_string())
            }
        }
    }
}

fn to_value(value: impl serde::Serialize) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}
