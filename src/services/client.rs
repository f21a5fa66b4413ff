//! Client side of the stdio tool channel.

use crate::services::fetch::Location;
use crate::services::protocol::*;
use crate::services::resources::ResourceTemplate;
use crate::services::tools::{ToolBackend, ToolError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

type Reader = Box<dyn AsyncBufRead + Send + Unpin>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct Connection {
    reader: Reader,
    writer: Writer,
}

/// Talks to a tool server over a pair of byte streams, usually a child's stdio
pub struct StdioToolClient {
    conn: Mutex<Connection>,
    next_id: AtomicU64,
    _child: Option<Child>,
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    resources: Vec<ResourceTemplate>,
}

impl StdioToolClient {
    /// Launch `program args...` and complete the handshake
    pub async fn spawn(program: &Path, args: &[String]) -> Result<Self, ToolError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child.stdin.take().ok_or(ToolError::Closed)?;
        let stdout = child.stdout.take().ok_or(ToolError::Closed)?;
        tracing::info!(program = %program.display(), "started tool server");

        let mut client = Self::over(BufReader::new(stdout), stdin);
        client._child = Some(child);
        client.initialize().await?;
        Ok(client)
    }

    /// Use already-connected streams. The handshake is left to the caller.
    pub fn over(reader: impl AsyncBufRead + Send + Unpin + 'static, writer: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            conn: Mutex::new(Connection {
                reader: Box::new(reader),
                writer: Box::new(writer),
            }),
            next_id: AtomicU64::new(1),
            _child: None,
        }
    }

    pub async fn initialize(&self) -> Result<Value, ToolError> {
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}
                }),
            )
            .await?;
        self.notify("notifications/initialized").await?;
        Ok(result)
    }

    /// Send one request and wait for the reply with the same id
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        let mut conn = self.conn.lock().await;
        conn.send(&line).await?;
        loop {
            let response = conn.receive().await?;
            if response.id != Some(Value::from(id)) {
                tracing::debug!(id = ?response.id, "skipping unrelated message");
                continue;
            }
            if let Some(err) = response.error {
                return Err(ToolError::Rpc {
                    code: err.code,
                    message: err.message,
                });
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    async fn notify(&self, method: &str) -> Result<(), ToolError> {
        let msg = json!({"jsonrpc": "2.0", "method": method});
        self.conn.lock().await.send(&msg.to_string()).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<String, ToolError> {
        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        let result: ToolCallResult = serde_json::from_value(result)?;
        result.into_text().map_err(ToolError::Remote)
    }
}

impl Connection {
    async fn send(&mut self, line: &str) -> Result<(), ToolError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> Result<JsonRpcResponse, ToolError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Err(ToolError::Closed);
            }
            if !line.trim().is_empty() {
                return Ok(serde_json::from_str(line.trim())?);
            }
        }
    }
}

#[async_trait]
impl ToolBackend for StdioToolClient {
    async fn check_air_quality(&self, location: Location) -> Result<String, ToolError> {
        self.call_tool(
            "check_air_quality",
            json!({"latitude": location.lat, "longitude": location.lon}),
        )
        .await
    }

    async fn get_news(&self) -> Result<String, ToolError> {
        self.call_tool("get_news", json!({})).await
    }

    async fn rate_news_sentiment(&self, title: &str, description: &str) -> Result<u8, ToolError> {
        let text = self
            .call_tool(
                "rate_news_sentiment",
                json!({"title": title, "description": description}),
            )
            .await?;
        text.trim()
            .parse()
            .map_err(|_| ToolError::Remote(format!("unexpected rating {text:?}")))
    }

    async fn list_resources(&self) -> Result<Vec<ResourceTemplate>, ToolError> {
        let result = self.request("resources/list", json!({})).await?;
        Ok(serde_json::from_value::<ResourceList>(result)?.resources)
    }

    async fn read_resource(&self, uri: &str) -> Result<String, ToolError> {
        let result = self.request("resources/read", json!({"uri": uri})).await?;
        let result: ReadResourceResult = serde_json::from_value(result)?;
        result
            .contents
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| ToolError::UnknownResource(uri.to_string()))
    }
}
