//! Stdio JSON-RPC client for MCP servers.
//!
//! The optional Drive and SharePoint adapters delegate their fetches to
//! external MCP servers that run as child processes and speak line-delimited
//! JSON-RPC over stdio. Server processes are spawned lazily on first use and
//! cached on the session object rather than in process-global state, so a
//! host can create, use, and shut down a session without leaking children
//! across test runs. Children are additionally killed on drop.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::McpServerConfig;
use crate::error::{ExtractError, Result};

/// The remote tool-invocation contract consumed by the MCP-backed adapters.
///
/// Given a server name, a tool name, and an argument mapping, returns the
/// tool's result mapping (containing at least a `content` string on
/// success).
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> Result<Value>;
}

struct ServerProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_id: u64,
}

/// A session holding configured MCP servers and their running processes.
pub struct McpSession {
    servers: HashMap<String, McpServerConfig>,
    running: Mutex<HashMap<String, ServerProcess>>,
}

impl McpSession {
    pub fn new(servers: HashMap<String, McpServerConfig>) -> Self {
        Self {
            servers,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Terminate all running server processes.
    pub async fn shutdown(&self) {
        let mut running = self.running.lock().await;
        for (name, mut proc) in running.drain() {
            debug!(server = name, "shutting down MCP server");
            if let Err(e) = proc.child.start_kill() {
                warn!(server = name, error = %e, "failed to kill MCP server");
            }
        }
    }

    fn server_config(&self, server: &str) -> Result<&McpServerConfig> {
        let config = self.servers.get(server).ok_or_else(|| {
            ExtractError::upstream(
                format!("mcp:{}", server),
                "server not configured".to_string(),
            )
        })?;
        if !config.enabled {
            return Err(ExtractError::upstream(
                format!("mcp:{}", server),
                "server is disabled".to_string(),
            ));
        }
        Ok(config)
    }

    fn spawn(config: &McpServerConfig) -> Result<ServerProcess> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::dependency(
                        config.command.clone(),
                        format!("install {} and ensure it is on PATH", config.command),
                    )
                } else {
                    ExtractError::unavailable(config.command.clone(), format!("failed to spawn: {}", e))
                }
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            ExtractError::unavailable(config.command.clone(), "no stdin handle")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            ExtractError::unavailable(config.command.clone(), "no stdout handle")
        })?;

        Ok(ServerProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            next_id: 1,
        })
    }
}

#[async_trait]
impl ToolInvoker for McpSession {
    async fn call_tool(&self, server: &str, tool: &str, arguments: Value) -> Result<Value> {
        let config = self.server_config(server)?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let mut running = self.running.lock().await;

        // Respawn if the cached process has exited.
        let dead = match running.get_mut(server) {
            Some(proc) => proc.child.try_wait().ok().flatten().is_some(),
            None => true,
        };
        if dead {
            debug!(server, command = %config.command, "starting MCP server");
            running.insert(server.to_string(), Self::spawn(config)?);
        }
        let proc = running
            .get_mut(server)
            .ok_or_else(|| ExtractError::upstream(format!("mcp:{}", server), "server vanished"))?;

        let id = proc.next_id;
        proc.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": { "name": tool, "arguments": arguments },
        });

        let mut line = serde_json::to_string(&request)
            .map_err(|e| ExtractError::upstream(format!("mcp:{}", server), e.to_string()))?;
        line.push('\n');
        proc.stdin.write_all(line.as_bytes()).await.map_err(|e| {
            ExtractError::unavailable(format!("mcp:{}", server), format!("write failed: {}", e))
        })?;
        proc.stdin.flush().await.map_err(|e| {
            ExtractError::unavailable(format!("mcp:{}", server), format!("flush failed: {}", e))
        })?;

        let mut response_line = String::new();
        tokio::time::timeout(timeout, proc.stdout.read_line(&mut response_line))
            .await
            .map_err(|_| {
                ExtractError::unavailable(
                    format!("mcp:{}", server),
                    format!("timed out after {}s", timeout.as_secs()),
                )
            })?
            .map_err(|e| {
                ExtractError::unavailable(format!("mcp:{}", server), format!("read failed: {}", e))
            })?;

        let response: Value = serde_json::from_str(&response_line).map_err(|e| {
            ExtractError::upstream(format!("mcp:{}", server), format!("bad response: {}", e))
        })?;

        if let Some(error) = response.get("error") {
            return Err(ExtractError::upstream(
                format!("mcp:{}", server),
                error.to_string(),
            ));
        }

        Ok(flatten_tool_result(
            response.get("result").cloned().unwrap_or_else(|| json!({})),
        ))
    }
}

/// Lift the MCP `content` list into a flat `content` string alongside the
/// rest of the result mapping.
fn flatten_tool_result(result: Value) -> Value {
    let Value::Object(ref map) = result else {
        return result;
    };
    let Some(Value::Array(contents)) = map.get("content") else {
        return result;
    };
    let Some(first) = contents.first() else {
        return result;
    };

    let text = first
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or_default();
    let mut flat = map.clone();
    flat.insert("content".to_string(), Value::from(text));
    Value::Object(flat)
}
