//! Line-delimited JSON dispatch loop over stdio
//!
//! One request per line in, one response per line out. Malformed input
//! produces an error response and the loop continues; camera-level
//! failures never terminate the server. EOF or an interrupt drains into
//! registry shutdown.

use crate::tools::{ToolContext, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// A single tool invocation request
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    /// Opaque correlation id echoed back in the response
    #[serde(default)]
    pub id: Option<Value>,
    /// Name of the tool to invoke
    pub tool: String,
    /// Arguments object; defaults to empty
    #[serde(default)]
    pub arguments: Value,
}

/// Response to a tool invocation
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    /// Correlation id from the request, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Whether the call succeeded
    pub ok: bool,
    /// Success payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Short human-readable error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<Value>, error: String) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(error),
        }
    }
}

/// Serve tool requests from stdin until EOF or interrupt, then shut the
/// registry down.
pub async fn serve(ctx: Arc<ToolContext>, tools: Arc<ToolRegistry>) -> std::io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!(tools = ?tools.tool_names(), "serving tool requests on stdio");
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let response = handle_line(&ctx, &tools, line).await;
                    let mut payload = serde_json::to_vec(&response).unwrap_or_else(|_| {
                        br#"{"ok":false,"error":"response serialization failed"}"#.to_vec()
                    });
                    payload.push(b'\n');
                    stdout.write_all(&payload).await?;
                    stdout.flush().await?;
                }
                None => {
                    info!("stdin closed, shutting down");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("interrupt received, shutting down");
                break;
            }
        }
    }

    ctx.registry.shutdown();
    Ok(())
}

/// Parse and dispatch one request line.
///
/// Hardware open/close can block for tens of milliseconds, so dispatch
/// runs on the blocking pool rather than the reactor.
async fn handle_line(ctx: &Arc<ToolContext>, tools: &Arc<ToolRegistry>, line: &str) -> ToolResponse {
    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!("malformed request line: {}", e);
            return ToolResponse::failure(None, format!("malformed request: {e}"));
        }
    };

    let ctx = ctx.clone();
    let tools = tools.clone();
    let join = tokio::task::spawn_blocking(move || {
        let outcome = tools.dispatch(&ctx, &request.tool, &request.arguments);
        (request.id, outcome)
    })
    .await;

    match join {
        Ok((id, Ok(output))) => ToolResponse::success(id, output.into_value()),
        Ok((id, Err(e))) => ToolResponse::failure(id, e.to_string()),
        Err(e) => ToolResponse::failure(None, format!("tool execution failed: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use camlink_capture::{MockBackend, StreamRegistry};
    use serde_json::json;

    fn context() -> Arc<ToolContext> {
        let config = ServerConfig::default();
        let registry = StreamRegistry::new(
            Arc::new(MockBackend::new(&[0])),
            config.stream_config(),
        );
        Arc::new(ToolContext { registry, config })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handle_line_success_and_id_echo() {
        let ctx = context();
        let tools = Arc::new(ToolRegistry::with_builtin_tools());

        let response =
            handle_line(&ctx, &tools, r#"{"id": 7, "tool": "list_cameras"}"#).await;
        assert!(response.ok);
        assert_eq!(response.id, Some(json!(7)));
        assert_eq!(response.result, Some(json!([0])));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handle_line_malformed_request() {
        let ctx = context();
        let tools = Arc::new(ToolRegistry::with_builtin_tools());

        let response = handle_line(&ctx, &tools, "not json").await;
        assert!(!response.ok);
        assert!(response.error.unwrap().contains("malformed request"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_handle_line_tool_error_is_a_short_string() {
        let ctx = context();
        let tools = Arc::new(ToolRegistry::with_builtin_tools());

        let response = handle_line(
            &ctx,
            &tools,
            r#"{"tool": "capture_from_stream", "arguments": {"camera_id": 0}}"#,
        )
        .await;
        assert!(!response.ok);
        assert_eq!(
            response.error.unwrap(),
            "camera 0 is not streaming (operation: capture_from_stream)"
        );
    }
}
