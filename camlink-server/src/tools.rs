//! Callable tool surface
//!
//! An explicit table mapping tool name to handler function with a declared
//! input schema, built once at startup. No runtime introspection: adding a
//! tool means adding an entry to [`ToolRegistry::with_builtin_tools`].

use crate::config::ServerConfig;
use crate::encode::{encode_frame, EncodeError, ImageContent};
use camlink_capture::{CaptureError, StreamRegistry};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

/// Shared state every tool handler receives
pub struct ToolContext {
    /// The per-device stream registry
    pub registry: StreamRegistry,
    /// Effective server configuration
    pub config: ServerConfig,
}

/// Errors surfaced to the caller as short human-readable strings
#[derive(Error, Debug)]
pub enum ToolError {
    /// A capture-layer failure, forwarded verbatim
    #[error("{0}")]
    Capture(#[from] CaptureError),

    /// Image encoding failed
    #[error("{0}")]
    Encode(#[from] EncodeError),

    /// The arguments did not match the tool's input schema
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        /// What was wrong
        message: String,
    },

    /// No tool with the requested name
    #[error("unknown tool: {name} (available: {available})")]
    UnknownTool {
        /// Requested name
        name: String,
        /// Comma-separated known tool names
        available: String,
    },
}

/// Result of a successful tool call
#[derive(Debug)]
pub enum ToolOutput {
    /// A structured JSON payload
    Json(Value),
    /// An encoded image payload
    Image(ImageContent),
}

impl ToolOutput {
    /// Flatten the output into the JSON value sent to the caller
    pub fn into_value(self) -> Value {
        match self {
            ToolOutput::Json(value) => value,
            ToolOutput::Image(content) => json!({
                "type": content.content_type,
                "mimeType": content.mime_type,
                "data": content.data,
            }),
        }
    }
}

type ToolHandler = fn(&ToolContext, &Value) -> Result<ToolOutput, ToolError>;

/// One callable tool: name, description, input schema, handler
pub struct ToolDef {
    /// Tool name as invoked by the caller
    pub name: &'static str,
    /// One-line description shown to the agent
    pub description: &'static str,
    /// JSON schema of the arguments object
    pub input_schema: Value,
    handler: ToolHandler,
}

/// The tool table, built at startup
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    /// Build the table of built-in camera tools
    pub fn with_builtin_tools() -> Self {
        let tools = vec![
            ToolDef {
                name: "list_cameras",
                description: "Return a list of available camera device indices.",
                input_schema: no_arguments_schema(),
                handler: list_cameras,
            },
            ToolDef {
                name: "get_camera_info",
                description: "Return camera resolution and FPS for the specified device.",
                input_schema: camera_id_schema(),
                handler: get_camera_info,
            },
            ToolDef {
                name: "start_camera",
                description: "Start a background capture stream for the specified camera.",
                input_schema: camera_id_schema(),
                handler: start_camera,
            },
            ToolDef {
                name: "capture_from_stream",
                description: "Return the latest frame from an active camera stream.",
                input_schema: camera_id_schema(),
                handler: capture_from_stream,
            },
            ToolDef {
                name: "stop_camera",
                description: "Stop the background capture stream for the specified camera.",
                input_schema: camera_id_schema(),
                handler: stop_camera,
            },
            ToolDef {
                name: "capture_image",
                description: "Capture a single frame from the camera and return it as an image.",
                input_schema: camera_id_schema(),
                handler: capture_image,
            },
        ];
        Self { tools }
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    /// Names of every registered tool, in registration order
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name).collect()
    }

    /// Invoke the named tool with the given arguments
    pub fn dispatch(
        &self,
        ctx: &ToolContext,
        name: &str,
        arguments: &Value,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
            available: self.tool_names().join(", "),
        })?;
        (tool.handler)(ctx, arguments)
    }
}

fn no_arguments_schema() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "additionalProperties": false,
    })
}

fn camera_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "camera_id": {
                "type": ["integer", "string"],
                "description": "Camera device index",
            },
        },
        "required": ["camera_id"],
    })
}

/// Parse the `camera_id` argument; integer and decimal-string forms are
/// both accepted.
fn camera_id_arg(arguments: &Value) -> Result<u32, ToolError> {
    let value = arguments
        .get("camera_id")
        .ok_or_else(|| ToolError::InvalidArguments {
            message: "missing required argument: camera_id".to_string(),
        })?;
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|id| u32::try_from(id).ok()),
        Value::String(s) => s.parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ToolError::InvalidArguments {
        message: format!("camera_id must be a non-negative device index, got {value}"),
    })
}

fn list_cameras(ctx: &ToolContext, _arguments: &Value) -> Result<ToolOutput, ToolError> {
    let devices = ctx.registry.list_devices(ctx.config.max_probe_devices);
    Ok(ToolOutput::Json(json!(devices)))
}

fn get_camera_info(ctx: &ToolContext, arguments: &Value) -> Result<ToolOutput, ToolError> {
    let device_id = camera_id_arg(arguments)?;
    let info = ctx.registry.camera_info(device_id)?;
    Ok(ToolOutput::Json(json!({
        "id": info.device_id,
        "width": info.width,
        "height": info.height,
        "fps": info.fps,
    })))
}

fn start_camera(ctx: &ToolContext, arguments: &Value) -> Result<ToolOutput, ToolError> {
    let device_id = camera_id_arg(arguments)?;
    let start = ctx.registry.start_stream(device_id)?;
    let status = if start.already_running {
        "already_running"
    } else {
        "started"
    };
    info!(device_id, status, "start_camera");
    Ok(ToolOutput::Json(json!({
        "status": status,
        "width": start.info.width,
        "height": start.info.height,
        "fps": start.info.fps,
    })))
}

fn capture_from_stream(ctx: &ToolContext, arguments: &Value) -> Result<ToolOutput, ToolError> {
    let device_id = camera_id_arg(arguments)?;
    let frame = ctx.registry.capture_from_stream(device_id)?;
    Ok(ToolOutput::Image(encode_frame(&frame)?))
}

fn stop_camera(ctx: &ToolContext, arguments: &Value) -> Result<ToolOutput, ToolError> {
    let device_id = camera_id_arg(arguments)?;
    ctx.registry.stop_stream(device_id)?;
    info!(device_id, "stop_camera");
    Ok(ToolOutput::Json(json!({ "status": "stopped" })))
}

fn capture_image(ctx: &ToolContext, arguments: &Value) -> Result<ToolOutput, ToolError> {
    let device_id = camera_id_arg(arguments)?;
    let frame = ctx.registry.capture_oneshot(device_id)?;
    info!(device_id, "captured one-shot image");
    Ok(ToolOutput::Image(encode_frame(&frame)?))
}
