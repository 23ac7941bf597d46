//! MCP server lifecycle and request dispatch.
//!
//! 1. **Initialisation**: `initialize` request, then the client's
//!    `notifications/initialized`
//! 2. **Operation**: `tools/list`, `tools/call` and `ping`
//! 3. **Shutdown**: stdin closes or the process receives a signal
//!
//! Tool calls are forwarded to the diagram engine one at a time; the
//! server holds no diagram state of its own.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::TimingApi;
use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools;
use crate::mcp::transport::StdioTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize answered, waiting for the initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: ToolCapabilities { list_changed: false },
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCapabilities {
    /// The tool list is fixed for the whole session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Name and version reported to the client.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters of the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    pub protocol_version: String,
    /// Client capabilities (unused).
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for the tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the tool's arguments.
    pub input_schema: Value,
}

/// Parameters of a tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text.
        text: String,
    },
    /// Base64-encoded image content.
    Image {
        /// Base64 image bytes.
        data: String,
        /// MIME type, e.g. `image/png`.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the call failed.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if passes &T
const fn is_false(b: &bool) -> bool {
    !*b
}

impl ToolCallResult {
    /// A successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A successful result holding `value` as pretty-printed JSON.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(format!("Failed to serialise result: {e}")),
        }
    }

    /// A successful result with a caption and an image.
    #[must_use]
    pub fn image(caption: impl Into<String>, data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: vec![
                ToolContent::Text {
                    text: caption.into(),
                },
                ToolContent::Image {
                    data: data.into(),
                    mime_type: mime_type.into(),
                },
            ],
            is_error: false,
        }
    }

    /// An error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// The timing diagram MCP server.
pub struct McpServer {
    state: ServerState,
    transport: StdioTransport,
    /// Negotiated protocol version, set by initialize.
    protocol_version: Option<String>,
    api: TimingApi,
}

impl McpServer {
    /// Creates a server that forwards tool calls to `api`.
    #[must_use]
    pub fn new(api: TimingApi) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            protocol_version: None,
            api,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Negotiated protocol version, once initialised.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Runs the main loop until stdin closes or a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        tracing::info!(engine = %self.api.client().base_url(), "MCP server listening on stdio");
        let result = self.run_with_shutdown().await;
        tracing::info!("MCP server stopped");
        result
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    if self.handle_input(line).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line = self.transport.read_line() => {
                    if self.handle_input(line).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles one read from the transport. Returns `true` to stop.
    async fn handle_input(&mut self, line: std::io::Result<Option<String>>) -> std::io::Result<bool> {
        let Some(line) = line? else {
            tracing::debug!("stdin closed");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        match parse_message(&line) {
            Ok(msg) => match self.dispatch(msg).await {
                Some(Ok(response)) => self.transport.write_response(&response).await?,
                Some(Err(error)) => self.transport.write_error(&error).await?,
                None => {}
            },
            Err(error) => {
                tracing::warn!(code = error.error.code, "Rejected malformed message");
                self.transport.write_error(&error).await?;
            }
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Processes one parsed message and returns the reply, if the message
    /// needs one. Notifications never get a reply.
    pub async fn dispatch(
        &mut self,
        msg: IncomingMessage,
    ) -> Option<Result<JsonRpcResponse, JsonRpcError>> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(&req).await),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    async fn handle_request(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        tracing::trace!(id = %req.id, method = %req.method, "Request");
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req).await,
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                tracing::info!("Client initialised");
                self.state = ServerState::Running;
            }
            method => tracing::debug!(method, "Ignoring notification"),
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                ErrorCode::InvalidRequest,
                "Server already initialised",
            ));
        }

        let params: InitializeParams = req.parse_params("initialize")?;
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested = %params.protocol_version,
                "Initialising"
            );
        }
        if params.protocol_version != MCP_PROTOCOL_VERSION {
            tracing::debug!(
                requested = %params.protocol_version,
                offered = MCP_PROTOCOL_VERSION,
                "Client asked for a different protocol version"
            );
        }

        self.protocol_version = Some(MCP_PROTOCOL_VERSION.to_string());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });
        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tools::definitions() }),
        ))
    }

    async fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req.parse_params("tool call")?;
        let result = tools::call(&self.api, &params.name, &params.arguments).await;

        let value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(req.id.clone(), "Internal error: failed to serialise result")
        })?;
        Ok(JsonRpcResponse::success(req.id.clone(), value))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state == ServerState::Running {
            return Ok(());
        }
        Err(JsonRpcError::new(
            Some(id.clone()),
            ErrorCode::InvalidRequest,
            "Server not initialised",
        ))
    }
}
