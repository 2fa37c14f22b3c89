//! WebSocket protocol dispatcher
//!
//! Accepts duplex JSON connections and routes each inbound envelope by its
//! `type`. The contract is strict request/response: every inbound message
//! produces exactly one outbound message correlated via `request_id`, even
//! when the input is malformed, the type is unknown, or a handler panics.
//!
//! Messages on one connection are handled sequentially in arrival order;
//! concurrency comes from multiple connections, not from interleaving within
//! one.

use std::{net::SocketAddr, sync::Arc};

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::{
    capture::CaptureEngine,
    config::Config,
    error::ProtocolError,
    model::{MessageType, ProtocolMessage, ScreenshotPayload, ScreenshotRequest},
    store::ImageStore,
};

/// Shared handler context: the pipeline pieces every request may touch
pub struct DispatchState {
    pub engine: Arc<CaptureEngine>,
    pub store:  ImageStore,
    pub config: Config,
}

/// WebSocket server routing protocol envelopes to the capture pipeline
pub struct Dispatcher {
    listener: TcpListener,
    state:    Arc<DispatchState>,
}

impl Dispatcher {
    /// Binds the listener; pass port 0 to let the OS pick one
    pub async fn bind(addr: SocketAddr, state: Arc<DispatchState>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Protocol dispatcher listening on {}", listener.local_addr()?);
        Ok(Self { listener, state })
    }

    /// The address actually bound
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (socket, peer) = self.listener.accept().await?;
            let state = self.state.clone();
            tokio::spawn(async move {
                debug!("Protocol connection from {}", peer);
                if let Err(e) = handle_connection(socket, state).await {
                    debug!("Connection from {} ended: {}", peer, e);
                }
            });
        }
    }
}

async fn handle_connection(
    socket: TcpStream,
    state: Arc<DispatchState>,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let mut ws = tokio_tungstenite::accept_async(socket).await?;

    while let Some(inbound) = ws.next().await {
        match inbound? {
            Message::Text(raw) => {
                let response = handle_message(&state, &raw).await;
                let outbound = match serde_json::to_string(&response) {
                    Ok(json) => json,
                    Err(e) => {
                        // Responses are plain data; serialization cannot
                        // realistically fail, but never go silent if it does.
                        warn!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                ws.send(Message::Text(outbound)).await?;
            }
            Message::Close(_) => break,
            // Pings are answered by the protocol layer; binary frames have
            // no meaning in this protocol.
            _ => {}
        }
    }

    Ok(())
}

/// Routes one raw inbound message to exactly one response
///
/// Handlers run in a spawned task so a panic is caught at this boundary and
/// answered with an `InternalHandlerFailure` error instead of killing the
/// connection.
pub async fn handle_message(state: &Arc<DispatchState>, raw: &str) -> ProtocolMessage {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            let error = ProtocolError::MalformedRequest {
                reason: e.to_string(),
            };
            return ProtocolMessage::error_response(None, error.code(), error.to_string());
        }
    };

    // Keep whatever id the sender managed to supply so even a rejection can
    // be correlated.
    let salvaged_id = value.get("id").and_then(|v| v.as_str()).map(str::to_string);
    let raw_kind = value
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let message: ProtocolMessage = match serde_json::from_value(value) {
        Ok(m) => m,
        Err(e) => {
            let error = ProtocolError::MalformedRequest {
                reason: e.to_string(),
            };
            return ProtocolMessage::error_response(salvaged_id, error.code(), error.to_string());
        }
    };

    let request_id = message.id.clone();
    let state = state.clone();
    let handle = tokio::spawn(async move { route(state, message, raw_kind).await });

    match handle.await {
        Ok(response) => response,
        Err(e) => {
            let error = ProtocolError::InternalHandlerFailure {
                reason: e.to_string(),
            };
            warn!("Handler for message {} failed: {}", request_id, e);
            ProtocolMessage::error_response(Some(request_id), error.code(), error.to_string())
        }
    }
}

async fn route(
    state: Arc<DispatchState>,
    message: ProtocolMessage,
    raw_kind: String,
) -> ProtocolMessage {
    match message.kind {
        MessageType::WindowListRequest => {
            let windows = state.engine.list().await;
            ProtocolMessage::response(
                message.id,
                MessageType::WindowListResponse,
                serde_json::json!({ "windows": windows }),
            )
        }
        MessageType::WindowScreenshotRequest => handle_screenshot(&state, message).await,
        // Pass-through surfaces; useful as liveness probes.
        MessageType::FunctionCall => {
            ProtocolMessage::response(message.id, MessageType::FunctionResult, message.content)
        }
        MessageType::Text => {
            ProtocolMessage::response(message.id, MessageType::Text, message.content)
        }
        _ => {
            let kind = if raw_kind.is_empty() {
                "(missing)".to_string()
            } else {
                raw_kind
            };
            let error = ProtocolError::UnsupportedType { kind };
            ProtocolMessage::error_response(Some(message.id), error.code(), error.to_string())
        }
    }
}

async fn handle_screenshot(state: &DispatchState, message: ProtocolMessage) -> ProtocolMessage {
    let content = match normalize_content(message.content) {
        Ok(content) => content,
        Err(error) => {
            return ProtocolMessage::error_response(
                Some(message.id),
                error.code(),
                error.to_string(),
            );
        }
    };

    // Absent content means "capture the foreground with defaults".
    let request: ScreenshotRequest = if content.is_null() {
        ScreenshotRequest::default()
    } else {
        match serde_json::from_value(content) {
            Ok(r) => r,
            Err(e) => {
                let error = ProtocolError::MalformedRequest {
                    reason: e.to_string(),
                };
                return ProtocolMessage::error_response(
                    Some(message.id),
                    error.code(),
                    error.to_string(),
                );
            }
        }
    };

    // A zero bound can never be satisfied; reject it before capture work.
    if request.max_dimension == Some(0) {
        let error = ProtocolError::MalformedRequest {
            reason: "max_dimension must be > 0".to_string(),
        };
        return ProtocolMessage::error_response(Some(message.id), error.code(), error.to_string());
    }

    let max_dimension = request
        .max_dimension
        .unwrap_or(state.config.max_image_dimension);
    let max_bytes = request.max_bytes.unwrap_or(state.config.max_file_size_bytes);

    let image = match state
        .engine
        .capture(request.window_ref(), max_dimension, max_bytes)
        .await
    {
        Ok(image) => image,
        Err(e) => {
            return ProtocolMessage::error_response(
                Some(message.id),
                e.code(),
                format!("{}. {}", e, e.remediation_hint()),
            );
        }
    };

    let entry = match state
        .store
        .put(&image.hash, &image.bytes, state.config.file_expiry)
        .await
    {
        Ok(entry) => entry,
        Err(e) => {
            return ProtocolMessage::error_response(Some(message.id), e.code(), e.to_string());
        }
    };

    let payload = ScreenshotPayload {
        uri:             state.config.image_uri(&entry.hash),
        format:          image.format,
        window_id:       image.window_id,
        window_title:    image.window_title,
        hash:            entry.hash,
        local_file_path: entry.file_path.to_string_lossy().to_string(),
    };

    match serde_json::to_value(&payload) {
        Ok(content) => {
            ProtocolMessage::response(message.id, MessageType::WindowScreenshotResponse, content)
        }
        Err(e) => {
            let error = ProtocolError::InternalHandlerFailure {
                reason: e.to_string(),
            };
            ProtocolMessage::error_response(Some(message.id), error.code(), error.to_string())
        }
    }
}

/// Unwraps double-encoded content
///
/// Some senders encode `content` as a JSON string holding JSON. A string
/// that parses as JSON is unwrapped one level; a string that does not parse
/// is a malformed request rather than a silently-empty one.
fn normalize_content(content: serde_json::Value) -> Result<serde_json::Value, ProtocolError> {
    match content {
        serde_json::Value::String(inner) => {
            serde_json::from_str(&inner).map_err(|e| ProtocolError::MalformedRequest {
                reason: format!("string content is not valid JSON: {}", e),
            })
        }
        other => Ok(other),
    }
}
