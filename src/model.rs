//! Data models and type definitions for winshot
//!
//! This module defines the core types used throughout the pipeline:
//! - Window identity types ([`WindowDescriptor`], [`WindowRef`])
//! - Capture results ([`CapturedImage`], [`ImageFormat`])
//! - Protocol message envelope ([`ProtocolMessage`], [`MessageType`])
//! - The screenshot response payload ([`ScreenshotPayload`])

use serde::{Deserialize, Serialize};

/// A top-level window as reported by an enumeration pass
///
/// `id` is a process-qualified, platform-stable handle (e.g.
/// `"Chrome:Google Chrome"` on macOS, a numeric X11 window id on Linux).
/// Uniqueness holds per enumeration call only; a window may vanish between
/// enumeration and capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowDescriptor {
    /// Opaque, string-serializable window handle
    pub id:      String,
    /// Window title at enumeration time
    pub title:   String,
    /// Name of the owning process
    pub process: String,
}

impl WindowDescriptor {
    /// Creates a new window descriptor
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        process: impl Into<String>,
    ) -> Self {
        Self {
            id:      id.into(),
            title:   title.into(),
            process: process.into(),
        }
    }

    /// Placeholder descriptor used when even the foreground window cannot be
    /// identified; strategies then capture whatever is frontmost.
    pub fn foreground_placeholder() -> Self {
        Self::new("foreground", "", "")
    }
}

/// How a capture request identifies its target window
///
/// Resolved against the most recent enumeration snapshot. An unresolvable
/// reference falls back to the current foreground window; that fallback is
/// policy, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowRef {
    /// A window id from a prior `window_list_response`
    Id(String),
    /// A 1-based index into the most recent enumeration
    Index(usize),
}

impl std::fmt::Display for WindowRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowRef::Id(id) => write!(f, "{}", id),
            WindowRef::Index(i) => write!(f, "#{}", i),
        }
    }
}

/// Delivery format for captured images
///
/// PNG is the only supported delivery format; the enum exists so the wire
/// shape and content types stay explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Portable Network Graphics
    Png,
}

impl ImageFormat {
    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
        }
    }

    /// HTTP content type for this format
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
        }
    }

    /// Returns the format as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A finished capture: constrained, encoded bytes plus provenance
///
/// `hash` is computed over the final bytes (post-resize, post-compression),
/// so identical visual output always yields the same store key. `window_id`
/// and `window_title` name the window that was actually captured, which may
/// differ from the requested one after a foreground fallback; the divergence
/// is reported here, never hidden. Immutable once created.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// Encoded image bytes
    pub bytes:        Vec<u8>,
    /// Final width in pixels
    pub width:        u32,
    /// Final height in pixels
    pub height:       u32,
    /// Encoding of `bytes`
    pub format:       ImageFormat,
    /// Content hash over `bytes` (lowercase hex SHA-256)
    pub hash:         String,
    /// Id of the window actually captured
    pub window_id:    String,
    /// Title of the window actually captured
    pub window_title: String,
}

/// Screenshot response payload
///
/// Both `uri` (File-Server-reachable) and `local_file_path` are always
/// populated together so a consumer can choose either.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotPayload {
    /// HTTP URI serving the image bytes
    pub uri:             String,
    /// Delivery format
    pub format:          ImageFormat,
    /// Id of the window actually captured
    pub window_id:       String,
    /// Title of the window actually captured
    pub window_title:    String,
    /// Content hash (store key)
    pub hash:            String,
    /// Filesystem path of the stored image
    pub local_file_path: String,
}

/// Message types routed by the dispatcher
///
/// Unrecognized strings deserialize to [`MessageType::Unknown`] so the
/// dispatcher can answer them with an `UnsupportedType` error instead of
/// dropping the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    WindowListRequest,
    WindowListResponse,
    WindowScreenshotRequest,
    WindowScreenshotResponse,
    FunctionCall,
    FunctionResult,
    Text,
    Error,
    /// Any type string not in the routing table
    #[serde(other)]
    Unknown,
}

/// The protocol envelope exchanged over the duplex connection
///
/// `request_id` is absent on requests and set to the originating request's
/// `id` on responses. `id` must be unique per connection; the dispatcher does
/// not deduplicate, so id reuse is a caller error with undefined correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolMessage {
    /// Unique message identity (per connection)
    pub id:         String,
    /// Id of the request this message answers; absent on requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Routing key
    #[serde(rename = "type")]
    pub kind:       MessageType,
    /// Structured payload; shape depends on `kind`
    #[serde(default)]
    pub content:    serde_json::Value,
}

impl ProtocolMessage {
    /// Builds a response correlated to `request_id` with a fresh `id`
    pub fn response(
        request_id: impl Into<String>,
        kind: MessageType,
        content: serde_json::Value,
    ) -> Self {
        Self {
            id:         uuid::Uuid::new_v4().to_string(),
            request_id: Some(request_id.into()),
            kind,
            content,
        }
    }

    /// Builds an `error` response carrying a stable code and message
    pub fn error_response(request_id: Option<String>, code: &str, message: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_id,
            kind: MessageType::Error,
            content: serde_json::json!({ "code": code, "message": message }),
        }
    }
}

/// Body of a `window_screenshot_request`
///
/// Clients send `content` either as a JSON object or as a
/// JSON-encoded string; the dispatcher normalizes both before this type is
/// parsed. `window_index` is 1-based.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenshotRequest {
    /// Target window id from a prior listing
    pub window_id:     Option<String>,
    /// 1-based index into the most recent listing
    pub window_index:  Option<usize>,
    /// Override for the configured maximum dimension
    pub max_dimension: Option<u32>,
    /// Override for the configured maximum byte size
    pub max_bytes:     Option<u64>,
}

impl ScreenshotRequest {
    /// Resolves the request body to a [`WindowRef`], id taking precedence
    pub fn window_ref(&self) -> Option<WindowRef> {
        if let Some(id) = &self.window_id {
            Some(WindowRef::Id(id.clone()))
        } else {
            self.window_index.map(WindowRef::Index)
        }
    }
}
