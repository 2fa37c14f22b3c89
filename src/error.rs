//! Error types for the capture-and-delivery pipeline
//!
//! Three error families cover the pipeline stages: [`CaptureError`] for the
//! capture engine, [`StoreError`] for the image store, and [`ProtocolError`]
//! for the dispatcher. Each variant carries a stable machine-readable code
//! (via `code()`) that the dispatcher places into `error` responses, plus a
//! human-readable message through `Display`.

/// Result type alias for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Result type alias for image store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by the capture engine
///
/// Permission failures are a distinct kind from transient ones (window gone,
/// activation timeout) so callers can present different guidance. No variant
/// triggers automatic retries beyond the strategy fallback chain.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// No window matched the requested identifier or index
    #[error("Window not found: {window}")]
    WindowNotFound {
        /// The identifier or index that failed to resolve
        window: String,
    },

    /// The resolved window could not be brought to the foreground
    #[error("Failed to activate window '{window}': {reason}")]
    ActivationFailed {
        /// The window that could not be activated
        window: String,
        /// Reason reported by the platform
        reason: String,
    },

    /// A single strategy attempt exceeded its bounded wait
    #[error("Capture strategy '{strategy}' timed out after {duration_ms}ms")]
    CaptureTimeout {
        /// Name of the strategy that timed out
        strategy:    String,
        /// The bounded wait that elapsed, in milliseconds
        duration_ms: u64,
    },

    /// Every strategy in the fallback chain failed
    #[error("All {attempts} capture strategies failed")]
    AllMethodsFailed {
        /// Number of strategies that were attempted
        attempts: usize,
    },

    /// No encoding of the image fits within the requested byte budget
    #[error("Cannot encode image within {max_bytes} bytes (best attempt: {best_bytes})")]
    SizeConstraintUnsatisfiable {
        /// The byte budget from the request
        max_bytes:  u64,
        /// Smallest encoding achieved before giving up
        best_bytes: u64,
    },

    /// The platform denied screen capture access
    #[error("Permission denied for screen capture on {platform}")]
    PermissionDenied {
        /// Platform where permission was denied
        platform: String,
    },

    /// Image decoding or encoding failed
    #[error("Failed to encode image as {format}: {reason}")]
    EncodingFailed {
        /// Image format that failed
        format: String,
        /// Reason for the failure
        reason: String,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Returns the stable machine-readable code for this error
    ///
    /// These codes are what protocol clients match on; they never change
    /// even if the display messages are reworded.
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::WindowNotFound { .. } => "WindowNotFound",
            CaptureError::ActivationFailed { .. } => "ActivationFailed",
            CaptureError::CaptureTimeout { .. } => "CaptureTimeout",
            CaptureError::AllMethodsFailed { .. } => "AllMethodsFailed",
            CaptureError::SizeConstraintUnsatisfiable { .. } => "SizeConstraintUnsatisfiable",
            CaptureError::PermissionDenied { .. } => "PermissionDenied",
            CaptureError::EncodingFailed { .. } => "EncodingFailed",
            CaptureError::Io(_) => "IoError",
        }
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// Provides platform-appropriate guidance a caller can surface alongside
    /// the error message.
    pub fn remediation_hint(&self) -> &str {
        match self {
            CaptureError::WindowNotFound { .. } => {
                "Request a fresh window list and check the identifier or index. Window titles \
                 change dynamically (e.g. browser tabs) and windows may close between listing and \
                 capture."
            }
            CaptureError::ActivationFailed { .. } => {
                "The window could not be raised; the capture may show whichever window was \
                 foreground instead. Check the response's window_id to see what was captured."
            }
            CaptureError::CaptureTimeout { .. } => {
                "A capture strategy took too long, often a stuck permission dialog or an \
                 unresponsive desktop session. Close any pending dialogs and re-issue the request."
            }
            CaptureError::AllMethodsFailed { .. } => {
                "Every capture strategy failed. Verify the platform capture tools are installed \
                 (xdotool and ImageMagick on Linux, screencapture on macOS) and re-issue the \
                 request."
            }
            CaptureError::SizeConstraintUnsatisfiable { .. } => {
                "The image cannot be compressed under max_bytes. Raise the byte budget or lower \
                 max_dimension so less pixel data needs encoding."
            }
            CaptureError::PermissionDenied { .. } => {
                "Grant screen recording permission to this process. On macOS: System Settings > \
                 Privacy & Security > Screen Recording. On Linux, check the X server access \
                 controls."
            }
            CaptureError::EncodingFailed { .. } => {
                "PNG encoding failed. The captured pixel data may be truncated; re-issue the \
                 request."
            }
            CaptureError::Io(_) => {
                "An I/O error occurred. Check file permissions, disk space, and that the \
                 temporary directory is writable."
            }
        }
    }
}

/// Errors produced by the image store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Writing or publishing the image file failed
    #[error("Failed to write store entry '{hash}': {source}")]
    WriteFailed {
        /// Content hash of the entry being written
        hash:   String,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// No entry exists for the given hash (never stored, or already evicted)
    #[error("No store entry for hash '{hash}'")]
    NotFound {
        /// The hash that was looked up
        hash: String,
    },

    /// I/O error outside the write path
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns the stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::WriteFailed { .. } => "WriteFailed",
            StoreError::NotFound { .. } => "NotFound",
            StoreError::Io(_) => "IoError",
        }
    }
}

/// Errors produced at the protocol dispatch boundary
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The message `type` is not in the routing table
    #[error("Unsupported message type: {kind}")]
    UnsupportedType {
        /// The unrecognized type string
        kind: String,
    },

    /// The message could not be parsed as a protocol request
    #[error("Malformed request: {reason}")]
    MalformedRequest {
        /// What failed to parse
        reason: String,
    },

    /// A handler failed in an unexpected way (caught at the dispatch boundary)
    #[error("Internal handler failure: {reason}")]
    InternalHandlerFailure {
        /// Description of the fault
        reason: String,
    },
}

impl ProtocolError {
    /// Returns the stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::UnsupportedType { .. } => "UnsupportedType",
            ProtocolError::MalformedRequest { .. } => "MalformedRequest",
            ProtocolError::InternalHandlerFailure { .. } => "InternalHandlerFailure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_not_found_message_and_code() {
        let error = CaptureError::WindowNotFound {
            window: "Chrome:Google Chrome".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("Window not found"));
        assert!(msg.contains("Chrome"));
        assert_eq!(error.code(), "WindowNotFound");
    }

    #[test]
    fn test_permission_denied_distinct_from_all_methods_failed() {
        let denied = CaptureError::PermissionDenied {
            platform: "macos".to_string(),
        };
        let exhausted = CaptureError::AllMethodsFailed { attempts: 3 };

        assert_ne!(denied.code(), exhausted.code());
        assert_eq!(denied.code(), "PermissionDenied");
        assert_eq!(exhausted.code(), "AllMethodsFailed");
    }

    #[test]
    fn test_permission_denied_remediation() {
        let error = CaptureError::PermissionDenied {
            platform: "macos".to_string(),
        };

        let hint = error.remediation_hint();
        assert!(hint.contains("Screen Recording"));
    }

    #[test]
    fn test_capture_timeout_message() {
        let error = CaptureError::CaptureTimeout {
            strategy:    "screencapture-window".to_string(),
            duration_ms: 3000,
        };

        let msg = error.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("3000"));
        assert!(msg.contains("screencapture-window"));
    }

    #[test]
    fn test_size_constraint_message() {
        let error = CaptureError::SizeConstraintUnsatisfiable {
            max_bytes:  1000,
            best_bytes: 4200,
        };

        let msg = error.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("4200"));
        assert_eq!(error.code(), "SizeConstraintUnsatisfiable");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: CaptureError = io_error.into();

        assert_eq!(error.code(), "IoError");
        assert!(error.to_string().contains("I/O error"));
    }

    #[test]
    fn test_store_not_found_code() {
        let error = StoreError::NotFound {
            hash: "abc123".to_string(),
        };

        assert_eq!(error.code(), "NotFound");
        assert!(error.to_string().contains("abc123"));
    }

    #[test]
    fn test_store_write_failed_carries_hash() {
        let error = StoreError::WriteFailed {
            hash:   "deadbeef".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only fs"),
        };

        assert_eq!(error.code(), "WriteFailed");
        let msg = error.to_string();
        assert!(msg.contains("deadbeef"));
        assert!(msg.contains("read-only fs"));
    }

    #[test]
    fn test_protocol_error_codes() {
        let unsupported = ProtocolError::UnsupportedType {
            kind: "bogus_request".to_string(),
        };
        let malformed = ProtocolError::MalformedRequest {
            reason: "not JSON".to_string(),
        };
        let internal = ProtocolError::InternalHandlerFailure {
            reason: "handler panicked".to_string(),
        };

        assert_eq!(unsupported.code(), "UnsupportedType");
        assert_eq!(malformed.code(), "MalformedRequest");
        assert_eq!(internal.code(), "InternalHandlerFailure");
    }

    #[test]
    fn test_all_capture_codes_are_stable() {
        // The dispatcher promises these exact strings to protocol clients.
        let cases: Vec<(CaptureError, &str)> = vec![
            (
                CaptureError::WindowNotFound {
                    window: "x".to_string(),
                },
                "WindowNotFound",
            ),
            (
                CaptureError::ActivationFailed {
                    window: "x".to_string(),
                    reason: "y".to_string(),
                },
                "ActivationFailed",
            ),
            (CaptureError::AllMethodsFailed { attempts: 2 }, "AllMethodsFailed"),
            (
                CaptureError::SizeConstraintUnsatisfiable {
                    max_bytes:  1,
                    best_bytes: 2,
                },
                "SizeConstraintUnsatisfiable",
            ),
            (
                CaptureError::PermissionDenied {
                    platform: "linux".to_string(),
                },
                "PermissionDenied",
            ),
        ];

        for (error, code) in cases {
            assert_eq!(error.code(), code);
        }
    }
}
