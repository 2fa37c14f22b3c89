//! Window capture backends and strategies
//!
//! This module holds the capture half of the pipeline:
//!
//! - [`WindowBackend`]: the per-platform seam covering window enumeration,
//!   activation, foreground lookup, and an ordered list of capture
//!   strategies
//! - [`CaptureStrategy`]: one concrete technique for obtaining pixel data,
//!   tried in priority order with a bounded wait per attempt
//! - [`CaptureEngine`]: the platform-independent pipeline driving
//!   resolve → activate → strategy chain → constraint pass
//!
//! Native window handles never cross this boundary; window identity is an
//! opaque string id inside [`WindowDescriptor`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::CaptureResult, model::WindowDescriptor};

pub mod engine;
pub mod frame;
pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "windows")]
pub mod windows;

pub use engine::CaptureEngine;
pub use frame::Frame;
pub use mock::{MockBackend, MockStrategy};

/// Platform seam for window enumeration, activation, and capture
///
/// Implementations must be thread-safe (`Send + Sync`); the engine is shared
/// across request-handling tasks behind an `Arc`.
#[async_trait]
pub trait WindowBackend: Send + Sync {
    /// Short platform name used in logs and permission errors
    fn platform(&self) -> &'static str;

    /// Lists currently open top-level windows
    ///
    /// May return an empty vector. Errors are permitted here; the engine
    /// degrades them to an empty result, since listing is advisory.
    async fn list_windows(&self) -> CaptureResult<Vec<WindowDescriptor>>;

    /// Returns the current foreground window
    ///
    /// Used as the explicit fallback when a requested window cannot be
    /// resolved.
    async fn foreground_window(&self) -> CaptureResult<WindowDescriptor>;

    /// Brings the window to the foreground so it is visually capturable
    ///
    /// Best-effort: the engine logs a failure and proceeds with capture,
    /// which may then target whatever window is actually frontmost.
    async fn activate(&self, window: &WindowDescriptor) -> CaptureResult<()>;

    /// Capture strategies in fixed priority order
    ///
    /// The engine tries each once per request, advancing on failure.
    fn strategies(&self) -> Vec<Arc<dyn CaptureStrategy>>;
}

/// One concrete technique for obtaining window pixel data
#[async_trait]
pub trait CaptureStrategy: Send + Sync {
    /// Strategy name for logs and timeout errors
    fn name(&self) -> &'static str;

    /// Attempts to capture the window, returning raw PNG bytes
    ///
    /// An empty buffer counts as a failure (the engine advances to the next
    /// strategy). Implementations need not bound their own runtime; the
    /// engine wraps every attempt in a timeout.
    async fn capture(&self, window: &WindowDescriptor) -> CaptureResult<Vec<u8>>;
}

/// Returns the capture backend for the current platform
///
/// Falls back to the mock backend on platforms without a shim so the rest of
/// the pipeline stays exercisable.
pub fn platform_backend() -> Arc<dyn WindowBackend> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(linux::LinuxBackend::new())
    }
    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::MacosBackend::new())
    }
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WindowsBackend::new())
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        tracing::warn!("No capture shim for this platform; using mock backend");
        Arc::new(mock::MockBackend::new())
    }
}
