//! Platform-independent capture pipeline
//!
//! [`CaptureEngine`] owns the request flow for a screenshot:
//!
//! 1. Resolve the requested window against the most recent enumeration
//!    snapshot (refreshing once on a miss), falling back to the foreground
//!    window when resolution fails.
//! 2. Best-effort activation so the target is visually frontmost.
//! 3. Walk the backend's strategy chain with a bounded wait per attempt,
//!    accepting the first non-empty buffer.
//! 4. Apply the dimension and byte-size constraints, then content-hash the
//!    final bytes.
//!
//! A foreground fallback is policy, not an error; the response carries the
//! identity of the window actually captured so the divergence is visible.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::{debug, info, warn};

use crate::{
    capture::WindowBackend,
    error::{CaptureError, CaptureResult},
    model::{CapturedImage, ImageFormat, WindowDescriptor, WindowRef},
    util::{encode, hash},
};

/// Drives window resolution, the strategy fallback chain, and the
/// constraint pass
pub struct CaptureEngine {
    backend:         Arc<dyn WindowBackend>,
    /// Most recent enumeration result; window indices resolve against this
    snapshot:        Mutex<Vec<WindowDescriptor>>,
    attempt_timeout: Duration,
}

impl CaptureEngine {
    /// Creates an engine over the given backend
    ///
    /// `attempt_timeout` bounds each individual strategy attempt, not the
    /// whole request.
    pub fn new(backend: Arc<dyn WindowBackend>, attempt_timeout: Duration) -> Self {
        Self {
            backend,
            snapshot: Mutex::new(Vec::new()),
            attempt_timeout,
        }
    }

    /// Lists open windows and refreshes the resolution snapshot
    ///
    /// Enumeration failures degrade to an empty list; listing is advisory
    /// and must not fail a session.
    pub async fn list(&self) -> Vec<WindowDescriptor> {
        match self.backend.list_windows().await {
            Ok(windows) => {
                debug!("Enumerated {} windows", windows.len());
                if let Ok(mut snapshot) = self.snapshot.lock() {
                    *snapshot = windows.clone();
                }
                windows
            }
            Err(e) => {
                warn!("Window enumeration failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Looks up a reference in the current snapshot without refreshing
    fn lookup(&self, target: &WindowRef) -> Option<WindowDescriptor> {
        let snapshot = self.snapshot.lock().ok()?;
        match target {
            WindowRef::Id(id) => snapshot.iter().find(|w| &w.id == id).cloned(),
            // Indices are 1-based, matching the list order clients see.
            WindowRef::Index(i) => i.checked_sub(1).and_then(|i| snapshot.get(i)).cloned(),
        }
    }

    /// Resolves a capture target to a concrete window descriptor
    ///
    /// Misses trigger one snapshot refresh before falling back to the
    /// foreground window. If even the foreground lookup fails, a placeholder
    /// descriptor is used and strategies capture whatever is frontmost.
    async fn resolve(&self, target: Option<WindowRef>) -> WindowDescriptor {
        if let Some(target) = target {
            if let Some(window) = self.lookup(&target) {
                return window;
            }

            // The snapshot may be stale or never populated; refresh once.
            let _ = self.list().await;
            if let Some(window) = self.lookup(&target) {
                return window;
            }

            info!("Window {} not found; falling back to foreground", target);
        }

        match self.backend.foreground_window().await {
            Ok(window) => window,
            Err(e) => {
                warn!("Foreground lookup failed ({}); capturing frontmost content", e);
                WindowDescriptor::foreground_placeholder()
            }
        }
    }

    /// Captures a screenshot of the target window
    ///
    /// `target: None` captures the foreground window. The returned image
    /// satisfies both `max_dimension` and `max_bytes`, and its `window_id`
    /// names the window actually captured (which may differ from the request
    /// after a fallback).
    pub async fn capture(
        &self,
        target: Option<WindowRef>,
        max_dimension: u32,
        max_bytes: u64,
    ) -> CaptureResult<CapturedImage> {
        let window = self.resolve(target).await;

        // Activation is best-effort: a window that refuses to raise still
        // gets a capture attempt, which may show whatever is frontmost.
        if let Err(e) = self.backend.activate(&window).await {
            warn!("Activation of '{}' failed: {}", window.id, e);
        }

        let raw = self.run_strategies(&window).await?;
        let (bytes, width, height) = encode::constrain(&raw, max_dimension, max_bytes)?;
        let hash = hash::content_hash(&bytes);

        debug!(
            "Captured '{}' as {}x{} ({} bytes, hash {})",
            window.id,
            width,
            height,
            bytes.len(),
            &hash[..12.min(hash.len())]
        );

        Ok(CapturedImage {
            bytes,
            width,
            height,
            format: ImageFormat::Png,
            hash,
            window_id: window.id,
            window_title: window.title,
        })
    }

    /// Walks the strategy chain, returning the first non-empty capture
    ///
    /// A permission failure anywhere in the chain dominates the final error:
    /// it names the actionable cause, where `AllMethodsFailed` would only say
    /// that nothing worked.
    async fn run_strategies(&self, window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        let strategies = self.backend.strategies();
        let attempts = strategies.len();
        let mut permission_denied: Option<CaptureError> = None;

        for strategy in strategies {
            match tokio::time::timeout(self.attempt_timeout, strategy.capture(window)).await {
                Ok(Ok(bytes)) if !bytes.is_empty() => {
                    debug!("Strategy '{}' succeeded ({} bytes)", strategy.name(), bytes.len());
                    return Ok(bytes);
                }
                Ok(Ok(_)) => {
                    warn!("Strategy '{}' returned an empty buffer", strategy.name());
                }
                Ok(Err(e)) => {
                    if matches!(e, CaptureError::PermissionDenied { .. }) {
                        permission_denied.get_or_insert(e);
                        warn!("Strategy '{}' denied by platform permissions", strategy.name());
                    } else {
                        warn!("Strategy '{}' failed: {}", strategy.name(), e);
                    }
                }
                Err(_) => {
                    let timeout = CaptureError::CaptureTimeout {
                        strategy:    strategy.name().to_string(),
                        duration_ms: self.attempt_timeout.as_millis() as u64,
                    };
                    warn!("{}", timeout);
                }
            }
        }

        Err(permission_denied.unwrap_or(CaptureError::AllMethodsFailed { attempts }))
    }
}
