//! Mock capture backend for testing and unsupported platforms
//!
//! [`MockBackend`] produces deterministic gradient images without touching
//! any platform API, and its strategy chain is scriptable so tests can drive
//! every engine path: fallback ordering, per-attempt timeouts, empty-buffer
//! rejection, and permission dominance.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use image::codecs::png::CompressionType;

use crate::{
    capture::{CaptureStrategy, Frame, WindowBackend},
    error::{CaptureError, CaptureResult},
    model::WindowDescriptor,
    util::encode,
};

/// Scripted behavior for one [`MockStrategy`] attempt
#[derive(Debug, Clone)]
enum Outcome {
    /// Produce a gradient PNG of the given dimensions
    Pattern { width: u32, height: u32 },
    /// Return success with a zero-length buffer
    Empty,
    /// Fail with `PermissionDenied`
    PermissionDenied,
    /// Fail with `WindowNotFound` (window vanished mid-capture)
    Vanished,
    /// Never complete; exercises the per-attempt timeout
    Hang,
}

/// A capture strategy with a scripted outcome
pub struct MockStrategy {
    name:    &'static str,
    outcome: Outcome,
    delay:   Option<Duration>,
}

impl MockStrategy {
    /// Strategy producing a gradient PNG of the given dimensions
    pub fn pattern(name: &'static str, width: u32, height: u32) -> Self {
        Self {
            name,
            outcome: Outcome::Pattern { width, height },
            delay: None,
        }
    }

    /// Strategy that succeeds with an empty buffer
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            outcome: Outcome::Empty,
            delay: None,
        }
    }

    /// Strategy that fails with a permission error
    pub fn denying_permission(name: &'static str) -> Self {
        Self {
            name,
            outcome: Outcome::PermissionDenied,
            delay: None,
        }
    }

    /// Strategy that fails as if the window vanished mid-capture
    pub fn vanished(name: &'static str) -> Self {
        Self {
            name,
            outcome: Outcome::Vanished,
            delay: None,
        }
    }

    /// Strategy that never completes within any reasonable timeout
    pub fn hanging(name: &'static str) -> Self {
        Self {
            name,
            outcome: Outcome::Hang,
            delay: None,
        }
    }

    /// Adds an artificial delay before the scripted outcome
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl CaptureStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn capture(&self, window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.outcome {
            Outcome::Pattern { width, height } => {
                let frame = Frame::from_test_pattern(*width, *height);
                encode::encode_png(&frame, CompressionType::Default)
            }
            Outcome::Empty => Ok(Vec::new()),
            Outcome::PermissionDenied => Err(CaptureError::PermissionDenied {
                platform: "mock".to_string(),
            }),
            Outcome::Vanished => Err(CaptureError::WindowNotFound {
                window: window.id.clone(),
            }),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// Mock window backend with a fixed window set and scriptable strategies
pub struct MockBackend {
    windows:          Vec<WindowDescriptor>,
    strategies:       Vec<Arc<dyn CaptureStrategy>>,
    list_fails:       bool,
    activation_fails: bool,
}

impl MockBackend {
    /// Creates a backend with three plausible windows and one working strategy
    pub fn new() -> Self {
        Self {
            windows:          vec![
                WindowDescriptor::new("Chrome:Google Chrome", "Google Chrome", "Chrome"),
                WindowDescriptor::new("Code:main.rs - winshot", "main.rs - winshot", "Code"),
                WindowDescriptor::new("Terminal:zsh", "zsh", "Terminal"),
            ],
            strategies:       vec![Arc::new(MockStrategy::pattern("mock-window", 1920, 1080))],
            list_fails:       false,
            activation_fails: false,
        }
    }

    /// Replaces the window set
    pub fn with_windows(mut self, windows: Vec<WindowDescriptor>) -> Self {
        self.windows = windows;
        self
    }

    /// Replaces the strategy chain
    pub fn with_strategies(mut self, strategies: Vec<MockStrategy>) -> Self {
        self.strategies = strategies
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn CaptureStrategy>)
            .collect();
        self
    }

    /// Makes `list_windows` return an error
    pub fn with_failing_list(mut self) -> Self {
        self.list_fails = true;
        self
    }

    /// Makes `activate` return an error
    pub fn with_failing_activation(mut self) -> Self {
        self.activation_fails = true;
        self
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowBackend for MockBackend {
    fn platform(&self) -> &'static str {
        "mock"
    }

    async fn list_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        if self.list_fails {
            return Err(CaptureError::Io(std::io::Error::other(
                "mock enumeration failure",
            )));
        }
        Ok(self.windows.clone())
    }

    async fn foreground_window(&self) -> CaptureResult<WindowDescriptor> {
        self.windows
            .first()
            .cloned()
            .ok_or_else(|| CaptureError::WindowNotFound {
                window: "foreground".to_string(),
            })
    }

    async fn activate(&self, window: &WindowDescriptor) -> CaptureResult<()> {
        if self.activation_fails {
            return Err(CaptureError::ActivationFailed {
                window: window.id.clone(),
                reason: "mock activation failure".to_string(),
            });
        }
        Ok(())
    }

    fn strategies(&self) -> Vec<Arc<dyn CaptureStrategy>> {
        self.strategies.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lists_three_windows() {
        let backend = MockBackend::new();
        let windows = backend.list_windows().await.unwrap();

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].id, "Chrome:Google Chrome");
        assert_eq!(windows[0].process, "Chrome");
    }

    #[tokio::test]
    async fn test_mock_foreground_is_first_window() {
        let backend = MockBackend::new();
        let foreground = backend.foreground_window().await.unwrap();
        assert_eq!(foreground.id, "Chrome:Google Chrome");
    }

    #[tokio::test]
    async fn test_mock_foreground_fails_when_no_windows() {
        let backend = MockBackend::new().with_windows(Vec::new());
        let result = backend.foreground_window().await;
        assert!(matches!(result, Err(CaptureError::WindowNotFound { .. })));
    }

    #[tokio::test]
    async fn test_pattern_strategy_produces_png() {
        let strategy = MockStrategy::pattern("mock-window", 320, 240);
        let window = WindowDescriptor::new("w", "t", "p");

        let bytes = strategy.capture(&window).await.unwrap();
        assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }

    #[tokio::test]
    async fn test_denying_strategy_reports_permission() {
        let strategy = MockStrategy::denying_permission("mock-denied");
        let window = WindowDescriptor::new("w", "t", "p");

        let result = strategy.capture(&window).await;
        assert!(matches!(result, Err(CaptureError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn test_failing_list_errors() {
        let backend = MockBackend::new().with_failing_list();
        assert!(backend.list_windows().await.is_err());
    }

    #[tokio::test]
    async fn test_failing_activation_errors() {
        let backend = MockBackend::new().with_failing_activation();
        let window = WindowDescriptor::new("w", "t", "p");

        let result = backend.activate(&window).await;
        assert!(matches!(result, Err(CaptureError::ActivationFailed { .. })));
    }
}
