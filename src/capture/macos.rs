//! macOS capture backend
//!
//! Uses AppleScript (via `osascript`) for window enumeration and activation
//! and `screencapture` for pixels. Window ids are `"<process>:<title>"`
//! strings, stable for as long as the window keeps its title.
//!
//! Strategy chain: capture the window by its CGWindowID when AppleScript can
//! produce one, otherwise a full-screen `screencapture -x` of the activated
//! (frontmost) window.

use std::{path::PathBuf, process::Output, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    capture::{CaptureStrategy, WindowBackend},
    error::{CaptureError, CaptureResult},
    model::WindowDescriptor,
};

async fn run_tool(program: &str, args: &[&str]) -> CaptureResult<Output> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not authorized") || stderr.contains("could not create image") {
            return Err(CaptureError::PermissionDenied {
                platform: "macos".to_string(),
            });
        }
        return Err(CaptureError::Io(std::io::Error::other(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        ))));
    }

    Ok(output)
}

async fn osascript(script: &str) -> CaptureResult<String> {
    let output = run_tool("osascript", &["-e", script]).await?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Splits a `"<process>:<title>"` window id into its parts
fn split_id(id: &str) -> Option<(&str, &str)> {
    id.split_once(':')
}

/// Scratch file for `screencapture`, removed after the bytes are read
async fn read_and_remove(path: &PathBuf) -> CaptureResult<Vec<u8>> {
    let bytes = tokio::fs::read(path).await?;
    let _ = tokio::fs::remove_file(path).await;
    Ok(bytes)
}

fn scratch_path() -> PathBuf {
    std::env::temp_dir().join(format!("winshot-{}.png", uuid::Uuid::new_v4()))
}

/// macOS window backend built on AppleScript and `screencapture`
pub struct MacosBackend;

impl MacosBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacosBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowBackend for MacosBackend {
    fn platform(&self) -> &'static str {
        "macos"
    }

    async fn list_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        // One line per window: "<process>\t<title>".
        let script = r#"
            set output to ""
            tell application "System Events"
                repeat with proc in (every process whose visible is true)
                    repeat with win in (every window of proc)
                        set output to output & (name of proc) & tab & (name of win) & linefeed
                    end repeat
                end repeat
            end tell
            return output
        "#;

        let listing = osascript(script).await?;
        let mut windows = Vec::new();
        for line in listing.lines() {
            if let Some((process, title)) = line.split_once('\t') {
                if title.is_empty() {
                    continue;
                }
                windows.push(WindowDescriptor::new(
                    format!("{}:{}", process, title),
                    title,
                    process,
                ));
            }
        }
        Ok(windows)
    }

    async fn foreground_window(&self) -> CaptureResult<WindowDescriptor> {
        let script = r#"
            tell application "System Events"
                set proc to first process whose frontmost is true
                set procName to name of proc
                try
                    set winName to name of front window of proc
                on error
                    set winName to ""
                end try
                return procName & tab & winName
            end tell
        "#;

        let line = osascript(script).await?;
        match line.split_once('\t') {
            Some((process, title)) => Ok(WindowDescriptor::new(
                format!("{}:{}", process, title),
                title,
                process,
            )),
            None => Err(CaptureError::WindowNotFound {
                window: "foreground".to_string(),
            }),
        }
    }

    async fn activate(&self, window: &WindowDescriptor) -> CaptureResult<()> {
        let Some((process, _)) = split_id(&window.id) else {
            return Err(CaptureError::ActivationFailed {
                window: window.id.clone(),
                reason: "id is not process-qualified".to_string(),
            });
        };

        let script = format!(
            r#"tell application "System Events" to set frontmost of process "{}" to true"#,
            process.replace('"', "\\\"")
        );
        osascript(&script).await.map_err(|e| CaptureError::ActivationFailed {
            window: window.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn strategies(&self) -> Vec<Arc<dyn CaptureStrategy>> {
        vec![Arc::new(ScreencaptureWindowStrategy), Arc::new(ScreencaptureScreenStrategy)]
    }
}

/// Captures a single window by CGWindowID via `screencapture -l`
struct ScreencaptureWindowStrategy;

#[async_trait]
impl CaptureStrategy for ScreencaptureWindowStrategy {
    fn name(&self) -> &'static str {
        "screencapture-window"
    }

    async fn capture(&self, window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        let Some((process, title)) = split_id(&window.id) else {
            return Err(CaptureError::WindowNotFound {
                window: window.id.clone(),
            });
        };

        let script = format!(
            r#"tell application "System Events" to return id of window "{}" of process "{}""#,
            title.replace('"', "\\\""),
            process.replace('"', "\\\"")
        );
        let window_id = osascript(&script).await?;
        if window_id.is_empty() || window_id.parse::<u64>().is_err() {
            debug!("No CGWindowID for '{}'", window.id);
            return Err(CaptureError::WindowNotFound {
                window: window.id.clone(),
            });
        }

        let path = scratch_path();
        let path_str = path.to_string_lossy().to_string();
        run_tool("screencapture", &["-x", "-o", "-l", &window_id, "-t", "png", &path_str])
            .await?;
        read_and_remove(&path).await
    }
}

/// Full-screen fallback via `screencapture -x`
struct ScreencaptureScreenStrategy;

#[async_trait]
impl CaptureStrategy for ScreencaptureScreenStrategy {
    fn name(&self) -> &'static str {
        "screencapture-screen"
    }

    async fn capture(&self, _window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        let path = scratch_path();
        let path_str = path.to_string_lossy().to_string();
        run_tool("screencapture", &["-x", "-t", "png", &path_str]).await?;
        read_and_remove(&path).await
    }
}
