//! Linux capture backend (X11)
//!
//! Shells out to `xdotool` for window enumeration and activation and to
//! ImageMagick's `import` for pixel capture, mirroring what a user would run
//! by hand. Two strategies form the fallback chain: a targeted
//! `import -window <id>` first, then a full-root capture of whatever is on
//! screen.
//!
//! Wayland sessions without XWayland will fail enumeration; the engine
//! degrades that to an empty window list.

use std::{process::Output, sync::Arc};

use async_trait::async_trait;
use tracing::debug;

use crate::{
    capture::{CaptureStrategy, WindowBackend},
    error::{CaptureError, CaptureResult},
    model::WindowDescriptor,
};

/// Runs an external tool, returning its output on zero exit status
async fn run_tool(program: &str, args: &[&str]) -> CaptureResult<Output> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("unable to open display")
            || stderr.contains("Can't open display")
        {
            return Err(CaptureError::PermissionDenied {
                platform: "linux".to_string(),
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

/// X11 window backend built on `xdotool` and `import`
pub struct LinuxBackend;

impl LinuxBackend {
    pub fn new() -> Self {
        Self
    }

    /// Fills in title and process for a raw X11 window id
    async fn describe(&self, xid: &str) -> CaptureResult<WindowDescriptor> {
        let title_out = run_tool("xdotool", &["getwindowname", xid]).await?;
        let title = String::from_utf8_lossy(&title_out.stdout).trim().to_string();

        // Class name doubles as the process label; resolving the real
        // process name would need a /proc walk per window.
        let process = match run_tool("xdotool", &["getwindowclassname", xid]).await {
            Ok(out) => String::from_utf8_lossy(&out.stdout).trim().to_string(),
            Err(_) => String::new(),
        };

        Ok(WindowDescriptor::new(xid, title, process))
    }
}

impl Default for LinuxBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowBackend for LinuxBackend {
    fn platform(&self) -> &'static str {
        "linux"
    }

    async fn list_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        let output =
            run_tool("xdotool", &["search", "--onlyvisible", "--name", ""]).await?;
        let ids = String::from_utf8_lossy(&output.stdout);

        let mut windows = Vec::new();
        for xid in ids.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match self.describe(xid).await {
                // Unnamed utility windows clutter the list; skip them.
                Ok(window) if !window.title.is_empty() => windows.push(window),
                Ok(_) => {}
                Err(e) => debug!("Skipping window {}: {}", xid, e),
            }
        }
        Ok(windows)
    }

    async fn foreground_window(&self) -> CaptureResult<WindowDescriptor> {
        let output = run_tool("xdotool", &["getactivewindow"]).await?;
        let xid = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if xid.is_empty() {
            return Err(CaptureError::WindowNotFound {
                window: "foreground".to_string(),
            });
        }
        self.describe(&xid).await
    }

    async fn activate(&self, window: &WindowDescriptor) -> CaptureResult<()> {
        run_tool("xdotool", &["windowactivate", "--sync", &window.id])
            .await
            .map_err(|e| CaptureError::ActivationFailed {
                window: window.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    fn strategies(&self) -> Vec<Arc<dyn CaptureStrategy>> {
        vec![Arc::new(ImportWindowStrategy), Arc::new(ImportRootStrategy)]
    }
}

/// Targeted capture of a single X11 window via `import -window <id>`
struct ImportWindowStrategy;

#[async_trait]
impl CaptureStrategy for ImportWindowStrategy {
    fn name(&self) -> &'static str {
        "import-window"
    }

    async fn capture(&self, window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        let output = run_tool("import", &["-window", &window.id, "png:-"]).await?;
        Ok(output.stdout)
    }
}

/// Full-screen capture via `import -window root`; the activated window is
/// expected to be frontmost by the time this runs
struct ImportRootStrategy;

#[async_trait]
impl CaptureStrategy for ImportRootStrategy {
    fn name(&self) -> &'static str {
        "import-root"
    }

    async fn capture(&self, _window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        let output = run_tool("import", &["-window", "root", "png:-"]).await?;
        Ok(output.stdout)
    }
}
