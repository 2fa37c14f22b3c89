//! Windows capture backend
//!
//! Shells out to PowerShell for everything: `Get-Process` for enumeration,
//! `AppActivate` for raising windows, and a `CopyFromScreen` snippet for
//! pixels. Window ids are process ids rendered as strings.
//!
//! A single full-screen strategy forms the chain; Windows offers no simple
//! command-line per-window capture, so activation does the targeting.

use std::{path::PathBuf, process::Output, sync::Arc};

use async_trait::async_trait;

use crate::{
    capture::{CaptureStrategy, WindowBackend},
    error::{CaptureError, CaptureResult},
    model::WindowDescriptor,
};

async fn powershell(script: &str) -> CaptureResult<Output> {
    let output = tokio::process::Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", script])
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::Io(std::io::Error::other(format!(
            "powershell exited with {}: {}",
            output.status,
            stderr.trim()
        ))));
    }

    Ok(output)
}

fn scratch_path() -> PathBuf {
    std::env::temp_dir().join(format!("winshot-{}.png", uuid::Uuid::new_v4()))
}

/// Windows backend built on PowerShell
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowBackend for WindowsBackend {
    fn platform(&self) -> &'static str {
        "windows"
    }

    async fn list_windows(&self) -> CaptureResult<Vec<WindowDescriptor>> {
        // One line per window: "<pid>|<title>|<process>".
        let script = r#"Get-Process | Where-Object { $_.MainWindowTitle } | ForEach-Object { "$($_.Id)|$($_.MainWindowTitle)|$($_.ProcessName)" }"#;
        let output = powershell(script).await?;

        let listing = String::from_utf8_lossy(&output.stdout);
        let mut windows = Vec::new();
        for line in listing.lines() {
            let mut parts = line.trim().splitn(3, '|');
            if let (Some(pid), Some(title), Some(process)) =
                (parts.next(), parts.next(), parts.next())
            {
                windows.push(WindowDescriptor::new(pid, title, process));
            }
        }
        Ok(windows)
    }

    async fn foreground_window(&self) -> CaptureResult<WindowDescriptor> {
        // No direct foreground query without native calls; the first
        // main-window process is the best command-line approximation.
        self.list_windows()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CaptureError::WindowNotFound {
                window: "foreground".to_string(),
            })
    }

    async fn activate(&self, window: &WindowDescriptor) -> CaptureResult<()> {
        let script = format!(
            r#"(New-Object -ComObject WScript.Shell).AppActivate({})"#,
            window.id
        );
        powershell(&script).await.map_err(|e| CaptureError::ActivationFailed {
            window: window.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn strategies(&self) -> Vec<Arc<dyn CaptureStrategy>> {
        vec![Arc::new(CopyFromScreenStrategy)]
    }
}

/// Full-screen capture via `System.Drawing` `CopyFromScreen`
struct CopyFromScreenStrategy;

#[async_trait]
impl CaptureStrategy for CopyFromScreenStrategy {
    fn name(&self) -> &'static str {
        "copy-from-screen"
    }

    async fn capture(&self, _window: &WindowDescriptor) -> CaptureResult<Vec<u8>> {
        let path = scratch_path();
        let path_str = path.to_string_lossy().to_string();
        let script = format!(
            r#"
            Add-Type -AssemblyName System.Windows.Forms, System.Drawing
            $bounds = [System.Windows.Forms.Screen]::PrimaryScreen.Bounds
            $bitmap = New-Object System.Drawing.Bitmap $bounds.Width, $bounds.Height
            $graphics = [System.Drawing.Graphics]::FromImage($bitmap)
            $graphics.CopyFromScreen($bounds.Location, [System.Drawing.Point]::Empty, $bounds.Size)
            $bitmap.Save('{}', [System.Drawing.Imaging.ImageFormat]::Png)
            $graphics.Dispose()
            $bitmap.Dispose()
            "#,
            path_str.replace('\'', "''")
        );

        powershell(&script).await?;
        let bytes = tokio::fs::read(&path).await?;
        let _ = tokio::fs::remove_file(&path).await;
        Ok(bytes)
    }
}
