//! Opening the front-end in a standalone application window.
//!
//! Chromium-based browsers support `--app=<url>`, which opens a window without
//! browser chrome. When none is installed the platform's default opener is
//! used instead.

use crate::error::{DoctorinoError, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Open `url` as an application window using an isolated browser profile.
///
/// Only http and https URLs are accepted.
pub fn open_app_window(url: &str, profile_dir: &Path) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(DoctorinoError::Window {
            message: format!("refusing to open non-http URL: {}", url),
        });
    }

    if let Err(e) = std::fs::create_dir_all(profile_dir) {
        debug!("Failed to create profile directory {}: {}", profile_dir.display(), e);
    }
    let app_arg = format!("--app={}", url);
    let profile_arg = format!("--user-data-dir={}", profile_dir.display());

    for browser in chromium_candidates() {
        let mut cmd = chromium_command(browser);
        cmd.args(["--new-window", &profile_arg, &app_arg]);
        if spawn_detached(cmd).is_ok() {
            debug!("Opened {} with {} in app mode", url, browser);
            return Ok(());
        }
    }

    debug!("No Chromium-based browser found, falling back to default opener");
    spawn_detached(default_opener(url)).map_err(|e| DoctorinoError::Window {
        message: format!("failed to open {}: {}", url, e),
    })
}

#[cfg(target_os = "linux")]
fn chromium_candidates() -> Vec<&'static str> {
    [
        "brave-browser",
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
        "microsoft-edge",
    ]
    .into_iter()
    .filter(|name| super::paths::find_in_path(name).is_some())
    .collect()
}

#[cfg(target_os = "macos")]
fn chromium_candidates() -> Vec<&'static str> {
    ["Brave Browser", "Google Chrome", "Chromium", "Microsoft Edge"]
        .into_iter()
        .filter(|app| Path::new(&format!("/Applications/{}.app", app)).exists())
        .collect()
}

#[cfg(target_os = "windows")]
fn chromium_candidates() -> Vec<&'static str> {
    [
        r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
    ]
    .into_iter()
    .filter(|exe| Path::new(exe).exists())
    .collect()
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn chromium_candidates() -> Vec<&'static str> {
    Vec::new()
}

#[cfg(target_os = "macos")]
fn chromium_command(app: &str) -> Command {
    let mut cmd = Command::new("open");
    cmd.args(["-n", "-a", app, "--args"]);
    cmd
}

#[cfg(not(target_os = "macos"))]
fn chromium_command(browser: &str) -> Command {
    Command::new(browser)
}

fn default_opener(url: &str) -> Command {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", url]);
        cmd
    }
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Spawn and reap in the background so the browser never becomes a zombie.
fn spawn_detached(mut cmd: Command) -> std::io::Result<()> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    std::thread::spawn(move || {
        let _ = child.wait();
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_non_http_urls() {
        let temp = TempDir::new().unwrap();
        let err = open_app_window("file:///etc/passwd", temp.path()).unwrap_err();
        assert!(matches!(err, DoctorinoError::Window { .. }));

        let err = open_app_window("javascript:alert(1)", temp.path()).unwrap_err();
        assert!(err.to_string().contains("non-http"));
    }
}
