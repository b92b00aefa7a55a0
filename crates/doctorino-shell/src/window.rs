//! Window hosts for the shell.

use doctorino_core::config::AppConfig;
use doctorino_core::platform;
use crate::server::WindowSignal;
use doctorino_core::{Result, WindowController, WindowHost, WindowState};
use std::path::PathBuf;
use tracing::{debug, info};

/// Opens the front-end as an application window in the installed browser.
pub struct SystemBrowser {
    profile_dir: PathBuf,
}

impl Default for SystemBrowser {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
        Self {
            profile_dir: base.join(AppConfig::APP_NAME).join("window-profile"),
        }
    }
}

impl WindowHost for SystemBrowser {
    fn show(&self, url: &str) -> Result<()> {
        platform::open_app_window(url, &self.profile_dir)
    }
}

/// No window at all; the URL is only logged.
pub struct Headless;

impl WindowHost for Headless {
    fn show(&self, url: &str) -> Result<()> {
        info!("Headless mode, front-end available at {}", url);
        Ok(())
    }
}

/// The host selected on the command line.
pub enum ShellWindow {
    Browser(SystemBrowser),
    Headless(Headless),
}

impl ShellWindow {
    pub fn select(headless: bool) -> Self {
        if headless {
            ShellWindow::Headless(Headless)
        } else {
            ShellWindow::Browser(SystemBrowser::default())
        }
    }
}

impl WindowHost for ShellWindow {
    fn show(&self, url: &str) -> Result<()> {
        match self {
            ShellWindow::Browser(host) => host.show(url),
            ShellWindow::Headless(host) => host.show(url),
        }
    }
}

/// Tracks open event streams and closes or reattaches the window with them.
#[derive(Debug, Default)]
pub struct WindowPresence {
    connected: usize,
}

impl WindowPresence {
    pub fn apply<H: WindowHost>(&mut self, signal: WindowSignal, window: &mut WindowController<H>) {
        match signal {
            WindowSignal::Connected => {
                self.connected += 1;
                window.attach();
            }
            WindowSignal::Disconnected if self.connected == 0 => return,
            WindowSignal::Disconnected => {
                self.connected -= 1;
                if self.connected == 0 && window.state() == WindowState::Open {
                    window.close();
                }
            }
        }
        debug!("{} window connection(s), window {:?}", self.connected, window.state());
    }
}
