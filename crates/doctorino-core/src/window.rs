//! The main window: where the front-end comes from and the window lifecycle.

use crate::backend::{BackendLayout, BuildMode};
use crate::config::UiConfig;
use crate::error::{DoctorinoError, Result};
use std::path::PathBuf;
use tracing::{debug, info};
use url::Url;

/// Where the window loads the front-end from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontendSource {
    /// A running development server.
    DevServer(Url),
    /// Built files, served by the bridge server at its root.
    Bundle(PathBuf),
}

impl FrontendSource {
    /// Dev server in development mode, bundle directory when packaged.
    ///
    /// `dev_server_override` replaces the default dev server URL.
    pub fn resolve(layout: &BackendLayout, dev_server_override: Option<&str>) -> Result<Self> {
        match layout.mode {
            BuildMode::Packaged => Ok(Self::Bundle(layout.frontend_bundle_dir())),
            BuildMode::Development => {
                let raw = dev_server_override
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(UiConfig::DEV_SERVER_URL);
                let url = Url::parse(raw).map_err(|e| DoctorinoError::Config {
                    message: format!("invalid dev server URL {:?}: {}", raw, e),
                })?;
                Ok(Self::DevServer(url))
            }
        }
    }

    pub fn bundle_dir(&self) -> Option<&PathBuf> {
        match self {
            Self::Bundle(dir) => Some(dir),
            Self::DevServer(_) => None,
        }
    }

    /// URL the window should load, given the bridge server's base URL.
    ///
    /// The dev server is told where the bridge lives through a query
    /// parameter; the bundle is served by the bridge itself.
    pub fn window_url(&self, bridge_base: &str) -> Result<String> {
        match self {
            Self::DevServer(url) => {
                let mut url = url.clone();
                url.query_pairs_mut()
                    .append_pair(UiConfig::BRIDGE_QUERY_PARAM, bridge_base);
                Ok(url.into())
            }
            Self::Bundle(_) => {
                let url = Url::parse(bridge_base).map_err(|e| DoctorinoError::Window {
                    message: format!("invalid bridge URL {:?}: {}", bridge_base, e),
                })?;
                Ok(url.into())
            }
        }
    }
}

/// Something that can put a URL in front of the user.
pub trait WindowHost: Send + Sync {
    fn show(&self, url: &str) -> Result<()>;
}

/// Lifecycle of the main window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    NotCreated,
    Open,
    Closed,
    Destroyed,
}

/// Owns the single main window.
pub struct WindowController<H: WindowHost> {
    host: H,
    state: WindowState,
    url: Option<String>,
}

impl<H: WindowHost> WindowController<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            state: WindowState::NotCreated,
            url: None,
        }
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Create the window and load `url`. Only valid once.
    pub fn create(&mut self, url: &str) -> Result<()> {
        if self.state != WindowState::NotCreated {
            return Err(DoctorinoError::InvalidState {
                operation: "create window",
                state: format!("{:?}", self.state),
            });
        }
        self.host.show(url)?;
        info!("Main window opened at {}", url);
        self.url = Some(url.to_string());
        self.state = WindowState::Open;
        Ok(())
    }

    pub fn close(&mut self) {
        if self.state == WindowState::Open {
            debug!("Main window closed");
            self.state = WindowState::Closed;
        }
    }

    /// Re-show a closed window. No-op while open.
    pub fn activate(&mut self) -> Result<()> {
        match (self.state, self.url.as_deref()) {
            (WindowState::Closed, Some(url)) => {
                self.host.show(url)?;
                self.state = WindowState::Open;
                Ok(())
            }
            (WindowState::Open, _) => Ok(()),
            (state, _) => Err(DoctorinoError::InvalidState {
                operation: "activate window",
                state: format!("{:?}", state),
            }),
        }
    }

    /// The window came back on its own, e.g. the user reloaded it.
    pub fn attach(&mut self) {
        if self.state == WindowState::Closed {
            debug!("Main window reattached");
            self.state = WindowState::Open;
        }
    }

    pub fn destroy(&mut self) {
        self.state = WindowState::Destroyed;
    }
}
