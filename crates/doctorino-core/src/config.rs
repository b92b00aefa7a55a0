//! Centralized configuration for the Doctorino host.
//!
//! Constants for backend supervision, networking, paths and the window, plus
//! the environment variable names the host honours.

use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const APP_NAME: &'static str = "Doctorino";
    pub const USER_AGENT: &'static str = "Doctorino-Desktop/1.0";
}

/// Configuration for the backend process supervisor.
pub struct SupervisorConfig;

impl SupervisorConfig {
    pub const DEFAULT_PORT: u16 = 34664;
    pub const BIND_HOST: &'static str = "127.0.0.1";

    // Readiness polling
    pub const HEALTH_CHECK_ATTEMPTS: u32 = 30;
    pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(1);
    pub const HEALTH_PATH: &'static str = "/health";

    // Shutdown
    pub const TERMINATE_GRACE: Duration = Duration::from_secs(3);
    pub const MONITOR_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

    // ASGI application served by uvicorn
    pub const ASGI_APP_ATTR: &'static str = "app";
}

/// Network-related configuration.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const HEALTH_REQUEST_TIMEOUT: Duration = Duration::from_millis(900);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
}

/// Directory and file names.
pub struct PathsConfig;

impl PathsConfig {
    pub const BACKEND_DIR_NAME: &'static str = "backend";
    pub const BACKEND_ENTRY_FILE: &'static str = "main.py";
    pub const REQUIREMENTS_FILE: &'static str = "requirements.txt";
    pub const RESOURCES_DIR_NAME: &'static str = "resources";
    pub const FRONTEND_DIR_NAME: &'static str = "frontend";
    pub const FRONTEND_DIST_DIR_NAME: &'static str = "dist";
    pub const VENV_DIR_NAMES: [&'static str; 2] = ["venv", ".venv"];
}

/// Window and front-end settings.
pub struct UiConfig;

impl UiConfig {
    pub const DEV_SERVER_URL: &'static str = "http://localhost:5173";
    pub const BRIDGE_QUERY_PARAM: &'static str = "bridge";
}

/// Environment variables read by the host.
pub struct EnvVars;

impl EnvVars {
    /// Port for the backend when no CLI flag is given.
    pub const API_PORT: &'static str = "API_PORT";
    /// Externally hosted backend; disables spawning.
    pub const BACKEND_URL: &'static str = "DOCTORINO_BACKEND_URL";
    /// Explicit Python interpreter.
    pub const PYTHON: &'static str = "DOCTORINO_PYTHON";
    /// Front-end development server.
    pub const DEV_SERVER_URL: &'static str = "DOCTORINO_DEV_SERVER_URL";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_budget() {
        assert_eq!(SupervisorConfig::HEALTH_CHECK_ATTEMPTS, 30);
        assert_eq!(SupervisorConfig::HEALTH_CHECK_INTERVAL, Duration::from_secs(1));
        // A probe must finish before the next one is due.
        assert!(NetworkConfig::HEALTH_REQUEST_TIMEOUT < SupervisorConfig::HEALTH_CHECK_INTERVAL);
    }
}
