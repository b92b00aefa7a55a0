//! HTTP access to the backend: base URL resolution, health, and info.

use super::readiness::HealthProbe;
use crate::config::{AppConfig, NetworkConfig, SupervisorConfig};
use crate::error::{DoctorinoError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Base URL of the backend and whether the host owns the process behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    /// Normalized base URL without a trailing slash.
    base: String,
    external: bool,
}

impl BackendEndpoint {
    /// The locally supervised backend on `port`.
    pub fn local(port: u16) -> Self {
        Self {
            base: format!("http://{}:{}", SupervisorConfig::BIND_HOST, port),
            external: false,
        }
    }

    /// An externally hosted backend.
    pub fn external(url: &str) -> Result<Self> {
        let base = Url::parse(url.trim()).map_err(|e| DoctorinoError::Config {
            message: format!("invalid backend URL {:?}: {}", url, e),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(DoctorinoError::Config {
                message: format!("backend URL must be http or https, got {}", base.scheme()),
            });
        }
        Ok(Self {
            base: base.as_str().trim_end_matches('/').to_string(),
            external: true,
        })
    }

    /// Local on `port` unless an override URL is supplied.
    pub fn resolve(port: u16, override_url: Option<&str>) -> Result<Self> {
        match override_url.map(str::trim).filter(|s| !s.is_empty()) {
            Some(url) => Self::external(url),
            None => Ok(Self::local(port)),
        }
    }

    /// Base URL without a trailing slash, as handed to the window.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn health_url(&self) -> String {
        format!("{}{}", self.base_url(), SupervisorConfig::HEALTH_PATH)
    }

    pub fn is_external(&self) -> bool {
        self.external
    }
}

/// Response of the backend's root endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendInfo {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub environment: String,
}

/// Thin reqwest wrapper for the few calls the host makes itself.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    endpoint: BackendEndpoint,
    health_url: String,
}

impl BackendClient {
    pub fn new(endpoint: BackendEndpoint) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(NetworkConfig::REQUEST_TIMEOUT)
            .user_agent(AppConfig::USER_AGENT)
            .build()
            .map_err(|e| DoctorinoError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            health_url: endpoint.health_url(),
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// `GET /health`; `Ok(true)` for any 2xx status. The body is ignored.
    pub async fn health(&self) -> Result<bool> {
        let response = self
            .client
            .get(&self.health_url)
            .timeout(NetworkConfig::HEALTH_REQUEST_TIMEOUT)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// `GET /` for the backend's name, version and environment.
    pub async fn info(&self) -> Result<BackendInfo> {
        let url = format!("{}/", self.endpoint.base_url());
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DoctorinoError::Network {
                message: format!("GET {} returned {}", url, status),
                source: None,
            });
        }
        Ok(response.json::<BackendInfo>().await?)
    }
}

#[async_trait]
impl HealthProbe for BackendClient {
    fn target(&self) -> &str {
        &self.health_url
    }

    async fn probe(&self) -> bool {
        match self.health().await {
            Ok(healthy) => healthy,
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_endpoint() {
        let endpoint = BackendEndpoint::local(34664);
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:34664");
        assert_eq!(endpoint.health_url(), "http://127.0.0.1:34664/health");
        assert!(!endpoint.is_external());
    }

    #[test]
    fn test_override_endpoint() {
        let endpoint = BackendEndpoint::resolve(34664, Some("https://api.example.org/v1/")).unwrap();
        assert_eq!(endpoint.base_url(), "https://api.example.org/v1");
        assert_eq!(endpoint.health_url(), "https://api.example.org/v1/health");
        assert!(endpoint.is_external());
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let endpoint = BackendEndpoint::resolve(8000, Some("  ")).unwrap();
        assert_eq!(endpoint, BackendEndpoint::local(8000));
    }

    #[test]
    fn test_rejects_bad_override() {
        assert!(matches!(
            BackendEndpoint::resolve(8000, Some("ftp://files.example.org")),
            Err(DoctorinoError::Config { .. })
        ));
        assert!(BackendEndpoint::resolve(8000, Some("not a url")).is_err());
    }

    #[test]
    fn test_backend_info_tolerates_missing_fields() {
        let info: BackendInfo = serde_json::from_str(r#"{"message": "Welcome"}"#).unwrap();
        assert_eq!(info.message, "Welcome");
        assert!(info.version.is_empty());
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_not_ready() {
        // Port 9 (discard) is essentially never bound on loopback.
        let client = BackendClient::new(BackendEndpoint::local(9)).unwrap();
        assert!(!client.probe().await);
        assert_eq!(client.target(), "http://127.0.0.1:9/health");
    }
}
