//! The bridge between the window and the host.
//!
//! The window can reach exactly three host capabilities, declared in
//! [`BridgeMethod`]. Every other name is rejected with `MethodNotFound`.

mod dialogs;

pub use dialogs::{DialogFilter, FileDialogs, OpenDialogOptions, SaveDialogOptions};

use crate::error::{DoctorinoError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Capabilities exposed to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeMethod {
    GetBackendUrl,
    OpenFileDialog,
    SaveFileDialog,
}

impl BridgeMethod {
    pub const ALL: [BridgeMethod; 3] = [
        BridgeMethod::GetBackendUrl,
        BridgeMethod::OpenFileDialog,
        BridgeMethod::SaveFileDialog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeMethod::GetBackendUrl => "get_backend_url",
            BridgeMethod::OpenFileDialog => "open_file_dialog",
            BridgeMethod::SaveFileDialog => "save_file_dialog",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

/// Dispatches bridged calls.
#[derive(Clone)]
pub struct Bridge {
    backend_url: String,
    dialogs: Arc<dyn FileDialogs>,
}

impl Bridge {
    pub fn new(backend_url: impl Into<String>, dialogs: Arc<dyn FileDialogs>) -> Self {
        Self {
            backend_url: backend_url.into(),
            dialogs,
        }
    }

    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    /// Run `method` with `params`.
    ///
    /// Dialogs resolve to a path string, or `null` when cancelled.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let method = BridgeMethod::from_name(method)
            .ok_or_else(|| DoctorinoError::MethodNotFound(method.to_string()))?;
        debug!("Bridged call: {}", method.as_str());

        match method {
            BridgeMethod::GetBackendUrl => Ok(Value::String(self.backend_url.clone())),
            BridgeMethod::OpenFileDialog => {
                let options = parse_options(params)?;
                Ok(path_or_null(self.dialogs.open_file(options).await?))
            }
            BridgeMethod::SaveFileDialog => {
                let options = parse_options(params)?;
                Ok(path_or_null(self.dialogs.save_file(options).await?))
            }
        }
    }
}

/// Missing or `null` params mean default options.
fn parse_options<T: DeserializeOwned + Default>(params: Value) -> Result<T> {
    if params.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(params).map_err(|e| DoctorinoError::InvalidParams {
        message: e.to_string(),
    })
}

fn path_or_null(path: Option<PathBuf>) -> Value {
    match path {
        Some(path) if !path.as_os_str().is_empty() => {
            Value::String(path.to_string_lossy().into_owned())
        }
        _ => Value::Null,
    }
}
