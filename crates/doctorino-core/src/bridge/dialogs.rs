//! Native file dialog options and the capability that shows them.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A named group of file extensions, e.g. `ECG recordings: [csv, dat]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogFilter {
    pub name: String,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// Options for the open-file dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OpenDialogOptions {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "default_path")]
    pub default_path: Option<PathBuf>,
    #[serde(default)]
    pub filters: Vec<DialogFilter>,
}

/// Options for the save-file dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaveDialogOptions {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "default_path")]
    pub default_path: Option<PathBuf>,
    #[serde(default)]
    pub filters: Vec<DialogFilter>,
}

/// Host OS file dialogs.
///
/// `Ok(None)` means the user cancelled; errors are reserved for dialogs that
/// could not be shown at all.
#[async_trait]
pub trait FileDialogs: Send + Sync {
    async fn open_file(&self, options: OpenDialogOptions) -> Result<Option<PathBuf>>;

    async fn save_file(&self, options: SaveDialogOptions) -> Result<Option<PathBuf>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_options() {
        let options: OpenDialogOptions = serde_json::from_value(json!({
            "title": "Select ECG recording",
            "defaultPath": "/home/doctor/ecg",
            "filters": [{"name": "ECG", "extensions": ["csv", "dat"]}]
        }))
        .unwrap();

        assert_eq!(options.title.as_deref(), Some("Select ECG recording"));
        assert_eq!(options.default_path, Some(PathBuf::from("/home/doctor/ecg")));
        assert_eq!(options.filters[0].extensions, vec!["csv", "dat"]);
    }

    #[test]
    fn test_snake_case_alias() {
        let options: SaveDialogOptions =
            serde_json::from_value(json!({"default_path": "report.pdf"})).unwrap();
        assert_eq!(options.default_path, Some(PathBuf::from("report.pdf")));
        assert!(options.filters.is_empty());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: std::result::Result<OpenDialogOptions, _> =
            serde_json::from_value(json!({"multiSelections": true}));
        assert!(result.is_err());
    }
}
