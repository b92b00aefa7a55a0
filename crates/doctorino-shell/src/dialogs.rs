//! Native dialogs via rfd.

use async_trait::async_trait;
use doctorino_core::bridge::{DialogFilter, OpenDialogOptions, SaveDialogOptions};
use doctorino_core::{DoctorinoError, FileDialogs, Result};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::path::{Path, PathBuf};
use tracing::debug;

/// OS file dialogs. Each dialog runs on the blocking pool.
pub struct NativeDialogs;

#[async_trait]
impl FileDialogs for NativeDialogs {
    async fn open_file(&self, options: OpenDialogOptions) -> Result<Option<PathBuf>> {
        run_blocking(move || {
            let dialog = build(options.title, options.default_path.as_deref(), &options.filters);
            dialog.pick_file()
        })
        .await
    }

    async fn save_file(&self, options: SaveDialogOptions) -> Result<Option<PathBuf>> {
        run_blocking(move || {
            let target = options.default_path.as_deref().map(save_target);
            let (directory, file_name) = target.unwrap_or_default();
            let mut dialog = build(options.title, directory.as_deref(), &options.filters);
            if let Some(name) = file_name {
                dialog = dialog.set_file_name(name);
            }
            dialog.save_file()
        })
        .await
    }
}

/// Split a save dialog's default path into a starting directory and a
/// suggested file name. An existing directory is used whole.
fn save_target(default: &Path) -> (Option<PathBuf>, Option<String>) {
    if default.is_dir() {
        return (Some(default.to_path_buf()), None);
    }
    let name = default
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let dir = default
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf);
    (dir, name)
}

fn build(title: Option<String>, directory: Option<&Path>, filters: &[DialogFilter]) -> FileDialog {
    let mut dialog = FileDialog::new();
    if let Some(title) = title {
        dialog = dialog.set_title(title);
    }
    if let Some(dir) = directory {
        dialog = dialog.set_directory(dir);
    }
    for filter in filters {
        dialog = dialog.add_filter(filter.name.as_str(), filter.extensions.as_slice());
    }
    dialog
}

async fn run_blocking<F>(show: F) -> Result<Option<PathBuf>>
where
    F: FnOnce() -> Option<PathBuf> + Send + 'static,
{
    let picked = tokio::task::spawn_blocking(show)
        .await
        .map_err(|e| DoctorinoError::Dialog {
            message: format!("dialog task failed: {}", e),
        })?;
    debug!("Dialog returned {:?}", picked);
    Ok(picked)
}

/// Show a modal error box. Blocks until dismissed.
pub fn show_error(title: &str, message: &str) {
    let _ = MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .set_buttons(MessageButtons::Ok)
        .show();
}
