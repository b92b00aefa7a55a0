//! Installing the backend's Python dependencies.

use super::interpreter::resolve_interpreter;
use super::layout::BackendLayout;
use crate::error::{DoctorinoError, Result};
use std::path::Path;
use tokio::process::Command;
use tracing::info;

/// Upgrade pip, then install `requirements.txt` into the resolved interpreter.
///
/// Output is inherited so progress shows in the terminal.
pub async fn install_dependencies(layout: &BackendLayout, explicit: Option<&Path>) -> Result<()> {
    if !layout.requirements_file.is_file() {
        return Err(DoctorinoError::DependencyInstallFailed {
            message: format!(
                "requirements file not found: {}",
                layout.requirements_file.display()
            ),
        });
    }

    let interpreter = resolve_interpreter(layout, explicit)?;
    info!("Installing backend dependencies with {}", interpreter.path.display());

    run_pip(&interpreter.path, &["install", "--upgrade", "pip"]).await?;
    let requirements = layout.requirements_file.to_string_lossy();
    run_pip(&interpreter.path, &["install", "-r", &requirements]).await?;

    info!("Backend dependencies installed");
    Ok(())
}

async fn run_pip(python: &Path, args: &[&str]) -> Result<()> {
    let status = Command::new(python)
        .arg("-m")
        .arg("pip")
        .args(args)
        .status()
        .await
        .map_err(|e| DoctorinoError::DependencyInstallFailed {
            message: format!("failed to run {}: {}", python.display(), e),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(DoctorinoError::DependencyInstallFailed {
            message: format!("pip {} exited with {}", args.join(" "), status),
        })
    }
}
