//! Interpreter paths and executable lookup.

use std::path::{Path, PathBuf};

/// Get the Python executable inside a virtual environment directory.
///
/// # Platform Behavior
/// - **Linux/macOS**: `{venv}/bin/python`
/// - **Windows**: `{venv}/Scripts/python.exe`
pub fn venv_python(venv_dir: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        venv_dir.join("Scripts").join("python.exe")
    }
    #[cfg(not(windows))]
    {
        venv_dir.join("bin").join("python")
    }
}

/// Names of the system interpreter, in preference order.
pub fn system_python_names() -> &'static [&'static str] {
    #[cfg(windows)]
    {
        &["python", "py"]
    }
    #[cfg(not(windows))]
    {
        &["python3", "python"]
    }
}

/// Locate an executable on `PATH`.
///
/// On Windows the `.exe` suffix is tried when `name` has no extension.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| find_in_dir(&dir, name))
}

fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }

    #[cfg(windows)]
    {
        if Path::new(name).extension().is_none() {
            let exe = dir.join(format!("{}.exe", name));
            if exe.is_file() {
                return Some(exe);
            }
        }
    }

    None
}
