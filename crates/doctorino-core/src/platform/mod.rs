//! Platform abstraction layer.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here:
//! - `paths` - Interpreter locations and PATH lookup
//! - `process` - Liveness checks and process-tree termination
//! - `browser` - Opening the front-end in an application window

pub mod browser;
pub mod paths;
pub mod process;

pub use browser::open_app_window;
pub use paths::{find_in_path, system_python_names, venv_python};
pub use process::{is_process_alive, terminate_process_tree};

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_platform() {
        let platform = current_platform();
        assert!(["linux", "windows", "macos", "unknown"].contains(&platform));
    }
}
