//! Python interpreter resolution.
//!
//! Order: explicit override, then a virtual environment next to the backend
//! or app root, then the system interpreter on `PATH`.

use super::layout::BackendLayout;
use crate::error::{DoctorinoError, Result};
use crate::platform;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where an interpreter was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpreterSource {
    Explicit,
    VirtualEnv,
    System,
}

/// A resolved Python interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpreter {
    pub path: PathBuf,
    pub source: InterpreterSource,
}

/// Resolve the interpreter used to run the backend.
pub fn resolve_interpreter(layout: &BackendLayout, explicit: Option<&Path>) -> Result<Interpreter> {
    resolve_with(layout, explicit, platform::find_in_path)
}

fn resolve_with(
    layout: &BackendLayout,
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<PathBuf>,
) -> Result<Interpreter> {
    let mut searched = Vec::new();

    if let Some(explicit) = explicit {
        let found = if explicit.is_file() {
            Some(explicit.to_path_buf())
        } else if explicit.components().count() == 1 {
            // A bare name such as `python3.11`.
            lookup(&explicit.to_string_lossy())
        } else {
            None
        };

        return found
            .map(|path| Interpreter {
                path,
                source: InterpreterSource::Explicit,
            })
            .ok_or_else(|| DoctorinoError::InterpreterNotFound {
                searched: vec![explicit.to_path_buf()],
            });
    }

    for venv in layout.venv_candidates() {
        let python = platform::venv_python(&venv);
        if python.is_file() {
            debug!("Using virtual environment interpreter {}", python.display());
            return Ok(Interpreter {
                path: python,
                source: InterpreterSource::VirtualEnv,
            });
        }
        searched.push(python);
    }

    for name in platform::system_python_names() {
        if let Some(path) = lookup(name) {
            debug!("Using system interpreter {}", path.display());
            return Ok(Interpreter {
                path,
                source: InterpreterSource::System,
            });
        }
        searched.push(PathBuf::from(name));
    }

    Err(DoctorinoError::InterpreterNotFound { searched })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_prefers_backend_venv() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());
        let backend_python = platform::venv_python(&layout.backend_dir.join("venv"));
        let root_python = platform::venv_python(&temp.path().join(".venv"));
        touch(&backend_python);
        touch(&root_python);

        let found = resolve_with(&layout, None, |_| Some(PathBuf::from("/usr/bin/python3"))).unwrap();
        assert_eq!(found.path, backend_python);
        assert_eq!(found.source, InterpreterSource::VirtualEnv);
    }

    #[test]
    fn test_falls_back_to_system() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());

        let found = resolve_with(&layout, None, |name| {
            (name == "python" || name == "python3").then(|| PathBuf::from("/usr/bin").join(name))
        })
        .unwrap();
        assert_eq!(found.source, InterpreterSource::System);
    }

    #[test]
    fn test_nothing_found() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());

        let err = resolve_with(&layout, None, |_| None).unwrap_err();
        match err {
            DoctorinoError::InterpreterNotFound { searched } => {
                // Four venv candidates plus every system name.
                assert_eq!(searched.len(), 4 + platform::system_python_names().len());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_path() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());
        let custom = temp.path().join("custom-python");
        touch(&custom);

        let found = resolve_with(&layout, Some(&custom), |_| None).unwrap();
        assert_eq!(found.path, custom);
        assert_eq!(found.source, InterpreterSource::Explicit);
    }

    #[test]
    fn test_explicit_missing_does_not_fall_back() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());
        touch(&platform::venv_python(&layout.backend_dir.join("venv")));

        let missing = temp.path().join("nope").join("python");
        let err = resolve_with(&layout, Some(&missing), |_| None).unwrap_err();
        assert!(matches!(err, DoctorinoError::InterpreterNotFound { .. }));
    }

    #[test]
    fn test_explicit_bare_name_uses_path_lookup() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());

        let found = resolve_with(&layout, Some(Path::new("python3.11")), |name| {
            Some(PathBuf::from("/usr/local/bin").join(name))
        })
        .unwrap();
        assert_eq!(found.path, PathBuf::from("/usr/local/bin/python3.11"));
    }
}
