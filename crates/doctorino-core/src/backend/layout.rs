//! Where the backend lives on disk.
//!
//! Development checkouts keep the backend next to the front-end sources;
//! packaged builds ship it under `resources/` beside the executable.

use crate::config::{PathsConfig, SupervisorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How the host was built and laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    Packaged,
}

impl BuildMode {
    /// Packaged when `<exe_dir>/resources/backend` exists.
    pub fn detect(exe_dir: &Path) -> Self {
        if packaged_root(exe_dir)
            .join(PathsConfig::BACKEND_DIR_NAME)
            .is_dir()
        {
            BuildMode::Packaged
        } else {
            BuildMode::Development
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Development => "development",
            BuildMode::Packaged => "packaged",
        }
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn packaged_root(exe_dir: &Path) -> PathBuf {
    exe_dir.join(PathsConfig::RESOURCES_DIR_NAME)
}

/// Resolved locations of the backend and front-end bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendLayout {
    pub mode: BuildMode,
    /// Development: repository root. Packaged: the `resources` directory.
    pub app_root: PathBuf,
    pub backend_dir: PathBuf,
    pub entry_file: PathBuf,
    pub requirements_file: PathBuf,
}

impl BackendLayout {
    /// Layout of a development checkout rooted at `app_root`.
    pub fn development(app_root: impl Into<PathBuf>) -> Self {
        Self::rooted(BuildMode::Development, app_root.into())
    }

    /// Layout of a packaged build whose executable lives in `exe_dir`.
    pub fn packaged(exe_dir: &Path) -> Self {
        Self::rooted(BuildMode::Packaged, packaged_root(exe_dir))
    }

    /// Resolve the layout for `mode`.
    ///
    /// An explicit `app_root` always wins; otherwise development uses the
    /// current directory and packaged uses the executable directory.
    pub fn resolve(mode: BuildMode, app_root: Option<PathBuf>, exe_dir: &Path, cwd: &Path) -> Self {
        match (mode, app_root) {
            (mode, Some(root)) => Self::rooted(mode, root),
            (BuildMode::Development, None) => Self::development(cwd),
            (BuildMode::Packaged, None) => Self::packaged(exe_dir),
        }
    }

    fn rooted(mode: BuildMode, app_root: PathBuf) -> Self {
        let backend_dir = app_root.join(PathsConfig::BACKEND_DIR_NAME);
        Self {
            mode,
            entry_file: backend_dir.join(PathsConfig::BACKEND_ENTRY_FILE),
            requirements_file: backend_dir.join(PathsConfig::REQUIREMENTS_FILE),
            backend_dir,
            app_root,
        }
    }

    /// Whether the backend entry point is present.
    pub fn entry_exists(&self) -> bool {
        self.entry_file.is_file()
    }

    /// Virtual environments to try, most specific first.
    pub fn venv_candidates(&self) -> Vec<PathBuf> {
        [&self.backend_dir, &self.app_root]
            .into_iter()
            .flat_map(|base| PathsConfig::VENV_DIR_NAMES.iter().map(move |name| base.join(name)))
            .collect()
    }

    /// The ASGI target handed to uvicorn, e.g. `main:app`.
    pub fn asgi_target(&self) -> String {
        let module = self
            .entry_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "main".to_string());
        format!("{}:{}", module, SupervisorConfig::ASGI_APP_ATTR)
    }

    /// Directory holding the built front-end bundle.
    pub fn frontend_bundle_dir(&self) -> PathBuf {
        self.app_root
            .join(PathsConfig::FRONTEND_DIR_NAME)
            .join(PathsConfig::FRONTEND_DIST_DIR_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_development_layout() {
        let layout = BackendLayout::development("/src/doctorino");
        assert_eq!(layout.mode, BuildMode::Development);
        assert_eq!(layout.backend_dir, PathBuf::from("/src/doctorino/backend"));
        assert_eq!(layout.entry_file, PathBuf::from("/src/doctorino/backend/main.py"));
        assert_eq!(
            layout.requirements_file,
            PathBuf::from("/src/doctorino/backend/requirements.txt")
        );
        assert_eq!(layout.asgi_target(), "main:app");
    }

    #[test]
    fn test_packaged_layout_uses_resources() {
        let layout = BackendLayout::packaged(Path::new("/opt/doctorino"));
        assert_eq!(layout.mode, BuildMode::Packaged);
        assert_eq!(layout.app_root, PathBuf::from("/opt/doctorino/resources"));
        assert_eq!(
            layout.frontend_bundle_dir(),
            PathBuf::from("/opt/doctorino/resources/frontend/dist")
        );
    }

    #[test]
    fn test_detect_mode() {
        let temp = TempDir::new().unwrap();
        assert_eq!(BuildMode::detect(temp.path()), BuildMode::Development);

        std::fs::create_dir_all(temp.path().join("resources/backend")).unwrap();
        assert_eq!(BuildMode::detect(temp.path()), BuildMode::Packaged);
    }

    #[test]
    fn test_explicit_root_wins() {
        let layout = BackendLayout::resolve(
            BuildMode::Packaged,
            Some(PathBuf::from("/custom")),
            Path::new("/opt/doctorino"),
            Path::new("/home/user"),
        );
        assert_eq!(layout.backend_dir, PathBuf::from("/custom/backend"));
        assert_eq!(layout.mode, BuildMode::Packaged);
    }

    #[test]
    fn test_venv_candidates_order() {
        let layout = BackendLayout::development("/app");
        assert_eq!(
            layout.venv_candidates(),
            vec![
                PathBuf::from("/app/backend/venv"),
                PathBuf::from("/app/backend/.venv"),
                PathBuf::from("/app/venv"),
                PathBuf::from("/app/.venv"),
            ]
        );
    }

    #[test]
    fn test_entry_exists() {
        let temp = TempDir::new().unwrap();
        let layout = BackendLayout::development(temp.path());
        assert!(!layout.entry_exists());

        std::fs::create_dir_all(&layout.backend_dir).unwrap();
        std::fs::write(&layout.entry_file, "app = None\n").unwrap();
        assert!(layout.entry_exists());
    }
}
