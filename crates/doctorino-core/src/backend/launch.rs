//! How the backend process is launched.

use super::layout::BackendLayout;
use crate::config::SupervisorConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Arguments passed to the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchArgs {
    /// `-u -m uvicorn <entry>:app --host <host> --port <port> [--reload]`
    Uvicorn {
        host: String,
        port: u16,
        reload: bool,
    },
    /// Arguments used verbatim.
    Custom(Vec<String>),
}

impl LaunchArgs {
    /// Render the argument list for `layout`.
    pub fn to_args(&self, layout: &BackendLayout) -> Vec<String> {
        match self {
            LaunchArgs::Uvicorn { host, port, reload } => {
                let mut args = vec![
                    "-u".to_string(),
                    "-m".to_string(),
                    "uvicorn".to_string(),
                    layout.asgi_target(),
                    "--host".to_string(),
                    host.clone(),
                    "--port".to_string(),
                    port.to_string(),
                ];
                if *reload {
                    args.push("--reload".to_string());
                }
                args
            }
            LaunchArgs::Custom(args) => args.clone(),
        }
    }
}

/// Everything needed to start the backend.
#[derive(Debug, Clone)]
pub struct BackendSpec {
    pub layout: BackendLayout,
    /// Interpreter override; resolved automatically when `None`.
    pub interpreter: Option<PathBuf>,
    pub port: u16,
    pub args: LaunchArgs,
    pub env_vars: HashMap<String, String>,
    /// `false` when the backend is hosted elsewhere and only polled.
    pub spawn: bool,
}

impl BackendSpec {
    /// Uvicorn on the loopback interface at `port`.
    pub fn new(layout: BackendLayout, port: u16) -> Self {
        Self {
            layout,
            interpreter: None,
            port,
            args: LaunchArgs::Uvicorn {
                host: SupervisorConfig::BIND_HOST.to_string(),
                port,
                reload: false,
            },
            env_vars: HashMap::new(),
            spawn: true,
        }
    }

    /// Use a specific interpreter.
    pub fn with_interpreter(mut self, path: impl Into<PathBuf>) -> Self {
        self.interpreter = Some(path.into());
        self
    }

    /// Toggle uvicorn's auto-reload. Ignored for custom arguments.
    pub fn with_reload(mut self, enabled: bool) -> Self {
        if let LaunchArgs::Uvicorn { reload, .. } = &mut self.args {
            *reload = enabled;
        }
        self
    }

    /// Replace the interpreter arguments.
    pub fn with_args(mut self, args: LaunchArgs) -> Self {
        self.args = args;
        self
    }

    /// Add an environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Do not start a process; the backend is reached at an external URL.
    pub fn without_spawn(mut self) -> Self {
        self.spawn = false;
        self
    }

    /// Build the command for `interpreter`.
    ///
    /// Output is piped and unbuffered. On Unix the child leads its own process
    /// group so the whole tree can be signalled.
    pub(crate) fn command(&self, interpreter: &Path) -> Command {
        let mut cmd = Command::new(interpreter);
        cmd.args(self.args.to_args(&self.layout))
            .current_dir(&self.layout.backend_dir)
            .env("PYTHONUNBUFFERED", "1")
            .env("PORT", self.port.to_string())
            .env("API_PORT", self.port.to_string())
            .envs(&self.env_vars)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | CREATE_NO_WINDOW);
        }

        cmd
    }
}
