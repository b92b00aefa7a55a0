//! Doctorino - desktop host for the Doctorino medical practice application.
//!
//! Starts the local Python backend, waits until it is healthy, and opens the
//! main window with a bridge to a few host capabilities.

mod app;
mod dialogs;
mod handler;
mod server;
mod window;

use app::Settings;
use clap::{Parser, ValueEnum};
use doctorino_core::backend::{BackendLayout, BuildMode};
use doctorino_core::config::{EnvVars, SupervisorConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Packaged when `resources/backend` sits next to the executable
    Auto,
    Development,
    Packaged,
}

#[derive(Parser, Debug)]
#[command(name = "doctorino")]
#[command(about = "Desktop host for the Doctorino medical practice application")]
#[command(version)]
struct Args {
    /// Port for the backend
    #[arg(short, long, env = EnvVars::API_PORT, default_value_t = SupervisorConfig::DEFAULT_PORT)]
    port: u16,

    /// Enable debug logging and backend auto-reload
    #[arg(short, long)]
    debug: bool,

    /// Build mode
    #[arg(long, value_enum, default_value_t = ModeArg::Auto)]
    mode: ModeArg,

    /// Application root containing `backend/` (defaults per mode)
    #[arg(long)]
    app_root: Option<PathBuf>,

    /// Python interpreter for the backend
    #[arg(long, env = EnvVars::PYTHON)]
    python: Option<PathBuf>,

    /// Port for the local bridge server (0 = auto-assign)
    #[arg(long, default_value = "0")]
    bridge_port: u16,

    /// Do not open a window; report fatal errors on stderr
    #[arg(long)]
    headless: bool,

    /// Install backend dependencies with pip and exit
    #[arg(long)]
    install_deps: bool,
}

impl Args {
    fn into_settings(self) -> Settings {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| cwd.clone());

        let mode = match self.mode {
            ModeArg::Auto => BuildMode::detect(&exe_dir),
            ModeArg::Development => BuildMode::Development,
            ModeArg::Packaged => BuildMode::Packaged,
        };

        Settings {
            layout: BackendLayout::resolve(mode, self.app_root, &exe_dir, &cwd),
            port: self.port,
            debug: self.debug,
            python: self.python,
            bridge_port: self.bridge_port,
            headless: self.headless,
            install_deps: self.install_deps,
            backend_url: std::env::var(EnvVars::BACKEND_URL).ok(),
            dev_server_url: std::env::var(EnvVars::DEV_SERVER_URL).ok(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging; RUST_LOG overrides the flag.
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("Starting Doctorino {}", env!("CARGO_PKG_VERSION"));

    app::run(args.into_settings()).await
}
