//! Startup and shutdown sequence of the desktop host.

use crate::dialogs::{self, NativeDialogs};
use crate::server::{self, BridgeState};
use crate::server::WindowSignal;
use crate::window::{ShellWindow, WindowPresence};
use anyhow::Context;
use doctorino_core::backend::{
    install_dependencies, BackendClient, BackendEndpoint, BackendLayout, BackendSpec,
};
use doctorino_core::config::{AppConfig, SupervisorConfig};
use doctorino_core::{
    BackendSupervisor, Bridge, BuildMode, DoctorinoError, EventBus, FrontendSource, HostEvent,
    WindowController, WindowState,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Resolved command-line and environment settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub layout: BackendLayout,
    pub port: u16,
    pub debug: bool,
    pub python: Option<PathBuf>,
    pub bridge_port: u16,
    pub headless: bool,
    pub install_deps: bool,
    pub backend_url: Option<String>,
    pub dev_server_url: Option<String>,
}

/// Run the host until Ctrl-C, or until startup fails.
pub async fn run(settings: Settings) -> ExitCode {
    info!(
        "{} mode, application root {}",
        settings.layout.mode,
        settings.layout.app_root.display()
    );

    if settings.install_deps {
        return match install_dependencies(&settings.layout, settings.python.as_deref()).await {
            Ok(()) => {
                info!("Dependencies installed. Please restart the application.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                report_fatal(&e.to_string(), settings.headless).await;
                ExitCode::FAILURE
            }
        };
    }

    let events = EventBus::default();
    let mut runtime_events = events.subscribe();

    let endpoint = match BackendEndpoint::resolve(settings.port, settings.backend_url.as_deref()) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            report_fatal(&e.to_string(), settings.headless).await;
            return ExitCode::FAILURE;
        }
    };

    let mut supervisor = BackendSupervisor::new(backend_spec(&settings, &endpoint), events.clone());

    let (window_signals, mut window_signal_rx) = mpsc::unbounded_channel();
    let mut presence = WindowPresence::default();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let started = tokio::select! {
        result = startup(&settings, &endpoint, &mut supervisor, &events, window_signals) => Some(result),
        _ = &mut shutdown => None,
    };

    let mut window = match started {
        Some(Ok(window)) => window,
        None => {
            info!("Shutdown signal received during startup");
            if let Err(e) = supervisor.stop().await {
                error!("Failed to stop backend: {}", e);
            }
            return ExitCode::SUCCESS;
        }
        Some(Err(e)) => {
            error!("Startup failed: {:#}", e);
            if let Err(stop_err) = supervisor.stop().await {
                warn!("Failed to stop backend after startup error: {}", stop_err);
            }
            report_fatal(&format!("{:#}", e), settings.headless).await;
            return ExitCode::FAILURE;
        }
    };

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutdown signal received");
                break;
            }
            event = runtime_events.recv() => match event {
                Ok(HostEvent::BackendExited { code }) => {
                    let message = format!(
                        "The backend stopped unexpectedly (exit code {}). Restart {} to continue.",
                        code.map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                        AppConfig::APP_NAME,
                    );
                    error!("{}", message);
                    if window.state() == WindowState::Closed {
                        if let Err(e) = window.activate() {
                            warn!("Failed to re-open the main window: {}", e);
                        }
                    }
                    if !settings.headless {
                        tokio::task::spawn_blocking(move || {
                            dialogs::show_error("Backend Error", &message)
                        });
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            Some(signal) = window_signal_rx.recv() => presence.apply(signal, &mut window),
        }
    }

    window.destroy();
    if let Err(e) = supervisor.stop().await {
        error!("Failed to stop backend: {}", e);
    }
    info!("Goodbye");
    ExitCode::SUCCESS
}

fn backend_spec(settings: &Settings, endpoint: &BackendEndpoint) -> BackendSpec {
    let reload = settings.debug && settings.layout.mode == BuildMode::Development;
    let mut spec = BackendSpec::new(settings.layout.clone(), settings.port).with_reload(reload);
    if let Some(python) = &settings.python {
        spec = spec.with_interpreter(python.clone());
    }
    if endpoint.is_external() {
        info!("Using external backend at {}", endpoint.base_url());
        spec = spec.without_spawn();
    }
    spec
}

/// Start the backend, wait for it, then bring up the bridge and the window.
async fn startup(
    settings: &Settings,
    endpoint: &BackendEndpoint,
    supervisor: &mut BackendSupervisor,
    events: &EventBus,
    window_signals: mpsc::UnboundedSender<WindowSignal>,
) -> anyhow::Result<WindowController<ShellWindow>> {
    supervisor.start().await?;

    let client = BackendClient::new(endpoint.clone())?;
    supervisor.wait_for_ready(&client).await?;

    match client.info().await {
        Ok(backend) => info!(
            "Backend: {} (version {}, {})",
            backend.message, backend.version, backend.environment
        ),
        Err(e) => warn!("Backend info unavailable: {}", e),
    }

    let frontend = FrontendSource::resolve(&settings.layout, settings.dev_server_url.as_deref())?;
    if let Some(dir) = frontend.bundle_dir() {
        if !dir.is_dir() {
            return Err(DoctorinoError::Config {
                message: format!("Front-end bundle not found: {}", dir.display()),
            }
            .into());
        }
    }

    let state = BridgeState {
        bridge: Bridge::new(endpoint.base_url(), Arc::new(NativeDialogs)),
        events: events.clone(),
        window_signals,
    };
    let bridge_addr = server::start_server(
        state,
        frontend.bundle_dir().cloned(),
        SupervisorConfig::BIND_HOST,
        settings.bridge_port,
    )
    .await
    .context("Failed to start bridge server")?;

    let url = frontend.window_url(&format!("http://{}", bridge_addr))?;
    let mut window = WindowController::new(ShellWindow::select(settings.headless));
    window.create(&url)?;
    Ok(window)
}

/// Tell the user startup failed: a dialog, or stderr when headless.
async fn report_fatal(message: &str, headless: bool) {
    let title = format!("{} failed to start", AppConfig::APP_NAME);
    if headless {
        eprintln!("{}: {}", title, message);
        return;
    }
    let message = message.to_string();
    if let Err(e) = tokio::task::spawn_blocking(move || dialogs::show_error(&title, &message)).await
    {
        eprintln!("{}", e);
    }
}
