//! Backend process supervisor.
//!
//! Lifecycle:
//!
//! ```text
//! Stopped -> Starting -> Ready -> Stopping -> Stopped
//!                    \-> Failed            (terminal)
//!            Starting/Ready -> Exited      (unexpected exit, terminal)
//! ```
//!
//! A supervisor starts at most once. Failures are not retried and an
//! unexpected exit is reported, never restarted.

use super::interpreter::{resolve_interpreter, Interpreter};
use super::launch::BackendSpec;
use super::output::forward_lines;
use super::readiness::{poll_until_ready, HealthProbe, ReadinessPolicy, ReadyReport};
use crate::config::SupervisorConfig;
use crate::error::{DoctorinoError, Result};
use crate::events::{EventBus, HostEvent, OutputStream};
use crate::platform;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::process::Child;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle state of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SupervisorState {
    Stopped,
    Starting,
    Ready,
    Failed,
    Stopping,
    Exited { code: Option<i32> },
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SupervisorState::Stopped => f.write_str("stopped"),
            SupervisorState::Starting => f.write_str("starting"),
            SupervisorState::Ready => f.write_str("ready"),
            SupervisorState::Failed => f.write_str("failed"),
            SupervisorState::Stopping => f.write_str("stopping"),
            SupervisorState::Exited { code: Some(code) } => write!(f, "exited with code {}", code),
            SupervisorState::Exited { code: None } => f.write_str("exited"),
        }
    }
}

/// Publishes state changes to watchers and the event bus.
#[derive(Debug, Clone)]
struct StateCell {
    tx: Arc<watch::Sender<SupervisorState>>,
    events: EventBus,
}

impl StateCell {
    fn get(&self) -> SupervisorState {
        *self.tx.borrow()
    }

    fn set(&self, next: SupervisorState) {
        let previous = self.tx.send_replace(next);
        if previous != next {
            debug!("Backend state {} -> {}", previous, next);
            self.events.publish(HostEvent::BackendState { state: next });
        }
    }

    /// Set `next` only while the current state satisfies `allowed`.
    fn set_if(&self, next: SupervisorState, allowed: impl Fn(&SupervisorState) -> bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if allowed(current) && *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
        if changed {
            self.events.publish(HostEvent::BackendState { state: next });
        }
        changed
    }
}

/// Owns the backend child process and its lifecycle state.
pub struct BackendSupervisor {
    spec: BackendSpec,
    policy: ReadinessPolicy,
    events: EventBus,
    state: StateCell,
    started: bool,
    pid: Option<u32>,
    interpreter: Option<Interpreter>,
    stop_requested: Arc<AtomicBool>,
    monitor: Option<JoinHandle<()>>,
    output_tasks: Vec<JoinHandle<()>>,
}

impl BackendSupervisor {
    pub fn new(spec: BackendSpec, events: EventBus) -> Self {
        let (tx, _) = watch::channel(SupervisorState::Stopped);
        Self {
            spec,
            policy: ReadinessPolicy::default(),
            state: StateCell {
                tx: Arc::new(tx),
                events: events.clone(),
            },
            events,
            started: false,
            pid: None,
            interpreter: None,
            stop_requested: Arc::new(AtomicBool::new(false)),
            monitor: None,
            output_tasks: Vec::new(),
        }
    }

    /// Override the readiness budget.
    pub fn with_policy(mut self, policy: ReadinessPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state.get()
    }

    /// Watch state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.tx.subscribe()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn interpreter(&self) -> Option<&Interpreter> {
        self.interpreter.as_ref()
    }

    pub fn spec(&self) -> &BackendSpec {
        &self.spec
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Launch the backend.
    ///
    /// Fails without spawning anything when the entry point or interpreter is
    /// missing. Must be called from within a tokio runtime.
    pub async fn start(&mut self) -> Result<()> {
        let current = self.state();
        if self.started || current != SupervisorState::Stopped {
            return Err(DoctorinoError::InvalidState {
                operation: "start",
                state: current.to_string(),
            });
        }
        self.started = true;
        self.state.set(SupervisorState::Starting);

        if !self.spec.spawn {
            info!("Using externally hosted backend; nothing to launch");
            return Ok(());
        }

        match self.launch() {
            Ok(()) => Ok(()),
            Err(e) => {
                error!("Backend launch failed: {}", e);
                self.state.set(SupervisorState::Failed);
                Err(e)
            }
        }
    }

    fn launch(&mut self) -> Result<()> {
        let layout = &self.spec.layout;
        if !layout.entry_exists() {
            return Err(DoctorinoError::BackendEntryNotFound(layout.entry_file.clone()));
        }

        let interpreter = resolve_interpreter(layout, self.spec.interpreter.as_deref())?;
        info!(
            "Launching backend {} with {} ({:?})",
            layout.entry_file.display(),
            interpreter.path.display(),
            interpreter.source
        );

        let mut child = self
            .spec
            .command(&interpreter.path)
            .spawn()
            .map_err(|e| DoctorinoError::SpawnFailed {
                program: interpreter.path.clone(),
                message: e.to_string(),
                source: Some(e),
            })?;

        let pid = child.id();
        info!("Backend process started with PID {:?} on port {}", pid, self.spec.port);

        if let Some(stdout) = child.stdout.take() {
            self.output_tasks
                .push(forward_lines(stdout, OutputStream::Stdout, self.events.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            self.output_tasks
                .push(forward_lines(stderr, OutputStream::Stderr, self.events.clone()));
        }

        self.monitor = Some(self.spawn_monitor(child));
        self.pid = pid;
        self.interpreter = Some(interpreter);
        Ok(())
    }

    /// Wait for the child and report exits nobody asked for.
    fn spawn_monitor(&self, mut child: Child) -> JoinHandle<()> {
        let state = self.state.clone();
        let stop_requested = Arc::clone(&self.stop_requested);
        let events = self.events.clone();

        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("Failed to wait for backend process: {}", e);
                    None
                }
            };

            if stop_requested.load(Ordering::SeqCst) {
                debug!("Backend exited after stop request (code {:?})", code);
                return;
            }

            error!("Backend process exited unexpectedly (code {:?})", code);
            state.set_if(SupervisorState::Exited { code }, |s| {
                matches!(s, SupervisorState::Starting | SupervisorState::Ready)
            });
            events.publish(HostEvent::BackendExited { code });
        })
    }

    /// Poll `probe` until the backend is healthy or the budget runs out.
    ///
    /// On failure the state becomes `Failed`; the process, if any, stays alive
    /// until [`stop`](Self::stop) is called.
    pub async fn wait_for_ready<P>(&mut self, probe: &P) -> Result<ReadyReport>
    where
        P: HealthProbe + ?Sized,
    {
        match self.state() {
            SupervisorState::Starting => {}
            SupervisorState::Exited { code } => {
                error!("Backend exited before readiness polling began (code {:?})", code);
                self.state.set(SupervisorState::Failed);
                return Err(DoctorinoError::BackendExited { code });
            }
            current => {
                return Err(DoctorinoError::InvalidState {
                    operation: "wait for readiness",
                    state: current.to_string(),
                });
            }
        }

        let watcher = self.state.tx.subscribe();
        let result = poll_until_ready(probe, &self.policy, || match *watcher.borrow() {
            SupervisorState::Exited { code } => Some(DoctorinoError::BackendExited { code }),
            _ => None,
        })
        .await;

        match result {
            Ok(report) => {
                if self
                    .state
                    .set_if(SupervisorState::Ready, |s| *s == SupervisorState::Starting)
                {
                    Ok(report)
                } else {
                    // Exited between the last check and the successful probe.
                    let code = match self.state() {
                        SupervisorState::Exited { code } => code,
                        _ => None,
                    };
                    self.state.set(SupervisorState::Failed);
                    Err(DoctorinoError::BackendExited { code })
                }
            }
            Err(e) => {
                error!("Backend did not become ready: {}", e);
                self.state.set(SupervisorState::Failed);
                Err(e)
            }
        }
    }

    /// Terminate the backend.
    ///
    /// A no-op when nothing was started or the process already exited. From
    /// `Failed` the process is still killed but the state stays `Failed`.
    pub async fn stop(&mut self) -> Result<()> {
        let current = self.state();

        let Some(pid) = self.pid else {
            if matches!(current, SupervisorState::Starting | SupervisorState::Ready) {
                // External backend: nothing to terminate.
                self.state.set(SupervisorState::Stopped);
            }
            return Ok(());
        };

        if let SupervisorState::Exited { .. } = current {
            self.pid = None;
            self.monitor = None;
            return Ok(());
        }

        self.stop_requested.store(true, Ordering::SeqCst);
        let failed = current == SupervisorState::Failed;
        if !failed {
            self.state.set(SupervisorState::Stopping);
        }

        info!("Stopping backend process {}", pid);
        let gone =
            platform::terminate_process_tree(pid, SupervisorConfig::TERMINATE_GRACE).await?;
        if !gone {
            warn!("Backend process {} may still be running", pid);
        }

        if let Some(monitor) = self.monitor.take() {
            if tokio::time::timeout(SupervisorConfig::MONITOR_JOIN_TIMEOUT, monitor)
                .await
                .is_err()
            {
                warn!("Timed out waiting for backend process {} to be reaped", pid);
            }
        }

        for task in self.output_tasks.drain(..) {
            task.abort();
        }

        self.pid = None;
        if !failed {
            self.state.set(SupervisorState::Stopped);
        }
        info!("Backend stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::layout::BackendLayout;
    use crate::backend::launch::LaunchArgs;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct NeverHealthy;

    #[async_trait]
    impl HealthProbe for NeverHealthy {
        fn target(&self) -> &str {
            "never"
        }

        async fn probe(&self) -> bool {
            false
        }
    }

    struct AlwaysHealthy;

    #[async_trait]
    impl HealthProbe for AlwaysHealthy {
        fn target(&self) -> &str {
            "always"
        }

        async fn probe(&self) -> bool {
            true
        }
    }

    fn fast_policy() -> ReadinessPolicy {
        ReadinessPolicy::new()
            .with_max_attempts(3)
            .with_interval(Duration::from_millis(20))
    }

    /// A layout whose entry point exists.
    fn layout_with_entry(temp: &TempDir) -> BackendLayout {
        let layout = BackendLayout::development(temp.path());
        std::fs::create_dir_all(&layout.backend_dir).unwrap();
        std::fs::write(&layout.entry_file, "app = None\n").unwrap();
        layout
    }

    #[tokio::test]
    async fn test_missing_entry_fails_before_spawn() {
        let temp = TempDir::new().unwrap();
        let spec = BackendSpec::new(BackendLayout::development(temp.path()), 34664);
        let mut supervisor = BackendSupervisor::new(spec, EventBus::default());

        let err = supervisor.start().await.unwrap_err();

        assert!(matches!(err, DoctorinoError::BackendEntryNotFound(_)));
        assert!(err.is_fatal_startup());
        assert_eq!(supervisor.pid(), None);
        assert!(supervisor.interpreter().is_none());
        assert_eq!(supervisor.state(), SupervisorState::Failed);
    }

    #[tokio::test]
    async fn test_missing_interpreter_fails_before_spawn() {
        let temp = TempDir::new().unwrap();
        let spec = BackendSpec::new(layout_with_entry(&temp), 34664)
            .with_interpreter(temp.path().join("no-such-python"));
        let mut supervisor = BackendSupervisor::new(spec, EventBus::default());

        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, DoctorinoError::InterpreterNotFound { .. }));
        assert_eq!(supervisor.pid(), None);
    }

    #[tokio::test]
    async fn test_no_retry_after_failure() {
        let temp = TempDir::new().unwrap();
        let spec = BackendSpec::new(BackendLayout::development(temp.path()), 34664);
        let mut supervisor = BackendSupervisor::new(spec, EventBus::default());

        assert!(supervisor.start().await.is_err());
        let err = supervisor.start().await.unwrap_err();
        assert!(matches!(err, DoctorinoError::InvalidState { operation: "start", .. }));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let temp = TempDir::new().unwrap();
        let spec = BackendSpec::new(BackendLayout::development(temp.path()), 34664);
        let mut supervisor = BackendSupervisor::new(spec, EventBus::default());

        supervisor.stop().await.unwrap();
        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }

    #[tokio::test]
    async fn test_wait_requires_start() {
        let temp = TempDir::new().unwrap();
        let spec = BackendSpec::new(BackendLayout::development(temp.path()), 34664);
        let mut supervisor = BackendSupervisor::new(spec, EventBus::default());

        let err = supervisor.wait_for_ready(&AlwaysHealthy).await.unwrap_err();
        assert!(matches!(err, DoctorinoError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn test_external_backend_lifecycle() {
        let temp = TempDir::new().unwrap();
        let spec = BackendSpec::new(BackendLayout::development(temp.path()), 34664).without_spawn();
        let mut supervisor = BackendSupervisor::new(spec, EventBus::default());

        supervisor.start().await.unwrap();
        assert_eq!(supervisor.pid(), None);

        let report = supervisor.wait_for_ready(&AlwaysHealthy).await.unwrap();
        assert_eq!(report.attempts, 1);
        assert_eq!(supervisor.state(), SupervisorState::Ready);

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Stopped);
    }

    #[cfg(unix)]
    fn sh_spec(temp: &TempDir, script: &str) -> BackendSpec {
        BackendSpec::new(layout_with_entry(temp), 34664)
            .with_interpreter("/bin/sh")
            .with_args(LaunchArgs::Custom(vec!["-c".into(), script.into()]))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_then_still_terminable() {
        let temp = TempDir::new().unwrap();
        let mut supervisor = BackendSupervisor::new(sh_spec(&temp, "sleep 30"), EventBus::default())
            .with_policy(fast_policy());

        supervisor.start().await.unwrap();
        let pid = supervisor.pid().unwrap();
        assert!(platform::is_process_alive(pid));

        let err = supervisor.wait_for_ready(&NeverHealthy).await.unwrap_err();
        assert!(matches!(err, DoctorinoError::HealthCheckTimeout { attempts: 3, .. }));
        assert_eq!(supervisor.state(), SupervisorState::Failed);

        supervisor.stop().await.unwrap();
        assert!(!platform::is_process_alive(pid));
        assert_eq!(supervisor.pid(), None);
        assert_eq!(supervisor.state(), SupervisorState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ready_then_stop() {
        let temp = TempDir::new().unwrap();
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let mut supervisor =
            BackendSupervisor::new(sh_spec(&temp, "sleep 30"), events).with_policy(fast_policy());

        supervisor.start().await.unwrap();
        supervisor.wait_for_ready(&AlwaysHealthy).await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Ready);

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state(), SupervisorState::Stopped);

        // An intentional stop is never reported as an exit.
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, HostEvent::BackendExited { .. }));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unexpected_exit_is_reported() {
        let temp = TempDir::new().unwrap();
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let mut supervisor = BackendSupervisor::new(sh_spec(&temp, "sleep 0.2; exit 3"), events)
            .with_policy(fast_policy());

        supervisor.start().await.unwrap();
        supervisor.wait_for_ready(&AlwaysHealthy).await.unwrap();

        let exited = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let HostEvent::BackendExited { code } = rx.recv().await.unwrap() {
                    return code;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(exited, Some(3));
        assert_eq!(supervisor.state(), SupervisorState::Exited { code: Some(3) });

        // Nothing left to stop; no restart happens.
        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.pid(), None);
        assert_eq!(supervisor.state(), SupervisorState::Exited { code: Some(3) });
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_during_startup_fails_fast() {
        let temp = TempDir::new().unwrap();
        let mut supervisor = BackendSupervisor::new(sh_spec(&temp, "exit 1"), EventBus::default())
            .with_policy(
                ReadinessPolicy::new()
                    .with_max_attempts(50)
                    .with_interval(Duration::from_millis(50)),
            );

        supervisor.start().await.unwrap();
        let err = supervisor.wait_for_ready(&NeverHealthy).await.unwrap_err();

        assert!(matches!(err, DoctorinoError::BackendExited { code: Some(1) }));
        assert_eq!(supervisor.state(), SupervisorState::Failed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_before_wait_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut supervisor = BackendSupervisor::new(sh_spec(&temp, "exit 1"), EventBus::default())
            .with_policy(fast_policy());

        supervisor.start().await.unwrap();
        let mut state = supervisor.subscribe_state();
        tokio::time::timeout(
            Duration::from_secs(5),
            state.wait_for(|s| matches!(s, SupervisorState::Exited { .. })),
        )
        .await
        .unwrap()
        .unwrap();

        let err = supervisor.wait_for_ready(&AlwaysHealthy).await.unwrap_err();

        assert!(matches!(err, DoctorinoError::BackendExited { code: Some(1) }));
        assert!(err.is_fatal_startup());
        assert_eq!(supervisor.state(), SupervisorState::Failed);
    }
}
