//! The Python backend: where it lives, how it is launched, and how its
//! lifecycle is supervised.
//!
//! # Example
//!
//! ```rust,no_run
//! use doctorino_core::backend::{BackendClient, BackendEndpoint, BackendLayout, BackendSpec, BackendSupervisor};
//! use doctorino_core::EventBus;
//!
//! #[tokio::main]
//! async fn main() -> doctorino_core::Result<()> {
//!     let layout = BackendLayout::development("/path/to/doctorino");
//!     let mut supervisor = BackendSupervisor::new(BackendSpec::new(layout, 34664), EventBus::default());
//!
//!     supervisor.start().await?;
//!     let client = BackendClient::new(BackendEndpoint::local(34664))?;
//!     supervisor.wait_for_ready(&client).await?;
//!
//!     supervisor.stop().await
//! }
//! ```

mod client;
mod deps;
mod interpreter;
mod launch;
mod layout;
mod output;
mod readiness;
mod supervisor;

pub use client::{BackendClient, BackendEndpoint, BackendInfo};
pub use deps::install_dependencies;
pub use interpreter::{resolve_interpreter, Interpreter, InterpreterSource};
pub use launch::{BackendSpec, LaunchArgs};
pub use layout::{BackendLayout, BuildMode};
pub use output::looks_like_error;
pub use readiness::{wait_until_ready, HealthProbe, ReadinessPolicy, ReadyReport};
pub use supervisor::{BackendSupervisor, SupervisorState};
