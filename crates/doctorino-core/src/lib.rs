//! Doctorino Core - process supervision and window plumbing for the Doctorino
//! desktop host.
//!
//! The host starts the local Python backend, waits until it answers on its
//! health endpoint, opens the main window, and exposes a small set of host
//! capabilities to that window. This crate holds everything except the
//! binary's wiring (CLI, logging setup, native dialogs and the HTTP surface).
//!
//! # Example
//!
//! ```rust,ignore
//! use doctorino_core::backend::{
//!     BackendClient, BackendEndpoint, BackendLayout, BackendSpec, BackendSupervisor,
//! };
//! use doctorino_core::EventBus;
//!
//! #[tokio::main]
//! async fn main() -> doctorino_core::Result<()> {
//!     let layout = BackendLayout::development("/path/to/doctorino");
//!     let events = EventBus::default();
//!     let mut supervisor = BackendSupervisor::new(BackendSpec::new(layout, 34664), events);
//!
//!     supervisor.start().await?;
//!     let client = BackendClient::new(BackendEndpoint::local(34664))?;
//!     supervisor.wait_for_ready(&client).await?;
//!
//!     // ... run the application ...
//!
//!     supervisor.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod window;

pub use backend::{BackendSupervisor, BuildMode, SupervisorState};
pub use bridge::{Bridge, BridgeMethod, FileDialogs};
pub use error::{DoctorinoError, Result};
pub use events::{EventBus, HostEvent, OutputStream};
pub use window::{FrontendSource, WindowController, WindowHost, WindowState};
