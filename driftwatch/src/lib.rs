//! # Driftwatch
//!
//! Configuration backup and drift detection for heterogeneous network
//! device fleets.
//!
//! Driftwatch captures running configuration over SSH and raw Telnet from
//! multiple vendor CLI dialects, stores dated snapshots with a
//! first-contact baseline per device, and reports noise-filtered
//! differences against the previous snapshot.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use driftwatch::{DriftConfig, RunCoordinator};
//! use driftwatch::inventory::load_inventory;
//! use driftwatch::transport::NetworkSessionFactory;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), driftwatch::Error> {
//!     let config = DriftConfig::default();
//!     let devices = load_inventory("Device.csv".as_ref())?;
//!
//!     let coordinator = RunCoordinator::new(config, Arc::new(NetworkSessionFactory));
//!     let summary = coordinator.run(devices).await?;
//!
//!     println!("{}", summary.format_status("now"));
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod dialect;
pub mod diff;
pub mod error;
pub mod fleet;
pub mod inventory;
pub mod notify;
pub mod report;
pub mod snapshot;
pub mod transport;

// Re-export main types for convenience
pub use config::{DriftConfig, WebhookConfig};
pub use dialect::{Capture, CaptureSettings, DialectId, DialectRegistry};
pub use error::Error;
pub use fleet::RunCoordinator;
pub use inventory::DeviceRecord;
pub use notify::{Notifier, RunSummary, WebhookNotifier};
pub use snapshot::SnapshotStore;
pub use transport::{NetworkSessionFactory, Session, SessionConfig, SessionFactory};
