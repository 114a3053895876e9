// MIT License - Copyright (c) 2026 Peter Wright

//! # domo-hub
//!
//! Home-automation control hub: bridges a field controller (the device that
//! actually reads sensors and drives actuators) and an operator console over
//! two plain TCP links. State reports flow in on the primary connection, the
//! operator's on/off commands flow back on a secondary one, security-sensor
//! activity trips an audible alarm, and every state transition lands in a
//! per-session CSV audit trail.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use domo_hub::{ConsoleInterface, DeviceRegistry, Hub, HubConfig};
//! use domo_hub::devices::default_declarations;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HubConfig::builder()
//!         .listen_port(10008)
//!         .command_port(10108)
//!         .build();
//!     let registry = DeviceRegistry::build(default_declarations())?;
//!
//!     let hub = Hub::new(config, registry);
//!     let registry = Arc::clone(hub.registry());
//!     let cancel = CancellationToken::new();
//!
//!     hub.serve(
//!         move || ConsoleInterface::new(Arc::clone(&registry)),
//!         cancel,
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod alarm;
pub mod audit;
pub mod config;
pub mod devices;
pub mod error;
pub mod hub;
pub mod operator;
pub mod protocol;
pub mod session;

// Re-exports for convenience
pub use alarm::AlarmTrigger;
pub use audit::AuditLog;
pub use config::{HubConfig, HubConfigBuilder};
pub use devices::{Device, DeviceRegistry, DeviceType};
pub use error::{HubError, Result};
pub use hub::Hub;
pub use operator::{ConsoleInterface, OperatorInterface, Selection};
pub use protocol::{CommandBatch, CommandFrame, StateReport};
pub use session::run_session;
