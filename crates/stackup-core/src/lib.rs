//! # stackup-core
//!
//! Core types, configuration, and error taxonomy for the stackup
//! service supervisor.
//!
//! A session is an ordered list of [`ServiceSpec`]s loaded once from a TOML
//! file. The supervisor in the `stackup` crate drives each spec through the
//! [`ServiceState`] machine; this crate stays free of process handling.

pub mod config;
pub mod error;
pub mod types;

pub use config::{load, SessionConfig};
pub use error::{
	ConfigError, ProbeError, ShutdownError, StartupCause, StartupError, StopCause, StopFailure,
};
pub use types::{ReadinessCheck, ServiceSpec, ServiceState, StopMethod};
