//! # stackup
//!
//! Foreground supervisor for an ordered stack of services.
//!
//! Starts each service in sequence, waits for its readiness check, then
//! idles until a termination signal and stops everything in reverse order.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use stackup::{ShutdownSignal, StartOutcome, Supervisor, SupervisorConfig};
//! use stackup_core::config;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cfg = config::load("stackup.toml".as_ref()).unwrap();
//! let shutdown = ShutdownSignal::install();
//! let sup = Supervisor::new(SupervisorConfig {
//!     probe_interval: cfg.probe_interval,
//!     log_dir: cfg.log_dir.clone(),
//!     max_log_size: cfg.max_log_size,
//! });
//!
//! match sup.start(&cfg.services, &shutdown).await {
//!     StartOutcome::Ready(mut session) => {
//!         sup.idle(&mut session, &shutdown).await;
//!         let _ = sup.shutdown(session).await;
//!     }
//!     StartOutcome::Failed(session, error) => {
//!         eprintln!("{}", error);
//!         let _ = sup.shutdown(session).await;
//!     }
//!     StartOutcome::Interrupted(session) => {
//!         let _ = sup.shutdown(session).await;
//!     }
//! }
//! # }
//! ```

pub mod output;
pub mod probe;
pub mod signals;
pub mod supervisor;

pub use output::LogSink;
pub use probe::ProbeOutcome;
pub use signals::ShutdownSignal;
pub use supervisor::{Session, StartOutcome, Supervisor, SupervisorConfig};
