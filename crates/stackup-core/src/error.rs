use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	Read {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to parse {path}: {source}")]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("no services defined")]
	NoServices,

	#[error("service with empty name")]
	EmptyName,

	#[error("duplicate service name: {0}")]
	DuplicateName(String),

	#[error("{0}: command is empty")]
	EmptyCommand(String),
}

/// The readiness check itself errored, as opposed to reporting not-ready.
///
/// A prober keeps polling past these, but the last one seen is carried into
/// the timeout report so the failure stays attributable.
#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("{addr}: connection refused")]
	Refused { addr: SocketAddr },

	#[error("{target}: {source}")]
	Io {
		target: String,
		#[source]
		source: std::io::Error,
	},

	#[error("probe command failed to spawn: {source}")]
	Command {
		#[source]
		source: std::io::Error,
	},
}

/// A service failed to come up; the whole session aborts.
#[derive(Debug, Error)]
#[error("{service}: {cause}")]
pub struct StartupError {
	pub service: String,
	pub cause: StartupCause,
}

#[derive(Debug, Error)]
pub enum StartupCause {
	#[error("failed to spawn: {0}")]
	Spawn(#[source] std::io::Error),

	#[error("exited with code {code:?} before becoming ready")]
	EarlyExit { code: Option<i32> },

	#[error("not ready within {timeout:?}{}", probe_note(.last_probe_error))]
	Timeout {
		timeout: Duration,
		last_probe_error: Option<ProbeError>,
	},
}

fn probe_note(last: &Option<ProbeError>) -> String {
	match last {
		Some(e) => format!(" (last probe error: {})", e),
		None => String::new(),
	}
}

/// Aggregate of stop failures. Logged and folded into the exit code,
/// never re-thrown to block process exit.
#[derive(Debug, Error)]
#[error("{} service(s) failed to stop", .failures.len())]
pub struct ShutdownError {
	pub failures: Vec<StopFailure>,
}

#[derive(Debug, Error)]
#[error("{service}: {cause}")]
pub struct StopFailure {
	pub service: String,
	pub cause: StopCause,
}

#[derive(Debug, Error)]
pub enum StopCause {
	#[error("stop command failed to run: {0}")]
	Run(#[source] std::io::Error),

	#[error("stop command exited with code {code:?}")]
	CommandFailed { code: Option<i32> },

	#[error("stop command still running after {grace:?}")]
	CommandTimeout { grace: Duration },

	#[error("signal delivery failed: {0}")]
	Signal(String),
}
