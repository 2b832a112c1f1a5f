use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// One entry in the ordered startup sequence. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
	pub name: String,
	/// Shell line, run via `sh -c` in its own process group.
	pub command: String,
	pub ready: ReadinessCheck,
	pub startup_timeout: Duration,
	pub stop: StopMethod,
	pub env: HashMap<String, String>,
	pub dir: Option<PathBuf>,
}

/// Predicate over externally observable state that confirms a service
/// can accept requests.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessCheck {
	/// TCP port accepts connections.
	Tcp(SocketAddr),
	/// Path exists on disk.
	File(PathBuf),
	/// File contains a substring.
	LogLine { path: PathBuf, contains: String },
	/// `sh -c` command exits 0.
	Command(String),
}

impl ReadinessCheck {
	pub fn describe(&self) -> String {
		match self {
			ReadinessCheck::Tcp(addr) => format!("tcp {}", addr),
			ReadinessCheck::File(path) => format!("file {}", path.display()),
			ReadinessCheck::LogLine { path, contains } => {
				format!("log line {:?} in {}", contains, path.display())
			}
			ReadinessCheck::Command(command) => format!("command `{}`", command),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopMethod {
	/// SIGTERM to the process group, SIGKILL once `grace` elapses.
	Signal { grace: Duration },
	/// `sh -c` stop command with `grace` as its deadline.
	Command { command: String, grace: Duration },
}

impl StopMethod {
	pub fn grace(&self) -> Duration {
		match self {
			StopMethod::Signal { grace } => *grace,
			StopMethod::Command { grace, .. } => *grace,
		}
	}
}

/// Per-service lifecycle. The supervisor is the sole writer.
///
/// Pending → Starting → {Ready, Failed} → Stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceState {
	Pending,
	Starting,
	Ready,
	Failed { exit_code: Option<i32> },
	Stopped,
}

impl ServiceState {
	pub fn is_ready(&self) -> bool {
		matches!(self, ServiceState::Ready)
	}

	/// Left Pending at some point, so reverse cleanup owes it a stop.
	pub fn has_started(&self) -> bool {
		matches!(
			self,
			ServiceState::Starting | ServiceState::Ready | ServiceState::Failed { .. }
		)
	}
}
