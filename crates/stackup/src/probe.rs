//! Readiness prober: polls a check at a fixed interval until it succeeds,
//! the per-service timeout elapses, or shutdown is requested.

use std::io::ErrorKind;
use std::time::Duration;
use stackup_core::{ProbeError, ReadinessCheck};
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::time::Instant;

use crate::signals::ShutdownSignal;

#[derive(Debug)]
pub enum ProbeOutcome {
	Ready,
	TimedOut { last_error: Option<ProbeError> },
	Interrupted,
}

/// Polls `check` every `interval` until it reports ready or `timeout`
/// elapses. Check errors do not abort the loop; the last one seen is
/// carried into the `TimedOut` report. The inter-poll sleep races against
/// the shutdown signal.
pub async fn probe(
	check: &ReadinessCheck,
	timeout: Duration,
	interval: Duration,
	shutdown: &ShutdownSignal,
) -> ProbeOutcome {
	let deadline = Instant::now() + timeout;
	let mut last_error = None;

	loop {
		match evaluate(check, interval).await {
			Ok(true) => return ProbeOutcome::Ready,
			Ok(false) => {}
			Err(e) => last_error = Some(e),
		}

		let now = Instant::now();
		if now >= deadline {
			return ProbeOutcome::TimedOut { last_error };
		}

		let sleep_for = interval.min(deadline - now);
		tokio::select! {
			_ = tokio::time::sleep(sleep_for) => {}
			_ = shutdown.triggered() => return ProbeOutcome::Interrupted,
		}
	}
}

/// One evaluation of the check. `Ok(false)` is not-yet-ready; `Err` means
/// the check itself broke (connection refused, unreadable file, probe
/// command that would not spawn).
async fn evaluate(check: &ReadinessCheck, connect_deadline: Duration) -> Result<bool, ProbeError> {
	match check {
		ReadinessCheck::Tcp(addr) => {
			match tokio::time::timeout(connect_deadline, TcpStream::connect(addr)).await {
				Ok(Ok(_)) => Ok(true),
				Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
					Err(ProbeError::Refused { addr: *addr })
				}
				Ok(Err(e)) => Err(ProbeError::Io {
					target: addr.to_string(),
					source: e,
				}),
				// Connect hung (filtered port): indistinguishable from not yet up.
				Err(_) => Ok(false),
			}
		}
		ReadinessCheck::File(path) => Ok(path.exists()),
		ReadinessCheck::LogLine { path, contains } => {
			if !path.exists() {
				return Ok(false);
			}
			match tokio::fs::read_to_string(path).await {
				Ok(content) => Ok(content.contains(contains.as_str())),
				Err(e) => Err(ProbeError::Io {
					target: path.display().to_string(),
					source: e,
				}),
			}
		}
		ReadinessCheck::Command(command) => {
			let status = Command::new("sh")
				.args(["-c", command])
				.stdout(std::process::Stdio::null())
				.stderr(std::process::Stdio::null())
				.status()
				.await
				.map_err(|source| ProbeError::Command { source })?;
			Ok(status.success())
		}
	}
}
