use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use stackup_core::{
	ServiceSpec, ServiceState, ShutdownError, StartupCause, StartupError, StopCause, StopFailure,
	StopMethod,
};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::Instant;

use crate::output::LogSink;
use crate::probe::{self, ProbeOutcome};
use crate::signals::ShutdownSignal;

pub struct SupervisorConfig {
	pub probe_interval: Duration,
	pub log_dir: PathBuf,
	pub max_log_size: u64,
}

/// Drives an ordered sequence of services through start, readiness, idle,
/// and reverse shutdown. Sole writer of every [`ServiceState`].
pub struct Supervisor {
	config: SupervisorConfig,
}

/// Live session: one handle per spec, in start order.
pub struct Session {
	services: Vec<ServiceHandle>,
}

struct ServiceHandle {
	spec: ServiceSpec,
	state: ServiceState,
	child: Option<Child>,
	pid: Option<u32>,
	log: LogSink,
}

pub enum StartOutcome {
	/// Every service reached Ready.
	Ready(Session),
	/// A service failed; the partial session still needs reverse cleanup.
	Failed(Session, StartupError),
	/// Shutdown signal arrived mid-startup.
	Interrupted(Session),
}

enum StartAbort {
	Failed(StartupCause),
	Interrupted,
}

impl Session {
	pub fn states(&self) -> Vec<(String, ServiceState)> {
		self.services
			.iter()
			.map(|h| (h.spec.name.clone(), h.state.clone()))
			.collect()
	}
}

impl Supervisor {
	pub fn new(config: SupervisorConfig) -> Self {
		Self { config }
	}

	/// Starts each spec in sequence; spec *i+1* only after spec *i* is Ready.
	pub async fn start(&self, specs: &[ServiceSpec], shutdown: &ShutdownSignal) -> StartOutcome {
		let mut session = Session {
			services: specs
				.iter()
				.map(|spec| ServiceHandle {
					state: ServiceState::Pending,
					child: None,
					pid: None,
					log: LogSink::new(&self.config.log_dir, &spec.name, self.config.max_log_size),
					spec: spec.clone(),
				})
				.collect(),
		};

		for i in 0..session.services.len() {
			if shutdown.is_triggered() {
				return StartOutcome::Interrupted(session);
			}
			match self.start_one(&mut session.services[i], shutdown).await {
				Ok(()) => {}
				Err(StartAbort::Interrupted) => return StartOutcome::Interrupted(session),
				Err(StartAbort::Failed(cause)) => {
					let service = session.services[i].spec.name.clone();
					return StartOutcome::Failed(session, StartupError { service, cause });
				}
			}
		}

		StartOutcome::Ready(session)
	}

	async fn start_one(
		&self,
		handle: &mut ServiceHandle,
		shutdown: &ShutdownSignal,
	) -> Result<(), StartAbort> {
		let name = handle.spec.name.clone();
		let ready = handle.spec.ready.clone();
		let timeout = handle.spec.startup_timeout;

		tracing::info!(service = %name, "starting");
		handle.state = ServiceState::Starting;

		let mut child = match spawn_service(&handle.spec) {
			Ok(c) => c,
			Err(e) => {
				handle.state = ServiceState::Failed { exit_code: None };
				return Err(StartAbort::Failed(StartupCause::Spawn(e)));
			}
		};
		handle.pid = child.id();

		if let Some(stdout) = child.stdout.take() {
			let sink = handle.log.clone();
			tokio::spawn(async move {
				pipe_output(stdout, sink).await;
			});
		}
		if let Some(stderr) = child.stderr.take() {
			let sink = handle.log.clone();
			tokio::spawn(async move {
				pipe_output(stderr, sink).await;
			});
		}

		handle
			.log
			.write(format!("[stackup] starting: {}\n", handle.spec.command).as_bytes())
			.await;

		// Probe while watching for the child dying underneath it. A launcher
		// that exits 0 keeps probing (forking init scripts); the process
		// group it led stays signalable through the recorded pid.
		let probe_fut = probe::probe(&ready, timeout, self.config.probe_interval, shutdown);
		tokio::pin!(probe_fut);
		let mut launcher_done = false;

		let outcome = loop {
			tokio::select! {
				out = &mut probe_fut => break out,
				status = child.wait(), if !launcher_done => {
					match status {
						Ok(s) if s.success() => {
							launcher_done = true;
						}
						Ok(s) => {
							handle.state = ServiceState::Failed { exit_code: s.code() };
							return Err(StartAbort::Failed(StartupCause::EarlyExit { code: s.code() }));
						}
						Err(e) => {
							tracing::warn!(service = %name, "wait failed: {}", e);
							handle.state = ServiceState::Failed { exit_code: None };
							return Err(StartAbort::Failed(StartupCause::EarlyExit { code: None }));
						}
					}
				}
			}
		};

		if !launcher_done {
			handle.child = Some(child);
		}

		match outcome {
			ProbeOutcome::Ready => {
				handle.state = ServiceState::Ready;
				handle.log.write(b"[stackup] ready\n").await;
				tracing::info!(service = %name, "ready");
				Ok(())
			}
			ProbeOutcome::TimedOut { last_error } => {
				handle.state = ServiceState::Failed { exit_code: None };
				Err(StartAbort::Failed(StartupCause::Timeout {
					timeout,
					last_probe_error: last_error,
				}))
			}
			ProbeOutcome::Interrupted => Err(StartAbort::Interrupted),
		}
	}

	/// Holds the session open until the shutdown signal fires, polling child
	/// liveness once per interval. An unexpected exit flips the service to
	/// Failed but keeps the session alive for inspection.
	pub async fn idle(&self, session: &mut Session, shutdown: &ShutdownSignal) {
		let mut tick = tokio::time::interval(self.config.probe_interval);
		loop {
			tokio::select! {
				_ = shutdown.triggered() => return,
				_ = tick.tick() => {
					for handle in session.services.iter_mut() {
						if !handle.state.is_ready() {
							continue;
						}
						let Some(child) = handle.child.as_mut() else { continue };
						if let Ok(Some(status)) = child.try_wait() {
							tracing::warn!(
								service = %handle.spec.name,
								code = ?status.code(),
								"exited unexpectedly"
							);
							handle
								.log
								.write(b"[stackup] exited unexpectedly\n")
								.await;
							handle.state = ServiceState::Failed { exit_code: status.code() };
							handle.child = None;
						}
					}
				}
			}
		}
	}

	/// Stops started services strictly in reverse start order, best-effort.
	/// Individual failures are collected, never re-thrown. A Failed service
	/// never gets its configured stop method, only forced cleanup of its
	/// process group.
	pub async fn shutdown(&self, mut session: Session) -> Result<(), ShutdownError> {
		let mut failures = Vec::new();

		for handle in session.services.iter_mut().rev() {
			match handle.state {
				ServiceState::Pending | ServiceState::Stopped => continue,
				ServiceState::Failed { .. } => {
					tracing::info!(service = %handle.spec.name, "cleaning up failed service");
					force_kill(handle).await;
				}
				ServiceState::Starting | ServiceState::Ready => {
					tracing::info!(service = %handle.spec.name, "stopping");
					if let Err(cause) = self.stop_one(handle).await {
						tracing::warn!(service = %handle.spec.name, "stop failed: {}", cause);
						failures.push(StopFailure {
							service: handle.spec.name.clone(),
							cause,
						});
					}
				}
			}
			handle.state = ServiceState::Stopped;
		}

		if failures.is_empty() {
			Ok(())
		} else {
			Err(ShutdownError { failures })
		}
	}

	async fn stop_one(&self, handle: &mut ServiceHandle) -> Result<(), StopCause> {
		match handle.spec.stop.clone() {
			StopMethod::Signal { grace } => self.stop_by_signal(handle, grace).await,
			StopMethod::Command { command, grace } => {
				self.stop_by_command(handle, &command, grace).await
			}
		}
	}

	async fn stop_by_signal(
		&self,
		handle: &mut ServiceHandle,
		grace: Duration,
	) -> Result<(), StopCause> {
		let Some(pid) = handle.pid else {
			return Ok(());
		};
		let pgid = Pid::from_raw(pid as i32);

		match killpg(pgid, Signal::SIGTERM) {
			Ok(()) => {}
			Err(Errno::ESRCH) => return Ok(()),
			Err(errno) => return Err(StopCause::Signal(errno.to_string())),
		}

		if wait_group_exit(handle.child.as_mut(), pgid, grace).await {
			return Ok(());
		}

		let _ = killpg(pgid, Signal::SIGKILL);
		if let Some(child) = handle.child.as_mut() {
			let _ = child.wait().await;
		}
		Ok(())
	}

	async fn stop_by_command(
		&self,
		handle: &mut ServiceHandle,
		command: &str,
		grace: Duration,
	) -> Result<(), StopCause> {
		let mut cmd = Command::new("sh");
		cmd.args(["-c", command])
			.stdout(Stdio::null())
			.stderr(Stdio::null());
		for (key, val) in &handle.spec.env {
			cmd.env(key, val);
		}
		if let Some(dir) = &handle.spec.dir {
			cmd.current_dir(dir);
		}

		let result = match cmd.spawn() {
			Err(e) => Err(StopCause::Run(e)),
			Ok(mut stop_child) => match tokio::time::timeout(grace, stop_child.wait()).await {
				Ok(Ok(status)) if status.success() => Ok(()),
				Ok(Ok(status)) => Err(StopCause::CommandFailed {
					code: status.code(),
				}),
				Ok(Err(e)) => Err(StopCause::Run(e)),
				Err(_) => {
					let _ = stop_child.kill().await;
					Err(StopCause::CommandTimeout { grace })
				}
			},
		};

		// Whatever the stop command did, the process group must be gone.
		if let Some(pid) = handle.pid {
			let pgid = Pid::from_raw(pid as i32);
			let gone = result.is_ok() && wait_group_exit(handle.child.as_mut(), pgid, grace).await;
			if !gone {
				let _ = killpg(pgid, Signal::SIGKILL);
				if let Some(child) = handle.child.as_mut() {
					let _ = child.wait().await;
				}
			}
		}

		result
	}
}

async fn force_kill(handle: &mut ServiceHandle) {
	let Some(pid) = handle.pid else {
		return;
	};
	let pgid = Pid::from_raw(pid as i32);
	let _ = killpg(pgid, Signal::SIGKILL);
	if let Some(child) = handle.child.as_mut() {
		let _ = child.wait().await;
	}
}

fn spawn_service(spec: &ServiceSpec) -> std::io::Result<Child> {
	let mut cmd = Command::new("sh");
	cmd.args(["-c", &spec.command])
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.process_group(0);
	if let Some(dir) = &spec.dir {
		cmd.current_dir(dir);
	}
	for (key, val) in &spec.env {
		cmd.env(key, val);
	}
	cmd.spawn()
}

async fn pipe_output<R: tokio::io::AsyncRead + Unpin>(mut reader: R, sink: LogSink) {
	let mut buf = [0u8; 4096];
	loop {
		match reader.read(&mut buf).await {
			Ok(0) => break,
			Ok(n) => sink.write(&buf[..n]).await,
			Err(_) => break,
		}
	}
}

/// True once every process in the group has exited within `grace`.
async fn wait_group_exit(child: Option<&mut Child>, pgid: Pid, grace: Duration) -> bool {
	match child {
		Some(child) => tokio::time::timeout(grace, child.wait()).await.is_ok(),
		None => {
			let deadline = Instant::now() + grace;
			while Instant::now() < deadline {
				if !group_alive(pgid) {
					return true;
				}
				tokio::time::sleep(Duration::from_millis(100)).await;
			}
			!group_alive(pgid)
		}
	}
}

fn group_alive(pgid: Pid) -> bool {
	// Null signal to the negative pid probes the group without delivering.
	kill(Pid::from_raw(-pgid.as_raw()), None).is_ok()
}
