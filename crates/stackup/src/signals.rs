//! Termination signal handling.
//!
//! [`ShutdownSignal::install`] registers the handler exactly once and hands
//! out cloneable receivers; every probe sleep and the idle loop race against
//! [`ShutdownSignal::triggered`].

use tokio::sync::watch;

#[derive(Clone)]
pub struct ShutdownSignal {
	rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
	/// Spawns the signal listener. Must be called inside a tokio runtime.
	pub fn install() -> Self {
		let (tx, rx) = watch::channel(false);
		tokio::spawn(async move {
			let _ = wait_for_termination().await;
			let _ = tx.send(true);
			// Hold the sender so receivers keep observing the flag.
			std::future::pending::<()>().await;
		});
		Self { rx }
	}

	/// Receiver pair driven by the returned sender instead of OS signals.
	pub fn pair() -> (watch::Sender<bool>, Self) {
		let (tx, rx) = watch::channel(false);
		(tx, Self { rx })
	}

	pub fn is_triggered(&self) -> bool {
		*self.rx.borrow()
	}

	/// Completes once the signal fires. A dropped sender counts as fired so
	/// a lost listener can never wedge shutdown.
	pub async fn triggered(&self) {
		let mut rx = self.rx.clone();
		loop {
			if *rx.borrow() {
				return;
			}
			if rx.changed().await.is_err() {
				return;
			}
		}
	}
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<()> {
	use tokio::signal::unix::{signal, SignalKind};

	let mut sigint = signal(SignalKind::interrupt())?;
	let mut sigterm = signal(SignalKind::terminate())?;
	let mut sigquit = signal(SignalKind::quit())?;

	tokio::select! {
		_ = tokio::signal::ctrl_c() => {},
		_ = sigint.recv() => {},
		_ = sigterm.recv() => {},
		_ = sigquit.recv() => {},
	}
	Ok(())
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<()> {
	tokio::signal::ctrl_c().await
}
