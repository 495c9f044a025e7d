use std::{future::Future, io};
use tracing::{debug, warn};

/// Resolves with the first termination request: Ctrl-C anywhere, plus SIGTERM
/// on Unix and console close or shutdown on Windows.
///
/// A listener that cannot be installed is logged and never fires.
pub async fn user_signal() {
	tokio::select! {
		_ = listen("Ctrl-C", tokio::signal::ctrl_c()) => {},
		_ = listen("termination signal", terminate()) => {},
	}
}

async fn listen(name: &str, signal: impl Future<Output = io::Result<()>>) {
	if let Err(error) = signal.await {
		warn!(%error, "Cannot listen for {name}");
		std::future::pending::<()>().await;
	}
	debug!("Received {name}");
}

#[cfg(unix)]
async fn terminate() -> io::Result<()> {
	use tokio::signal::unix::{signal, SignalKind};

	signal(SignalKind::terminate())?.recv().await;
	Ok(())
}

#[cfg(windows)]
async fn terminate() -> io::Result<()> {
	use tokio::signal::windows::{ctrl_close, ctrl_shutdown};

	let (mut close, mut shutdown) = (ctrl_close()?, ctrl_shutdown()?);
	tokio::select! {
		_ = close.recv() => {},
		_ = shutdown.recv() => {},
	}
	Ok(())
}

#[cfg(not(any(unix, windows)))]
async fn terminate() -> io::Result<()> {
	std::future::pending().await
}
