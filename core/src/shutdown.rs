use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;

pub mod utils;

/// Stops a group of tasks and waits until all of them are gone.
///
/// Every task holds a [`Monitor`] created with [`Controller::watch`]. Calling
/// [`Controller::shutdown`] cancels all monitors and resolves once the last
/// of them has been dropped.
pub struct Controller {
	cancellation_token: CancellationToken,

	/// Cloned into every [`Monitor`], dropped on shutdown.
	task_tracker: Option<mpsc::Sender<()>>,

	/// Resolves with `None` once all tracker senders are dropped.
	task_waiter: mpsc::Receiver<()>,
}

impl Controller {
	pub fn new() -> Self {
		let (task_tracker, task_waiter) = mpsc::channel::<()>(1);
		Self {
			cancellation_token: CancellationToken::new(),
			task_tracker: Some(task_tracker),
			task_waiter,
		}
	}

	/// Creates a new [`Monitor`] instance that can listen for the shutdown signal.
	///
	/// Watching a controller which already completed shutdown is refused.
	pub fn watch(&self) -> Result<Monitor, Error> {
		let task_tracker = self.task_tracker.clone().ok_or_else(|| {
			Error::StateInvariant("Cannot watch a completed shutdown".to_string())
		})?;
		Ok(Monitor {
			cancellation_token: self.cancellation_token.clone(),
			_task_tracker: task_tracker,
		})
	}

	/// Cheap handle that can trigger the shutdown without waiting for it.
	pub fn signal(&self) -> Signal {
		Signal(self.cancellation_token.clone())
	}

	pub fn trigger_shutdown(&self) {
		self.cancellation_token.cancel();
	}

	pub fn is_shutdown(&self) -> bool {
		self.cancellation_token.is_cancelled()
	}

	/// Cancels all monitors and waits until they are dropped. Calling it again is a no-op.
	pub async fn shutdown(&mut self) {
		self.cancellation_token.cancel();

		// drop kept sender so that recv() returns once every monitor is gone
		if let Some(task_tracker) = self.task_tracker.take() {
			drop(task_tracker);
		}

		let _ = self.task_waiter.recv().await;
	}
}

impl Default for Controller {
	fn default() -> Self {
		Self::new()
	}
}

/// Observes the shutdown signal of its [`Controller`].
#[derive(Clone)]
pub struct Monitor {
	cancellation_token: CancellationToken,

	/// Keeps [`Controller::shutdown`] pending while the monitor is alive.
	_task_tracker: mpsc::Sender<()>,
}

impl Monitor {
	pub fn is_shutdown(&self) -> bool {
		self.cancellation_token.is_cancelled()
	}

	/// Receives shutdown notifications, waiting if required.
	pub async fn canceled(&self) {
		if self.is_shutdown() {
			return;
		}
		self.cancellation_token.cancelled().await;
	}

	/// Sleeps for the given duration, returns `false` if shutdown interrupted the sleep.
	pub async fn sleep(&self, duration: Duration) -> bool {
		if self.is_shutdown() {
			return false;
		}
		if duration.is_zero() {
			return true;
		}
		tokio::select! {
			_ = self.cancellation_token.cancelled() => false,
			_ = tokio::time::sleep(duration) => true,
		}
	}

	pub fn signal(&self) -> Signal {
		Signal(self.cancellation_token.clone())
	}
}

/// Triggers or awaits shutdown without tracking the holder.
#[derive(Clone, Debug, Default)]
pub struct Signal(CancellationToken);

impl Signal {
	pub fn trigger(&self) {
		self.0.cancel();
	}

	pub fn is_triggered(&self) -> bool {
		self.0.is_cancelled()
	}

	pub async fn triggered(&self) {
		self.0.cancelled().await;
	}
}
