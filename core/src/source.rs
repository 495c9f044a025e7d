//! Port to the chain feed and the bundled adapters.
use async_trait::async_trait;
use futures::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::{
	error::Error,
	network::Network,
	observer::EventLog,
	queue::BlockQueue,
	types::PendingBlock,
	utils::spawn_in_span,
};

mod replay;
mod synthetic;

pub use replay::ReplaySource;
pub use synthetic::{SyntheticConfig, SyntheticSource};

/// External streaming source of fully formed blocks.
#[async_trait]
pub trait BlockSource: Send + Sync + 'static {
	/// Starts delivering arrivals of `network` into the sink.
	async fn start(&self, network: Network, sink: Sink) -> Result<SourceHandle, Error>;
}

#[async_trait]
impl BlockSource for Box<dyn BlockSource> {
	async fn start(&self, network: Network, sink: Sink) -> Result<SourceHandle, Error> {
		(**self).start(network, sink).await
	}
}

/// Receiving end handed to a started source.
///
/// Arrivals after stop, or for another network than the run's, are dropped.
#[derive(Clone)]
pub struct Sink {
	network: Network,
	queue: BlockQueue,
	log: EventLog,
	closed: CancellationToken,
}

impl Sink {
	pub fn new(network: Network, queue: BlockQueue, log: EventLog) -> Self {
		Sink {
			network,
			queue,
			log,
			closed: CancellationToken::new(),
		}
	}

	/// Enqueues the arrival, returns `false` if it was dropped.
	pub fn push(&self, pending: PendingBlock) -> bool {
		let block_number = pending.block.number;
		if self.is_closed() {
			debug!(block_number, "Dropping block received after stop");
			return false;
		}
		if pending.block.network != self.network {
			warn!(
				block_number,
				"Dropping block of {} network, expected {}", pending.block.network, self.network
			);
			return false;
		}
		self.queue.enqueue(pending);
		true
	}

	/// Recoverable source failure, the run stays active.
	pub fn report_error(&self, error: Error) {
		error!("{error}");
		self.log.push(error.to_string());
	}

	pub fn log(&self, message: impl Into<String>) {
		self.log.push(message);
	}

	pub fn close(&self) {
		self.closed.cancel();
	}

	pub fn is_closed(&self) -> bool {
		self.closed.is_cancelled()
	}

	pub async fn closed(&self) {
		self.closed.cancelled().await;
	}
}

/// Handle of a started source. Stopping closes the sink and waits for the source task.
pub struct SourceHandle {
	closed: CancellationToken,
	task: Option<JoinHandle<()>>,
}

impl SourceHandle {
	/// Runs the source future in its own task, bound to the sink lifetime.
	pub fn spawn<F>(sink: &Sink, future: F) -> Self
	where
		F: Future<Output = ()> + Send + 'static,
	{
		SourceHandle {
			closed: sink.closed.clone(),
			task: Some(spawn_in_span(future)),
		}
	}

	/// Handle of a source which pushes without a task of its own.
	pub fn detached(sink: &Sink) -> Self {
		SourceHandle {
			closed: sink.closed.clone(),
			task: None,
		}
	}

	pub async fn stop(mut self) {
		self.closed.cancel();
		if let Some(task) = self.task.take() {
			if let Err(error) = task.await {
				error!("Block source task failed: {error}");
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::Block;
	use tokio::sync::broadcast;

	fn pending(network: Network, number: u32) -> PendingBlock {
		PendingBlock::without_submissions(Block {
			network,
			number,
			hash: String::new(),
			total_cell_count: 0,
			sample_count: 0,
			has_da_submissions: false,
			confidence: 0.0,
		})
	}

	fn sink(queue: &BlockQueue) -> Sink {
		let (events, _) = broadcast::channel(16);
		Sink::new(Network::Turing, queue.clone(), EventLog::new(10, events))
	}

	#[test]
	fn other_network_arrivals_are_dropped() {
		let queue = BlockQueue::new();
		let sink = sink(&queue);

		assert!(sink.push(pending(Network::Turing, 1)));
		assert!(!sink.push(pending(Network::Mainnet, 2)));
		assert_eq!(queue.len(), 1);
	}

	#[tokio::test]
	async fn arrivals_after_stop_are_dropped() {
		let queue = BlockQueue::new();
		let sink = sink(&queue);

		let handle = SourceHandle::spawn(&sink, {
			let sink = sink.clone();
			async move { sink.closed().await }
		});
		handle.stop().await;

		assert!(sink.is_closed());
		assert!(!sink.push(pending(Network::Turing, 1)));
		assert!(queue.is_empty());
	}

	#[test]
	fn errors_are_logged() {
		let queue = BlockQueue::new();
		let (events, _) = broadcast::channel(16);
		let log = EventLog::new(10, events);
		let sink = Sink::new(Network::Turing, queue, log.clone());

		sink.report_error(Error::Source("connection lost".to_string()));
		assert_eq!(log.entries()[0].message, "Block source failed: connection lost");
	}
}
