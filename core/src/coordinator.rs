//! Single consumer that drains the block queue one block at a time.
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
	error::Error,
	history::HistoryWindow,
	observer::{CoordinatorState, OutputEvent, Publisher, SamplingState},
	proof::Verifier,
	queue::{BlockQueue, Consumer},
	sampler::{sample_block, Pacing},
	shutdown::Monitor,
	types::PendingBlock,
};

pub struct Coordinator<V> {
	queue: BlockQueue,
	consumer: Consumer,
	verifier: Arc<V>,
	pacing: Pacing,
	history: HistoryWindow,
	publisher: Publisher,
	monitor: Monitor,
}

impl<V: Verifier + 'static> Coordinator<V> {
	/// Claims the queue consumer and resets published sampling state.
	pub fn new(
		queue: &BlockQueue,
		verifier: Arc<V>,
		pacing: Pacing,
		history_size: usize,
		publisher: Publisher,
		monitor: Monitor,
	) -> Result<Self, Error> {
		let consumer = queue.consumer()?;
		publisher.update(|state| *state = SamplingState::default());
		Ok(Coordinator {
			queue: queue.clone(),
			consumer,
			verifier,
			pacing,
			history: HistoryWindow::new(history_size),
			publisher,
			monitor,
		})
	}

	fn set_state(&self, state: CoordinatorState) {
		self.publisher.update(|sampling| sampling.state = state);
	}

	/// Runs until shutdown is requested, then clears the queue and moves to `Stopped`.
	pub async fn run(mut self) {
		info!("Starting block processing");
		self.set_state(CoordinatorState::Draining);

		loop {
			if self.monitor.is_shutdown() {
				break;
			}

			let Some(pending) = self.consumer.try_dequeue() else {
				tokio::select! {
					_ = self.consumer.notified() => continue,
					_ = self.monitor.canceled() => break,
				}
			};

			self.process(pending).await;
		}

		self.queue.clear();
		self.publisher.update(|state| {
			state.processing = false;
			state.state = CoordinatorState::Stopped;
		});
		info!("Block processing stopped");
	}

	async fn process(&mut self, mut pending: PendingBlock) {
		let block_number = pending.block.number;

		if let Err(error) = pending.validate() {
			warn!(block_number, "Skipping malformed block: {error}");
			self.publisher
				.log(format!("Skipping block {block_number}: {error}"));
			self.publisher.emit(OutputEvent::BlockRejected {
				block_number,
				reason: error.to_string(),
			});
			return;
		}

		if pending.block.has_da_submissions {
			if let Some(matrix) = pending.matrix.as_mut() {
				*matrix = matrix.reset();
				pending.block.confidence = 0.0;
			}
		}

		self.history.push(pending.block.clone());
		let (block, matrix, history) = (
			pending.block.clone(),
			pending.matrix.clone().unwrap_or_default(),
			self.history.to_vec(),
		);
		self.publisher.update(move |state| {
			state.current_block = Some(block);
			state.matrix = matrix;
			state.history = history;
			state.processing = true;
			state.state = CoordinatorState::VerifyingBlock;
		});
		self.publisher.emit(OutputEvent::BlockStarted {
			block: pending.block.clone(),
		});
		self.publisher.log(format!(
			"Processing block {block_number} ({})",
			pending.block.hash
		));

		let outcome = sample_block(
			&self.verifier,
			&pending,
			self.pacing,
			&self.publisher,
			&self.monitor,
		)
		.await;

		if outcome.interrupted {
			info!(block_number, "Block processing interrupted");
		} else if pending.is_sampled() {
			self.publisher.log(format!(
				"Block {block_number} verified {}/{} cells, confidence {:.2}%",
				outcome.verified, outcome.total, outcome.confidence
			));
		}

		self.publisher.update(|state| {
			state.processing = false;
			state.state = CoordinatorState::Draining;
		});
		self.publisher.emit(OutputEvent::BlockCompleted {
			block_number,
			outcome,
		});
	}
}

/// Reports an error that halts block processing of the current run.
pub fn report_fatal(publisher: &Publisher, error: &Error) {
	error!("Block processing halted: {error}");
	publisher.log(format!("Fatal: {error}"));
	publisher.emit(OutputEvent::Fatal {
		reason: error.to_string(),
	});
}
