//! Read-only view of the sampler for UIs and the HTTP API.
//!
//! State is published as whole snapshots over [`watch`] channels, so readers
//! never see a half applied update. Progress is additionally streamed as
//! [`OutputEvent`]s over a [`broadcast`] channel.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
	collections::VecDeque,
	sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::{broadcast, watch};

use crate::{
	network::Network,
	sampler::BlockOutcome,
	types::{Block, Matrix, Position},
};

pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
	#[default]
	Idle,
	Draining,
	VerifyingBlock,
	Stopped,
}

/// Everything the coordinator owns, published as one snapshot.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct SamplingState {
	pub current_block: Option<Block>,
	pub matrix: Matrix,
	pub history: Vec<Block>,
	pub processing: bool,
	pub state: CoordinatorState,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
	pub running: bool,
	pub network: Network,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LogEntry {
	pub timestamp: DateTime<Utc>,
	pub message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
	RunStarted {
		network: Network,
	},
	RunStopped {
		network: Network,
	},
	NetworkSelected {
		network: Network,
	},
	BlockStarted {
		block: Block,
	},
	CellVerified {
		block_number: u32,
		position: Position,
		confidence: f64,
	},
	CellFailed {
		block_number: u32,
		position: Position,
	},
	CellErrored {
		block_number: u32,
		position: Position,
		error: String,
	},
	BlockCompleted {
		block_number: u32,
		outcome: BlockOutcome,
	},
	BlockRejected {
		block_number: u32,
		reason: String,
	},
	Log(LogEntry),
	Fatal {
		reason: String,
	},
}

/// Bounded user-facing log. Every entry is also emitted as [`OutputEvent::Log`].
#[derive(Clone)]
pub struct EventLog {
	entries: Arc<RwLock<VecDeque<LogEntry>>>,
	capacity: usize,
	events: broadcast::Sender<OutputEvent>,
}

impl EventLog {
	pub fn new(capacity: usize, events: broadcast::Sender<OutputEvent>) -> Self {
		EventLog {
			entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
			capacity,
			events,
		}
	}

	pub fn push(&self, message: impl Into<String>) {
		let entry = LogEntry {
			timestamp: Utc::now(),
			message: message.into(),
		};
		{
			let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
			entries.push_back(entry.clone());
			while entries.len() > self.capacity {
				entries.pop_front();
			}
		}
		let _ = self.events.send(OutputEvent::Log(entry));
	}

	/// Drops all entries and starts over with the given message.
	pub fn reset(&self, message: impl Into<String>) {
		self.entries
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.clear();
		self.push(message);
	}

	pub fn entries(&self) -> Vec<LogEntry> {
		self.entries
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.cloned()
			.collect()
	}
}

/// Write side of the sampling state, held by the coordinator of the active run.
#[derive(Clone)]
pub struct Publisher {
	sampling: Arc<watch::Sender<SamplingState>>,
	events: broadcast::Sender<OutputEvent>,
	log: EventLog,
}

impl Publisher {
	pub fn new(
		sampling: Arc<watch::Sender<SamplingState>>,
		events: broadcast::Sender<OutputEvent>,
		log: EventLog,
	) -> Self {
		Publisher {
			sampling,
			events,
			log,
		}
	}

	/// Applies the change and publishes the resulting snapshot at once.
	pub fn update(&self, modify: impl FnOnce(&mut SamplingState)) {
		self.sampling.send_modify(modify);
	}

	pub fn emit(&self, event: OutputEvent) {
		// no subscribers is fine
		let _ = self.events.send(event);
	}

	pub fn log(&self, message: impl Into<String>) {
		self.log.push(message);
	}
}

/// Read side handed to the API and other observers.
#[derive(Clone)]
pub struct Observer {
	run: watch::Receiver<RunState>,
	sampling: watch::Receiver<SamplingState>,
	events: broadcast::Sender<OutputEvent>,
	log: EventLog,
}

impl Observer {
	pub fn new(
		run: watch::Receiver<RunState>,
		sampling: watch::Receiver<SamplingState>,
		events: broadcast::Sender<OutputEvent>,
		log: EventLog,
	) -> Self {
		Observer {
			run,
			sampling,
			events,
			log,
		}
	}

	pub fn run_state(&self) -> RunState {
		*self.run.borrow()
	}

	pub fn sampling_state(&self) -> SamplingState {
		self.sampling.borrow().clone()
	}

	pub fn current_block(&self) -> Option<Block> {
		self.sampling.borrow().current_block.clone()
	}

	pub fn matrix(&self) -> Matrix {
		self.sampling.borrow().matrix.clone()
	}

	pub fn history(&self) -> Vec<Block> {
		self.sampling.borrow().history.clone()
	}

	pub fn is_running(&self) -> bool {
		self.run.borrow().running
	}

	pub fn network(&self) -> Network {
		self.run.borrow().network
	}

	pub fn is_processing(&self) -> bool {
		self.sampling.borrow().processing
	}

	pub fn coordinator_state(&self) -> CoordinatorState {
		self.sampling.borrow().state
	}

	pub fn logs(&self) -> Vec<LogEntry> {
		self.log.entries()
	}

	pub fn subscribe(&self) -> broadcast::Receiver<OutputEvent> {
		self.events.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn log_is_bounded_and_emitted() {
		let (events, mut receiver) = broadcast::channel(16);
		let log = EventLog::new(2, events);

		log.reset("Initiating sampler");
		log.push("first");
		log.push("second");

		let messages = log
			.entries()
			.into_iter()
			.map(|entry| entry.message)
			.collect::<Vec<_>>();
		assert_eq!(messages, vec!["first", "second"]);

		let Ok(OutputEvent::Log(entry)) = receiver.try_recv() else {
			panic!("Expected log event");
		};
		assert_eq!(entry.message, "Initiating sampler");
	}

	#[test]
	fn reset_starts_over() {
		let (events, _) = broadcast::channel(16);
		let log = EventLog::new(10, events);
		log.push("old");
		log.reset("Initiating sampler");
		assert_eq!(log.entries().len(), 1);
		assert_eq!(log.entries()[0].message, "Initiating sampler");
	}

	#[test]
	fn observer_sees_published_snapshot() {
		let (events, _) = broadcast::channel(16);
		let log = EventLog::new(10, events.clone());
		let (run_sender, run_receiver) = watch::channel(RunState::default());
		let (sampling_sender, sampling_receiver) = watch::channel(SamplingState::default());
		let publisher = Publisher::new(Arc::new(sampling_sender), events.clone(), log.clone());
		let observer = Observer::new(run_receiver, sampling_receiver, events, log);

		assert_eq!(observer.coordinator_state(), CoordinatorState::Idle);
		assert!(observer.current_block().is_none());

		publisher.update(|state| {
			state.matrix = Matrix::new(2, 2);
			state.processing = true;
			state.state = CoordinatorState::VerifyingBlock;
		});
		run_sender.send_modify(|run| {
			run.running = true;
			run.network = Network::Mainnet;
		});

		assert_eq!(observer.matrix().total_cell_count, 4);
		assert!(observer.is_processing());
		assert_eq!(observer.coordinator_state(), CoordinatorState::VerifyingBlock);
		assert!(observer.is_running());
		assert_eq!(observer.network(), Network::Mainnet);
	}

	#[test]
	fn events_serialize_with_type_tag() {
		let event = OutputEvent::CellFailed {
			block_number: 3,
			position: Position::new(1, 2),
		};
		let json = serde_json::to_value(&event).unwrap();
		assert_eq!(json["type"], "cell_failed");
		assert_eq!(json["position"]["row"], 1);
	}
}
