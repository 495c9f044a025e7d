//! Run lifecycle: start, stop and network switch of the sampling pipeline.
use std::sync::Arc;
use tokio::{
	sync::{broadcast, watch, Mutex},
	task::JoinHandle,
};
use tracing::{error, info};

use crate::{
	coordinator::{report_fatal, Coordinator},
	error::Error,
	network::Network,
	observer::{
		CoordinatorState, EventLog, Observer, OutputEvent, Publisher, RunState, SamplingState,
		EVENT_CHANNEL_CAPACITY,
	},
	proof::Verifier,
	queue::BlockQueue,
	sampler::Pacing,
	shutdown::Controller,
	source::{BlockSource, Sink, SourceHandle},
	types::SamplerConfig,
	utils::spawn_in_span,
};

pub type SharedController<S, V> = Arc<Mutex<RunController<S, V>>>;

struct ActiveRun {
	shutdown: Controller,
	sink: Sink,
	source: Option<SourceHandle>,
	queue: BlockQueue,
	/// Supervisor of the coordinator task
	coordinator: JoinHandle<()>,
}

/// Waits for the coordinator task and halts the run if it died.
async fn supervise(
	coordinator: JoinHandle<()>,
	run_state: Arc<watch::Sender<RunState>>,
	publisher: Publisher,
) {
	let Err(error) = coordinator.await else {
		return;
	};
	let error = Error::StateInvariant(format!("Block processing task failed: {error}"));
	report_fatal(&publisher, &error);
	publisher.update(|state| {
		state.processing = false;
		state.state = CoordinatorState::Stopped;
	});
	run_state.send_modify(|state| state.running = false);
}

/// Owns `running` and `network`. Besides the controller, only the supervisor of
/// its run writes [`RunState`], to mark a halted run as not running.
pub struct RunController<S, V> {
	source: Arc<S>,
	verifier: Arc<V>,
	config: SamplerConfig,
	run_state: Arc<watch::Sender<RunState>>,
	sampling: Arc<watch::Sender<SamplingState>>,
	events: broadcast::Sender<OutputEvent>,
	log: EventLog,
	run: Option<ActiveRun>,
}

impl<S: BlockSource, V: Verifier + 'static> RunController<S, V> {
	pub fn new(source: S, verifier: V, network: Network, config: SamplerConfig) -> Self {
		let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		let log = EventLog::new(config.log_size, events.clone());
		let (run_state, _) = watch::channel(RunState {
			running: false,
			network,
		});
		let (sampling, _) = watch::channel(SamplingState::default());
		RunController {
			source: Arc::new(source),
			verifier: Arc::new(verifier),
			config,
			run_state: Arc::new(run_state),
			sampling: Arc::new(sampling),
			events,
			log,
			run: None,
		}
	}

	pub fn observer(&self) -> Observer {
		Observer::new(
			self.run_state.subscribe(),
			self.sampling.subscribe(),
			self.events.clone(),
			self.log.clone(),
		)
	}

	pub fn is_running(&self) -> bool {
		self.run_state.borrow().running
	}

	pub fn network(&self) -> Network {
		self.run_state.borrow().network
	}

	fn publisher(&self) -> Publisher {
		Publisher::new(self.sampling.clone(), self.events.clone(), self.log.clone())
	}

	/// Starts a fresh run on `network`, restarting the current one if needed.
	///
	/// Source failures are logged and leave the run active. A broken state
	/// invariant aborts the start and is returned.
	pub async fn start(&mut self, network: Network) -> Result<(), Error> {
		if self.run.is_some() {
			self.stop().await;
		}

		self.log.reset("Initiating sampler");
		self.run_state.send_modify(|state| state.network = network);

		let publisher = self.publisher();
		let queue = BlockQueue::new();
		let shutdown = Controller::new();
		let coordinator = shutdown.watch().and_then(|monitor| {
			Coordinator::new(
				&queue,
				self.verifier.clone(),
				Pacing::from(&self.config),
				self.config.history_size,
				publisher.clone(),
				monitor,
			)
		});
		let coordinator = match coordinator {
			Ok(coordinator) => coordinator,
			Err(error) => {
				report_fatal(&publisher, &error);
				return Err(error);
			},
		};

		self.run_state.send_modify(|state| state.running = true);
		info!("Starting sampler on {network} network");
		self.log.push(format!("Starting sampler on {network} network"));
		publisher.emit(OutputEvent::RunStarted { network });

		let coordinator = spawn_in_span(supervise(
			spawn_in_span(coordinator.run()),
			self.run_state.clone(),
			publisher,
		));
		let sink = Sink::new(network, queue.clone(), self.log.clone());
		let source = match self.source.start(network, sink.clone()).await {
			Ok(handle) => Some(handle),
			Err(error) => {
				sink.report_error(error);
				None
			},
		};

		self.run = Some(ActiveRun {
			shutdown,
			sink,
			source,
			queue,
			coordinator,
		});
		Ok(())
	}

	/// Stops the source, then the coordinator, and waits for both. Safe to call when idle.
	pub async fn stop(&mut self) {
		let Some(mut run) = self.run.take() else {
			return;
		};
		let network = self.network();
		info!("Stopping sampler on {network} network");

		run.sink.close();
		if let Some(source) = run.source.take() {
			source.stop().await;
		}

		run.shutdown.shutdown().await;
		if let Err(error) = run.coordinator.await {
			error!("Block processing supervisor failed: {error}");
		}
		run.queue.clear();

		self.run_state.send_modify(|state| state.running = false);
		self.log.push(format!("Stopped sampler on {network} network"));
		let _ = self.events.send(OutputEvent::RunStopped { network });
	}

	/// Restarts the run on the new network if running, otherwise only selects it.
	///
	/// A run halted by a fatal error is cleaned up before the network is selected.
	pub async fn switch_network(&mut self, network: Network) -> Result<(), Error> {
		info!("Switching to {network} network");
		self.log.push(format!("Switching to {network} network"));

		if self.is_running() {
			self.stop().await;
			return self.start(network).await;
		}

		self.stop().await;
		self.run_state.send_modify(|state| state.network = network);
		let _ = self.events.send(OutputEvent::NetworkSelected { network });
		Ok(())
	}
}
