//! Avail block sampler: samples cells of incoming blocks, verifies their
//! proofs and reports the resulting availability confidence over HTTP.

use crate::{
	cli::CliOpts,
	config::{BlockSourceKind, RuntimeConfig},
};
use avail_sampler_core::{
	api::server::Server,
	controller::RunController,
	proof::{SimulatedVerifier, TimeoutVerifier},
	shutdown::{utils::user_signal, Controller},
	source::{BlockSource, ReplaySource, SyntheticSource},
	utils::{default_subscriber, install_panic_hooks, json_subscriber, spawn_in_span},
};
use clap::Parser;
use color_eyre::{
	eyre::{eyre, WrapErr},
	Result,
};
use std::{fs, sync::Arc};
use tokio::sync::Mutex;
use tracing::{error, info};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod cli;
mod config;

fn block_source(cfg: &RuntimeConfig) -> Box<dyn BlockSource> {
	match cfg.block_source {
		BlockSourceKind::Synthetic => Box::new(SyntheticSource::new(cfg.into())),
		BlockSourceKind::Replay => Box::new(ReplaySource::new(
			(&cfg.replay_paths).into(),
			cfg.block_interval,
		)),
	}
}

async fn run(cfg: RuntimeConfig, shutdown: &Controller) -> Result<()> {
	let version = clap::crate_version!();
	info!("Running Avail sampler version: {version}.");
	info!("Using config: {cfg:?}");

	let verifier = TimeoutVerifier::new(
		SimulatedVerifier::new(cfg.verifier_pass_rate, cfg.verifier_latency),
		cfg.verification_timeout,
	);
	let controller = Arc::new(Mutex::new(RunController::new(
		block_source(&cfg),
		verifier,
		cfg.network,
		(&cfg).into(),
	)));

	let server = Server {
		observer: controller.lock().await.observer(),
		controller: controller.clone(),
		shutdown: shutdown.watch()?,
	};
	spawn_in_span(server.bind(cfg.api.clone())?);

	if cfg.autostart {
		controller
			.lock()
			.await
			.start(cfg.network)
			.await
			.wrap_err("Starting sampler failed")?;
	} else {
		info!("Waiting for a start command on the HTTP API...");
	}

	shutdown.signal().triggered().await;
	controller.lock().await.stop().await;
	Ok(())
}

pub fn load_runtime_config(opts: &CliOpts) -> Result<RuntimeConfig> {
	let mut cfg = if let Some(config_path) = &opts.config {
		fs::metadata(config_path).map_err(|_| eyre!("Provided config file doesn't exist."))?;
		confy::load_path(config_path)
			.wrap_err(format!("Failed to load configuration from {}", config_path))?
	} else {
		RuntimeConfig::default()
	};

	cfg.log_format_json = opts.logs_json || cfg.log_format_json;
	cfg.log_level = opts.verbosity.unwrap_or(cfg.log_level);

	// Flags override the config parameters
	if let Some(network) = opts.network {
		cfg.network = network;
	}
	if let Some(http_port) = opts.http_server_port {
		cfg.api.http_server_port = http_port;
	}
	if let Some(block_source) = opts.block_source {
		cfg.block_source = block_source;
	}
	if let Some(replay_file) = &opts.replay_file {
		cfg.block_source = BlockSourceKind::Replay;
		cfg.replay_paths.set(cfg.network, replay_file.clone());
	}
	cfg.autostart |= opts.autostart;

	if cfg.history_size == 0 {
		return Err(eyre!("History size must be greater than zero"));
	}

	Ok(cfg)
}

#[tokio::main]
pub async fn main() -> Result<()> {
	let mut shutdown = Controller::new();
	let opts = CliOpts::parse();
	let cfg = load_runtime_config(&opts)?;

	if cfg.log_format_json {
		tracing::subscriber::set_global_default(json_subscriber(cfg.log_level))?;
	} else {
		tracing::subscriber::set_global_default(default_subscriber(cfg.log_level))?;
	};

	// install custom panic hooks
	install_panic_hooks(shutdown.signal())?;

	// spawn a task to watch for ctrl-c signals from user to trigger the shutdown
	let signal = shutdown.signal();
	spawn_in_span(async move {
		user_signal().await;
		info!("User signaled shutdown");
		signal.trigger();
	});

	let result = run(cfg, &shutdown).await;
	shutdown.shutdown().await;

	if let Err(error) = result {
		error!("{error:#}");
		return Err(error.wrap_err("Running sampler failed"));
	}
	Ok(())
}
