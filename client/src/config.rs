use std::{collections::HashMap, path::PathBuf, time::Duration};

use avail_sampler_core::{
	api::configuration::APIConfig,
	network::Network,
	source::SyntheticConfig,
	types::{
		duration_millis_format, duration_seconds_format, tracing_level_format, SamplerConfig,
	},
};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockSourceKind {
	/// Blocks generated locally with random sampled cells
	#[default]
	Synthetic,
	/// Blocks replayed from recorded JSON lines files
	Replay,
}

/// Replay files per network.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ReplayPaths {
	pub local: Option<PathBuf>,
	pub turing: Option<PathBuf>,
	pub mainnet: Option<PathBuf>,
}

impl ReplayPaths {
	pub fn set(&mut self, network: Network, path: PathBuf) {
		match network {
			Network::Local => self.local = Some(path),
			Network::Turing => self.turing = Some(path),
			Network::Mainnet => self.mainnet = Some(path),
		}
	}
}

impl From<&ReplayPaths> for HashMap<Network, PathBuf> {
	fn from(paths: &ReplayPaths) -> Self {
		[
			(Network::Local, &paths.local),
			(Network::Turing, &paths.turing),
			(Network::Mainnet, &paths.mainnet),
		]
		.into_iter()
		.filter_map(|(network, path)| path.clone().map(|path| (network, path)))
		.collect()
	}
}

/// Representation of a configuration used by this project.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RuntimeConfig {
	#[serde(flatten)]
	pub api: APIConfig,
	/// Log level, default is `INFO`. See `<https://docs.rs/log/0.4.14/log/enum.LevelFilter.html>` for possible log level values. (default: `INFO`).
	#[serde(with = "tracing_level_format")]
	pub log_level: Level,
	/// If set to true, logs are displayed in JSON format, which is used for structured logging. Otherwise, plain text format is used (default: false).
	pub log_format_json: bool,
	/// Network selected on startup (default: turing).
	pub network: Network,
	/// Start sampling right after startup, otherwise wait for a start command (default: false).
	pub autostart: bool,
	/// Number of recent blocks kept for display (default: 10).
	pub history_size: usize,
	/// Milliseconds to wait after each verified cell (default: 100).
	#[serde(with = "duration_millis_format")]
	pub cell_delay: Duration,
	/// Milliseconds to wait after all cells of a block are verified (default: 500).
	#[serde(with = "duration_millis_format")]
	pub settle_delay: Duration,
	/// Seconds after which a cell verification is considered failed (default: 10).
	#[serde(with = "duration_seconds_format")]
	pub verification_timeout: Duration,
	/// Maximum number of user-facing log entries (default: 100).
	pub log_size: usize,
	/// Where blocks come from (default: synthetic).
	pub block_source: BlockSourceKind,
	/// Seconds between two blocks of the synthetic or replay source (default: 20).
	#[serde(with = "duration_seconds_format")]
	pub block_interval: Duration,
	/// Files replayed by the replay source, per network.
	pub replay_paths: ReplayPaths,
	/// Confidence threshold, used to calculate how many cells are sampled by the synthetic source (default: 99.9).
	pub confidence: f64,
	/// Probability of a synthetic block carrying DA submissions (default: 0.8).
	pub da_submission_rate: f64,
	/// Probability of the simulated verifier accepting a proof (default: 1.0).
	pub verifier_pass_rate: f64,
	/// Milliseconds the simulated verifier takes per proof (default: 0).
	#[serde(with = "duration_millis_format")]
	pub verifier_latency: Duration,
}

impl From<&RuntimeConfig> for SamplerConfig {
	fn from(val: &RuntimeConfig) -> Self {
		SamplerConfig {
			history_size: val.history_size,
			log_size: val.log_size,
			cell_delay: val.cell_delay,
			settle_delay: val.settle_delay,
		}
	}
}

impl From<&RuntimeConfig> for SyntheticConfig {
	fn from(val: &RuntimeConfig) -> Self {
		SyntheticConfig {
			block_interval: val.block_interval,
			confidence: val.confidence,
			da_submission_rate: val.da_submission_rate,
		}
	}
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		let sampler = SamplerConfig::default();
		RuntimeConfig {
			api: Default::default(),
			log_level: Level::INFO,
			log_format_json: false,
			network: Network::Turing,
			autostart: false,
			history_size: sampler.history_size,
			cell_delay: sampler.cell_delay,
			settle_delay: sampler.settle_delay,
			verification_timeout: Duration::from_secs(10),
			log_size: sampler.log_size,
			block_source: BlockSourceKind::Synthetic,
			block_interval: Duration::from_secs(20),
			replay_paths: Default::default(),
			confidence: 99.9,
			da_submission_rate: 0.8,
			verifier_pass_rate: 1.0,
			verifier_latency: Duration::ZERO,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;
	use tempfile::NamedTempFile;

	fn load(content: &str) -> RuntimeConfig {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(content.as_bytes()).unwrap();
		confy::load_path(file.path()).unwrap()
	}

	#[test]
	fn missing_fields_use_defaults() {
		let config = load("");
		let default = RuntimeConfig::default();

		assert_eq!(config.network, Network::Turing);
		assert_eq!(config.history_size, 10);
		assert_eq!(config.cell_delay, Duration::from_millis(100));
		assert_eq!(config.settle_delay, Duration::from_millis(500));
		assert_eq!(config.verification_timeout, default.verification_timeout);
		assert_eq!(config.api.http_server_port, 7007);
		assert_eq!(config.block_source, BlockSourceKind::Synthetic);
	}

	#[test]
	fn values_are_loaded() {
		let config = load(
			r#"
http_server_port = 8008
log_level = "debug"
network = "Mainnet"
history_size = 3
cell_delay = 0
block_source = "replay"
block_interval = 6

[replay_paths]
mainnet = "mainnet.jsonl"
"#,
		);

		assert_eq!(config.api.http_server_port, 8008);
		assert_eq!(config.log_level, Level::DEBUG);
		assert_eq!(config.network, Network::Mainnet);
		assert_eq!(config.history_size, 3);
		assert_eq!(config.cell_delay, Duration::ZERO);
		assert_eq!(config.block_source, BlockSourceKind::Replay);
		assert_eq!(config.block_interval, Duration::from_secs(6));

		let paths = HashMap::from(&config.replay_paths);
		assert_eq!(paths.len(), 1);
		assert_eq!(paths[&Network::Mainnet], PathBuf::from("mainnet.jsonl"));
	}

	#[test]
	fn sampler_config_from_runtime_config() {
		let config = RuntimeConfig {
			history_size: 4,
			cell_delay: Duration::ZERO,
			..Default::default()
		};
		let sampler = SamplerConfig::from(&config);
		assert_eq!(sampler.history_size, 4);
		assert_eq!(sampler.cell_delay, Duration::ZERO);
		assert_eq!(sampler.log_size, 100);
	}
}
