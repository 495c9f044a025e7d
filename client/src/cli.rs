use crate::config::BlockSourceKind;
use avail_sampler_core::network::Network;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(version)]
pub struct CliOpts {
	/// Path to the toml configuration file
	#[arg(short, long, value_name = "FILE")]
	pub config: Option<String>,
	/// Network selected on startup
	#[arg(short, long, value_name = "network")]
	pub network: Option<Network>,
	/// Start sampling right away
	#[arg(long)]
	pub autostart: bool,
	/// Source of the sampled blocks
	#[arg(long, value_name = "source")]
	pub block_source: Option<BlockSourceKind>,
	/// JSON lines file replayed for the selected network, implies the replay source
	#[arg(long, value_name = "FILE")]
	pub replay_file: Option<PathBuf>,
	/// HTTP port
	#[arg(long)]
	pub http_server_port: Option<u16>,
	/// Log level
	#[arg(long)]
	pub verbosity: Option<Level>,
	/// Set logs format to JSON
	#[arg(long)]
	pub logs_json: bool,
}
