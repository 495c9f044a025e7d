use async_trait::async_trait;
use rand::{seq::SliceRandom, thread_rng, Rng};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::{BlockSource, Sink, SourceHandle};
use crate::{
	error::Error,
	network::{cell_count_for_confidence, generate_random_cells, Network},
	types::{Block, Cell, Matrix, PendingBlock},
};

const ROWS: [u32; 5] = [1, 2, 4, 8, 16];
const COLS: [u32; 7] = [4, 8, 16, 32, 64, 128, 256];
const PROOF_SIZE: usize = 48;
const COMMITMENT_SIZE: usize = 48;
const CELL_DATA_SIZE: usize = 32;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
	pub block_interval: Duration,
	/// Target confidence used to pick the number of sampled cells
	pub confidence: f64,
	/// Probability of a block carrying DA submissions
	pub da_submission_rate: f64,
}

/// Generates blocks locally, sampling random cells the way a light client does.
pub struct SyntheticSource {
	config: SyntheticConfig,
}

impl SyntheticSource {
	pub fn new(config: SyntheticConfig) -> Self {
		SyntheticSource { config }
	}
}

fn random_bytes(size: usize) -> Vec<u8> {
	let mut bytes = vec![0u8; size];
	thread_rng().fill(&mut bytes[..]);
	bytes
}

pub(crate) fn generate_block(network: Network, number: u32, config: &SyntheticConfig) -> PendingBlock {
	let mut rng = thread_rng();
	let hash = format!("0x{}", hex::encode(rng.gen::<[u8; 32]>()));
	let has_da_submissions = rng.gen_bool(config.da_submission_rate.clamp(0.0, 1.0));

	if !has_da_submissions {
		return PendingBlock::without_submissions(Block {
			network,
			number,
			hash,
			total_cell_count: 0,
			sample_count: 0,
			has_da_submissions,
			confidence: 0.0,
		});
	}

	let rows = ROWS.choose(&mut rng).copied().unwrap_or(1);
	let cols = COLS.choose(&mut rng).copied().unwrap_or(4);
	// sampling happens on the erasure-extended grid
	let matrix = Matrix::new(rows * 2, cols);
	let cell_count = cell_count_for_confidence(config.confidence);
	let cells = generate_random_cells(matrix.max_row, matrix.max_col, cell_count)
		.into_iter()
		.map(|position| Cell {
			position,
			data: random_bytes(CELL_DATA_SIZE),
		})
		.collect::<Vec<_>>();

	PendingBlock {
		block: Block {
			network,
			number,
			hash,
			total_cell_count: matrix.total_cell_count,
			sample_count: cells.len() as u32,
			has_da_submissions,
			confidence: 0.0,
		},
		proofs: cells.iter().map(|_| random_bytes(PROOF_SIZE)).collect(),
		commitments: (0..matrix.max_row)
			.map(|_| random_bytes(COMMITMENT_SIZE))
			.collect(),
		matrix: Some(matrix),
		cells,
	}
}

#[async_trait]
impl BlockSource for SyntheticSource {
	async fn start(&self, network: Network, sink: Sink) -> Result<SourceHandle, Error> {
		info!(
			interval = ?self.config.block_interval,
			"Generating synthetic blocks for {network} network"
		);
		let config = self.config.clone();
		let task_sink = sink.clone();

		Ok(SourceHandle::spawn(&sink, async move {
			let mut ticker =
				tokio::time::interval(config.block_interval.max(Duration::from_millis(1)));
			ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
			let mut number = 0;
			loop {
				tokio::select! {
					_ = task_sink.closed() => return,
					_ = ticker.tick() => {},
				}
				number += 1;
				let pending = generate_block(network, number, &config);
				debug!(
					block_number = number,
					has_da_submissions = pending.block.has_da_submissions,
					"Generated block"
				);
				task_sink.push(pending);
			}
		}))
	}
}
