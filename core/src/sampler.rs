//! Per-block cell verification.
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

use crate::{
	error::{Error, VerificationError},
	observer::{OutputEvent, Publisher},
	proof::Verifier,
	shutdown::Monitor,
	types::{Cell, PendingBlock, SamplerConfig},
	utils::{calculate_confidence, spawn_in_span},
};

/// Delays applied between verified cells and after a block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pacing {
	pub cell_delay: Duration,
	pub settle_delay: Duration,
}

impl Pacing {
	pub const NONE: Pacing = Pacing {
		cell_delay: Duration::ZERO,
		settle_delay: Duration::ZERO,
	};
}

impl From<&SamplerConfig> for Pacing {
	fn from(config: &SamplerConfig) -> Self {
		Pacing {
			cell_delay: config.cell_delay,
			settle_delay: config.settle_delay,
		}
	}
}

/// Result of sampling one block.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct BlockOutcome {
	/// Number of cells selected for sampling
	pub total: usize,
	/// Cells the verifier was called for
	pub sampled: usize,
	/// Unique positions that passed verification
	pub verified: usize,
	/// Proofs that did not match
	pub failed: usize,
	/// Verifications that could not be carried out
	pub errored: usize,
	pub confidence: f64,
	/// Stop was requested before the block was completed
	pub interrupted: bool,
}

impl BlockOutcome {
	/// Cells that were never verified because the run stopped.
	pub fn unsampled(&self) -> usize {
		self.total - self.sampled
	}
}

tokio::task_local! {
	static VERIFICATION: ();
}

/// True on a task running a single cell verification.
pub fn in_verification() -> bool {
	VERIFICATION.try_with(|_| ()).is_ok()
}

/// Runs one verification on its own task, so a crashing verifier fails the cell
/// instead of the caller.
async fn verify_cell<V: Verifier + 'static>(
	verifier: Arc<V>,
	proof: Vec<u8>,
	commitment: Vec<u8>,
	grid_width: u32,
	row: u32,
	col: u32,
) -> Result<bool, VerificationError> {
	spawn_in_span(VERIFICATION.scope((), async move {
		verifier
			.verify(&proof, &commitment, grid_width, row, col)
			.await
	}))
	.await
	.unwrap_or_else(|error| {
		Err(VerificationError::Failed(format!(
			"Verification task failed: {error}"
		)))
	})
}

/// Verifies sampled cells of the block one by one, in order.
///
/// Expects `pending.matrix` to be already reset. Every pass grows the verified
/// set, recomputes confidence and publishes a new snapshot. Failed and errored
/// cells leave the state untouched. Stop requests are observed between cells
/// and during delays, never during a verification call.
pub async fn sample_block<V: Verifier + 'static>(
	verifier: &Arc<V>,
	pending: &PendingBlock,
	pacing: Pacing,
	publisher: &Publisher,
	monitor: &Monitor,
) -> BlockOutcome {
	let block_number = pending.block.number;
	let mut matrix = pending.matrix.clone().unwrap_or_default();
	let cells: &[Cell] = if pending.is_sampled() {
		&pending.cells[..]
	} else {
		&[]
	};

	let mut outcome = BlockOutcome {
		total: cells.len(),
		sampled: 0,
		verified: 0,
		failed: 0,
		errored: 0,
		confidence: pending.block.confidence,
		interrupted: false,
	};

	info!(block_number, cells = cells.len(), "Sampling block");

	for (index, cell) in cells.iter().enumerate() {
		if monitor.is_shutdown() {
			outcome.interrupted = true;
			break;
		}

		let position = cell.position;
		let (row, col) = (position.row, position.col);
		let proof = pending.proofs.get(index).cloned().unwrap_or_default();
		let result = match pending.commitments.get(row as usize) {
			Some(commitment) => {
				verify_cell(
					verifier.clone(),
					proof,
					commitment.clone(),
					matrix.max_col,
					row,
					col,
				)
				.await
			},
			None => Err(VerificationError::InvalidData),
		};
		outcome.sampled += 1;

		match result {
			Ok(true) => {
				if matrix.insert_verified(position) {
					outcome.confidence = calculate_confidence(matrix.verified_cells.len() as u32);
					let (matrix, confidence) = (matrix.clone(), outcome.confidence);
					publisher.update(move |state| {
						state.matrix = matrix;
						if let Some(block) = state.current_block.as_mut() {
							block.confidence = confidence;
						}
					});
				}
				debug!(block_number, row, col, confidence = outcome.confidence, "Cell verified");
				publisher.emit(OutputEvent::CellVerified {
					block_number,
					position,
					confidence: outcome.confidence,
				});
			},
			Ok(false) => {
				outcome.failed += 1;
				debug!(block_number, row, col, "Cell proof is not valid");
				publisher.emit(OutputEvent::CellFailed {
					block_number,
					position,
				});
			},
			Err(source) => {
				outcome.errored += 1;
				let error = Error::Verification {
					block_number,
					position,
					source,
				};
				warn!(block_number, row, col, "{error}");
				publisher.log(error.to_string());
				publisher.emit(OutputEvent::CellErrored {
					block_number,
					position,
					error: error.to_string(),
				});
			},
		}

		if !monitor.sleep(pacing.cell_delay).await {
			outcome.interrupted = true;
			break;
		}
	}

	outcome.verified = matrix.verified_cells.len();

	if !outcome.interrupted && !monitor.sleep(pacing.settle_delay).await {
		outcome.interrupted = true;
	}

	info!(
		block_number,
		verified = outcome.verified,
		failed = outcome.failed,
		errored = outcome.errored,
		"Confidence factor: {}",
		outcome.confidence
	);
	outcome
}
