use std::time::Duration;
use thiserror::Error;

use crate::types::Position;

/// Failure of a single proof check.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
	#[error("Proof, data or commitment is not valid")]
	InvalidData,
	#[error("Verification did not finish in {0:?}")]
	Timeout(Duration),
	#[error("Verifier failed: {0}")]
	Failed(String),
}

#[derive(Error, Debug)]
pub enum Error {
	/// A sampled cell could not be verified. Recovered locally, the cell does not count.
	#[error("Cannot verify cell {position} of block {block_number}: {source}")]
	Verification {
		block_number: u32,
		position: Position,
		#[source]
		source: VerificationError,
	},
	/// The block source failed to deliver. Recovered locally, the run stays active.
	#[error("Block source failed: {0}")]
	Source(String),
	/// Internal scheduling contract was broken. Halts the current run.
	#[error("State invariant violated: {0}")]
	StateInvariant(String),
}
