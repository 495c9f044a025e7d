//! Port to the cell proof verification primitive.
use async_trait::async_trait;
use mockall::automock;
use std::time::Duration;
use tracing::debug;

use crate::error::VerificationError;

mod simulated;

pub use simulated::SimulatedVerifier;

/// Checks a cell proof against the commitment of its row.
///
/// Returns `Ok(false)` when the proof does not match, and an error when the
/// check itself could not be carried out.
#[async_trait]
#[automock]
pub trait Verifier: Send + Sync {
	async fn verify(
		&self,
		proof: &[u8],
		commitment: &[u8],
		grid_width: u32,
		row: u32,
		col: u32,
	) -> Result<bool, VerificationError>;
}

/// Bounds every call of the wrapped verifier.
pub struct TimeoutVerifier<V> {
	inner: V,
	timeout: Duration,
}

impl<V: Verifier> TimeoutVerifier<V> {
	pub fn new(inner: V, timeout: Duration) -> Self {
		TimeoutVerifier { inner, timeout }
	}
}

#[async_trait]
impl<V: Verifier> Verifier for TimeoutVerifier<V> {
	async fn verify(
		&self,
		proof: &[u8],
		commitment: &[u8],
		grid_width: u32,
		row: u32,
		col: u32,
	) -> Result<bool, VerificationError> {
		let verification = self
			.inner
			.verify(proof, commitment, grid_width, row, col);
		match tokio::time::timeout(self.timeout, verification).await {
			Ok(result) => result,
			Err(_) => {
				debug!(row, col, "Verification timed out after {:?}", self.timeout);
				Err(VerificationError::Timeout(self.timeout))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn slow_verification_times_out() {
		let mut verifier = MockVerifier::new();
		verifier.expect_verify().returning(|_, _, _, _, _| {
			Box::pin(async {
				tokio::time::sleep(Duration::from_secs(60)).await;
				Ok(true)
			})
		});

		let verifier = TimeoutVerifier::new(verifier, Duration::from_secs(10));
		let result = verifier.verify(&[1], &[2], 4, 0, 0).await;
		assert_eq!(result, Err(VerificationError::Timeout(Duration::from_secs(10))));
	}

	#[tokio::test]
	async fn result_is_passed_through() {
		let mut verifier = MockVerifier::new();
		verifier
			.expect_verify()
			.withf(|proof, commitment, width, row, col| {
				proof.to_vec() == vec![1u8]
					&& commitment.to_vec() == vec![2u8]
					&& *width == 4 && *row == 1
					&& *col == 3
			})
			.times(1)
			.returning(|_, _, _, _, _| Box::pin(async { Ok(false) }));

		let verifier = TimeoutVerifier::new(verifier, Duration::from_secs(10));
		assert_eq!(verifier.verify(&[1], &[2], 4, 1, 3).await, Ok(false));
	}
}
