use async_trait::async_trait;
use rand::{thread_rng, Rng};
use std::time::Duration;
use tracing::trace;

use super::Verifier;
use crate::error::VerificationError;

/// Stand-in for the commitment scheme, used when no real primitive is wired.
///
/// Passes each well formed proof with probability `pass_rate`, after `latency`.
#[derive(Clone, Debug)]
pub struct SimulatedVerifier {
	pass_rate: f64,
	latency: Duration,
}

impl SimulatedVerifier {
	pub fn new(pass_rate: f64, latency: Duration) -> Self {
		SimulatedVerifier {
			pass_rate: pass_rate.clamp(0.0, 1.0),
			latency,
		}
	}
}

#[async_trait]
impl Verifier for SimulatedVerifier {
	async fn verify(
		&self,
		proof: &[u8],
		commitment: &[u8],
		grid_width: u32,
		row: u32,
		col: u32,
	) -> Result<bool, VerificationError> {
		if proof.is_empty() || commitment.is_empty() || col >= grid_width {
			return Err(VerificationError::InvalidData);
		}
		if !self.latency.is_zero() {
			tokio::time::sleep(self.latency).await;
		}
		let verified = thread_rng().gen_bool(self.pass_rate);
		trace!(row, col, verified, "Simulated cell verification");
		Ok(verified)
	}
}
