use clap::ValueEnum;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::Display;
use tracing::{debug, info};

use crate::types::Position;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Network {
	Local,
	#[default]
	Turing,
	Mainnet,
}

impl TryFrom<String> for Network {
	type Error = String;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		<Network as ValueEnum>::from_str(&value, true)
			.map_err(|_| format!("Unsupported network: {value}"))
	}
}

/* @note: fn to take the number of cells needs to get equal to or greater than
the percentage of confidence mentioned in config file */

pub const CELL_COUNT_99_99: u32 = 14;

/// Calculates number of cells required to achieve given confidence
pub fn cell_count_for_confidence(confidence: f64) -> u32 {
	let mut cell_count: u32;
	if !(50.0..=100f64).contains(&confidence) {
		info!("Confidence {confidence} is invalid, using default confidence of 99");
		cell_count = (-((1f64 - (99.3f64 / 100f64)).log2())).ceil() as u32;
	} else {
		cell_count = (-((1f64 - (confidence / 100f64)).log2())).ceil() as u32;
	}
	if cell_count <= 1 {
		info!("Confidence {confidence} is too low, using confidence of 50.0");
		cell_count = 1;
	} else if cell_count > CELL_COUNT_99_99 {
		info!("Confidence {confidence} is too high, using confidence of 99.99");
		cell_count = CELL_COUNT_99_99;
	}
	cell_count
}

/// Picks `cell_count` unique random positions inside `rows` x `cols` grid.
pub fn generate_random_cells(rows: u32, cols: u32, cell_count: u32) -> Vec<Position> {
	let max_cells = rows * cols;
	let count = if max_cells < cell_count {
		debug!("Max cells count {max_cells} is lesser than cell_count {cell_count}");
		max_cells
	} else {
		cell_count
	};

	let mut rng = thread_rng();
	let mut indices = HashSet::new();
	while (indices.len() as u32) < count {
		let col = rng.gen_range(0..cols);
		let row = rng.gen_range(0..rows);
		indices.insert(Position { row, col });
	}

	indices.into_iter().collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use test_case::test_case;

	#[test_case(99.9 => 10)]
	#[test_case(99.99 => 14)]
	#[test_case(50.0 => 1)]
	#[test_case(10.0 => 8 ; "falls back to default")]
	#[test_case(100.0 => CELL_COUNT_99_99 ; "capped")]
	fn cell_count(confidence: f64) -> u32 {
		cell_count_for_confidence(confidence)
	}

	#[test_case("turing" => Ok(Network::Turing))]
	#[test_case("Mainnet" => Ok(Network::Mainnet))]
	#[test_case("LOCAL" => Ok(Network::Local))]
	#[test_case("hex" => Err("Unsupported network: hex".to_string()))]
	fn network_from_string(value: &str) -> Result<Network, String> {
		Network::try_from(value.to_string())
	}

	#[test]
	fn network_is_displayed_in_kebab_case() {
		assert_eq!(Network::Mainnet.to_string(), "mainnet");
		assert_eq!(serde_json::to_string(&Network::Turing).unwrap(), "\"turing\"");
		assert_eq!(Network::default(), Network::Turing);
	}

	#[test]
	fn random_cells_are_limited_by_grid_size() {
		assert_eq!(generate_random_cells(2, 2, 10).len(), 4);
		assert!(generate_random_cells(0, 4, 3).is_empty());
	}

	proptest! {
		#[test]
		fn random_cells_are_unique_and_inside_grid(rows in 1u32..32, cols in 1u32..32, count in 0u32..20) {
			let cells = generate_random_cells(rows, cols, count);
			let unique = cells.iter().collect::<HashSet<_>>();
			prop_assert_eq!(cells.len() as u32, count.min(rows * cols));
			prop_assert_eq!(unique.len(), cells.len());
			prop_assert!(cells.iter().all(|p| p.row < rows && p.col < cols));
		}
	}
}
