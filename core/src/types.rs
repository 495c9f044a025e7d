//! Shared sampler structs and enums.
use color_eyre::{eyre::eyre, Result};
use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::network::Network;

/// Chain block as seen by the sampler.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Block {
	pub network: Network,
	pub number: u32,
	pub hash: String,
	pub total_cell_count: u32,
	pub sample_count: u32,
	pub has_da_submissions: bool,
	#[serde(default)]
	pub confidence: f64,
}

#[derive(Serialize, Deserialize, Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[display("({row}, {col})")]
pub struct Position {
	pub row: u32,
	pub col: u32,
}

impl Position {
	pub fn new(row: u32, col: u32) -> Self {
		Position { row, col }
	}
}

/// Sampled cell with its opaque payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Cell {
	#[serde(flatten)]
	pub position: Position,
	#[serde(default, with = "hex_format")]
	pub data: Vec<u8>,
}

impl Cell {
	pub fn new(row: u32, col: u32) -> Self {
		Cell {
			position: Position { row, col },
			data: vec![],
		}
	}
}

/// Sampling grid of a block and the cells verified so far.
///
/// Verified positions are unique and kept in verification order.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Matrix {
	pub max_row: u32,
	pub max_col: u32,
	pub total_cell_count: u32,
	#[serde(default)]
	pub verified_cells: Vec<Position>,
}

impl Matrix {
	pub fn new(max_row: u32, max_col: u32) -> Self {
		Matrix {
			max_row,
			max_col,
			total_cell_count: max_row * max_col,
			verified_cells: vec![],
		}
	}

	/// Same grid with an empty verified set.
	pub fn reset(&self) -> Matrix {
		Matrix {
			verified_cells: vec![],
			..self.clone()
		}
	}

	pub fn contains(&self, position: &Position) -> bool {
		position.row < self.max_row && position.col < self.max_col
	}

	pub fn is_verified(&self, position: &Position) -> bool {
		self.verified_cells.contains(position)
	}

	/// Marks position as verified, returns `false` if it was already verified.
	pub fn insert_verified(&mut self, position: Position) -> bool {
		if self.is_verified(&position) {
			return false;
		}
		self.verified_cells.push(position);
		true
	}
}

/// Arrival record, consumed exactly once by the coordinator.
///
/// Proof at index `i` belongs to cell `i`, commitments are indexed by row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingBlock {
	pub block: Block,
	#[serde(default)]
	pub matrix: Option<Matrix>,
	#[serde(default)]
	pub cells: Vec<Cell>,
	#[serde(default, with = "hex_vec_format")]
	pub proofs: Vec<Vec<u8>>,
	#[serde(default, with = "hex_vec_format")]
	pub commitments: Vec<Vec<u8>>,
}

impl PendingBlock {
	pub fn without_submissions(block: Block) -> Self {
		PendingBlock {
			block,
			matrix: None,
			cells: vec![],
			proofs: vec![],
			commitments: vec![],
		}
	}

	pub fn is_sampled(&self) -> bool {
		self.block.has_da_submissions && self.matrix.is_some() && !self.cells.is_empty()
	}

	/// Checks that proofs and commitments line up with sampled cells.
	pub fn validate(&self) -> Result<()> {
		if !self.is_sampled() {
			return Ok(());
		}

		if self.proofs.len() != self.cells.len() {
			return Err(eyre!(
				"Expected {} proofs, got {}",
				self.cells.len(),
				self.proofs.len()
			));
		}

		let matrix = self.matrix.as_ref().ok_or_else(|| eyre!("Missing matrix"))?;
		for cell in &self.cells {
			if !matrix.contains(&cell.position) {
				return Err(eyre!(
					"Cell {} is outside of {}x{} matrix",
					cell.position,
					matrix.max_row,
					matrix.max_col
				));
			}
			if self.commitments.get(cell.position.row as usize).is_none() {
				return Err(eyre!("Missing commitment for row {}", cell.position.row));
			}
		}
		Ok(())
	}
}

/// Sampler configuration (see `RuntimeConfig` for details)
#[derive(Clone, Debug)]
pub struct SamplerConfig {
	pub history_size: usize,
	pub log_size: usize,
	pub cell_delay: Duration,
	pub settle_delay: Duration,
}

impl Default for SamplerConfig {
	fn default() -> Self {
		Self {
			history_size: 10,
			log_size: 100,
			cell_delay: Duration::from_millis(100),
			settle_delay: Duration::from_millis(500),
		}
	}
}

pub mod hex_format {
	use serde::{self, Deserialize, Deserializer, Serializer};

	pub fn parse(value: &str) -> Result<Vec<u8>, hex::FromHexError> {
		hex::decode(value.strip_prefix("0x").unwrap_or(value))
	}

	pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		parse(&value).map_err(serde::de::Error::custom)
	}
}

pub mod hex_vec_format {
	use super::hex_format;
	use serde::{self, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(values: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(values.len()))?;
		for value in values {
			seq.serialize_element(&format!("0x{}", hex::encode(value)))?;
		}
		seq.end()
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Vec::<String>::deserialize(deserializer)?
			.iter()
			.map(|value| hex_format::parse(value))
			.collect::<Result<_, _>>()
			.map_err(serde::de::Error::custom)
	}
}

pub mod tracing_level_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::str::FromStr;
	use tracing::Level;

	pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&level.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = String::deserialize(deserializer)?;
		Level::from_str(&value).map_err(serde::de::Error::custom)
	}
}

pub mod duration_seconds_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(duration.as_secs())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = u64::deserialize(deserializer)?;
		Ok(Duration::from_secs(value))
	}
}

pub mod duration_millis_format {
	use serde::{self, Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_u64(duration.as_millis() as u64)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let value = u64::deserialize(deserializer)?;
		Ok(Duration::from_millis(value))
	}
}
