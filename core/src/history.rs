use std::collections::VecDeque;

use crate::types::Block;

/// Bounded chain tail, most-recent-last.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
	capacity: usize,
	blocks: VecDeque<Block>,
}

impl HistoryWindow {
	pub fn new(capacity: usize) -> Self {
		HistoryWindow {
			capacity,
			blocks: VecDeque::with_capacity(capacity),
		}
	}

	/// Appends the newest block, evicting the oldest ones beyond capacity.
	pub fn push(&mut self, block: Block) {
		self.blocks.push_back(block);
		while self.blocks.len() > self.capacity {
			self.blocks.pop_front();
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = &Block> {
		self.blocks.iter()
	}

	pub fn to_vec(&self) -> Vec<Block> {
		self.blocks.iter().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	pub fn clear(&mut self) {
		self.blocks.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::network::Network;
	use test_case::test_case;

	fn block(number: u32) -> Block {
		Block {
			network: Network::Turing,
			number,
			hash: String::new(),
			total_cell_count: 0,
			sample_count: 0,
			has_da_submissions: false,
			confidence: 0.0,
		}
	}

	#[test_case(10, 3 => vec![1, 2, 3] ; "below capacity")]
	#[test_case(10, 10 => (1..=10).collect::<Vec<_>>() ; "at capacity")]
	#[test_case(10, 11 => (2..=11).collect::<Vec<_>>() ; "oldest evicted")]
	#[test_case(2, 5 => vec![4, 5] ; "small window")]
	#[test_case(0, 3 => Vec::<u32>::new() ; "zero capacity")]
	fn push_keeps_most_recent_last(capacity: usize, pushes: u32) -> Vec<u32> {
		let mut history = HistoryWindow::new(capacity);
		(1..=pushes).for_each(|number| history.push(block(number)));
		assert!(history.len() <= capacity);
		history.iter().map(|block| block.number).collect()
	}

	#[test]
	fn clear_empties_window() {
		let mut history = HistoryWindow::new(3);
		history.push(block(1));
		history.clear();
		assert!(history.is_empty());
		assert!(history.to_vec().is_empty());
	}
}
