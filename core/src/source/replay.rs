use async_trait::async_trait;
use std::{collections::HashMap, path::PathBuf, time::Duration};
use tokio::{
	fs::File,
	io::{AsyncBufReadExt, BufReader},
	time::MissedTickBehavior,
};
use tracing::{debug, info};

use super::{BlockSource, Sink, SourceHandle};
use crate::{error::Error, network::Network, types::PendingBlock};

/// Plays back recorded arrivals, one JSON encoded [`PendingBlock`] per line.
pub struct ReplaySource {
	paths: HashMap<Network, PathBuf>,
	interval: Duration,
}

impl ReplaySource {
	pub fn new(paths: HashMap<Network, PathBuf>, interval: Duration) -> Self {
		ReplaySource { paths, interval }
	}
}

#[async_trait]
impl BlockSource for ReplaySource {
	async fn start(&self, network: Network, sink: Sink) -> Result<SourceHandle, Error> {
		let path = self
			.paths
			.get(&network)
			.cloned()
			.ok_or_else(|| Error::Source(format!("No replay file configured for {network} network")))?;

		let file = File::open(&path)
			.await
			.map_err(|error| Error::Source(format!("Cannot open {}: {error}", path.display())))?;

		info!(path = %path.display(), "Replaying blocks of {network} network");
		let interval = self.interval;
		let task_sink = sink.clone();
		Ok(SourceHandle::spawn(&sink, async move {
			replay(file, path, interval, task_sink).await
		}))
	}
}

async fn replay(file: File, path: PathBuf, interval: Duration, sink: Sink) {
	let mut lines = BufReader::new(file).lines();
	let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
	let mut line_number = 0;

	loop {
		let line = tokio::select! {
			_ = sink.closed() => return,
			line = lines.next_line() => line,
		};
		line_number += 1;

		let line = match line {
			Ok(Some(line)) if line.trim().is_empty() => continue,
			Ok(Some(line)) => line,
			Ok(None) => {
				sink.log(format!("Replay of {} finished", path.display()));
				return;
			},
			Err(error) => {
				sink.report_error(Error::Source(format!(
					"Cannot read {}: {error}",
					path.display()
				)));
				return;
			},
		};

		let pending = match serde_json::from_str::<PendingBlock>(&line) {
			Ok(pending) => pending,
			Err(error) => {
				sink.report_error(Error::Source(format!(
					"Cannot parse line {line_number} of {}: {error}",
					path.display()
				)));
				continue;
			},
		};

		tokio::select! {
			_ = sink.closed() => return,
			_ = ticker.tick() => {},
		}
		debug!(block_number = pending.block.number, "Replaying block");
		sink.push(pending);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		observer::EventLog,
		queue::BlockQueue,
		types::{Block, Cell, Matrix},
	};
	use std::io::Write;
	use tempfile::NamedTempFile;
	use tokio::sync::broadcast;

	fn line(network: Network, number: u32) -> String {
		let pending = PendingBlock {
			block: Block {
				network,
				number,
				hash: format!("0x{number:064x}"),
				total_cell_count: 4,
				sample_count: 1,
				has_da_submissions: true,
				confidence: 0.0,
			},
			matrix: Some(Matrix::new(2, 2)),
			cells: vec![Cell::new(1, 1)],
			proofs: vec![vec![0xaa; 48]],
			commitments: vec![vec![0xbb; 48], vec![0xcc; 48]],
		};
		serde_json::to_string(&pending).unwrap()
	}

	fn replay_file(lines: &[String]) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		for line in lines {
			writeln!(file, "{line}").unwrap();
		}
		file
	}

	fn sink(queue: &BlockQueue, log: &EventLog) -> Sink {
		Sink::new(Network::Turing, queue.clone(), log.clone())
	}

	#[tokio::test]
	async fn replays_valid_lines_and_reports_broken_ones() {
		let file = replay_file(&[
			line(Network::Turing, 1),
			String::new(),
			"{not json".to_string(),
			line(Network::Mainnet, 2),
			line(Network::Turing, 3),
		]);
		let queue = BlockQueue::new();
		let (events, _) = broadcast::channel(16);
		let log = EventLog::new(10, events);
		let paths = HashMap::from([(Network::Turing, file.path().to_path_buf())]);

		let source = ReplaySource::new(paths, Duration::from_millis(1));
		let handle = source.start(Network::Turing, sink(&queue, &log)).await.unwrap();

		tokio::time::timeout(Duration::from_secs(5), async {
			while !log.entries().iter().any(|entry| entry.message.contains("finished")) {
				tokio::time::sleep(Duration::from_millis(5)).await;
			}
		})
		.await
		.unwrap();
		handle.stop().await;

		let consumer = queue.consumer().unwrap();
		let numbers = std::iter::from_fn(|| consumer.try_dequeue())
			.map(|pending| pending.block.number)
			.collect::<Vec<_>>();
		assert_eq!(numbers, vec![1, 3]);
		assert!(log
			.entries()
			.iter()
			.any(|entry| entry.message.contains("Cannot parse line 3")));
	}

	#[tokio::test]
	async fn missing_network_path_is_a_source_error() {
		let queue = BlockQueue::new();
		let (events, _) = broadcast::channel(16);
		let log = EventLog::new(10, events);

		let source = ReplaySource::new(HashMap::new(), Duration::from_secs(1));
		let result = source.start(Network::Mainnet, sink(&queue, &log)).await;
		assert!(matches!(result, Err(Error::Source(_))));
	}

	#[tokio::test]
	async fn stop_interrupts_replay() {
		let file = replay_file(&[line(Network::Turing, 1), line(Network::Turing, 2)]);
		let queue = BlockQueue::new();
		let (events, _) = broadcast::channel(16);
		let log = EventLog::new(10, events);
		let paths = HashMap::from([(Network::Turing, file.path().to_path_buf())]);

		let source = ReplaySource::new(paths, Duration::from_secs(3600));
		let handle = source.start(Network::Turing, sink(&queue, &log)).await.unwrap();
		tokio::time::timeout(Duration::from_secs(5), handle.stop())
			.await
			.unwrap();

		assert!(queue.len() <= 1);
	}
}
