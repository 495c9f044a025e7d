//! FIFO admission buffer between the block source and the coordinator.
use std::{
	collections::VecDeque,
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc, Mutex, MutexGuard, PoisonError,
	},
};
use tokio::sync::Notify;

use crate::{error::Error, types::PendingBlock};

struct Inner {
	items: Mutex<VecDeque<PendingBlock>>,
	notify: Notify,
	consumer_claimed: AtomicBool,
}

impl Inner {
	fn items(&self) -> MutexGuard<'_, VecDeque<PendingBlock>> {
		self.items.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Unbounded queue of arrived blocks. Any clone can enqueue, only the single
/// [`Consumer`] can dequeue.
#[derive(Clone)]
pub struct BlockQueue {
	inner: Arc<Inner>,
}

impl BlockQueue {
	pub fn new() -> Self {
		BlockQueue {
			inner: Arc::new(Inner {
				items: Mutex::new(VecDeque::new()),
				notify: Notify::new(),
				consumer_claimed: AtomicBool::new(false),
			}),
		}
	}

	/// Appends block to the tail and wakes the consumer. Never blocks.
	pub fn enqueue(&self, pending: PendingBlock) {
		self.inner.items().push_back(pending);
		self.inner.notify.notify_one();
	}

	pub fn clear(&self) {
		self.inner.items().clear();
	}

	pub fn len(&self) -> usize {
		self.inner.items().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.items().is_empty()
	}

	/// Claims the consumer side of the queue. Only one consumer may exist at a time.
	pub fn consumer(&self) -> Result<Consumer, Error> {
		if self
			.inner
			.consumer_claimed
			.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
			.is_err()
		{
			return Err(Error::StateInvariant(
				"Block queue already has a consumer".to_string(),
			));
		}
		Ok(Consumer {
			inner: self.inner.clone(),
		})
	}
}

impl Default for BlockQueue {
	fn default() -> Self {
		Self::new()
	}
}

pub struct Consumer {
	inner: Arc<Inner>,
}

impl Consumer {
	pub fn try_dequeue(&self) -> Option<PendingBlock> {
		self.inner.items().pop_front()
	}

	/// Resolves after the next enqueue. An enqueue that happened while nobody
	/// was waiting resolves the next call immediately.
	pub async fn notified(&self) {
		self.inner.notify.notified().await;
	}
}

impl Drop for Consumer {
	fn drop(&mut self) {
		self.inner.consumer_claimed.store(false, Ordering::Release);
	}
}
