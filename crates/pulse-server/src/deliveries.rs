// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process counters for webhook deliveries.
//!
//! Read only by logging and `/health`. Spawned handlers cannot be cancelled
//! through here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

#[derive(Debug, Default)]
pub struct DeliveryTracker {
	received: AtomicU64,
	ignored: AtomicU64,
	rejected: AtomicU64,
	in_flight: AtomicU64,
	completed: AtomicU64,
	failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
	pub received: u64,
	pub ignored: u64,
	pub rejected: u64,
	pub in_flight: u64,
	pub completed: u64,
	pub failed: u64,
}

impl DeliveryTracker {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// A signature-valid delivery arrived.
	pub fn record_received(&self) {
		self.received.fetch_add(1, Ordering::Relaxed);
	}

	pub fn record_ignored(&self) {
		self.ignored.fetch_add(1, Ordering::Relaxed);
	}

	/// Payload could not be parsed into a typed event.
	pub fn record_rejected(&self) {
		self.rejected.fetch_add(1, Ordering::Relaxed);
	}

	/// Start tracking a spawned handler. Dropping the guard without calling
	/// [`DeliveryGuard::succeeded`] counts as a failure.
	pub fn begin(self: &Arc<Self>) -> DeliveryGuard {
		self.in_flight.fetch_add(1, Ordering::Relaxed);
		DeliveryGuard {
			tracker: Arc::clone(self),
			succeeded: false,
		}
	}

	pub fn snapshot(&self) -> DeliveryStats {
		DeliveryStats {
			received: self.received.load(Ordering::Relaxed),
			ignored: self.ignored.load(Ordering::Relaxed),
			rejected: self.rejected.load(Ordering::Relaxed),
			in_flight: self.in_flight.load(Ordering::Relaxed),
			completed: self.completed.load(Ordering::Relaxed),
			failed: self.failed.load(Ordering::Relaxed),
		}
	}
}

pub struct DeliveryGuard {
	tracker: Arc<DeliveryTracker>,
	succeeded: bool,
}

impl DeliveryGuard {
	pub fn succeeded(mut self) {
		self.succeeded = true;
	}
}

impl Drop for DeliveryGuard {
	fn drop(&mut self) {
		let finished = if self.succeeded {
			&self.tracker.completed
		} else {
			&self.tracker.failed
		};
		finished.fetch_add(1, Ordering::Relaxed);
		self.tracker.in_flight.fetch_sub(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn guard_moves_delivery_out_of_flight() {
		let tracker = DeliveryTracker::new();

		let ok = tracker.begin();
		let bad = tracker.begin();
		assert_eq!(tracker.snapshot().in_flight, 2);

		ok.succeeded();
		drop(bad);

		let stats = tracker.snapshot();
		assert_eq!(stats.in_flight, 0);
		assert_eq!(stats.completed, 1);
		assert_eq!(stats.failed, 1);
	}

	#[test]
	fn counters_start_at_zero() {
		let stats = DeliveryTracker::new().snapshot();
		assert_eq!(
			stats,
			DeliveryStats {
				received: 0,
				ignored: 0,
				rejected: 0,
				in_flight: 0,
				completed: 0,
				failed: 0,
			}
		);
	}

	#[tokio::test]
	async fn panicking_handler_counts_as_failed() {
		let tracker = DeliveryTracker::new();
		let guard = tracker.begin();
		let handle = tokio::spawn(async move {
			let _guard = guard;
			panic!("handler blew up");
		});
		assert!(handle.await.is_err());
		assert_eq!(tracker.snapshot().failed, 1);
	}
}
