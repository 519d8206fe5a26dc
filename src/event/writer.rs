// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dedicated consumer thread that drains the event buffer and persists
//! batches to the configured sink, without ever blocking the matching path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::buffer::EventBufferError;
use super::{EventBatch, EventConsumer, MatchingEvent, EventSink};
use crate::types::now_millis;

/// Tuning for the event writer's batching behavior.
#[derive(Debug, Clone)]
pub struct EventWriterConfig {
	/// Flush once a pending batch reaches this many events.
	pub batch_size: usize,
	/// Flush a non-empty batch after this many milliseconds even if it
	/// hasn't reached `batch_size`.
	pub batch_timeout_ms: u64,
	pub verbose_logging: bool,
}

impl Default for EventWriterConfig {
	fn default() -> Self {
		Self { batch_size: 100, batch_timeout_ms: 100, verbose_logging: false }
	}
}

/// Owns the dedicated event-writer thread. Dropping it (or calling
/// `shutdown`) joins the thread after the buffer has been fully drained.
pub struct EventWriter {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl EventWriter {
	pub fn start(
		consumer: EventConsumer,
		mut sink: Box<dyn EventSink>,
		config: EventWriterConfig,
	) -> Self {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("event-writer".to_string())
			.spawn(move || {
				info!(target: "event_writer", "Event writer started");
				Self::run_writer_loop(&consumer, sink.as_mut(), &config, &shutdown_clone);
				info!(target: "event_writer", "Event writer stopped");
			})
			.expect("failed to spawn event-writer thread");

		Self { thread_handle: Some(thread_handle), shutdown }
	}

	fn run_writer_loop(
		consumer: &EventConsumer,
		sink: &mut dyn EventSink,
		config: &EventWriterConfig,
		shutdown: &Arc<AtomicBool>,
	) {
		let mut pending: Vec<MatchingEvent> = Vec::with_capacity(config.batch_size);
		let mut batch_started_at = Instant::now();
		let batch_timeout = Duration::from_millis(config.batch_timeout_ms.max(1));

		loop {
			// Block until something arrives or the current batch's deadline
			// elapses, rather than busy-polling — mirrors the reference
			// logger thread waiting on its queue condition variable.
			let wait = if pending.is_empty() {
				batch_timeout
			} else {
				batch_timeout.saturating_sub(batch_started_at.elapsed())
			};
			match consumer.recv_timeout(wait) {
				Ok(event) => {
					if pending.is_empty() {
						batch_started_at = Instant::now();
					}
					pending.push(event);
				}
				Err(EventBufferError::Empty) | Err(EventBufferError::Disconnected) => {}
				Err(EventBufferError::Full) => unreachable!("recv_timeout never reports Full"),
			}

			let want = config.batch_size.saturating_sub(pending.len());
			if want > 0 {
				pending.extend(consumer.drain(want));
			}

			let timed_out = !pending.is_empty() && batch_started_at.elapsed() >= batch_timeout;
			let full = pending.len() >= config.batch_size;

			if full || timed_out {
				let batch = EventBatch::new(std::mem::take(&mut pending), now_millis());
				Self::commit_batch(sink, batch, config.verbose_logging);
				batch_started_at = Instant::now();
				continue;
			}

			if shutdown.load(Ordering::Acquire) {
				pending.extend(consumer.drain(usize::MAX));
				if !pending.is_empty() {
					let batch = EventBatch::new(std::mem::take(&mut pending), now_millis());
					Self::commit_batch(sink, batch, config.verbose_logging);
				}
				break;
			}
		}
	}

	fn commit_batch(sink: &mut dyn EventSink, batch: EventBatch, verbose: bool) {
		let batch_size = batch.len();
		for event in batch.events {
			let result = match &event {
				MatchingEvent::Order(record) => sink.write_order(record),
				MatchingEvent::Trade(record) => sink.write_trade(record),
				MatchingEvent::Outcome(record) => sink.write_outcome(record),
			};
			if let Err(err) = result {
				error!(target: "event_writer", error = %err, "Failed to persist event");
			}
		}
		if let Err(err) = sink.flush() {
			error!(target: "event_writer", error = %err, "Failed to flush event sink");
		}
		if verbose {
			debug!(target: "event_writer", batch_size, timestamp = batch.batch_timestamp, "Batch committed");
		}
	}

	pub fn shutdown(mut self) {
		info!(target: "event_writer", "Shutting down event writer");
		self.shutdown.store(true, Ordering::Release);
		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "event_writer", error = ?e, "Event writer thread panicked");
		}
	}
}

impl Drop for EventWriter {
	fn drop(&mut self) {
		self.shutdown.store(true, Ordering::Release);
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::{EventBuffer, OrderLog};
	use crate::types::{OrderEventType, OrderId, Price, Side};
	use std::sync::atomic::AtomicUsize;

	/// Test sink that just counts writes, so the count can be observed from
	/// outside the writer thread without reaching back into a moved `Box`.
	struct CountingSink {
		orders: Arc<AtomicUsize>,
	}

	impl EventSink for CountingSink {
		fn write_order(&mut self, _record: &OrderLog) -> Result<(), super::super::EventSinkError> {
			self.orders.fetch_add(1, Ordering::Relaxed);
			Ok(())
		}
		fn write_trade(&mut self, _record: &super::super::TradeLog) -> Result<(), super::super::EventSinkError> {
			Ok(())
		}
		fn write_outcome(&mut self, _record: &crate::types::RequestOutcome) -> Result<(), super::super::EventSinkError> {
			Ok(())
		}
		fn flush(&mut self) -> Result<(), super::super::EventSinkError> {
			Ok(())
		}
	}

	#[test]
	fn writer_drains_and_flushes_queued_events() {
		let (producer, consumer) = EventBuffer::new(16).split();
		let order_count = Arc::new(AtomicUsize::new(0));
		let sink = Box::new(CountingSink { orders: order_count.clone() });
		let config = EventWriterConfig { batch_size: 4, batch_timeout_ms: 20, verbose_logging: true };
		let writer = EventWriter::start(consumer, sink, config);

		for seq in 0..3 {
			producer
				.push(MatchingEvent::Order(OrderLog {
					symbol: "BTC-USD".into(),
					seq,
					timestamp: 0,
					event_type: OrderEventType::NewAccepted,
					order_id: OrderId(1),
					side: Side::Buy,
					price: Price(100),
					remaining_qty: 1,
				}))
				.unwrap();
		}

		thread::sleep(Duration::from_millis(100));
		writer.shutdown();

		assert_eq!(order_count.load(Ordering::Relaxed), 3);
	}
}
