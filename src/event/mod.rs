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

//! Structured events emitted by the matching engine and consumed by the
//! event writer.

pub mod buffer;
pub mod storage;
pub mod writer;

pub use buffer::{EventBuffer, EventConsumer, EventProducer};
pub use storage::{EventSink, EventSinkError, FileEventSink, MemoryEventSink};
pub use writer::{EventWriter, EventWriterConfig};

use serde::{Deserialize, Serialize};

use crate::types::{Fill, OrderEventType, OrderId, Price, Quantity, RequestOutcome, Side, Symbol, Timestamp};

/// Per-symbol monotonic sequence number.
pub type SequenceNumber = u64;

/// A single per-order lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLog {
	pub symbol: Symbol,
	pub seq: SequenceNumber,
	pub timestamp: Timestamp,
	pub event_type: OrderEventType,
	pub order_id: OrderId,
	pub side: Side,
	pub price: Price,
	pub remaining_qty: Quantity,
}

/// A single trade record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLog {
	pub symbol: Symbol,
	pub seq: SequenceNumber,
	pub timestamp: Timestamp,
	pub fill: Fill,
}

/// The three event kinds that share the event pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchingEvent {
	Order(OrderLog),
	Trade(TradeLog),
	Outcome(RequestOutcome),
}

impl MatchingEvent {
	pub fn symbol(&self) -> Option<&str> {
		match self {
			MatchingEvent::Order(o) => Some(&o.symbol),
			MatchingEvent::Trade(t) => Some(&t.symbol),
			MatchingEvent::Outcome(_) => None,
		}
	}
}

/// A batch of events drained together by the writer, stamped with the time
/// the batch was committed.
#[derive(Debug, Clone)]
pub struct EventBatch {
	pub events: Vec<MatchingEvent>,
	pub batch_timestamp: Timestamp,
}

impl EventBatch {
	pub fn new(events: Vec<MatchingEvent>, batch_timestamp: Timestamp) -> Self {
		Self { events, batch_timestamp }
	}

	pub fn is_empty(&self) -> bool {
		self.events.is_empty()
	}

	pub fn len(&self) -> usize {
		self.events.len()
	}
}
