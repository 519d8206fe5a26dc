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

//! Per-symbol state: one order book plus its own sequence counters.
//!
//! A `SymbolState` is owned exclusively by the tasks its serializer runs —
//! nothing outside that serializer ever touches it, so the sequence
//! counters below don't strictly need to be atomic, but they cost nothing
//! here and match the reference implementation's choice of atomic maps.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::event::SequenceNumber;
use crate::orderbook::OrderBook;

/// Independent, per-symbol monotonic counters for order events, trade
/// events, and match sequence numbers (§4.4.4 requires these be distinct).
#[derive(Default)]
pub struct SequenceCounters {
	order_seq: AtomicU64,
	trade_seq: AtomicU64,
	match_seq: AtomicU64,
}

impl SequenceCounters {
	pub fn next_order_seq(&self) -> SequenceNumber {
		self.order_seq.fetch_add(1, Ordering::Relaxed) + 1
	}

	pub fn next_trade_seq(&self) -> SequenceNumber {
		self.trade_seq.fetch_add(1, Ordering::Relaxed) + 1
	}

	pub fn next_match_seq(&self) -> u64 {
		self.match_seq.fetch_add(1, Ordering::Relaxed) + 1
	}
}

/// Everything the matcher needs for one symbol: its book and its sequence
/// counters. Owned exclusively by the symbol's serializer.
pub struct SymbolState {
	pub book: OrderBook,
	pub sequences: SequenceCounters,
}

impl SymbolState {
	pub fn new(symbol: impl Into<String>) -> Self {
		Self { book: OrderBook::new(symbol), sequences: SequenceCounters::default() }
	}
}
