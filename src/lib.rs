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

//! In-memory, multi-symbol, price/time-priority limit order book matching
//! engine.
//!
//! A [`pool::WorkerPool`] of OS threads backs one [`pool::Serializer`] per
//! symbol, giving each symbol the illusion of single-threaded execution
//! while different symbols match concurrently. [`engine::Exchange`] routes
//! requests to the right symbol and blocks the caller until the matcher's
//! outcome is ready. Every order acceptance, fill, and request outcome is
//! pushed onto a bounded channel and persisted by a dedicated
//! [`event::EventWriter`] thread, so the matching path itself never blocks
//! on I/O.

pub mod config;
pub mod engine;
pub mod event;
pub mod logging;
pub mod matcher;
pub mod orderbook;
pub mod pool;
pub mod types;

pub use config::MatchingConfig;
pub use engine::Exchange;
pub use event::{EventProducer, EventSink, EventWriter, EventWriterConfig, FileEventSink, MatchingEvent, MemoryEventSink};
pub use logging::init_logging;
pub use orderbook::OrderBook;
pub use pool::WorkerPool;
pub use types::{
	Fill, MatchingError, NewOrderParams, Order, OrderEventType, OrderId, OrderKind, OrderState, Price, Quantity, RejectReason,
	RequestId, RequestOutcome, RequestStatus, Side, Symbol, TradingRequest,
};
