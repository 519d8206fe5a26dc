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

//! `Exchange`: the multi-symbol router. Routes each request to its symbol's
//! serializer, which runs the matcher on a shared worker pool and completes
//! a `oneshot` channel with the outcome.
//!
//! The reference implementation posts the matching work to a strand but
//! captures the outcome by reference on the caller's stack and returns
//! before the task necessarily runs — a data race. This implementation
//! fixes that by completing a `tokio::sync::oneshot::Sender` from *inside*
//! the task the serializer runs, and having the caller block on the paired
//! receiver.

pub mod state;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::event::{EventProducer, MatchingEvent};
use crate::pool::{Serializer, WorkerPool};
use crate::types::{RejectReason, RequestOutcome, Symbol, TradingRequest};
use state::SymbolState;

struct AssetContext {
	serializer: Serializer,
	state: Arc<std::sync::Mutex<SymbolState>>,
}

/// Routes trading requests to per-symbol matching state, one serializer per
/// symbol, all sharing one worker pool.
pub struct Exchange {
	pool: Arc<WorkerPool>,
	assets: DashMap<Symbol, AssetContext>,
	events: EventProducer,
}

impl Exchange {
	pub fn new(pool: Arc<WorkerPool>, events: EventProducer) -> Self {
		Self { pool, assets: DashMap::new(), events }
	}

	/// Register a symbol. Requests for unregistered symbols are rejected
	/// with `UNKNOWN_SYMBOL` (§4.4.1) rather than auto-created — a matching
	/// core backtesting a fixed instrument universe should not silently
	/// admit typos as new markets.
	pub fn add_symbol(&self, symbol: impl Into<Symbol>) {
		let symbol = symbol.into();
		let context = AssetContext {
			serializer: Serializer::new(self.pool.clone()),
			state: Arc::new(std::sync::Mutex::new(SymbolState::new(symbol.clone()))),
		};
		self.assets.insert(symbol, context);
	}

	pub fn has_symbol(&self, symbol: &str) -> bool {
		self.assets.contains_key(symbol)
	}

	/// Submit a request and block until its outcome is available.
	///
	/// The blocking happens on a `oneshot::Receiver` completed from inside
	/// the task the symbol's serializer runs — never by reading a value
	/// some other thread might not have written yet.
	pub fn submit(&self, request: TradingRequest) -> RequestOutcome {
		let request_id = request.request_id();
		let symbol = request.symbol().to_string();

		let Some(context) = self.assets.get(&symbol) else {
			return RequestOutcome::rejected(request_id, RejectReason::UnknownSymbol, format!("unknown symbol: {symbol}"));
		};

		let (tx, rx) = oneshot::channel();
		let state = context.state.clone();
		let events = self.events.clone();

		context.serializer.post(Box::new(move || {
			let outcome = {
				let mut state = state.lock().unwrap();
				let (outcome, produced_events) = crate::matcher::process_request(&mut state, request);
				for event in produced_events {
					if let Err(err) = events.push(event) {
						warn!(target: "engine", error = %err, "Failed to enqueue matching event");
					}
				}
				outcome
			};
			if let Err(err) = events.push(MatchingEvent::Outcome(outcome.clone())) {
				warn!(target: "engine", error = %err, "Failed to enqueue request outcome event");
			}
			debug!(target: "engine", request_id = %request_id, "Request processed");
			// The receiver may already be gone if the caller dropped it
			// (e.g. panicked while waiting); that's not this task's problem.
			let _ = tx.send(outcome);
		}));

		rx.blocking_recv().unwrap_or_else(|_| {
			RequestOutcome::rejected(request_id, RejectReason::NotModifiable, "engine shut down before request completed")
		})
	}
}
