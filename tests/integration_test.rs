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

//! End-to-end wiring: `WorkerPool` + `Exchange` (one serializer per symbol)
//! + `EventWriter` draining into a real `FileEventSink`, driven the way a
//! caller outside this crate would actually assemble the pieces.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use matchbook::event::{EventBuffer, EventWriterConfig};
use matchbook::{
	Exchange, EventWriter, FileEventSink, NewOrderParams, OrderKind, Price, RequestId, RequestStatus, Side, TradingRequest,
	WorkerPool,
};

fn new_order(request_id: u64, symbol: &str, side: Side, price: u64, qty: u32) -> TradingRequest {
	TradingRequest::NewOrder {
		request_id: RequestId(request_id),
		symbol: symbol.to_string(),
		order_type: OrderKind::Limit,
		params: NewOrderParams { client_id: "integration".into(), side, price: Some(Price(price)), qty },
	}
}

#[test]
fn end_to_end_cross_persists_trade_and_outcome_logs() {
	let log_dir = tempfile::tempdir().unwrap();
	let sink = FileEventSink::open(log_dir.path()).unwrap();

	let (producer, consumer) = EventBuffer::new(1024).split();
	let writer = EventWriter::start(consumer, Box::new(sink), EventWriterConfig { batch_size: 8, batch_timeout_ms: 20, verbose_logging: false });

	let pool = Arc::new(WorkerPool::new(4));
	let exchange = Exchange::new(pool, producer);
	exchange.add_symbol("BTC-USD");

	let sell = exchange.submit(new_order(1, "BTC-USD", Side::Sell, 100, 10));
	assert_eq!(sell.status, RequestStatus::Ok);
	assert!(sell.fills.is_empty());

	let buy = exchange.submit(new_order(2, "BTC-USD", Side::Buy, 100, 10));
	assert_eq!(buy.status, RequestStatus::Ok);
	assert_eq!(buy.fills.len(), 1);
	assert_eq!(buy.fills[0].qty, 10);
	assert_eq!(buy.fills[0].price, Price(100));

	// Give the dedicated writer thread a moment to drain and flush before
	// asserting on the files it owns.
	thread::sleep(Duration::from_millis(150));
	writer.shutdown();

	let orders_log = std::fs::read_to_string(log_dir.path().join("orders.log")).unwrap();
	let trades_log = std::fs::read_to_string(log_dir.path().join("trades.log")).unwrap();
	let requests_log = std::fs::read_to_string(log_dir.path().join("requests.log")).unwrap();

	assert!(orders_log.contains("NEW_ACCEPTED"));
	assert!(orders_log.contains("FILLED"));
	assert!(!trades_log.is_empty());
	assert!(requests_log.contains("OK"));
}

#[test]
fn unregistered_symbol_never_reaches_the_event_pipeline() {
	let (producer, consumer) = EventBuffer::new(64).split();
	let sink = matchbook::MemoryEventSink::new();
	let writer = EventWriter::start(consumer, Box::new(sink), EventWriterConfig::default());

	let pool = Arc::new(WorkerPool::new(2));
	let exchange = Exchange::new(pool, producer);
	exchange.add_symbol("BTC-USD");

	let outcome = exchange.submit(new_order(1, "ETH-USD", Side::Buy, 100, 1));
	assert_eq!(outcome.status, RequestStatus::Rejected);

	writer.shutdown();
}

#[test]
fn multiple_symbols_match_independently_under_one_pool() {
	let (producer, _consumer) = EventBuffer::new(1024).split();
	let pool = Arc::new(WorkerPool::new(4));
	let exchange = Arc::new(Exchange::new(pool, producer));
	exchange.add_symbol("AAA");
	exchange.add_symbol("BBB");

	exchange.submit(new_order(1, "AAA", Side::Sell, 50, 5));
	exchange.submit(new_order(2, "BBB", Side::Sell, 200, 5));

	let aaa_fill = exchange.submit(new_order(3, "AAA", Side::Buy, 50, 5));
	let bbb_fill = exchange.submit(new_order(4, "BBB", Side::Buy, 200, 5));

	assert_eq!(aaa_fill.fills.len(), 1);
	assert_eq!(aaa_fill.fills[0].price, Price(50));
	assert_eq!(bbb_fill.fills.len(), 1);
	assert_eq!(bbb_fill.fills[0].price, Price(200));
}
