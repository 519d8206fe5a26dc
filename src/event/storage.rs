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

//! Append-only sinks for order, trade, and request-outcome events.
//!
//! `FileEventSink` writes the three CSV-ish logs this crate's schema calls
//! for (`orders.log`, `trades.log`, `requests.log`); `MemoryEventSink`
//! collects the same records in memory for tests.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use super::{OrderLog, TradeLog};
use crate::types::{Price, RequestOutcome};

const TIMESTAMP_FORMAT: &[time::format_description::FormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

#[derive(Debug, Error)]
pub enum EventSinkError {
	#[error("failed to open log file {path}: {source}")]
	Open { path: String, #[source] source: std::io::Error },
	#[error("failed to write log record: {0}")]
	Write(#[from] std::io::Error),
}

/// Destination for persisted order, trade, and request-outcome records.
///
/// The matching engine never calls these directly — only the event writer
/// thread does, after draining a batch — so a failure here is logged and
/// swallowed rather than propagated back into the matching path (§7).
pub trait EventSink: Send {
	fn write_order(&mut self, record: &OrderLog) -> Result<(), EventSinkError>;
	fn write_trade(&mut self, record: &TradeLog) -> Result<(), EventSinkError>;
	fn write_outcome(&mut self, record: &RequestOutcome) -> Result<(), EventSinkError>;
	fn flush(&mut self) -> Result<(), EventSinkError>;
}

/// Render a millisecond epoch timestamp as local calendar time to second
/// resolution (`YYYY-MM-DD HH:MM:SS`), matching `std::localtime` formatted
/// with `%Y-%m-%d %H:%M:%S` in the reference implementation.
fn format_timestamp(millis: u64) -> String {
	let Ok(utc) = OffsetDateTime::from_unix_timestamp((millis / 1000) as i64) else {
		return millis.to_string();
	};
	let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
	utc.to_offset(local_offset).format(TIMESTAMP_FORMAT).unwrap_or_else(|_| millis.to_string())
}

/// Render a scaled-integer price (ticks = hundredths of a unit) to two
/// decimal places, matching `std::setprecision(2)` in the reference
/// implementation's stream operators.
fn format_price(price: Price) -> String {
	format!("{}.{:02}", price.0 / 100, price.0 % 100)
}

/// Three append-only flat files under a configured log directory.
pub struct FileEventSink {
	orders: BufWriter<File>,
	trades: BufWriter<File>,
	requests: BufWriter<File>,
}

impl FileEventSink {
	pub fn open(log_dir: &Path) -> Result<Self, EventSinkError> {
		std::fs::create_dir_all(log_dir).map_err(|source| EventSinkError::Open {
			path: log_dir.display().to_string(),
			source,
		})?;
		let open = |name: &str| -> Result<BufWriter<File>, EventSinkError> {
			let path = log_dir.join(name);
			let file = OpenOptions::new()
				.create(true)
				.append(true)
				.open(&path)
				.map_err(|source| EventSinkError::Open { path: path.display().to_string(), source })?;
			Ok(BufWriter::new(file))
		};
		Ok(Self {
			orders: open("orders.log")?,
			trades: open("trades.log")?,
			requests: open("requests.log")?,
		})
	}
}

impl EventSink for FileEventSink {
	fn write_order(&mut self, record: &OrderLog) -> Result<(), EventSinkError> {
		writeln!(
			self.orders,
			"{},{},{},{},{},{},{},{}",
			format_timestamp(record.timestamp),
			record.symbol,
			record.seq,
			record.event_type,
			record.order_id,
			record.side,
			format_price(record.price),
			record.remaining_qty,
		)?;
		Ok(())
	}

	fn write_trade(&mut self, record: &TradeLog) -> Result<(), EventSinkError> {
		writeln!(
			self.trades,
			"{},{},{},{},{},{},{},{},{},{}",
			format_timestamp(record.timestamp),
			record.symbol,
			record.seq,
			record.symbol,
			record.fill.taker_id,
			record.fill.maker_id,
			format_price(record.fill.price),
			record.fill.qty,
			record.fill.taker_side,
			record.fill.match_seq,
		)?;
		Ok(())
	}

	fn write_outcome(&mut self, record: &RequestOutcome) -> Result<(), EventSinkError> {
		write!(
			self.requests,
			"{},{},{},\"{}\",{},{},{}",
			record.request_id,
			record.status,
			record.reason,
			record.message,
			record.taker_filled_qty,
			record.taker_remaining_qty,
			record.fills.len(),
		)?;
		for fill in &record.fills {
			write!(
				self.requests,
				",{}:{}:{}:{}",
				fill.taker_id, fill.maker_id, format_price(fill.price), fill.qty
			)?;
		}
		writeln!(self.requests)?;
		Ok(())
	}

	fn flush(&mut self) -> Result<(), EventSinkError> {
		self.orders.flush()?;
		self.trades.flush()?;
		self.requests.flush()?;
		Ok(())
	}
}

/// In-memory sink for tests: keeps every record it was given, in order.
#[derive(Default)]
pub struct MemoryEventSink {
	pub orders: Mutex<Vec<OrderLog>>,
	pub trades: Mutex<Vec<TradeLog>>,
	pub outcomes: Mutex<Vec<RequestOutcome>>,
}

impl MemoryEventSink {
	pub fn new() -> Self {
		Self::default()
	}
}

impl EventSink for MemoryEventSink {
	fn write_order(&mut self, record: &OrderLog) -> Result<(), EventSinkError> {
		self.orders.lock().unwrap().push(record.clone());
		Ok(())
	}

	fn write_trade(&mut self, record: &TradeLog) -> Result<(), EventSinkError> {
		self.trades.lock().unwrap().push(record.clone());
		Ok(())
	}

	fn write_outcome(&mut self, record: &RequestOutcome) -> Result<(), EventSinkError> {
		self.outcomes.lock().unwrap().push(record.clone());
		Ok(())
	}

	fn flush(&mut self) -> Result<(), EventSinkError> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{Fill, OrderEventType, OrderId, Price, RejectReason, RequestId, RequestStatus, Side};

	fn sample_order_log() -> OrderLog {
		OrderLog {
			symbol: "BTC-USD".into(),
			seq: 1,
			timestamp: 1_700_000_000_000,
			event_type: OrderEventType::NewAccepted,
			order_id: OrderId(1000),
			side: Side::Buy,
			price: Price(100),
			remaining_qty: 5,
		}
	}

	fn sample_trade_log() -> TradeLog {
		TradeLog {
			symbol: "BTC-USD".into(),
			seq: 1,
			timestamp: 1_700_000_000_000,
			fill: Fill {
				taker_id: OrderId(1001),
				maker_id: OrderId(1000),
				price: Price(100),
				qty: 5,
				taker_side: Side::Sell,
				timestamp: 1_700_000_000_000,
				match_seq: 1,
			},
		}
	}

	#[test]
	fn file_sink_creates_three_logs() {
		let dir = tempfile::tempdir().unwrap();
		let mut sink = FileEventSink::open(dir.path()).unwrap();
		sink.write_order(&sample_order_log()).unwrap();
		sink.write_trade(&sample_trade_log()).unwrap();
		sink.write_outcome(&RequestOutcome {
			request_id: RequestId(1),
			status: RequestStatus::Ok,
			reason: RejectReason::None,
			message: String::new(),
			fills: vec![sample_trade_log().fill],
			taker_filled_qty: 5,
			taker_remaining_qty: 0,
		})
		.unwrap();
		sink.flush().unwrap();

		assert!(dir.path().join("orders.log").exists());
		assert!(dir.path().join("trades.log").exists());
		assert!(dir.path().join("requests.log").exists());

		let orders = std::fs::read_to_string(dir.path().join("orders.log")).unwrap();
		assert!(orders.contains("NEW_ACCEPTED"));
		assert!(orders.contains("1000"));
		assert!(orders.contains("1.00"));

		let requests = std::fs::read_to_string(dir.path().join("requests.log")).unwrap();
		assert!(requests.contains("1001:1000:1.00:5"));
	}

	#[test]
	fn price_renders_to_two_decimal_places() {
		assert_eq!(format_price(Price(100)), "1.00");
		assert_eq!(format_price(Price(150)), "1.50");
		assert_eq!(format_price(Price(5)), "0.05");
	}

	#[test]
	fn memory_sink_collects_in_order() {
		let mut sink = MemoryEventSink::new();
		sink.write_order(&sample_order_log()).unwrap();
		sink.write_order(&sample_order_log()).unwrap();
		assert_eq!(sink.orders.lock().unwrap().len(), 2);
	}
}
