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

//! Core domain types shared by the order book, matcher, and event pipeline.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process-wide, strictly monotonically increasing order id generator.
///
/// Starts at 1000, matching the reference generator's nonzero base.
static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1000);

/// Allocate the next order id.
pub fn next_order_id() -> OrderId {
	OrderId(NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Unique, monotonically increasing identifier for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Caller-supplied correlation id for a trading request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Short textual ticker identifying a tradable instrument.
pub type Symbol = String;

/// Scaled-integer price, expressed in ticks.
///
/// A fixed-point representation avoids the equality/ordering hazards of
/// comparing floating point prices directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(pub u64);

impl fmt::Display for Price {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Order quantity.
pub type Quantity = u32;

/// Monotonic timepoint, milliseconds since the Unix epoch.
pub type Timestamp = u64;

pub fn now_millis() -> Timestamp {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

impl fmt::Display for Side {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Side::Buy => write!(f, "BUY"),
			Side::Sell => write!(f, "SELL"),
		}
	}
}

/// Order kind: market orders never rest in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderKind {
	Market,
	Limit,
}

/// Order lifecycle state.
///
/// Monotonic except for `PartiallyFilled`, which may be revisited between
/// fills. `Expired` is part of the vocabulary for completeness with the
/// event schema but nothing in this engine currently produces it — there is
/// no time-in-force feature that can expire an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderState {
	Pending,
	Active,
	PartiallyFilled,
	Filled,
	Cancelled,
	Rejected,
	Expired,
}

/// A resting or in-flight order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
	pub id: OrderId,
	pub client_id: String,
	pub symbol: Symbol,
	pub side: Side,
	pub kind: OrderKind,
	/// Meaningless for market orders.
	pub price: Price,
	pub original_qty: Quantity,
	pub remaining_qty: Quantity,
	pub state: OrderState,
	pub timestamp: Timestamp,
}

impl Order {
	pub fn is_filled(&self) -> bool {
		self.remaining_qty == 0
	}
}

/// Parameters for admitting a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderParams {
	pub client_id: String,
	pub side: Side,
	/// `None` for market orders.
	pub price: Option<Price>,
	pub qty: Quantity,
}

/// One of the three request kinds the engine accepts.
#[derive(Debug, Clone)]
pub enum TradingRequest {
	NewOrder {
		request_id: RequestId,
		symbol: Symbol,
		order_type: OrderKind,
		params: NewOrderParams,
	},
	Cancel {
		request_id: RequestId,
		symbol: Symbol,
		order_id: OrderId,
	},
	Modify {
		request_id: RequestId,
		symbol: Symbol,
		order_id: OrderId,
		new_price: Price,
		new_quantity: Quantity,
	},
}

impl TradingRequest {
	pub fn request_id(&self) -> RequestId {
		match self {
			TradingRequest::NewOrder { request_id, .. }
			| TradingRequest::Cancel { request_id, .. }
			| TradingRequest::Modify { request_id, .. } => *request_id,
		}
	}

	pub fn symbol(&self) -> &str {
		match self {
			TradingRequest::NewOrder { symbol, .. }
			| TradingRequest::Cancel { symbol, .. }
			| TradingRequest::Modify { symbol, .. } => symbol,
		}
	}
}

/// Immutable record of a single maker/taker match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
	pub taker_id: OrderId,
	pub maker_id: OrderId,
	/// Always the maker's price (maker-price rule).
	pub price: Price,
	pub qty: Quantity,
	pub taker_side: Side,
	pub timestamp: Timestamp,
	pub match_seq: u64,
}

/// Outcome status of a processed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
	Ok,
	Rejected,
	Noop,
}

impl fmt::Display for RequestStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			RequestStatus::Ok => "OK",
			RequestStatus::Rejected => "REJECTED",
			RequestStatus::Noop => "NOOP",
		};
		write!(f, "{s}")
	}
}

/// Reason a request was rejected (or `None` on success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
	None,
	UnknownSymbol,
	UnknownOrder,
	InvalidPrice,
	InvalidQuantity,
	NotModifiable,
	BookClosed,
}

impl fmt::Display for RejectReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			RejectReason::None => "NONE",
			RejectReason::UnknownSymbol => "UNKNOWN_SYMBOL",
			RejectReason::UnknownOrder => "UNKNOWN_ORDER",
			RejectReason::InvalidPrice => "INVALID_PRICE",
			RejectReason::InvalidQuantity => "INVALID_QUANTITY",
			RejectReason::NotModifiable => "NOT_MODIFIABLE",
			RejectReason::BookClosed => "BOOK_CLOSED",
		};
		write!(f, "{s}")
	}
}

/// Synchronous result of `process_request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOutcome {
	pub request_id: RequestId,
	pub status: RequestStatus,
	pub reason: RejectReason,
	pub message: String,
	pub fills: Vec<Fill>,
	pub taker_filled_qty: Quantity,
	pub taker_remaining_qty: Quantity,
}

impl RequestOutcome {
	pub fn ok(request_id: RequestId) -> Self {
		Self {
			request_id,
			status: RequestStatus::Ok,
			reason: RejectReason::None,
			message: String::new(),
			fills: Vec::new(),
			taker_filled_qty: 0,
			taker_remaining_qty: 0,
		}
	}

	pub fn rejected(request_id: RequestId, reason: RejectReason, message: impl Into<String>) -> Self {
		Self {
			request_id,
			status: RequestStatus::Rejected,
			reason,
			message: message.into(),
			fills: Vec::new(),
			taker_filled_qty: 0,
			taker_remaining_qty: 0,
		}
	}
}

/// Event type vocabulary for `OrderLog` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
	NewAccepted,
	Replaced,
	Canceled,
	Expired,
	Rejected,
	PartiallyFilled,
	Filled,
}

impl fmt::Display for OrderEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			OrderEventType::NewAccepted => "NEW_ACCEPTED",
			OrderEventType::Replaced => "REPLACED",
			OrderEventType::Canceled => "CANCELED",
			OrderEventType::Expired => "EXPIRED",
			OrderEventType::Rejected => "REJECTED",
			OrderEventType::PartiallyFilled => "PARTIALLY_FILLED",
			OrderEventType::Filled => "FILLED",
		};
		write!(f, "{s}")
	}
}

/// Errors raised while validating or matching a request.
///
/// These never cross the serializer boundary as `panic`s; they're folded
/// into a `RequestOutcome` by the caller instead. The type exists for the
/// few internal operations (book invariant checks, handle lookups used in
/// tests) that benefit from a typed `Result`.
#[derive(Debug, Error)]
pub enum MatchingError {
	#[error("unknown symbol: {0}")]
	UnknownSymbol(String),
	#[error("unknown order: {0}")]
	UnknownOrder(OrderId),
	#[error("invalid price for order {0}")]
	InvalidPrice(OrderId),
	#[error("invalid quantity for order {0}")]
	InvalidQuantity(OrderId),
	#[error("order book is closed for market order {0}")]
	BookClosed(OrderId),
}
