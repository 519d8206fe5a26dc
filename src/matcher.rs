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

//! The matching algorithm: price/time priority crossing, admission,
//! cancellation, and modification, plus the event stream each produces.
//!
//! Everything here assumes it is being called from inside the serializer of
//! the request's own symbol — the book is effectively single-threaded for
//! the duration of one call to [`process_request`].

use tracing::debug;

use crate::engine::state::SymbolState;
use crate::event::{MatchingEvent, OrderLog, TradeLog};
use crate::types::{
	next_order_id, now_millis, Fill, NewOrderParams, Order, OrderEventType, OrderId, OrderKind,
	OrderState, Price, RejectReason, RequestId, RequestOutcome, Side, TradingRequest,
};

/// Process one request against `state`, returning the synchronous outcome
/// plus every event it produced, in emission order.
pub fn process_request(state: &mut SymbolState, request: TradingRequest) -> (RequestOutcome, Vec<MatchingEvent>) {
	match request {
		TradingRequest::NewOrder { request_id, symbol, order_type, params } => {
			handle_new_order(state, &symbol, request_id, order_type, params)
		}
		TradingRequest::Cancel { request_id, symbol, order_id } => {
			handle_cancel(state, &symbol, request_id, order_id)
		}
		TradingRequest::Modify { request_id, symbol, order_id, new_price, new_quantity } => {
			handle_modify(state, &symbol, request_id, order_id, new_price, new_quantity)
		}
	}
}

fn handle_new_order(
	state: &mut SymbolState,
	symbol: &str,
	request_id: RequestId,
	order_type: OrderKind,
	params: NewOrderParams,
) -> (RequestOutcome, Vec<MatchingEvent>) {
	if params.qty == 0 {
		return reject_new_order(state, symbol, request_id, RejectReason::InvalidQuantity, "quantity must be positive");
	}
	if order_type == OrderKind::Limit && !matches!(params.price, Some(p) if p.0 > 0) {
		return reject_new_order(state, symbol, request_id, RejectReason::InvalidPrice, "limit orders require a positive price");
	}

	let order = Order {
		id: next_order_id(),
		client_id: params.client_id,
		symbol: symbol.to_string(),
		side: params.side,
		kind: order_type,
		price: params.price.unwrap_or(Price(0)),
		original_qty: params.qty,
		remaining_qty: params.qty,
		state: OrderState::Active,
		timestamp: now_millis(),
	};

	admit(state, symbol, request_id, order)
}

fn reject_new_order(
	state: &mut SymbolState,
	symbol: &str,
	request_id: RequestId,
	reason: RejectReason,
	message: &str,
) -> (RequestOutcome, Vec<MatchingEvent>) {
	let seq = state.sequences.next_order_seq();
	let events = vec![MatchingEvent::Order(OrderLog {
		symbol: symbol.to_string(),
		seq,
		timestamp: now_millis(),
		event_type: OrderEventType::Rejected,
		order_id: OrderId(0),
		side: Side::Buy,
		price: Price(0),
		remaining_qty: 0,
	})];
	(RequestOutcome::rejected(request_id, reason, message), events)
}

/// Run `order` against the book: match it, then either rest the residual
/// (limit) or reject the residual (market). Shared by fresh `NewOrder`
/// admissions and by `Modify`'s remove-then-resubmit.
fn admit(
	state: &mut SymbolState,
	symbol: &str,
	request_id: RequestId,
	mut order: Order,
) -> (RequestOutcome, Vec<MatchingEvent>) {
	let kind = order.kind;
	let original_qty = order.original_qty;
	let mut events = Vec::new();
	let fills = match_against_book(state, symbol, &mut order, &mut events);

	match kind {
		OrderKind::Limit => {
			let remaining = order.remaining_qty;
			if remaining > 0 {
				order.state = if fills.is_empty() { OrderState::Active } else { OrderState::PartiallyFilled };
				let id = order.id;
				let side = order.side;
				let price = order.price;
				state.book.insert(order);
				let seq = state.sequences.next_order_seq();
				events.push(MatchingEvent::Order(OrderLog {
					symbol: symbol.to_string(),
					seq,
					timestamp: now_millis(),
					event_type: OrderEventType::NewAccepted,
					order_id: id,
					side,
					price,
					remaining_qty: remaining,
				}));
			}
			let outcome = RequestOutcome {
				request_id,
				status: crate::types::RequestStatus::Ok,
				reason: RejectReason::None,
				message: String::new(),
				fills,
				taker_filled_qty: original_qty - remaining,
				taker_remaining_qty: remaining,
			};
			(outcome, events)
		}
		OrderKind::Market => {
			let remaining = order.remaining_qty;
			let filled = original_qty - remaining;
			let outcome = if remaining > 0 {
				RequestOutcome {
					request_id,
					status: crate::types::RequestStatus::Rejected,
					reason: RejectReason::BookClosed,
					message: "insufficient resting liquidity for market order".to_string(),
					fills,
					taker_filled_qty: filled,
					taker_remaining_qty: remaining,
				}
			} else {
				RequestOutcome {
					request_id,
					status: crate::types::RequestStatus::Ok,
					reason: RejectReason::None,
					message: String::new(),
					fills,
					taker_filled_qty: filled,
					taker_remaining_qty: 0,
				}
			};
			(outcome, events)
		}
	}
}

fn can_match(taker: &Order, maker_price: Price) -> bool {
	if taker.kind == OrderKind::Market {
		return true;
	}
	match taker.side {
		Side::Buy => taker.price >= maker_price,
		Side::Sell => taker.price <= maker_price,
	}
}

/// Walk the opposite side of the book, crossing the taker against resting
/// makers in strict price/time priority until the taker is filled or the
/// book is no longer crossable.
fn match_against_book(
	state: &mut SymbolState,
	symbol: &str,
	taker: &mut Order,
	events: &mut Vec<MatchingEvent>,
) -> Vec<Fill> {
	let mut fills = Vec::new();
	let opposite = taker.side.opposite();

	loop {
		if taker.remaining_qty == 0 {
			break;
		}
		let Some(maker_price) = state.book.best_price(opposite) else {
			break;
		};
		if !can_match(taker, maker_price) {
			break;
		}
		let Some(maker) = state.book.best(opposite).cloned() else {
			break;
		};

		let exec_qty = taker.remaining_qty.min(maker.remaining_qty);
		taker.remaining_qty -= exec_qty;
		let maker_remaining = maker.remaining_qty - exec_qty;
		let now = now_millis();

		let match_seq = state.sequences.next_match_seq();
		let fill = Fill {
			taker_id: taker.id,
			maker_id: maker.id,
			price: maker_price,
			qty: exec_qty,
			taker_side: taker.side,
			timestamp: now,
			match_seq,
		};
		events.push(MatchingEvent::Trade(TradeLog {
			symbol: symbol.to_string(),
			seq: state.sequences.next_trade_seq(),
			timestamp: now,
			fill,
		}));
		fills.push(fill);

		if maker_remaining == 0 {
			state.book.pop_front_at(opposite, maker_price);
			events.push(MatchingEvent::Order(OrderLog {
				symbol: symbol.to_string(),
				seq: state.sequences.next_order_seq(),
				timestamp: now,
				event_type: OrderEventType::Filled,
				order_id: maker.id,
				side: maker.side,
				price: maker_price,
				remaining_qty: 0,
			}));
		} else {
			state.book.set_front_remaining(opposite, maker_price, maker_remaining);
			events.push(MatchingEvent::Order(OrderLog {
				symbol: symbol.to_string(),
				seq: state.sequences.next_order_seq(),
				timestamp: now,
				event_type: OrderEventType::PartiallyFilled,
				order_id: maker.id,
				side: maker.side,
				price: maker_price,
				remaining_qty: maker_remaining,
			}));
		}

		taker.state = if taker.remaining_qty == 0 { OrderState::Filled } else { OrderState::PartiallyFilled };
		events.push(MatchingEvent::Order(OrderLog {
			symbol: symbol.to_string(),
			seq: state.sequences.next_order_seq(),
			timestamp: now,
			event_type: if taker.remaining_qty == 0 { OrderEventType::Filled } else { OrderEventType::PartiallyFilled },
			order_id: taker.id,
			side: taker.side,
			price: taker.price,
			remaining_qty: taker.remaining_qty,
		}));

		debug!(
			target: "matcher",
			symbol, taker_id = %taker.id, maker_id = %maker.id, price = %maker_price, qty = exec_qty,
			"Trade executed"
		);
	}

	fills
}

fn handle_cancel(
	state: &mut SymbolState,
	symbol: &str,
	request_id: RequestId,
	order_id: OrderId,
) -> (RequestOutcome, Vec<MatchingEvent>) {
	let Some(order) = state.book.remove(order_id) else {
		return (RequestOutcome::rejected(request_id, RejectReason::UnknownOrder, "no such resting order"), Vec::new());
	};

	let seq = state.sequences.next_order_seq();
	let events = vec![MatchingEvent::Order(OrderLog {
		symbol: symbol.to_string(),
		seq,
		timestamp: now_millis(),
		event_type: OrderEventType::Canceled,
		order_id: order.id,
		side: order.side,
		price: order.price,
		remaining_qty: order.remaining_qty,
	})];

	(RequestOutcome::ok(request_id), events)
}

fn handle_modify(
	state: &mut SymbolState,
	symbol: &str,
	request_id: RequestId,
	order_id: OrderId,
	new_price: Price,
	new_quantity: u32,
) -> (RequestOutcome, Vec<MatchingEvent>) {
	if new_quantity == 0 {
		return (RequestOutcome::rejected(request_id, RejectReason::InvalidQuantity, "quantity must be positive"), Vec::new());
	}

	let Some(existing) = state.book.get(order_id).cloned() else {
		return (RequestOutcome::rejected(request_id, RejectReason::UnknownOrder, "no such resting order"), Vec::new());
	};

	let mut events = Vec::new();
	let seq = state.sequences.next_order_seq();
	events.push(MatchingEvent::Order(OrderLog {
		symbol: symbol.to_string(),
		seq,
		timestamp: now_millis(),
		event_type: OrderEventType::Replaced,
		order_id,
		side: existing.side,
		price: new_price,
		remaining_qty: new_quantity,
	}));

	state.book.remove(order_id);

	// Priority is not preserved: the resubmission gets a fresh timestamp,
	// but keeps the same order id and client (§4.4.3, §9 open question 1).
	let resubmitted = Order {
		id: order_id,
		client_id: existing.client_id,
		symbol: symbol.to_string(),
		side: existing.side,
		kind: existing.kind,
		price: new_price,
		original_qty: new_quantity,
		remaining_qty: new_quantity,
		state: OrderState::Active,
		timestamp: now_millis(),
	};

	let (outcome, mut resubmission_events) = admit(state, symbol, request_id, resubmitted);
	events.append(&mut resubmission_events);
	(outcome, events)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::{NewOrderParams, RequestStatus};

	fn new_order_request(
		request_id: u64,
		symbol: &str,
		kind: OrderKind,
		side: Side,
		price: Option<u64>,
		qty: u32,
	) -> TradingRequest {
		TradingRequest::NewOrder {
			request_id: RequestId(request_id),
			symbol: symbol.to_string(),
			order_type: kind,
			params: NewOrderParams { client_id: "client".into(), side, price: price.map(Price), qty },
		}
	}

	// S1: simple cross.
	#[test]
	fn simple_cross_fills_both_sides() {
		let mut state = SymbolState::new("BTC-USD");
		let (buy_outcome, _) =
			process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Buy, Some(100), 10));
		assert_eq!(buy_outcome.status, RequestStatus::Ok);

		let (sell_outcome, events) =
			process_request(&mut state, new_order_request(2, "BTC-USD", OrderKind::Limit, Side::Sell, Some(100), 10));

		assert_eq!(sell_outcome.fills.len(), 1);
		assert_eq!(sell_outcome.fills[0].qty, 10);
		assert_eq!(sell_outcome.fills[0].price, Price(100));
		assert!(state.book.is_empty_side(Side::Buy));
		assert!(state.book.is_empty_side(Side::Sell));

		let filled_events = events
			.iter()
			.filter(|e| matches!(e, MatchingEvent::Order(o) if o.event_type == OrderEventType::Filled))
			.count();
		assert_eq!(filled_events, 2);
	}

	// S2: partial fill and rest.
	#[test]
	fn partial_fill_leaves_residual_resting() {
		let mut state = SymbolState::new("BTC-USD");
		process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Sell, Some(50), 4));
		let (outcome, _) =
			process_request(&mut state, new_order_request(2, "BTC-USD", OrderKind::Limit, Side::Buy, Some(60), 10));

		assert_eq!(outcome.fills.len(), 1);
		assert_eq!(outcome.fills[0].qty, 4);
		assert_eq!(outcome.taker_remaining_qty, 6);
		assert!(state.book.is_empty_side(Side::Sell));
		let resting = state.book.best(Side::Buy).unwrap();
		assert_eq!(resting.remaining_qty, 6);
		assert_eq!(resting.price, Price(60));
	}

	// S3: walk the book.
	#[test]
	fn walk_the_book_across_three_levels() {
		let mut state = SymbolState::new("BTC-USD");
		process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Sell, Some(100), 5));
		process_request(&mut state, new_order_request(2, "BTC-USD", OrderKind::Limit, Side::Sell, Some(101), 5));
		process_request(&mut state, new_order_request(3, "BTC-USD", OrderKind::Limit, Side::Sell, Some(102), 5));

		let (outcome, _) =
			process_request(&mut state, new_order_request(4, "BTC-USD", OrderKind::Limit, Side::Buy, Some(102), 12));

		assert_eq!(outcome.fills.len(), 3);
		assert_eq!(outcome.fills[0].price, Price(100));
		assert_eq!(outcome.fills[0].qty, 5);
		assert_eq!(outcome.fills[1].price, Price(101));
		assert_eq!(outcome.fills[1].qty, 5);
		assert_eq!(outcome.fills[2].price, Price(102));
		assert_eq!(outcome.fills[2].qty, 2);
		assert_eq!(outcome.taker_remaining_qty, 0);

		let resting = state.book.best(Side::Sell).unwrap();
		assert_eq!(resting.remaining_qty, 3);
		assert_eq!(resting.price, Price(102));
		assert!(state.book.is_empty_side(Side::Buy));
	}

	// S4: market rejected with no book.
	#[test]
	fn market_order_rejected_when_book_empty() {
		let mut state = SymbolState::new("BTC-USD");
		let (outcome, events) =
			process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Market, Side::Buy, None, 5));
		assert_eq!(outcome.status, RequestStatus::Rejected);
		assert_eq!(outcome.reason, RejectReason::BookClosed);
		assert!(outcome.fills.is_empty());
		assert!(events.is_empty());
	}

	// S5: market partial is rejected but reports fills.
	#[test]
	fn market_partial_fill_is_rejected_but_reports_fills() {
		let mut state = SymbolState::new("BTC-USD");
		process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Sell, Some(100), 3));
		let (outcome, _) =
			process_request(&mut state, new_order_request(2, "BTC-USD", OrderKind::Market, Side::Buy, None, 10));

		assert_eq!(outcome.status, RequestStatus::Rejected);
		assert_eq!(outcome.reason, RejectReason::BookClosed);
		assert_eq!(outcome.fills.len(), 1);
		assert_eq!(outcome.fills[0].qty, 3);
		assert_eq!(outcome.taker_filled_qty, 3);
		assert_eq!(outcome.taker_remaining_qty, 7);
		assert!(state.book.is_empty_side(Side::Sell));
	}

	// S6: cancel, then cancel again.
	#[test]
	fn cancel_then_cancel_again_is_rejected() {
		let mut state = SymbolState::new("BTC-USD");
		let (new_outcome, _) =
			process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Buy, Some(100), 10));
		assert_eq!(new_outcome.status, RequestStatus::Ok);
		let order_id = state.book.best(Side::Buy).unwrap().id;

		let (cancel_outcome, events) = process_request(
			&mut state,
			TradingRequest::Cancel { request_id: RequestId(2), symbol: "BTC-USD".into(), order_id },
		);
		assert_eq!(cancel_outcome.status, RequestStatus::Ok);
		assert!(state.book.is_empty_side(Side::Buy));
		assert!(matches!(&events[0], MatchingEvent::Order(o) if o.event_type == OrderEventType::Canceled));

		let (second_cancel, _) = process_request(
			&mut state,
			TradingRequest::Cancel { request_id: RequestId(3), symbol: "BTC-USD".into(), order_id },
		);
		assert_eq!(second_cancel.status, RequestStatus::Rejected);
		assert_eq!(second_cancel.reason, RejectReason::UnknownOrder);
	}

	#[test]
	fn modify_resets_priority_but_keeps_order_id() {
		let mut state = SymbolState::new("BTC-USD");
		process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Buy, Some(100), 10));
		let order_id = state.book.best(Side::Buy).unwrap().id;
		process_request(&mut state, new_order_request(2, "BTC-USD", OrderKind::Limit, Side::Buy, Some(100), 5));

		let (outcome, events) = process_request(
			&mut state,
			TradingRequest::Modify {
				request_id: RequestId(3),
				symbol: "BTC-USD".into(),
				order_id,
				new_price: Price(100),
				new_quantity: 20,
			},
		);
		assert_eq!(outcome.status, RequestStatus::Ok);
		assert!(matches!(&events[0], MatchingEvent::Order(o) if o.event_type == OrderEventType::Replaced));

		// The modified order lost time priority: it is now behind the order
		// admitted second (id differs) even though it was originally first.
		let ids: Vec<_> = state.book.iter_side(Side::Buy).map(|o| o.id).collect();
		assert_eq!(ids[ids.len() - 1], order_id);
	}

	#[test]
	fn rejects_limit_order_with_no_price() {
		let mut state = SymbolState::new("BTC-USD");
		let (outcome, events) =
			process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Buy, None, 10));
		assert_eq!(outcome.status, RequestStatus::Rejected);
		assert_eq!(outcome.reason, RejectReason::InvalidPrice);
		assert!(matches!(&events[0], MatchingEvent::Order(o) if o.order_id == OrderId(0)));
	}

	#[test]
	fn book_never_crosses_after_any_request() {
		let mut state = SymbolState::new("BTC-USD");
		process_request(&mut state, new_order_request(1, "BTC-USD", OrderKind::Limit, Side::Buy, Some(99), 5));
		process_request(&mut state, new_order_request(2, "BTC-USD", OrderKind::Limit, Side::Sell, Some(101), 5));
		assert!(!state.book.is_crossed());
	}
}
