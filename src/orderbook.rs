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

//! Per-symbol price/time priority order book.
//!
//! Each side is a sorted map keyed by price, whose values are FIFO queues of
//! resting orders at that level. Bids are read from the high end of the map,
//! asks from the low end, so both sides share the same underlying
//! structure. A handle map resolves an order id directly to its side and
//! price level, giving O(log P) insertion and O(1) amortized cancel without
//! the reindexing a flat position-indexed vector would require.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::types::{Order, OrderId, Price, Side};

#[derive(Default)]
pub struct OrderBook {
	pub symbol: String,
	bids: BTreeMap<Price, VecDeque<Order>>,
	asks: BTreeMap<Price, VecDeque<Order>>,
	handles: HashMap<OrderId, (Side, Price)>,
}

impl OrderBook {
	pub fn new(symbol: impl Into<String>) -> Self {
		Self {
			symbol: symbol.into(),
			bids: BTreeMap::new(),
			asks: BTreeMap::new(),
			handles: HashMap::new(),
		}
	}

	fn side_map(&self, side: Side) -> &BTreeMap<Price, VecDeque<Order>> {
		match side {
			Side::Buy => &self.bids,
			Side::Sell => &self.asks,
		}
	}

	fn side_map_mut(&mut self, side: Side) -> &mut BTreeMap<Price, VecDeque<Order>> {
		match side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		}
	}

	pub fn is_empty_side(&self, side: Side) -> bool {
		self.side_map(side).is_empty()
	}

	/// Best resting order on `side` (highest bid / lowest ask), front of its
	/// level's FIFO queue.
	pub fn best(&self, side: Side) -> Option<&Order> {
		let level = match side {
			Side::Buy => self.bids.iter().next_back(),
			Side::Sell => self.asks.iter().next(),
		};
		level.and_then(|(_, q)| q.front())
	}

	pub fn best_price(&self, side: Side) -> Option<Price> {
		match side {
			Side::Buy => self.bids.keys().next_back().copied(),
			Side::Sell => self.asks.keys().next().copied(),
		}
	}

	/// Insert a resting order at its own price level, appended to the FIFO
	/// queue (preserving time priority among orders at the same price).
	///
	/// # Panics
	/// Panics if `order.remaining_qty == 0` or `order.kind` is `Market` —
	/// both are programming errors the engine must never trigger.
	pub fn insert(&mut self, order: Order) {
		assert!(order.remaining_qty > 0, "cannot rest an order with zero remaining quantity");
		assert!(
			order.kind != crate::types::OrderKind::Market,
			"market orders must never rest in the book"
		);
		let side = order.side;
		let price = order.price;
		let id = order.id;
		self.side_map_mut(side).entry(price).or_default().push_back(order);
		self.handles.insert(id, (side, price));
	}

	/// Remove the front (best-priority) order of a level and pop the level
	/// if it becomes empty. Used while walking the book during matching.
	pub fn pop_front_at(&mut self, side: Side, price: Price) -> Option<Order> {
		let map = self.side_map_mut(side);
		let Some(queue) = map.get_mut(&price) else {
			return None;
		};
		let order = queue.pop_front();
		if queue.is_empty() {
			map.remove(&price);
		}
		if let Some(ref o) = order {
			self.handles.remove(&o.id);
		}
		order
	}

	/// Update the remaining quantity of the front order of a level in place
	/// (used when a maker is partially filled but stays resting).
	pub fn set_front_remaining(&mut self, side: Side, price: Price, remaining: u32) {
		if let Some(queue) = self.side_map_mut(side).get_mut(&price)
			&& let Some(front) = queue.front_mut()
		{
			front.remaining_qty = remaining;
		}
	}

	/// Remove a specific resting order by id, wherever it is in its level's
	/// queue (used by cancel, which need not target the front).
	pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
		let (side, price) = self.handles.remove(&order_id)?;
		let map = self.side_map_mut(side);
		let queue = map.get_mut(&price)?;
		let pos = queue.iter().position(|o| o.id == order_id)?;
		let order = queue.remove(pos);
		if queue.is_empty() {
			map.remove(&price);
		}
		order
	}

	pub fn contains(&self, order_id: OrderId) -> bool {
		self.handles.contains_key(&order_id)
	}

	pub fn get(&self, order_id: OrderId) -> Option<&Order> {
		let (side, price) = *self.handles.get(&order_id)?;
		self.side_map(side).get(&price)?.iter().find(|o| o.id == order_id)
	}

	/// True iff the book would be crossed: a resting bid at or above the
	/// best ask. Checked after every mutation as a correctness invariant.
	pub fn is_crossed(&self) -> bool {
		match (self.best_price(Side::Buy), self.best_price(Side::Sell)) {
			(Some(bid), Some(ask)) => bid >= ask,
			_ => false,
		}
	}

	/// Every resting order on `side`, in priority order, for invariant
	/// checks and tests.
	pub fn iter_side(&self, side: Side) -> impl Iterator<Item = &Order> {
		let levels: Box<dyn Iterator<Item = &VecDeque<Order>>> = match side {
			Side::Buy => Box::new(self.bids.values().rev()),
			Side::Sell => Box::new(self.asks.values()),
		};
		levels.flat_map(|q| q.iter())
	}
}
