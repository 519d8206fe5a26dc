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

//! Bounded single-producer/single-consumer channel carrying `MatchingEvent`s
//! from the matching engine to the event writer.

use thiserror::Error;

use super::MatchingEvent;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventBufferError {
	#[error("event buffer is full")]
	Full,
	#[error("event buffer is empty")]
	Empty,
	#[error("event buffer is disconnected")]
	Disconnected,
}

/// Bounded channel of `MatchingEvent`s. Split into a producer half (cloned
/// freely across worker threads) and a single consumer half owned by the
/// event writer thread.
pub struct EventBuffer {
	sender: crossbeam::channel::Sender<MatchingEvent>,
	receiver: crossbeam::channel::Receiver<MatchingEvent>,
}

impl EventBuffer {
	pub fn new(capacity: usize) -> Self {
		let (sender, receiver) = crossbeam::channel::bounded(capacity);
		Self { sender, receiver }
	}

	pub fn split(self) -> (EventProducer, EventConsumer) {
		(EventProducer { sender: self.sender }, EventConsumer { receiver: self.receiver })
	}
}

#[derive(Clone)]
pub struct EventProducer {
	sender: crossbeam::channel::Sender<MatchingEvent>,
}

impl EventProducer {
	/// Push an event, blocking briefly if the buffer is full.
	///
	/// Once a match has happened, losing its event is worse than a short
	/// producer stall, so this blocks rather than drops — unlike a plain
	/// `try_send`.
	pub fn push(&self, event: MatchingEvent) -> Result<(), EventBufferError> {
		self.sender.send(event).map_err(|_| EventBufferError::Disconnected)
	}

	pub fn is_full(&self) -> bool {
		self.sender.is_full()
	}
}

pub struct EventConsumer {
	receiver: crossbeam::channel::Receiver<MatchingEvent>,
}

impl EventConsumer {
	pub fn try_recv(&self) -> Result<MatchingEvent, EventBufferError> {
		self.receiver.try_recv().map_err(|e| match e {
			crossbeam::channel::TryRecvError::Empty => EventBufferError::Empty,
			crossbeam::channel::TryRecvError::Disconnected => EventBufferError::Disconnected,
		})
	}

	pub fn recv_timeout(
		&self,
		timeout: std::time::Duration,
	) -> Result<MatchingEvent, EventBufferError> {
		self.receiver.recv_timeout(timeout).map_err(|e| match e {
			crossbeam::channel::RecvTimeoutError::Timeout => EventBufferError::Empty,
			crossbeam::channel::RecvTimeoutError::Disconnected => EventBufferError::Disconnected,
		})
	}

	/// Drain up to `max_count` currently-available events without blocking.
	pub fn drain(&self, max_count: usize) -> Vec<MatchingEvent> {
		let mut events = Vec::with_capacity(max_count.min(64));
		while events.len() < max_count {
			match self.receiver.try_recv() {
				Ok(event) => events.push(event),
				Err(_) => break,
			}
		}
		events
	}
}
