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

//! Per-symbol serializer ("strand"): gives one symbol the illusion of a
//! single-threaded matching engine while letting different symbols run
//! concurrently on the shared worker pool.
//!
//! Tasks posted to one `Serializer` execute in posting order, never
//! concurrently with one another, without ever pinning a worker thread for
//! longer than a single task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::{Task, WorkerPool};

struct Inner {
	tasks: Mutex<VecDeque<Task>>,
	running: AtomicBool,
}

/// Serializes execution of tasks posted from possibly-many threads onto a
/// shared `WorkerPool`, one task at a time, in FIFO order.
#[derive(Clone)]
pub struct Serializer {
	inner: Arc<Inner>,
	pool: Arc<WorkerPool>,
}

impl Serializer {
	pub fn new(pool: Arc<WorkerPool>) -> Self {
		Self {
			inner: Arc::new(Inner { tasks: Mutex::new(VecDeque::new()), running: AtomicBool::new(false) }),
			pool,
		}
	}

	/// Append `task` to the FIFO. If the serializer was idle, submits a
	/// driver to the worker pool to start draining it.
	pub fn post(&self, task: Task) {
		let mut tasks = self.inner.tasks.lock().unwrap();
		tasks.push_back(task);
		if !self.inner.running.swap(true, Ordering::AcqRel) {
			drop(tasks);
			self.submit_driver();
		}
	}

	fn submit_driver(&self) {
		let inner = self.inner.clone();
		let pool = self.pool.clone();
		self.pool.submit(Box::new(move || Self::execute_next(inner, pool)));
	}

	/// Pop and run exactly one task, then either resubmit itself to the pool
	/// (more tasks pending) or clear the running flag (FIFO drained). This
	/// is what keeps the serializer from pinning a worker across tasks.
	fn execute_next(inner: Arc<Inner>, pool: Arc<WorkerPool>) {
		let task = {
			let mut tasks = inner.tasks.lock().unwrap();
			tasks.pop_front()
		};

		if let Some(task) = task {
			if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
				tracing::error!(target: "serializer", panic = ?payload, "Serialized task panicked");
			}
		}

		let mut tasks = inner.tasks.lock().unwrap();
		if tasks.is_empty() {
			inner.running.store(false, Ordering::Release);
		} else {
			drop(tasks);
			pool.submit(Box::new(move || Self::execute_next(inner, pool.clone())));
			return;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;

	#[test]
	fn tasks_observe_posting_order() {
		let pool = Arc::new(WorkerPool::new(4));
		let serializer = Serializer::new(pool);
		let order = Arc::new(Mutex::new(Vec::new()));

		for i in 0..20 {
			let order = order.clone();
			serializer.post(Box::new(move || {
				order.lock().unwrap().push(i);
			}));
		}

		std::thread::sleep(Duration::from_millis(200));
		let observed = order.lock().unwrap();
		let expected: Vec<i32> = (0..20).collect();
		assert_eq!(*observed, expected);
	}

	#[test]
	fn different_symbols_run_concurrently() {
		let pool = Arc::new(WorkerPool::new(4));
		let a = Serializer::new(pool.clone());
		let b = Serializer::new(pool);
		let counter = Arc::new(AtomicUsize::new(0));

		let c1 = counter.clone();
		a.post(Box::new(move || {
			std::thread::sleep(Duration::from_millis(50));
			c1.fetch_add(1, Ordering::SeqCst);
		}));
		let c2 = counter.clone();
		b.post(Box::new(move || {
			c2.fetch_add(1, Ordering::SeqCst);
		}));

		std::thread::sleep(Duration::from_millis(150));
		assert_eq!(counter.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn panicking_task_does_not_stall_the_fifo() {
		let pool = Arc::new(WorkerPool::new(2));
		let serializer = Serializer::new(pool);
		let counter = Arc::new(AtomicUsize::new(0));

		serializer.post(Box::new(|| panic!("boom")));
		let c = counter.clone();
		serializer.post(Box::new(move || {
			c.fetch_add(1, Ordering::SeqCst);
		}));

		std::thread::sleep(Duration::from_millis(100));
		assert_eq!(counter.load(Ordering::SeqCst), 1);
	}
}
