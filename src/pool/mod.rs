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

//! Fixed-size worker pool draining a shared task queue.
//!
//! The pool itself provides no ordering between tasks — per-symbol
//! ordering is the serializer's job (`pool::serializer`).

pub mod serializer;

pub use serializer::Serializer;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{error, info, warn};

pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
	tasks: Mutex<VecDeque<Task>>,
	condvar: Condvar,
	stop: AtomicBool,
}

/// A fixed set of worker threads draining a shared FIFO task queue.
pub struct WorkerPool {
	shared: Arc<Shared>,
	workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
	pub fn new(size: usize) -> Self {
		let size = size.max(1);
		let shared = Arc::new(Shared {
			tasks: Mutex::new(VecDeque::new()),
			condvar: Condvar::new(),
			stop: AtomicBool::new(false),
		});

		let workers = (0..size)
			.map(|idx| {
				let shared = shared.clone();
				thread::Builder::new()
					.name(format!("worker-{idx}"))
					.spawn(move || Self::worker_loop(shared))
					.expect("failed to spawn worker thread")
			})
			.collect();

		info!(target: "pool", size, "Worker pool started");
		Self { shared, workers }
	}

	fn worker_loop(shared: Arc<Shared>) {
		loop {
			let task = {
				let mut tasks = shared.tasks.lock().unwrap();
				loop {
					if let Some(task) = tasks.pop_front() {
						break Some(task);
					}
					if shared.stop.load(Ordering::Acquire) {
						break None;
					}
					tasks = shared.condvar.wait(tasks).unwrap();
				}
			};

			let Some(task) = task else {
				break;
			};

			if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
				error!(target: "pool", panic = ?payload, "Worker task panicked");
			}
		}
	}

	/// Enqueue a unit of work and wake one worker. Silently dropped if the
	/// pool is shutting down.
	pub fn submit(&self, task: Task) {
		if self.shared.stop.load(Ordering::Acquire) {
			return;
		}
		let mut tasks = self.shared.tasks.lock().unwrap();
		if self.shared.stop.load(Ordering::Acquire) {
			return;
		}
		tasks.push_back(task);
		self.shared.condvar.notify_one();
	}

	/// Stop accepting new tasks, let every worker drain its current task and
	/// any already-queued ones, then join all workers.
	pub fn shutdown(&mut self) {
		info!(target: "pool", "Shutting down worker pool");
		self.shared.stop.store(true, Ordering::Release);
		self.shared.condvar.notify_all();
		for worker in self.workers.drain(..) {
			if let Err(e) = worker.join() {
				warn!(target: "pool", error = ?e, "Worker thread panicked during shutdown");
			}
		}
	}
}

impl Drop for WorkerPool {
	fn drop(&mut self) {
		if !self.workers.is_empty() {
			self.shutdown();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;

	#[test]
	fn submitted_tasks_all_run() {
		let pool = WorkerPool::new(4);
		let counter = Arc::new(AtomicUsize::new(0));
		for _ in 0..50 {
			let counter = counter.clone();
			pool.submit(Box::new(move || {
				counter.fetch_add(1, Ordering::SeqCst);
			}));
		}
		thread::sleep(Duration::from_millis(200));
		assert_eq!(counter.load(Ordering::SeqCst), 50);
	}

	#[test]
	fn panicking_task_does_not_stop_the_pool() {
		let pool = WorkerPool::new(2);
		let counter = Arc::new(AtomicUsize::new(0));

		pool.submit(Box::new(|| panic!("boom")));

		let counter_clone = counter.clone();
		pool.submit(Box::new(move || {
			counter_clone.fetch_add(1, Ordering::SeqCst);
		}));

		thread::sleep(Duration::from_millis(200));
		assert_eq!(counter.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn tasks_submitted_after_shutdown_are_dropped() {
		let mut pool = WorkerPool::new(1);
		pool.shutdown();
		let counter = Arc::new(AtomicUsize::new(0));
		let counter_clone = counter.clone();
		pool.submit(Box::new(move || {
			counter_clone.fetch_add(1, Ordering::SeqCst);
		}));
		thread::sleep(Duration::from_millis(50));
		assert_eq!(counter.load(Ordering::SeqCst), 0);
	}
}
