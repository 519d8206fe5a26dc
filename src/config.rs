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

//! Configuration for the engine's own tunables (worker count, queue
//! capacities, logging). Values belonging to out-of-scope collaborators
//! (bind addresses, CSV input paths) deliberately have no home here.

use serde::{Deserialize, Serialize};

/// Component name used as the `tracing` target prefix and log file stem.
pub const LOG_COMPONENT_NAME: &str = "matching";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
	/// Number of worker threads in the shared pool. Defaults to the host's
	/// available parallelism.
	pub worker_threads: usize,
	/// Capacity of the bounded channel between the matching engine and the
	/// event writer.
	pub event_queue_capacity: usize,
	/// Maximum events per committed batch.
	pub event_batch_size: usize,
	/// Maximum time a non-empty batch waits before being flushed.
	pub event_batch_timeout_ms: u64,
	/// Directory the event writer's file sinks are created under.
	pub log_directory: String,
	/// `tracing` log level filter (e.g. `"info"`, `"debug"`).
	pub log_level: String,
	/// Mirror logs to stdout in addition to the rolling file appender.
	pub log_to_console: bool,
	/// Emit verbose (`debug`) logging from the pool, serializer, and writer.
	pub verbose_logging: bool,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			worker_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4),
			event_queue_capacity: 4096,
			event_batch_size: 100,
			event_batch_timeout_ms: 100,
			log_directory: "logs/matching".to_string(),
			log_level: DEFAULT_LOG_LEVEL.to_string(),
			log_to_console: DEFAULT_LOG_TO_CONSOLE,
			verbose_logging: false,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from a TOML or JSON file, falling back to
	/// defaults for any field the file omits.
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let settings = config::Config::builder()
			.add_source(config::File::with_name(path).required(false))
			.build()?;
		settings.try_deserialize()
	}

	/// Load configuration from environment variables prefixed `MATCHING_`
	/// (e.g. `MATCHING_WORKER_THREADS=8`), falling back to defaults.
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let settings = config::Config::builder()
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;
		settings.try_deserialize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_worker_threads_is_positive() {
		assert!(MatchingConfig::default().worker_threads > 0);
	}

	#[test]
	fn from_env_falls_back_to_defaults_without_overrides() {
		let config = MatchingConfig::from_env().unwrap();
		assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
	}
}
