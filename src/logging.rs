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

//! Structured logging bootstrap: a rolling, non-blocking file appender plus
//! an optional console mirror, both driven by `tracing-subscriber`'s
//! `EnvFilter`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::{LOG_COMPONENT_NAME, MatchingConfig};

/// Initialize global `tracing` subscription for the process.
///
/// Returns a `WorkerGuard` that must be held for the process lifetime —
/// dropping it flushes and stops the background writer thread, so dropping
/// it early silently truncates the log.
pub fn init_logging(config: &MatchingConfig) -> WorkerGuard {
	let file_appender = tracing_appender::rolling::daily(&config.log_directory, format!("{LOG_COMPONENT_NAME}.log"));
	let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

	let env_filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_LEVEL));

	let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

	let registry = tracing_subscriber::registry().with(env_filter).with(file_layer);

	if config.log_to_console {
		let console_layer = fmt::layer().with_writer(std::io::stdout);
		let _ = registry.with(console_layer).try_init();
	} else {
		let _ = registry.try_init();
	}

	guard
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn init_logging_does_not_panic() {
		let dir = tempfile::tempdir().unwrap();
		let mut config = MatchingConfig::default();
		config.log_directory = dir.path().display().to_string();
		// `try_init` is used (not `init`) precisely so this is safe to call
		// more than once across the test binary's threads.
		let _guard = init_logging(&config);
	}
}
