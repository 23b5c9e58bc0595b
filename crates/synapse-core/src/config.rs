// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::path::PathBuf;
use std::time::Duration;

/// Idle back-off ramp for the worker: sleep grows linearly from zero towards
/// `max_sleep` over `ramp`, once idleness has exceeded `threshold`.
#[derive(Debug, Clone)]
pub struct IdleBackoffConfig {
	pub threshold: Duration,
	pub ramp: Duration,
	pub max_sleep: Duration,
}

impl Default for IdleBackoffConfig {
	fn default() -> Self {
		Self {
			threshold: Duration::from_millis(100),
			ramp: Duration::from_secs(5 * 60),
			max_sleep: Duration::from_secs(1),
		}
	}
}

impl IdleBackoffConfig {
	/// Sleep duration for the given continuous idle duration.
	pub fn sleep_for(&self, idle_for: Duration) -> Duration {
		if idle_for <= self.threshold {
			return Duration::ZERO;
		}
		let elapsed = idle_for - self.threshold;
		if elapsed >= self.ramp {
			return self.max_sleep;
		}
		let frac = elapsed.as_secs_f64() / self.ramp.as_secs_f64();
		Duration::from_secs_f64(self.max_sleep.as_secs_f64() * frac)
	}
}

#[derive(Debug, Clone)]
pub struct Config {
	/// 32-bit hash seed. `None` means derive from wall-clock time at start.
	pub hash_seed: Option<u32>,
	pub snapshot_path: PathBuf,
	pub idle_backoff: IdleBackoffConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			hash_seed: None,
			snapshot_path: PathBuf::from("db.json"),
			idle_backoff: IdleBackoffConfig::default(),
		}
	}
}