// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::Receiver;
use synapse_core::{Config, Value};
use synapse_hash::ExpiringTable;

use crate::dispatch;
use crate::persistence;
use crate::request::{Request, ReplyHandle};

fn derive_seed(config: &Config) -> u32 {
	config.hash_seed.unwrap_or_else(|| {
		SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.subsec_nanos()).unwrap_or(0)
	})
}

/// The single consuming loop: owns the table exclusively, so every
/// request is serialized without any lock around the data itself.
///
/// Dispatch and the idle rehash/expiry sweep share one `recv_timeout` call:
/// when no request arrives within the idle-backoff window the loop performs
/// one maintenance tick instead of busy-spinning on an empty mailbox.
pub fn run(config: Config, rx: Receiver<(Request, ReplyHandle)>, running: Arc<AtomicBool>) {
	let seed = derive_seed(&config);
	let mut table: ExpiringTable<Value> = ExpiringTable::new(seed);
	let mut zset_seed = seed as u64;

	if let Err(e) = persistence::load(&config.snapshot_path, &mut table) {
		tracing::error!(error = %e, path = %config.snapshot_path.display(), "snapshot load failed");
	}

	let mut idle_since = Instant::now();
	loop {
		let timeout = config.idle_backoff.sleep_for(idle_since.elapsed()).max(std::time::Duration::from_millis(1));
		match rx.recv_timeout(timeout) {
			Ok((request, reply)) => {
				idle_since = Instant::now();
				let outcome = dispatch::handle(&mut table, &config, &request, &mut zset_seed);
				reply.fulfill(outcome.reply);
				if outcome.stop {
					break;
				}
			}
			Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
				table.sweep_tick();
			}
			Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
		}
	}

	running.store(false, Ordering::SeqCst);
}