// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::Error;
use crate::table::HashTable;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_epoch_secs() -> u64 {
	SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// A primary table paired with a sibling table of key→expiry-epoch-seconds.
///
/// A key with an expiry entry `<= now` is logically absent even though its
/// primary entry still physically exists; it is evicted lazily on access and
/// by the rolling sweep driven by [`ExpiringTable::sweep_tick`].
pub struct ExpiringTable<V> {
	primary: HashTable<V>,
	expires: HashTable<u64>,
	sweep_cursor: usize,
}

impl<V> ExpiringTable<V> {
	pub fn new(seed: u32) -> Self {
		Self { primary: HashTable::new(seed), expires: HashTable::new(seed), sweep_cursor: 0 }
	}

	fn is_expired(&mut self, key: &str) -> bool {
		matches!(self.expires.get(key), Some(&exp) if exp <= now_epoch_secs())
	}

	fn evict_if_expired(&mut self, key: &str) {
		if self.is_expired(key) {
			self.primary.remove(key);
			self.expires.remove(key);
		}
	}

	pub fn get(&mut self, key: &str) -> Option<&V> {
		self.evict_if_expired(key);
		self.primary.get(key)
	}

	pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
		self.evict_if_expired(key);
		self.primary.get_mut(key)
	}

	pub fn has(&mut self, key: &str) -> bool {
		self.get(key).is_some()
	}

	/// Inserting always clears any existing TTL for the key (§9 Open
	/// Question, resolved in favor of Redis semantics).
	pub fn set(&mut self, key: &str, value: V) -> Option<V> {
		self.expires.remove(key);
		self.primary.set(key, value)
	}

	pub fn remove(&mut self, key: &str) -> Option<V> {
		self.expires.remove(key);
		self.primary.remove(key)
	}

	pub fn rename(&mut self, old: &str, new: &str) -> Result<(), Error> {
		self.evict_if_expired(old);
		self.expires.remove(new);
		if let Some(exp) = self.expires.remove(old) {
			self.expires.set(new, exp);
		}
		self.primary.rename(old, new)
	}

	/// Sets a TTL of `seconds` from now. Returns `false` if the key is
	/// absent.
	pub fn expire(&mut self, key: &str, seconds: u64) -> bool {
		if !self.has(key) {
			return false;
		}
		self.expires.set(key, now_epoch_secs() + seconds);
		true
	}

	pub fn len(&self) -> usize {
		self.primary.len()
	}

	/// Keys with no expiry entry, or an expiry strictly in the future.
	/// Does not itself evict; relies on the sweep/lazy-eviction to keep
	/// entries honest over time.
	pub fn keys(&mut self) -> Vec<String> {
		let now = now_epoch_secs();
		let candidates = self.primary.keys();
		candidates
			.into_iter()
			.filter(|k| !matches!(self.expires.get(k), Some(&exp) if exp <= now))
			.collect()
	}

	/// One bounded step of the expiration sweep, called once per idle
	/// worker tick with a rolling cursor over bucket indices: each tick
	/// walks exactly one bucket's chain of the expiry table rather than
	/// materializing every TTL-bearing key.
	pub fn sweep_tick(&mut self) {
		self.primary.tick();
		self.expires.tick();

		let bucket_count = self.expires.bucket_count();
		if bucket_count == 0 {
			self.sweep_cursor = 0;
			return;
		}
		if self.sweep_cursor >= bucket_count {
			self.sweep_cursor = 0;
		}
		for key in self.expires.bucket_keys(self.sweep_cursor) {
			self.evict_if_expired(&key);
		}
		self.sweep_cursor = (self.sweep_cursor + 1) % bucket_count;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_then_get_round_trips() {
		let mut t: ExpiringTable<String> = ExpiringTable::new(0);
		t.set("k", "v".into());
		assert_eq!(t.get("k"), Some(&"v".to_string()));
	}

	#[test]
	fn expire_in_the_past_makes_key_absent() {
		let mut t: ExpiringTable<String> = ExpiringTable::new(0);
		t.set("k", "v".into());
		t.expires.set("k", 0);
		assert_eq!(t.get("k"), None);
		assert!(!t.keys().contains(&"k".to_string()));
	}

	#[test]
	fn set_clears_previous_ttl() {
		let mut t: ExpiringTable<String> = ExpiringTable::new(0);
		t.set("k", "v".into());
		t.expire("k", 100);
		t.set("k", "v2".into());
		assert_eq!(t.expires.get("k"), None);
	}

	#[test]
	fn expire_on_missing_key_returns_false() {
		let mut t: ExpiringTable<String> = ExpiringTable::new(0);
		assert!(!t.expire("missing", 10));
	}

	#[test]
	fn sweep_tick_eventually_evicts_expired_key() {
		let mut t: ExpiringTable<String> = ExpiringTable::new(0);
		t.set("k", "v".into());
		t.expires.set("k", now_epoch_secs().saturating_sub(1));
		for _ in 0..t.expires.bucket_count() {
			t.sweep_tick();
		}
		assert_eq!(t.primary.get("k"), None);
	}
}