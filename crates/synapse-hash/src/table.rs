// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use crate::error::Error;
use crate::murmur::murmurhash2;

const INITIAL_SIZE: usize = 16;
const LOAD_FACTOR_EXPAND: f64 = 0.7;
const LOAD_FACTOR_SHRINK: f64 = 0.1;

#[derive(Debug, Clone)]
struct Entry<V> {
	key: String,
	value: V,
}

/// A key→value map with chained buckets and incremental (progressive)
/// rehashing: growth and shrinkage never move more than one bucket's worth
/// of entries per call, so no single operation pays for a full resize.
///
/// The two-table duality described for the original design is hidden behind
/// this type's public methods; callers never see `table0`/`table1` directly.
#[derive(Debug, Clone)]
pub struct HashTable<V> {
	seed: u32,
	table0: Vec<Vec<Entry<V>>>,
	table1: Vec<Vec<Entry<V>>>,
	count0: usize,
	count1: usize,
	/// `None` when not rehashing; otherwise the next bucket index of
	/// `table0` to migrate, counting down to 0.
	rehashing_index: Option<usize>,
}

impl<V> HashTable<V> {
	pub fn new(seed: u32) -> Self {
		Self {
			seed,
			table0: (0..INITIAL_SIZE).map(|_| Vec::new()).collect(),
			table1: Vec::new(),
			count0: 0,
			count1: 0,
			rehashing_index: None,
		}
	}

	pub fn len(&self) -> usize {
		self.count0 + self.count1
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn is_rehashing(&self) -> bool {
		self.rehashing_index.is_some()
	}

	fn bucket_index(&self, key: &str, size: usize) -> usize {
		(murmurhash2(key.as_bytes(), self.seed) as usize) % size
	}

	/// One migration step if rehashing, otherwise a threshold check that
	/// may start one. Called before every public operation.
	fn maintenance(&mut self) {
		if let Some(idx) = self.rehashing_index {
			self.rehash_step(idx);
			return;
		}

		let size0 = self.table0.len();
		if size0 == 0 {
			return;
		}
		let load = self.count0 as f64 / size0 as f64;
		if load > LOAD_FACTOR_EXPAND {
			self.begin_resize(size0 * 2);
		} else if size0 > INITIAL_SIZE && load < LOAD_FACTOR_SHRINK {
			self.begin_resize((size0 / 2).max(INITIAL_SIZE));
		}
	}

	fn begin_resize(&mut self, new_size: usize) {
		tracing::debug!(from = self.table0.len(), to = new_size, "hash table resize begins");
		self.table1 = (0..new_size).map(|_| Vec::new()).collect();
		self.count1 = 0;
		self.rehashing_index = if self.table0.is_empty() { None } else { Some(self.table0.len() - 1) };
	}

	fn rehash_step(&mut self, bucket: usize) {
		let chain = std::mem::take(&mut self.table0[bucket]);
		self.count0 -= chain.len();
		for entry in chain {
			let idx = self.bucket_index(&entry.key, self.table1.len());
			self.table1[idx].push(entry);
			self.count1 += 1;
		}
		if bucket == 0 {
			self.table0 = std::mem::take(&mut self.table1);
			self.count0 = self.count1;
			self.count1 = 0;
			self.rehashing_index = None;
			tracing::debug!(size = self.table0.len(), "hash table resize complete");
		} else {
			self.rehashing_index = Some(bucket - 1);
		}
	}

	pub fn get(&mut self, key: &str) -> Option<&V> {
		self.maintenance();
		if self.is_rehashing() {
			let idx1 = self.bucket_index(key, self.table1.len());
			if let Some(e) = self.table1[idx1].iter().find(|e| e.key == key) {
				return Some(&e.value);
			}
		}
		let idx0 = self.bucket_index(key, self.table0.len());
		self.table0[idx0].iter().find(|e| e.key == key).map(|e| &e.value)
	}

	pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
		self.maintenance();
		if self.is_rehashing() {
			let idx1 = self.bucket_index(key, self.table1.len());
			if self.table1[idx1].iter().any(|e| e.key == key) {
				return self.table1[idx1].iter_mut().find(|e| e.key == key).map(|e| &mut e.value);
			}
		}
		let idx0 = self.bucket_index(key, self.table0.len());
		self.table0[idx0].iter_mut().find(|e| e.key == key).map(|e| &mut e.value)
	}

	pub fn has(&mut self, key: &str) -> bool {
		self.get(key).is_some()
	}

	/// Inserts or overwrites, returning the previous value if any.
	pub fn set(&mut self, key: &str, value: V) -> Option<V> {
		self.maintenance();
		if self.is_rehashing() {
			let idx1 = self.bucket_index(key, self.table1.len());
			if let Some(e) = self.table1[idx1].iter_mut().find(|e| e.key == key) {
				return Some(std::mem::replace(&mut e.value, value));
			}
		}
		let idx0 = self.bucket_index(key, self.table0.len());
		if let Some(e) = self.table0[idx0].iter_mut().find(|e| e.key == key) {
			return Some(std::mem::replace(&mut e.value, value));
		}

		if self.is_rehashing() {
			let idx1 = self.bucket_index(key, self.table1.len());
			self.table1[idx1].push(Entry { key: key.to_string(), value });
			self.count1 += 1;
		} else {
			let idx0 = self.bucket_index(key, self.table0.len());
			self.table0[idx0].push(Entry { key: key.to_string(), value });
			self.count0 += 1;
		}
		None
	}

	pub fn remove(&mut self, key: &str) -> Option<V> {
		self.maintenance();
		if self.is_rehashing() {
			let idx1 = self.bucket_index(key, self.table1.len());
			if let Some(pos) = self.table1[idx1].iter().position(|e| e.key == key) {
				self.count1 -= 1;
				return Some(self.table1[idx1].remove(pos).value);
			}
		}
		let idx0 = self.bucket_index(key, self.table0.len());
		if let Some(pos) = self.table0[idx0].iter().position(|e| e.key == key) {
			self.count0 -= 1;
			return Some(self.table0[idx0].remove(pos).value);
		}
		None
	}

	pub fn rename(&mut self, old: &str, new: &str) -> Result<(), Error> {
		match self.remove(old) {
			Some(v) => {
				self.set(new, v);
				Ok(())
			}
			None => Err(Error::NoSuchKey),
		}
	}

	pub fn keys(&mut self) -> Vec<String> {
		self.maintenance();
		let mut out = Vec::with_capacity(self.len());
		for bucket in &self.table0 {
			out.extend(bucket.iter().map(|e| e.key.clone()));
		}
		if self.is_rehashing() {
			for bucket in &self.table1 {
				out.extend(bucket.iter().map(|e| e.key.clone()));
			}
		}
		out
	}

	/// Runs one incremental rehash step without performing a lookup.
	/// Used by the worker's idle tick to keep making progress even when
	/// no requests are arriving.
	pub fn tick(&mut self) {
		self.maintenance();
	}

	/// Number of buckets in `table0`, the table a bucket-bounded sweep
	/// should index into; `table1`'s matching bucket (if rehashing) is
	/// folded in by [`HashTable::bucket_keys`].
	pub fn bucket_count(&self) -> usize {
		self.table0.len()
	}

	/// Keys in `table0`'s bucket `index`, plus `table1`'s corresponding
	/// bucket while a rehash is in progress. Bounded by a single bucket's
	/// chain length rather than a full-table scan.
	pub fn bucket_keys(&self, index: usize) -> Vec<String> {
		let mut out = Vec::new();
		if !self.table0.is_empty() {
			out.extend(self.table0[index % self.table0.len()].iter().map(|e| e.key.clone()));
		}
		if self.is_rehashing() {
			out.extend(self.table1[index % self.table1.len()].iter().map(|e| e.key.clone()));
		}
		out
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_then_get_round_trips() {
		let mut t: HashTable<String> = HashTable::new(0);
		t.set("a", "1".into());
		assert_eq!(t.get("a"), Some(&"1".to_string()));
	}

	#[test]
	fn remove_then_get_is_none() {
		let mut t: HashTable<i32> = HashTable::new(0);
		t.set("a", 1);
		assert_eq!(t.remove("a"), Some(1));
		assert_eq!(t.get("a"), None);
	}

	#[test]
	fn rehash_survives_many_inserts_and_preserves_values() {
		let mut t: HashTable<usize> = HashTable::new(1);
		for i in 0..10_000 {
			t.set(&format!("key-{i}"), i);
		}
		assert_eq!(t.len(), 10_000);
		for i in 0..10_000 {
			assert_eq!(t.get(&format!("key-{i}")), Some(&i));
		}
	}

	#[test]
	fn rehash_completes_within_bounded_steps() {
		let mut t: HashTable<usize> = HashTable::new(1);
		for i in 0..100 {
			t.set(&format!("key-{i}"), i);
		}
		let mut steps = 0;
		while t.is_rehashing() {
			t.tick();
			steps += 1;
			assert!(steps < 1000, "rehash did not converge");
		}
	}

	#[test]
	fn rename_missing_key_errors() {
		let mut t: HashTable<i32> = HashTable::new(0);
		assert!(t.rename("a", "b").is_err());
	}

	#[test]
	fn rename_moves_value() {
		let mut t: HashTable<i32> = HashTable::new(0);
		t.set("a", 1);
		t.rename("a", "b").unwrap();
		assert_eq!(t.get("a"), None);
		assert_eq!(t.get("b"), Some(&1));
	}

	#[test]
	fn bucket_keys_only_returns_the_requested_bucket() {
		let mut t: HashTable<i32> = HashTable::new(0);
		for i in 0..200 {
			t.set(&format!("key-{i}"), i);
		}
		while t.is_rehashing() {
			t.tick();
		}
		let total: usize = (0..t.bucket_count()).map(|b| t.bucket_keys(b).len()).sum();
		assert_eq!(total, t.len());
	}
}