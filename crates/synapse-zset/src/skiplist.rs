// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Error;

pub const MAX_LEVEL: usize = 32;
const P: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
	Sum,
	Min,
	Max,
}

impl Aggregate {
	fn combine(self, acc: f64, next: f64) -> f64 {
		match self {
			Aggregate::Sum => acc + next,
			Aggregate::Min => acc.min(next),
			Aggregate::Max => acc.max(next),
		}
	}
}

#[derive(Debug, Clone)]
struct Node {
	score: f64,
	member: String,
	forward: Vec<Option<usize>>,
	backward: Option<usize>,
}

fn cmp_key(score_a: f64, member_a: &str, score_b: f64, member_b: &str) -> Ordering {
	match score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal) {
		Ordering::Equal => member_a.cmp(member_b),
		other => other,
	}
}

/// Score-ordered set of (score, member) pairs.
///
/// Elements live in a slab (`arena`); the member→index dictionary never
/// owns a second copy of an element's identity, only a lookup key, so
/// removing a dict entry can never leave a dangling or doubly-freed
/// element the way the source's direct member-string sharing could.
#[derive(Debug, Clone)]
pub struct ZSet {
	arena: Vec<Option<Node>>,
	free: Vec<usize>,
	head: Vec<Option<usize>>,
	tail: Option<usize>,
	level: usize,
	dict: HashMap<String, usize>,
	rng: StdRng,
}

impl ZSet {
	pub fn new(seed: u64) -> Self {
		Self {
			arena: Vec::new(),
			free: Vec::new(),
			head: vec![None; MAX_LEVEL],
			tail: None,
			level: 1,
			dict: HashMap::new(),
			rng: StdRng::seed_from_u64(seed),
		}
	}

	fn node(&self, idx: usize) -> &Node {
		self.arena[idx].as_ref().expect("arena slot must be occupied")
	}

	fn forward_at(&self, pos: Option<usize>, level: usize) -> Option<usize> {
		match pos {
			None => self.head.get(level).copied().flatten(),
			Some(idx) => self.node(idx).forward.get(level).copied().flatten(),
		}
	}

	fn set_forward(&mut self, pos: Option<usize>, level: usize, value: Option<usize>) {
		match pos {
			None => self.head[level] = value,
			Some(idx) => self.arena[idx].as_mut().unwrap().forward[level] = value,
		}
	}

	fn random_level(&mut self) -> usize {
		let mut level = 1;
		while level < MAX_LEVEL && self.rng.random::<f64>() < P {
			level += 1;
		}
		level
	}

	fn alloc(&mut self, node: Node) -> usize {
		if let Some(idx) = self.free.pop() {
			self.arena[idx] = Some(node);
			idx
		} else {
			self.arena.push(Some(node));
			self.arena.len() - 1
		}
	}

	fn free_node(&mut self, idx: usize) {
		self.arena[idx] = None;
		self.free.push(idx);
	}

	/// Predecessor at every level below `self.level` for the given key.
	fn find_update(&self, score: f64, member: &str) -> Vec<Option<usize>> {
		let mut update = vec![None; self.level];
		let mut cur: Option<usize> = None;
		for i in (0..self.level).rev() {
			loop {
				match self.forward_at(cur, i) {
					Some(next_idx) => {
						let n = self.node(next_idx);
						if cmp_key(n.score, &n.member, score, member) == Ordering::Less {
							cur = Some(next_idx);
							continue;
						}
						break;
					}
					None => break,
				}
			}
			update[i] = cur;
		}
		update
	}

	pub fn card(&self) -> usize {
		self.dict.len()
	}

	pub fn score(&self, member: &str) -> Option<f64> {
		self.dict.get(member).map(|&idx| self.node(idx).score)
	}

	/// Removes any existing element for `member`, then inserts a fresh
	/// one at `score`. Returns the set's new cardinality.
	pub fn zadd(&mut self, score: f64, member: &str) -> Result<usize, Error> {
		if !score.is_finite() {
			tracing::warn!(score, member, "rejected non-finite score");
			return Err(Error::InvalidScore(score));
		}
		self.unlink(member);

		let update = self.find_update(score, member);
		let new_level = self.random_level();
		let mut update = update;
		if new_level > self.level {
			update.resize(new_level, None);
			self.level = new_level;
		}

		let idx = self.alloc(Node { score, member: member.to_string(), forward: vec![None; new_level], backward: None });

		for i in 0..new_level {
			let pred = update.get(i).copied().flatten();
			let succ = self.forward_at(pred, i);
			self.set_forward(pred, i, Some(idx));
			self.arena[idx].as_mut().unwrap().forward[i] = succ;
		}

		let pred0 = update.first().copied().flatten();
		self.arena[idx].as_mut().unwrap().backward = pred0;
		let succ0 = self.node(idx).forward[0];
		match succ0 {
			Some(s) => self.arena[s].as_mut().unwrap().backward = Some(idx),
			None => self.tail = Some(idx),
		}

		self.dict.insert(member.to_string(), idx);
		Ok(self.card())
	}

	/// Unlinks and frees `member`'s element, if present. Returns whether
	/// a removal happened.
	pub fn zrem(&mut self, member: &str) -> bool {
		self.unlink(member)
	}

	fn unlink(&mut self, member: &str) -> bool {
		let idx = match self.dict.remove(member) {
			Some(idx) => idx,
			None => return false,
		};
		let score = self.node(idx).score;
		let node_level = self.node(idx).forward.len();
		let update = self.find_update(score, member);

		for i in 0..node_level {
			let succ = self.node(idx).forward[i];
			let pred = update.get(i).copied().flatten();
			self.set_forward(pred, i, succ);
		}

		let succ0 = self.node(idx).forward[0];
		let pred0 = self.node(idx).backward;
		match succ0 {
			Some(s) => self.arena[s].as_mut().unwrap().backward = pred0,
			None => self.tail = pred0,
		}

		while self.level > 1 && self.head[self.level - 1].is_none() {
			self.level -= 1;
		}

		self.free_node(idx);
		true
	}

	fn iter_bottom(&self) -> impl Iterator<Item = (&str, f64)> {
		let mut cur = self.forward_at(None, 0);
		std::iter::from_fn(move || {
			let idx = cur?;
			let n = self.node(idx);
			cur = n.forward[0];
			Some((n.member.as_str(), n.score))
		})
	}

	/// Index-based range over the bottom list, `[start, stop]` inclusive;
	/// `stop` clamps to `card() - 1`. `None` when `start > stop` or out
	/// of range, matching list range semantics.
	pub fn zrange(&self, start: usize, stop: usize) -> Option<Vec<(String, f64)>> {
		let len = self.card();
		if len == 0 || start >= len || start > stop {
			return None;
		}
		let stop = stop.min(len - 1);
		Some(self.iter_bottom().skip(start).take(stop - start + 1).map(|(m, s)| (m.to_string(), s)).collect())
	}

	pub fn zrank(&self, member: &str) -> Option<usize> {
		self.iter_bottom().position(|(m, _)| m == member)
	}

	fn first_at_or_above(&self, min: f64, incl_min: bool) -> Option<usize> {
		let mut cur: Option<usize> = None;
		for i in (0..self.level).rev() {
			loop {
				match self.forward_at(cur, i) {
					Some(next_idx) => {
						let n = self.node(next_idx);
						let still_below = if incl_min { n.score < min } else { n.score <= min };
						if still_below {
							cur = Some(next_idx);
							continue;
						}
						break;
					}
					None => break,
				}
			}
		}
		self.forward_at(cur, 0)
	}

	fn within_upper(score: f64, max: f64, incl_max: bool) -> bool {
		if incl_max { score <= max } else { score < max }
	}

	pub fn zrangebyscore(&self, min: f64, incl_min: bool, max: f64, incl_max: bool) -> Vec<(String, f64)> {
		if min >= max {
			return Vec::new();
		}
		let mut out = Vec::new();
		let mut cur = self.first_at_or_above(min, incl_min);
		while let Some(idx) = cur {
			let n = self.node(idx);
			if !Self::within_upper(n.score, max, incl_max) {
				break;
			}
			out.push((n.member.clone(), n.score));
			cur = n.forward[0];
		}
		out
	}

	/// Count of elements with score in the interval. Returns 0 when
	/// `min >= max`, per the documented contract (not just "no
	/// elements found").
	pub fn zcount(&self, min: f64, incl_min: bool, max: f64, incl_max: bool) -> usize {
		if min >= max {
			return 0;
		}
		self.zrangebyscore(min, incl_min, max, incl_max).len()
	}

	pub fn zremrangebyscore(&mut self, min: f64, incl_min: bool, max: f64, incl_max: bool) -> usize {
		let victims: Vec<String> = self.zrangebyscore(min, incl_min, max, incl_max).into_iter().map(|(m, _)| m).collect();
		let mut removed = 0;
		for member in victims {
			if self.unlink(&member) {
				removed += 1;
			}
		}
		removed
	}
}

/// Builds a new set from the intersection of `sets`, weighting each input's
/// score by the matching entry in `weights` before aggregating.
pub fn zinterstore(sets: &[&ZSet], weights: &[f64], aggregate: Aggregate, seed: u64) -> Result<ZSet, Error> {
	let mut out = ZSet::new(seed);
	if sets.is_empty() {
		return Ok(out);
	}
	let (smallest_idx, _) = sets.iter().enumerate().min_by_key(|(_, s)| s.card()).unwrap();

	'members: for (member, _) in sets[smallest_idx].iter_bottom() {
		let mut combined: Option<f64> = None;
		for (i, set) in sets.iter().enumerate() {
			let raw = match set.score(member) {
				Some(s) => s,
				None => continue 'members,
			};
			let weighted = raw * weights.get(i).copied().unwrap_or(1.0);
			combined = Some(match combined {
				None => weighted,
				Some(acc) => aggregate.combine(acc, weighted),
			});
		}
		if let Some(score) = combined {
			out.zadd(score, member)?;
		}
	}
	Ok(out)
}

/// Builds a new set from the union of `sets`, weighting each input's score
/// by the matching entry in `weights` before aggregating.
pub fn zunionstore(sets: &[&ZSet], weights: &[f64], aggregate: Aggregate, seed: u64) -> Result<ZSet, Error> {
	let mut acc: HashMap<String, f64> = HashMap::new();
	for (i, set) in sets.iter().enumerate() {
		let weight = weights.get(i).copied().unwrap_or(1.0);
		for (member, score) in set.iter_bottom() {
			let weighted = score * weight;
			acc.entry(member.to_string())
				.and_modify(|e| *e = aggregate.combine(*e, weighted))
				.or_insert(weighted);
		}
	}
	let mut out = ZSet::new(seed);
	for (member, score) in acc {
		out.zadd(score, &member)?;
	}
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zadd_reorders_and_zrange_reflects_score_order() {
		let mut z = ZSet::new(1);
		z.zadd(1.0, "a").unwrap();
		z.zadd(2.0, "b").unwrap();
		z.zadd(2.0, "a").unwrap();
		assert_eq!(z.zrange(0, usize::MAX), Some(vec![("a".into(), 2.0), ("b".into(), 2.0)]));
	}

	#[test]
	fn zadd_rejects_non_finite_score() {
		let mut z = ZSet::new(1);
		assert!(z.zadd(f64::NAN, "a").is_err());
		assert!(z.zadd(f64::INFINITY, "a").is_err());
		assert_eq!(z.card(), 0);
	}

	#[test]
	fn zcard_matches_dict_and_bottom_list() {
		let mut z = ZSet::new(1);
		for i in 0..50 {
			z.zadd(i as f64, &format!("m{i}")).unwrap();
		}
		assert_eq!(z.card(), 50);
		assert_eq!(z.zrange(0, usize::MAX).unwrap().len(), 50);
	}

	#[test]
	fn zrem_then_zscore_is_none() {
		let mut z = ZSet::new(1);
		z.zadd(1.0, "a").unwrap();
		assert!(z.zrem("a"));
		assert!(!z.zrem("a"));
		assert_eq!(z.score("a"), None);
	}

	#[test]
	fn zrangebyscore_respects_bounds_and_inclusivity() {
		let mut z = ZSet::new(1);
		for i in 0..10 {
			z.zadd(i as f64, &format!("m{i}")).unwrap();
		}
		let result = z.zrangebyscore(2.0, true, 5.0, false);
		let members: Vec<_> = result.into_iter().map(|(m, _)| m).collect();
		assert_eq!(members, vec!["m2", "m3", "m4"]);
	}

	#[test]
	fn zcount_empty_interval_is_zero() {
		let mut z = ZSet::new(1);
		z.zadd(1.0, "a").unwrap();
		assert_eq!(z.zcount(5.0, true, 1.0, true), 0);
	}

	#[test]
	fn zinterstore_sums_weighted_scores_for_common_members() {
		let mut a = ZSet::new(1);
		a.zadd(1.0, "x").unwrap();
		a.zadd(2.0, "y").unwrap();
		let mut b = ZSet::new(2);
		b.zadd(10.0, "x").unwrap();
		b.zadd(20.0, "z").unwrap();

		let out = zinterstore(&[&a, &b], &[2.0, 3.0], Aggregate::Sum, 3).unwrap();
		assert_eq!(out.card(), 1);
		assert_eq!(out.score("x"), Some(2.0 * 1.0 + 3.0 * 10.0));
	}

	#[test]
	fn zunionstore_includes_every_member_once() {
		let mut a = ZSet::new(1);
		a.zadd(1.0, "x").unwrap();
		let mut b = ZSet::new(2);
		b.zadd(5.0, "x").unwrap();
		b.zadd(7.0, "y").unwrap();

		let out = zunionstore(&[&a, &b], &[1.0, 1.0], Aggregate::Max, 3).unwrap();
		assert_eq!(out.card(), 2);
		assert_eq!(out.score("x"), Some(5.0));
		assert_eq!(out.score("y"), Some(7.0));
	}

	#[test]
	fn zrank_reflects_position_in_bottom_list() {
		let mut z = ZSet::new(1);
		z.zadd(1.0, "a").unwrap();
		z.zadd(2.0, "b").unwrap();
		z.zadd(3.0, "c").unwrap();
		assert_eq!(z.zrank("b"), Some(1));
		assert_eq!(z.zrank("missing"), None);
	}

	#[test]
	fn large_insert_preserves_sorted_order() {
		let mut z = ZSet::new(7);
		for i in (0..2000).rev() {
			z.zadd(i as f64, &format!("m{i}")).unwrap();
		}
		let range = z.zrange(0, usize::MAX).unwrap();
		for w in range.windows(2) {
			assert!(w[0].1 <= w[1].1);
		}
	}
}