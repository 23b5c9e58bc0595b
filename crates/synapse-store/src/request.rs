// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use synapse_core::{Error, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	Get,
	Set,
	Del,
	Rename,
	LPush,
	LPop,
	RPush,
	RPop,
	LLen,
	LRange,
	HGet,
	HSet,
	HDel,
	HIncrBy,
	ZAdd,
	ZScore,
	ZCard,
	ZCount,
	ZRange,
	ZRangeByScore,
	ZRank,
	ZRem,
	ZRemRangeByScore,
	ZInterStore,
	ZUnionStore,
	Expire,
	Keys,
	FlushAll,
	Save,
	Shutdown,
	InfoDatasetMemory,
}

impl FromStr for Action {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Error> {
		use Action::*;
		Ok(match s.to_ascii_uppercase().as_str() {
			"GET" => Get,
			"SET" => Set,
			"DEL" => Del,
			"RENAME" => Rename,
			"LPUSH" => LPush,
			"LPOP" => LPop,
			"RPUSH" => RPush,
			"RPOP" => RPop,
			"LLEN" => LLen,
			"LRANGE" => LRange,
			"HGET" => HGet,
			"HSET" => HSet,
			"HDEL" => HDel,
			"HINCRBY" => HIncrBy,
			"ZADD" => ZAdd,
			"ZSCORE" => ZScore,
			"ZCARD" => ZCard,
			"ZCOUNT" => ZCount,
			"ZRANGE" => ZRange,
			"ZRANGEBYSCORE" => ZRangeByScore,
			"ZRANK" => ZRank,
			"ZREM" => ZRem,
			"ZREMRANGEBYSCORE" => ZRemRangeByScore,
			"ZINTERSTORE" => ZInterStore,
			"ZUNIONSTORE" => ZUnionStore,
			"EXPIRE" => Expire,
			"KEYS" => Keys,
			"FLUSHALL" => FlushAll,
			"SAVE" => Save,
			"SHUTDOWN" => Shutdown,
			"INFO-DATASET-MEMORY" => InfoDatasetMemory,
			_ => return Err(Error::UnknownCommand),
		})
	}
}

/// An action plus its ordered, positional arguments. Built empty and
/// appended to; both request and reply are owned by the submitter until the
/// reply is awaited.
#[derive(Debug, Clone)]
pub struct Request {
	pub action: Action,
	pub args: Vec<Value>,
}

impl Request {
	pub fn new(action: Action) -> Self {
		Self { action, args: Vec::new() }
	}

	pub fn arg(mut self, value: impl Into<Value>) -> Self {
		self.args.push(value.into());
		self
	}
}

struct Inner {
	value: Mutex<Option<Value>>,
	cond: Condvar,
}

/// A reply whose `done` flag and payload are realized as a mutex-guarded
/// slot plus condvar: the worker fulfills it once, the submitter blocks on
/// [`ReplyHandle::await_reply`] rather than spin-polling a flag.
#[derive(Clone)]
pub struct ReplyHandle {
	inner: Arc<Inner>,
}

impl ReplyHandle {
	pub(crate) fn new() -> Self {
		Self { inner: Arc::new(Inner { value: Mutex::new(None), cond: Condvar::new() }) }
	}

	pub(crate) fn fulfill(&self, value: Value) {
		let mut guard = self.inner.value.lock();
		*guard = Some(value);
		self.inner.cond.notify_one();
	}

	/// Blocks until the worker has filled this reply, then extracts the
	/// payload, consuming the `done` flag.
	pub fn await_reply(self) -> Value {
		let mut guard = self.inner.value.lock();
		while guard.is_none() {
			self.inner.cond.wait(&mut guard);
		}
		guard.take().expect("checked Some above")
	}
}