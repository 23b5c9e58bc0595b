// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod dispatch;
mod persistence;
mod request;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use synapse_core::{Config, Error, Value};

pub use request::{Action, ReplyHandle, Request};

/// Handle to a running store worker thread.
///
/// Every request is serialized through a single mailbox; `Store` itself
/// holds no data, only the sender half and the thread handle.
pub struct Store {
	tx: crossbeam_channel::Sender<(Request, ReplyHandle)>,
	running: Arc<AtomicBool>,
	handle: Option<JoinHandle<()>>,
}

impl Store {
	pub fn start(config: Config) -> Self {
		let (tx, rx) = crossbeam_channel::unbounded();
		let running = Arc::new(AtomicBool::new(true));
		let running_for_worker = running.clone();
		let handle = std::thread::Builder::new()
			.name("synapse-store".into())
			.spawn(move || worker::run(config, rx, running_for_worker))
			.expect("spawn store worker thread");
		Self { tx, running, handle: Some(handle) }
	}

	pub fn is_running(&self) -> bool {
		self.running.load(Ordering::SeqCst)
	}

	/// Enqueues `request` and returns a handle the caller can await later,
	/// without blocking on the worker's response.
	pub fn submit(&self, request: Request) -> Result<ReplyHandle, Error> {
		if !self.is_running() {
			return Err(Error::DatabaseClosed);
		}
		let reply = ReplyHandle::new();
		self.tx.send((request, reply.clone())).map_err(|_| Error::DatabaseClosed)?;
		Ok(reply)
	}

	pub fn submit_sync(&self, request: Request) -> Value {
		match self.submit(request) {
			Ok(reply) => reply.await_reply(),
			Err(e) => Value::Error(e.to_string()),
		}
	}

	pub fn get(&self, key: &str) -> Value {
		self.submit_sync(Request::new(Action::Get).arg(key))
	}

	pub fn set(&self, key: &str, value: &str) -> Value {
		self.submit_sync(Request::new(Action::Set).arg(key).arg(value))
	}

	pub fn del(&self, keys: &[&str]) -> Value {
		let mut request = Request::new(Action::Del);
		for k in keys {
			request = request.arg(*k);
		}
		self.submit_sync(request)
	}

	pub fn lpush(&self, key: &str, values: &[&str]) -> Value {
		let mut request = Request::new(Action::LPush).arg(key);
		for v in values {
			request = request.arg(*v);
		}
		self.submit_sync(request)
	}

	pub fn rpush(&self, key: &str, values: &[&str]) -> Value {
		let mut request = Request::new(Action::RPush).arg(key);
		for v in values {
			request = request.arg(*v);
		}
		self.submit_sync(request)
	}

	pub fn lrange(&self, key: &str, start: u32, stop: u32) -> Value {
		self.submit_sync(Request::new(Action::LRange).arg(key).arg(start.to_string()).arg(stop.to_string()))
	}

	pub fn hset(&self, key: &str, field: &str, value: &str) -> Value {
		self.submit_sync(Request::new(Action::HSet).arg(key).arg(field).arg(value))
	}

	pub fn hget(&self, key: &str, field: &str) -> Value {
		self.submit_sync(Request::new(Action::HGet).arg(key).arg(field))
	}

	pub fn hincrby(&self, key: &str, field: &str, delta: i32) -> Value {
		self.submit_sync(Request::new(Action::HIncrBy).arg(key).arg(field).arg(delta.to_string()))
	}

	pub fn zadd(&self, key: &str, score: f64, member: &str) -> Value {
		self.submit_sync(Request::new(Action::ZAdd).arg(key).arg(score.to_string()).arg(member))
	}

	pub fn zrange(&self, key: &str, start: u32, stop: u32) -> Value {
		self.submit_sync(Request::new(Action::ZRange).arg(key).arg(start.to_string()).arg(stop.to_string()))
	}

	pub fn keys(&self, pattern: Option<&str>) -> Value {
		let mut request = Request::new(Action::Keys);
		if let Some(pattern) = pattern {
			request = request.arg(pattern);
		}
		self.submit_sync(request)
	}

	pub fn expire(&self, key: &str, seconds: u64) -> Value {
		self.submit_sync(Request::new(Action::Expire).arg(key).arg(seconds.to_string()))
	}

	pub fn flushall(&self) -> Value {
		self.submit_sync(Request::new(Action::FlushAll))
	}

	pub fn save(&self) -> Value {
		self.submit_sync(Request::new(Action::Save))
	}

	/// Asks the worker to snapshot and stop, then joins its thread.
	/// Idempotent: calling it again after the thread has already joined
	/// is a no-op.
	pub fn shutdown(&mut self) {
		if let Some(handle) = self.handle.take() {
			let _ = self.submit_sync(Request::new(Action::Shutdown));
			let _ = handle.join();
		}
	}
}

impl Drop for Store {
	fn drop(&mut self) {
		self.shutdown();
	}
}