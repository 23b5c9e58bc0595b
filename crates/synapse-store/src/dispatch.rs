// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use synapse_core::{match_keys, string_to_int, string_to_uint, Config, Error, List, Value};
use synapse_hash::{ExpiringTable, HashTable};
use synapse_zset::{zinterstore, zunionstore, Aggregate, ZSet};

use crate::request::{Action, Request};

pub struct Outcome {
	pub reply: Value,
	pub stop: bool,
}

fn ok(value: Value) -> Outcome {
	Outcome { reply: value, stop: false }
}

fn err(e: Error) -> Outcome {
	Outcome { reply: Value::Error(e.to_string()), stop: false }
}

fn arg_str(args: &[Value], idx: usize) -> Result<&str, Error> {
	args.get(idx).and_then(Value::as_str).ok_or(Error::WrongArguments)
}

fn arg_uint(args: &[Value], idx: usize) -> Result<u32, Error> {
	string_to_uint(arg_str(args, idx)?).ok_or(Error::SyntaxError)
}

fn arg_int(args: &[Value], idx: usize) -> Result<i32, Error> {
	string_to_int(arg_str(args, idx)?).ok_or(Error::SyntaxError)
}

/// Parses a ZCOUNT/ZRANGEBYSCORE/ZREMRANGEBYSCORE bound: a leading `(`
/// marks the bound exclusive, following the familiar score-range convention.
fn parse_bound(raw: &str) -> Result<(f64, bool), Error> {
	if let Some(rest) = raw.strip_prefix('(') {
		rest.parse::<f64>().map(|v| (v, false)).map_err(|_| Error::SyntaxError)
	} else {
		raw.parse::<f64>().map(|v| (v, true)).map_err(|_| Error::SyntaxError)
	}
}

fn with_list<'a>(table: &'a mut ExpiringTable<Value>, key: &str) -> Result<Option<&'a mut List>, Error> {
	match table.get_mut(key) {
		None => Ok(None),
		Some(Value::List(l)) => Ok(Some(l)),
		Some(_) => Err(Error::WrongType),
	}
}

fn with_hash<'a>(table: &'a mut ExpiringTable<Value>, key: &str) -> Result<Option<&'a mut HashTable<Value>>, Error> {
	match table.get_mut(key) {
		None => Ok(None),
		Some(Value::Hash(h)) => Ok(Some(h)),
		Some(_) => Err(Error::WrongType),
	}
}

fn with_zset<'a>(table: &'a mut ExpiringTable<Value>, key: &str) -> Result<Option<&'a mut ZSet>, Error> {
	match table.get_mut(key) {
		None => Ok(None),
		Some(Value::SortedSet(z)) => Ok(Some(z)),
		Some(_) => Err(Error::WrongType),
	}
}

pub fn handle(table: &mut ExpiringTable<Value>, config: &Config, request: &Request, zset_seed: &mut u64) -> Outcome {
	let args = &request.args;
	let stop = request.action == Action::Shutdown;
	match dispatch(table, config, request.action, args, zset_seed) {
		Ok(value) => Outcome { reply: value, stop },
		Err(e) => err(e),
	}
}

fn next_seed(zset_seed: &mut u64) -> u64 {
	*zset_seed = zset_seed.wrapping_add(0x9E3779B97F4A7C15);
	*zset_seed
}

fn dispatch(
	table: &mut ExpiringTable<Value>,
	config: &Config,
	action: Action,
	args: &[Value],
	zset_seed: &mut u64,
) -> Result<Value, Error> {
	use Action::*;
	match action {
		Get => {
			let key = arg_str(args, 0)?;
			match table.get(key) {
				None => Ok(Value::Null),
				Some(Value::String(s)) => Ok(Value::String(s.clone())),
				Some(_) => Err(Error::WrongType),
			}
		}
		Set => {
			let key = arg_str(args, 0)?.to_string();
			let value = arg_str(args, 1)?.to_string();
			table.set(&key, Value::String(value));
			Ok(Value::Null)
		}
		Del => {
			if args.is_empty() {
				return Err(Error::WrongArguments);
			}
			let mut removed = 0u32;
			for v in args {
				let key = v.as_str().ok_or(Error::WrongArguments)?;
				if table.remove(key).is_some() {
					removed += 1;
				}
			}
			Ok(Value::Uint(removed))
		}
		Rename => {
			let old = arg_str(args, 0)?.to_string();
			let new = arg_str(args, 1)?.to_string();
			table.rename(&old, &new).map(|_| Value::Null).map_err(|_| Error::NoSuchKey)
		}
		LPush | RPush => {
			if args.len() < 2 {
				return Err(Error::WrongArguments);
			}
			let key = arg_str(args, 0)?.to_string();
			let values: Vec<Value> = args[1..].iter().cloned().collect();
			if table.get(&key).is_none() {
				table.set(&key, Value::List(List::new()));
			}
			let list = with_list(table, &key)?.expect("just inserted");
			let len = if action == LPush { list.lpush(values) } else { list.rpush(values) };
			Ok(Value::Uint(len as u32))
		}
		LPop | RPop => {
			let key = arg_str(args, 0)?.to_string();
			let count = if args.len() > 1 { Some(arg_uint(args, 1)? as usize) } else { None };
			let Some(list) = with_list(table, &key)? else {
				return Ok(Value::Null);
			};
			match count {
				None => {
					let popped = if action == LPop { list.lpop() } else { list.rpop() };
					Ok(popped.unwrap_or(Value::Null))
				}
				Some(n) => {
					let popped = if action == LPop { list.lpop_n(n) } else { list.rpop_n(n) };
					let mut out = List::new();
					out.rpush(popped);
					Ok(Value::List(out))
				}
			}
		}
		LLen => {
			let key = arg_str(args, 0)?.to_string();
			Ok(Value::Uint(with_list(table, &key)?.map(|l| l.len()).unwrap_or(0) as u32))
		}
		LRange => {
			let key = arg_str(args, 0)?.to_string();
			let start = arg_uint(args, 1)? as usize;
			let stop = arg_uint(args, 2)? as usize;
			let Some(list) = with_list(table, &key)? else {
				return Ok(Value::Null);
			};
			match list.range(start, stop) {
				Some(items) => {
					let mut out = List::new();
					out.rpush(items);
					Ok(Value::List(out))
				}
				None => Ok(Value::Null),
			}
		}
		HGet => {
			let key = arg_str(args, 0)?.to_string();
			let field = arg_str(args, 1)?.to_string();
			match with_hash(table, &key)? {
				None => Ok(Value::Null),
				Some(h) => Ok(h.get(&field).cloned().unwrap_or(Value::Null)),
			}
		}
		HSet => {
			if args.len() < 3 || args.len() % 2 == 0 {
				return Err(Error::WrongArguments);
			}
			let key = arg_str(args, 0)?.to_string();
			if table.get(&key).is_none() {
				table.set(&key, Value::Hash(HashTable::new(next_seed(zset_seed) as u32)));
			}
			let hash = with_hash(table, &key)?.expect("just inserted");
			let mut added = 0u32;
			for pair in args[1..].chunks(2) {
				let field = pair[0].as_str().ok_or(Error::WrongArguments)?;
				let value = pair[1].clone();
				if hash.set(field, value).is_none() {
					added += 1;
				}
			}
			Ok(Value::Uint(added))
		}
		HDel => {
			if args.len() < 2 {
				return Err(Error::WrongArguments);
			}
			let key = arg_str(args, 0)?.to_string();
			let Some(hash) = with_hash(table, &key)? else {
				return Ok(Value::Uint(0));
			};
			let mut removed = 0u32;
			for v in &args[1..] {
				let field = v.as_str().ok_or(Error::WrongArguments)?;
				if hash.remove(field).is_some() {
					removed += 1;
				}
			}
			Ok(Value::Uint(removed))
		}
		HIncrBy => {
			let key = arg_str(args, 0)?.to_string();
			let field = arg_str(args, 1)?.to_string();
			let delta = arg_int(args, 2)?;
			if table.get(&key).is_none() {
				table.set(&key, Value::Hash(HashTable::new(next_seed(zset_seed) as u32)));
			}
			let hash = with_hash(table, &key)?.expect("just inserted");
			let current = match hash.get(&field) {
				None => 0,
				Some(Value::String(s)) => string_to_int(s).ok_or(Error::WrongType)?,
				Some(_) => return Err(Error::WrongType),
			};
			let next = current.wrapping_add(delta);
			hash.set(&field, Value::String(next.to_string()));
			Ok(Value::Int(next))
		}
		ZAdd => {
			if args.len() < 3 || args.len() % 2 == 0 {
				return Err(Error::WrongArguments);
			}
			let key = arg_str(args, 0)?.to_string();
			if table.get(&key).is_none() {
				table.set(&key, Value::SortedSet(ZSet::new(next_seed(zset_seed))));
			}
			let zset = with_zset(table, &key)?.expect("just inserted");
			let mut card = zset.card();
			for pair in args[1..].chunks(2) {
				let score: f64 = pair[0].as_str().ok_or(Error::WrongArguments)?.parse().map_err(|_| Error::SyntaxError)?;
				let member = pair[1].as_str().ok_or(Error::WrongArguments)?;
				card = zset.zadd(score, member).map_err(|_| Error::SyntaxError)?;
			}
			Ok(Value::Uint(card as u32))
		}
		ZScore => {
			let key = arg_str(args, 0)?.to_string();
			let member = arg_str(args, 1)?.to_string();
			Ok(with_zset(table, &key)?.and_then(|z| z.score(&member)).map(Value::Double).unwrap_or(Value::Null))
		}
		ZCard => {
			let key = arg_str(args, 0)?.to_string();
			Ok(Value::Uint(with_zset(table, &key)?.map(|z| z.card()).unwrap_or(0) as u32))
		}
		ZCount => {
			let key = arg_str(args, 0)?.to_string();
			let (min, incl_min) = parse_bound(arg_str(args, 1)?)?;
			let (max, incl_max) = parse_bound(arg_str(args, 2)?)?;
			Ok(Value::Uint(with_zset(table, &key)?.map(|z| z.zcount(min, incl_min, max, incl_max)).unwrap_or(0) as u32))
		}
		ZRange => {
			let key = arg_str(args, 0)?.to_string();
			let start = arg_uint(args, 1)? as usize;
			let stop = arg_uint(args, 2)? as usize;
			let withscores = args.get(3).and_then(Value::as_str).map(|s| s.eq_ignore_ascii_case("withscores")).unwrap_or(false);
			let Some(zset) = with_zset(table, &key)? else {
				return Ok(Value::Null);
			};
			match zset.zrange(start, stop) {
				None => Ok(Value::Null),
				Some(items) => Ok(render_scored(items, withscores)),
			}
		}
		ZRangeByScore => {
			let key = arg_str(args, 0)?.to_string();
			let (min, incl_min) = parse_bound(arg_str(args, 1)?)?;
			let (max, incl_max) = parse_bound(arg_str(args, 2)?)?;
			let withscores = args.get(3).and_then(Value::as_str).map(|s| s.eq_ignore_ascii_case("withscores")).unwrap_or(false);
			let Some(zset) = with_zset(table, &key)? else {
				return Ok(Value::List(List::new()));
			};
			Ok(render_scored(zset.zrangebyscore(min, incl_min, max, incl_max), withscores))
		}
		ZRank => {
			let key = arg_str(args, 0)?.to_string();
			let member = arg_str(args, 1)?.to_string();
			let withscores = args.get(2).and_then(Value::as_str).map(|s| s.eq_ignore_ascii_case("withscores")).unwrap_or(false);
			let Some(zset) = with_zset(table, &key)? else {
				return Ok(Value::Null);
			};
			match zset.zrank(&member) {
				None => Ok(Value::Null),
				Some(rank) if !withscores => Ok(Value::Uint(rank as u32)),
				Some(rank) => {
					let score = zset.score(&member).unwrap_or(0.0);
					let mut out = List::new();
					out.rpush([Value::Uint(rank as u32), Value::Double(score)]);
					Ok(Value::List(out))
				}
			}
		}
		ZRem => {
			if args.len() < 2 {
				return Err(Error::WrongArguments);
			}
			let key = arg_str(args, 0)?.to_string();
			let Some(zset) = with_zset(table, &key)? else {
				return Ok(Value::Uint(0));
			};
			let mut removed = 0u32;
			for v in &args[1..] {
				let member = v.as_str().ok_or(Error::WrongArguments)?;
				if zset.zrem(member) {
					removed += 1;
				}
			}
			Ok(Value::Uint(removed))
		}
		ZRemRangeByScore => {
			let key = arg_str(args, 0)?.to_string();
			let (min, incl_min) = parse_bound(arg_str(args, 1)?)?;
			let (max, incl_max) = parse_bound(arg_str(args, 2)?)?;
			let Some(zset) = with_zset(table, &key)? else {
				return Ok(Value::Uint(0));
			};
			Ok(Value::Uint(zset.zremrangebyscore(min, incl_min, max, incl_max) as u32))
		}
		ZInterStore | ZUnionStore => store_combine(table, action, args, zset_seed),
		Expire => {
			let key = arg_str(args, 0)?.to_string();
			let seconds = arg_uint(args, 1)? as u64;
			Ok(Value::Uint(if table.expire(&key, seconds) { 1 } else { 0 }))
		}
		Keys => {
			let pattern = args.first().and_then(Value::as_str).map(str::to_string);
			let mut keys = table.keys();
			if let Some(pattern) = &pattern {
				keys.retain(|k| match_keys(k, pattern));
			}
			let mut out = List::new();
			out.rpush(keys.into_iter().map(Value::String));
			Ok(Value::List(out))
		}
		FlushAll => {
			*table = ExpiringTable::new(config.hash_seed.unwrap_or(0));
			Ok(Value::Null)
		}
		Save => match crate::persistence::save(&config.snapshot_path, table) {
			Ok(()) => Ok(Value::Bool(true)),
			Err(e) => {
				tracing::error!(error = %e, "snapshot save failed");
				Ok(Value::Error(format!("ERR save failed: {e}")))
			}
		},
		Shutdown => {
			if let Err(e) = crate::persistence::save(&config.snapshot_path, table) {
				tracing::error!(error = %e, "snapshot save on shutdown failed");
			}
			Ok(Value::Null)
		}
		InfoDatasetMemory => Ok(Value::String(format!("keys={} approx_bytes={}", table.len(), table.len() * 64))),
	}
}

fn render_scored(items: Vec<(String, f64)>, withscores: bool) -> Value {
	let mut out = List::new();
	if withscores {
		for (member, score) in items {
			out.rpush([Value::String(member), Value::Double(score)]);
		}
	} else {
		out.rpush(items.into_iter().map(|(member, _)| Value::String(member)));
	}
	Value::List(out)
}

/// `ZINTERSTORE dest numkeys key... [WEIGHTS w...] [AGGREGATE SUM|MIN|MAX]`
fn store_combine(table: &mut ExpiringTable<Value>, action: Action, args: &[Value], zset_seed: &mut u64) -> Result<Value, Error> {
	let dest = arg_str(args, 0)?.to_string();
	let numkeys = arg_uint(args, 1)? as usize;
	if args.len() < 2 + numkeys {
		return Err(Error::WrongArguments);
	}
	let keys: Vec<String> = args[2..2 + numkeys].iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<_>>().ok_or(Error::WrongArguments)?;

	let mut rest = &args[2 + numkeys..];
	let mut weights = vec![1.0_f64; numkeys];
	if rest.first().and_then(Value::as_str).map(|s| s.eq_ignore_ascii_case("weights")).unwrap_or(false) {
		if rest.len() < 1 + numkeys {
			return Err(Error::WrongArguments);
		}
		for i in 0..numkeys {
			weights[i] = rest[1 + i].as_str().ok_or(Error::WrongArguments)?.parse().map_err(|_| Error::SyntaxError)?;
		}
		rest = &rest[1 + numkeys..];
	}

	let mut aggregate = Aggregate::Sum;
	if rest.first().and_then(Value::as_str).map(|s| s.eq_ignore_ascii_case("aggregate")).unwrap_or(false) {
		let token = rest.get(1).and_then(Value::as_str).ok_or(Error::WrongArguments)?;
		aggregate = match token.to_ascii_uppercase().as_str() {
			"SUM" => Aggregate::Sum,
			"MIN" => Aggregate::Min,
			"MAX" => Aggregate::Max,
			_ => return Err(Error::SyntaxError),
		};
	}

	let mut owned: Vec<ZSet> = Vec::with_capacity(numkeys);
	for k in &keys {
		match table.get(k) {
			Some(Value::SortedSet(z)) => owned.push(z.clone()),
			None => owned.push(ZSet::new(0)),
			Some(_) => return Err(Error::WrongType),
		}
	}
	let sets: Vec<&ZSet> = owned.iter().collect();

	let seed = next_seed(zset_seed);
	let result = if action == Action::ZInterStore {
		zinterstore(&sets, &weights, aggregate, seed)
	} else {
		zunionstore(&sets, &weights, aggregate, seed)
	}
	.map_err(|_| Error::SyntaxError)?;
	let card = result.card();
	table.set(&dest, Value::SortedSet(result));
	Ok(Value::Uint(card as u32))
}