// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::io;
use std::path::Path;

use serde_json::{Map, Value as Json};
use synapse_core::{List, Value};
use synapse_hash::ExpiringTable;

/// Loads a JSON snapshot if `path` exists; string fields become
/// `Value::String`, array-of-string fields become `Value::List`. Any other
/// JSON shape for a field is skipped (unknown types are not fatal).
pub fn load(path: &Path, table: &mut ExpiringTable<Value>) -> io::Result<()> {
	if !path.exists() {
		return Ok(());
	}
	let raw = std::fs::read_to_string(path)?;
	let doc: Json = serde_json::from_str(&raw)?;
	let Json::Object(map) = doc else {
		return Ok(());
	};

	for (key, value) in map {
		match value {
			Json::String(s) => {
				table.set(&key, Value::String(s));
			}
			Json::Array(items) => {
				let mut list = List::new();
				let strings: Vec<Value> =
					items.into_iter().filter_map(|v| v.as_str().map(|s| Value::String(s.to_string()))).collect();
				list.rpush(strings);
				table.set(&key, Value::List(list));
			}
			_ => tracing::debug!(%key, "skipping snapshot field of unsupported type"),
		}
	}
	Ok(())
}

/// Serializes every string and list entry to a temp file beside `path`,
/// then renames it into place. Hashes and sorted sets are not persisted,
/// matching the shipped snapshot format; the temp-file-and-rename step
/// upgrades the original's write-in-place behavior to an atomic replace.
pub fn save(path: &Path, table: &mut ExpiringTable<Value>) -> io::Result<()> {
	let mut doc = Map::new();
	for key in table.keys() {
		match table.get(&key) {
			Some(Value::String(s)) => {
				doc.insert(key, Json::String(s.clone()));
			}
			Some(Value::List(list)) => {
				let arr: Vec<Json> =
					list.iter().filter_map(|v| v.as_str().map(|s| Json::String(s.to_string()))).collect();
				doc.insert(key, Json::Array(arr));
			}
			_ => {}
		}
	}

	let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
	let tmp = parent.join(format!(".{}.tmp", path.file_name().and_then(|n| n.to_str()).unwrap_or("snapshot")));

	let file = std::fs::File::create(&tmp)?;
	serde_json::to_writer_pretty(&file, &Json::Object(doc))?;
	file.sync_all()?;
	std::fs::rename(&tmp, path)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_strings_and_lists() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("db.json");

		let mut table: ExpiringTable<Value> = ExpiringTable::new(0);
		table.set("greeting", Value::String("hello".into()));
		let mut list = List::new();
		list.rpush([Value::String("a".into()), Value::String("b".into())]);
		table.set("items", Value::List(list));

		save(&path, &mut table).unwrap();

		let mut reloaded: ExpiringTable<Value> = ExpiringTable::new(0);
		load(&path, &mut reloaded).unwrap();

		assert_eq!(reloaded.get("greeting"), Some(&Value::String("hello".into())));
		match reloaded.get("items") {
			Some(Value::List(l)) => {
				assert_eq!(l.range(0, usize::MAX).unwrap(), vec![Value::String("a".into()), Value::String("b".into())]);
			}
			other => panic!("expected list, got {other:?}"),
		}
	}

	#[test]
	fn missing_file_loads_as_empty() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.json");
		let mut table: ExpiringTable<Value> = ExpiringTable::new(0);
		load(&path, &mut table).unwrap();
		assert_eq!(table.len(), 0);
	}
}