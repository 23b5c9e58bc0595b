// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::thread::sleep;
use std::time::Duration;

use synapse_core::{Config, Value};
use synapse_store::Store;

fn store_with_temp_snapshot() -> (Store, tempfile::TempDir) {
	let dir = tempfile::tempdir().expect("create temp dir");
	let config = Config { snapshot_path: dir.path().join("snapshot.json"), ..Config::default() };
	(Store::start(config), dir)
}

#[test]
fn expired_key_is_absent_after_its_ttl() {
	let (store, _dir) = store_with_temp_snapshot();

	store.set("k", "v");
	store.expire("k", 1);
	assert_eq!(store.get("k"), Value::String("v".into()));

	sleep(Duration::from_millis(1100));

	assert_eq!(store.get("k"), Value::Null);
	assert!(!matches!(store.keys(None), Value::List(l) if l.iter().any(|v| matches!(v, Value::String(s) if s == "k"))));
}

#[test]
fn large_insert_preserves_every_key_after_rehashing() {
	let (store, _dir) = store_with_temp_snapshot();

	for i in 0..10_000 {
		store.set(&format!("key-{i}"), &i.to_string());
	}

	let Value::List(keys) = store.keys(None) else {
		panic!("KEYS must reply with a list");
	};
	assert_eq!(keys.len(), 10_000);

	for i in 0..10_000 {
		assert_eq!(store.get(&format!("key-{i}")), Value::String(i.to_string()));
	}
}

#[test]
fn rename_missing_source_reports_no_such_key() {
	let (store, _dir) = store_with_temp_snapshot();
	let reply = store.submit_sync(synapse_store::Request::new(synapse_store::Action::Rename).arg("missing").arg("dest"));
	assert_eq!(reply, Value::Error("ERR no such key".to_string()));
}

#[test]
fn del_is_idempotent() {
	let (store, _dir) = store_with_temp_snapshot();
	store.set("k", "v");
	assert_eq!(store.del(&["k"]), Value::Uint(1));
	assert_eq!(store.del(&["k"]), Value::Uint(0));
}
