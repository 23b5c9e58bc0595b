// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Data-driven end-to-end scripts. Each line is either a bare command (run
//! and discarded) or a command followed by `=> expected reply` (run and
//! asserted). Lines starting with `#` are comments.

use std::path::Path;
use std::str::FromStr;

use synapse_core::{Config, Value};
use synapse_store::{Action, Request, Store};
use test_each_file::test_each_path;

fn format_value(value: &Value) -> String {
	match value {
		Value::Null => "(nil)".to_string(),
		Value::Error(msg) => format!("(error) {msg}"),
		Value::Bool(b) => b.to_string(),
		Value::Int(i) => i.to_string(),
		Value::Uint(u) => u.to_string(),
		Value::Double(d) => d.to_string(),
		Value::String(s) => s.clone(),
		Value::List(list) => {
			let items: Vec<String> = list.iter().map(format_value).collect();
			format!("[{}]", items.join(", "))
		}
		Value::Hash(_) | Value::SortedSet(_) => format!("{value:?}"),
	}
}

fn run_line(store: &Store, line: &str) {
	let (command, expected) = match line.split_once("=>") {
		Some((cmd, expected)) => (cmd.trim(), Some(expected.trim())),
		None => (line.trim(), None),
	};
	if command.is_empty() {
		return;
	}

	let tokens: Vec<&str> = command.split_whitespace().collect();
	let (action_token, arg_tokens) = tokens.split_first().expect("non-empty command");
	let action = Action::from_str(action_token).expect("known action in test script");

	let mut request = Request::new(action);
	for arg in arg_tokens {
		request = request.arg(*arg);
	}
	let reply = store.submit_sync(request);

	if let Some(expected) = expected {
		assert_eq!(format_value(&reply), expected, "script line {line:?} produced an unexpected reply");
	}
}

fn run_script(path: &Path) {
	let dir = tempfile::tempdir().expect("create temp dir for script snapshot");
	let config = Config { snapshot_path: dir.path().join("snapshot.json"), ..Config::default() };
	let mut store = Store::start(config);

	let contents = std::fs::read_to_string(path).expect("read script file");
	for line in contents.lines() {
		if line.trim_start().starts_with('#') {
			continue;
		}
		run_line(&store, line);
	}

	store.shutdown();
}

test_each_path! { in "crates/synapse-store/tests/scripts" as scripts => run_script }
