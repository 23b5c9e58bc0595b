// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use std::str::FromStr;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use synapse_core::Value;
use synapse_store::{Action, Request, Store};

/// Splits a line into whitespace-separated tokens, treating `"…"` as one
/// token (with `\"` as an escaped quote inside it).
fn tokenize(line: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut chars = line.chars().peekable();

	while let Some(&c) = chars.peek() {
		if c.is_whitespace() {
			chars.next();
			continue;
		}
		if c == '"' {
			chars.next();
			let mut token = String::new();
			while let Some(c) = chars.next() {
				match c {
					'"' => break,
					'\\' if chars.peek() == Some(&'"') => {
						chars.next();
						token.push('"');
					}
					other => token.push(other),
				}
			}
			tokens.push(token);
		} else {
			let mut token = String::new();
			while let Some(&c) = chars.peek() {
				if c.is_whitespace() {
					break;
				}
				token.push(c);
				chars.next();
			}
			tokens.push(token);
		}
	}
	tokens
}

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

/// Reads a line, tokenizes it, uppercases the action token, submits it
/// synchronously, and prints the reply. Ctrl-C clears the current line;
/// Ctrl-D exits.
pub fn run(store: &mut Store) {
	let mut rl = DefaultEditor::new().expect("initialize readline editor");

	loop {
		match rl.readline("synapse> ") {
			Ok(line) => {
				let _ = rl.add_history_entry(&line);
				let tokens = tokenize(&line);
				let Some((action_token, arg_tokens)) = tokens.split_first() else {
					continue;
				};

				match Action::from_str(action_token) {
					Ok(action) => {
						if action == Action::Shutdown {
							let reply = store.submit_sync(Request::new(action));
							println!("{}", format_value(&reply));
							break;
						}
						let mut request = Request::new(action);
						for arg in arg_tokens {
							request = request.arg(arg.as_str());
						}
						let reply = store.submit_sync(request);
						println!("{}", format_value(&reply));
					}
					Err(e) => println!("(error) {e}"),
				}
			}
			Err(ReadlineError::Interrupted) => {
				println!("^C");
			}
			Err(ReadlineError::Eof) => {
				break;
			}
			Err(err) => {
				eprintln!("readline error: {err}");
				break;
			}
		}
	}

	store.shutdown();
}
