// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod activation;

use std::path::PathBuf;

use rand::Rng;
use synapse_core::{Config, Value};
use synapse_store::{Action, Request, Store};

use activation::{aggregate_cut, Activation};

const TAGS: &[&str] = &["sports", "music", "tech", "food", "travel", "art"];
const ITERATIONS: usize = 200;
const REPORT_EVERY: usize = 50;
const PERSONALITY_KEY: &str = "personality";
const LIKES_KEY: &str = "likes";

/// Reads the running personality vector back as `(tag, weight)` pairs by
/// issuing a `ZRANGE ... WITHSCORES` request directly, since the flattened
/// reply needs no convenience wrapper of its own.
fn read_personality(store: &Store) -> Vec<(String, f64)> {
	let reply = store.submit_sync(
		Request::new(Action::ZRange).arg(PERSONALITY_KEY).arg("0").arg(u32::MAX.to_string()).arg("withscores"),
	);
	let Value::List(list) = reply else {
		return Vec::new();
	};
	let items: Vec<Value> = list.iter().cloned().collect();
	items
		.chunks(2)
		.filter_map(|pair| match pair {
			[Value::String(tag), Value::Double(score)] => Some((tag.clone(), *score)),
			_ => None,
		})
		.collect()
}

/// Simulates one round of freshly observed tag engagement: each tag gets a
/// liked-fraction in `[0, 1]`, nudged by the running per-tag like counter
/// that the hash in `LIKES_KEY` accumulates across iterations.
fn observe_new_weights(store: &Store, rng: &mut impl Rng) -> Vec<(String, f64)> {
	TAGS.iter()
		.map(|&tag| {
			let liked = rng.random::<bool>();
			if liked {
				store.hincrby(LIKES_KEY, tag, 1);
			}
			let count = match store.hget(LIKES_KEY, tag) {
				Value::String(s) => s.parse::<f64>().unwrap_or(0.0),
				_ => 0.0,
			};
			let noise: f64 = rng.random_range(-0.05..0.05);
			(tag.to_string(), (count / 20.0 + noise).clamp(0.0, 1.0))
		})
		.collect()
}

fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
		.init();
}

fn main() {
	init_tracing();

	let config = Config { snapshot_path: PathBuf::from("recsim.json"), ..Config::default() };
	let mut store = Store::start(config);

	let mut rng = rand::rng();
	let activation = Activation::Selu;

	for i in 0..ITERATIONS {
		let new_weights = observe_new_weights(&store, &mut rng);
		let mut personality = read_personality(&store);
		aggregate_cut(&mut personality, &new_weights, i, ITERATIONS, activation);
		for (tag, weight) in &personality {
			store.zadd(PERSONALITY_KEY, *weight, tag);
		}

		if i % REPORT_EVERY == 0 || i == ITERATIONS - 1 {
			tracing::info!(iteration = i, ?personality, "personality vector updated");
		}
	}

	store.save();
	let final_personality = read_personality(&store);
	println!("final personality vector:");
	for (tag, weight) in final_personality {
		println!("  {tag}: {weight:.4}");
	}

	store.shutdown();
}
