// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

mod repl;

use std::path::PathBuf;

use clap::Parser;
use synapse_core::Config;
use synapse_store::Store;

#[derive(Parser, Debug)]
#[command(name = "synapse-cli", about = "Interactive REPL for the synapse store")]
struct Args {
	/// 32-bit hash seed; omit to derive one from wall-clock time at start.
	#[arg(long, env = "SYNAPSE_HASH_SEED")]
	hash_seed: Option<u32>,

	/// Path to the JSON snapshot file, loaded on start and written by SAVE/SHUTDOWN.
	#[arg(long, env = "SYNAPSE_SNAPSHOT_PATH", default_value = "db.json")]
	snapshot_path: PathBuf,
}

fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
		.init();
}

fn main() {
	init_tracing();
	let args = Args::parse();

	let mut config = Config::default();
	config.hash_seed = args.hash_seed;
	config.snapshot_path = args.snapshot_path;

	let mut store = Store::start(config);
	repl::run(&mut store);
}
