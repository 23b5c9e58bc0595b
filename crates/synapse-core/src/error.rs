// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

use thiserror::Error;

/// The fixed set of error tokens that cross the request/reply boundary.
///
/// The wire text of each variant is part of the external contract and must
/// not change: callers match on these strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
	#[error("ERR database is closed")]
	DatabaseClosed,
	#[error("ERR wrong arguments ")]
	WrongArguments,
	#[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
	WrongType,
	#[error("ERR no such key")]
	NoSuchKey,
	#[error("ERR syntax error")]
	SyntaxError,
	#[error("ERR unknown command")]
	UnknownCommand,
}