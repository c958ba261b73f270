//! Cinder: a UCI chess engine.
//!
//! The engine is built from three tightly coupled subsystems:
//! - a bitboard board representation with magic-lookup sliding attacks
//!   and incremental make/unmake (`board`);
//! - a tapered, cache-backed static evaluation (`eval`);
//! - a lazy-SMP principal-variation alpha-beta search sharing one
//!   lock-free transposition table (`search`, `tt`).
//!
//! The `engine` module owns all of it behind a single controller object
//! and the `uci` module speaks the protocol.
//!
//! # Quick start
//!
//! ```
//! use cinder::board::Board;
//! use cinder::eval::EvalParams;
//! use cinder::search::{SearchLimits, SearchWorker};
//! use cinder::sync::StopFlag;
//! use cinder::tt::TranspositionTable;
//! use std::sync::Arc;
//!
//! let mut worker = SearchWorker::new(
//!     0,
//!     Arc::new(TranspositionTable::new(16)),
//!     Arc::new(EvalParams::new()),
//! );
//! let limits = SearchLimits { max_depth: 4, ..Default::default() };
//! let report = worker.run_search(Board::new(), limits, StopFlag::new(), None);
//! assert!(report.best_move.is_some());
//! ```
//!
//! # Features
//!
//! - `serde` — serialization derives for the small value types
//! - `logging` — debug logging hooks via the `log` crate

// Pedantic lints with the usual chess-engine escapes.
#![warn(clippy::pedantic)]
// Bit patterns read better without separators.
#![allow(clippy::unreadable_literal)]
// eval_mg/eval_eg and friends are intentionally similar.
#![allow(clippy::similar_names)]
// Square/board indices are ubiquitous and in-range casts.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod board;
pub mod engine;
pub mod eval;
pub mod search;
pub mod sync;
pub mod tt;
pub mod uci;
pub mod zobrist;
