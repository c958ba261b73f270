//! Alpha-beta search: worker state, iterative deepening, pruning and
//! the lazy-SMP thread pool.

mod alphabeta;
mod constants;
mod history;
mod iterative;
mod params;
mod picker;
mod pool;
mod quiescence;

pub use constants::{DRAW_SCORE, INFINITE_SCORE, MATE_SCORE, MATE_THRESHOLD};
pub use params::SearchParams;
pub use pool::SearchPool;

use std::sync::Arc;
use std::time::Instant;

use crate::board::{Board, Move, Piece, MAX_PLY};
use crate::eval::{EvalParams, Evaluator, NO_EVAL};
use crate::sync::StopFlag;
use crate::tt::TranspositionTable;

use history::Heuristics;

/// Limits for one `go` command.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    /// Maximum iterative-deepening depth.
    pub max_depth: u32,
    /// Node budget (0 = unlimited).
    pub node_limit: u64,
    /// Soft time target in ms (0 = none): iteration gate.
    pub soft_time_ms: u64,
    /// Hard ceiling in ms (0 = none): polled during search.
    pub hard_time_ms: u64,
    /// Number of principal variations to report.
    pub multipv: u32,
    /// Infinite analysis: ignore time, run until stopped.
    pub infinite: bool,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            max_depth: MAX_PLY as u32 - 1,
            node_limit: 0,
            soft_time_ms: 0,
            hard_time_ms: 0,
            multipv: 1,
            infinite: false,
        }
    }
}

/// One periodic search report for the UCI `info` line.
#[derive(Debug, Clone)]
pub struct SearchInfo {
    pub depth: u32,
    pub seldepth: u32,
    pub multipv: u32,
    /// Centipawn score, meaningless when `mate` is set.
    pub score: i32,
    /// Moves to mate, negative when being mated.
    pub mate: Option<i32>,
    pub nodes: u64,
    pub nps: u64,
    pub time_ms: u64,
    pub hashfull: u32,
    pub pv: String,
}

/// Callback receiving per-iteration reports (worker 0 only).
pub type InfoCallback = Arc<dyn Fn(&SearchInfo) + Send + Sync>;

/// Final outcome of one worker's search.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: u32,
    pub nodes: u64,
}

/// Per-ply search stack entry (a fixed arena, no allocation in search).
#[derive(Clone, Copy)]
struct PlyState {
    static_eval: i32,
    positional: i32,
    current_move: Move,
    moved_piece_to: Option<(Piece, usize)>,
    excluded: Move,
}

impl PlyState {
    const fn empty() -> Self {
        PlyState {
            static_eval: NO_EVAL,
            positional: NO_EVAL,
            current_move: Move::NULL,
            moved_piece_to: None,
            excluded: Move::NULL,
        }
    }
}

/// One search thread's complete state. Workers share only the
/// transposition table and the stop flag.
pub struct SearchWorker {
    id: usize,
    board: Board,
    tt: Arc<TranspositionTable>,
    evaluator: Evaluator,
    params: SearchParams,
    heuristics: Heuristics,
    stack: Box<[PlyState; MAX_PLY + 2]>,
    stop: StopFlag,
    start_time: Instant,
    limits: SearchLimits,
    root_moves: Vec<Move>,
    nodes: u64,
    seldepth: u32,
    completed_depth: u32,
    best_root_move: Option<Move>,
    best_root_score: i32,
    info_callback: Option<InfoCallback>,
}

impl SearchWorker {
    #[must_use]
    pub fn new(id: usize, tt: Arc<TranspositionTable>, eval_params: Arc<EvalParams>) -> Self {
        SearchWorker {
            id,
            board: Board::new(),
            tt,
            evaluator: Evaluator::new(eval_params),
            params: SearchParams::default(),
            heuristics: Heuristics::new(),
            stack: Box::new([PlyState::empty(); MAX_PLY + 2]),
            stop: StopFlag::new(),
            start_time: Instant::now(),
            limits: SearchLimits::default(),
            root_moves: Vec::new(),
            nodes: 0,
            seldepth: 0,
            completed_depth: 0,
            best_root_move: None,
            best_root_score: -INFINITE_SCORE,
            info_callback: None,
        }
    }

    pub fn set_search_params(&mut self, params: SearchParams) {
        self.params = params;
    }

    pub fn set_contempt(&mut self, contempt: i32, color: crate::board::Color) {
        self.evaluator.contempt = contempt;
        self.evaluator.contempt_color = color;
    }

    pub fn set_tt(&mut self, tt: Arc<TranspositionTable>) {
        self.tt = tt;
    }

    pub fn set_eval_params(&mut self, params: Arc<EvalParams>) {
        self.evaluator.params = params;
    }

    /// New game: wipe all per-worker learned state.
    pub fn new_game(&mut self) {
        self.heuristics.clear();
        self.evaluator.clear_caches();
    }

    #[inline]
    fn should_stop(&self) -> bool {
        if self.stop.is_stopped() {
            return true;
        }
        if self.limits.node_limit > 0 && self.nodes >= self.limits.node_limit {
            return true;
        }
        // Poll the clock sparsely.
        if self.limits.hard_time_ms > 0 && self.nodes.trailing_zeros() >= 10 {
            let elapsed = self.start_time.elapsed().as_millis() as u64;
            if elapsed >= self.limits.hard_time_ms {
                return true;
            }
        }
        false
    }

    #[inline]
    fn ply_state(&self, ply: usize) -> &PlyState {
        &self.stack[ply.min(MAX_PLY + 1)]
    }

    #[inline]
    fn ply_state_mut(&mut self, ply: usize) -> &mut PlyState {
        &mut self.stack[ply.min(MAX_PLY + 1)]
    }

    /// The move made at the previous ply, if any.
    fn previous_move(&self, ply: usize) -> Move {
        if ply == 0 {
            Move::NULL
        } else {
            self.ply_state(ply - 1).current_move
        }
    }

    fn previous_piece_to(&self, ply: usize) -> Option<(Piece, usize)> {
        if ply == 0 {
            None
        } else {
            self.ply_state(ply - 1).moved_piece_to
        }
    }

    /// Extract the principal variation for `first_move` from the TT by
    /// walking best moves, guarding against cycles.
    fn extract_pv(&mut self, first_move: Move, max_len: usize) -> Vec<Move> {
        let mut pv = Vec::with_capacity(max_len);
        let mut seen = Vec::with_capacity(max_len);
        let mut undo = Vec::with_capacity(max_len);

        let mut next = Some(first_move);
        while pv.len() < max_len {
            let Some(mv) = next else { break };
            if !self.board.is_pseudo_legal(mv) || !self.board.is_legal(mv) {
                break;
            }
            if seen.contains(&self.board.hash()) {
                break;
            }
            seen.push(self.board.hash());
            pv.push(mv);
            undo.push((mv, self.board.make_move(mv)));
            next = self
                .tt
                .probe(self.board.hash())
                .map(|e| e.mv)
                .filter(|m| !m.is_null());
        }

        for (mv, info) in undo.into_iter().rev() {
            self.board.unmake_move(mv, info);
        }
        pv
    }

    fn format_pv(&self, pv: &[Move]) -> String {
        pv.iter()
            .map(|m| self.board.format_move(*m))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worker() -> SearchWorker {
        SearchWorker::new(
            0,
            Arc::new(TranspositionTable::new(16)),
            Arc::new(EvalParams::new()),
        )
    }

    #[test]
    fn test_worker_search_startpos_depth_finds_legal_move() {
        let mut w = worker();
        let board = Board::new();
        let limits = SearchLimits {
            max_depth: 3,
            ..Default::default()
        };
        let report = w.run_search(board, limits, StopFlag::new(), None);
        let mv = report.best_move.expect("search found a move");
        let mut check = Board::new();
        assert!(check.generate_moves().contains(mv));
        assert!(report.nodes > 0);
        assert!(report.depth >= 1);
    }

    #[test]
    fn test_worker_respects_stop_flag() {
        let mut w = worker();
        let stop = StopFlag::new();
        stop.stop();
        let limits = SearchLimits {
            max_depth: 30,
            ..Default::default()
        };
        let report = w.run_search(Board::new(), limits, stop, None);
        // Stopped immediately: barely any nodes searched.
        assert!(report.nodes < 50_000);
    }

    #[test]
    fn test_worker_node_limit() {
        let mut w = worker();
        let limits = SearchLimits {
            max_depth: 64,
            node_limit: 2_000,
            ..Default::default()
        };
        let report = w.run_search(Board::new(), limits, StopFlag::new(), None);
        assert!(report.nodes <= 30_000, "node limit grossly exceeded");
    }
}
