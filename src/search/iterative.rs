//! Iterative deepening driver: aspiration windows, MultiPV, soft-time
//! iteration control and the per-worker search entry point.

use crate::board::{Board, Move};
use crate::sync::StopFlag;

use super::constants::{INFINITE_SCORE, MATE_SCORE, MATE_THRESHOLD};
use super::{InfoCallback, SearchInfo, SearchLimits, SearchWorker, WorkerReport};

impl SearchWorker {
    /// Run a full search on `board` under `limits`. This is the worker
    /// thread's entry point; worker 0 passes an `info` callback.
    pub fn run_search(
        &mut self,
        board: Board,
        limits: SearchLimits,
        stop: StopFlag,
        info: Option<InfoCallback>,
    ) -> WorkerReport {
        self.board = board;
        self.stop = stop;
        self.limits = limits;
        self.info_callback = info;
        self.start_time = std::time::Instant::now();
        self.nodes = 0;
        self.seldepth = 0;
        self.completed_depth = 0;
        self.best_root_move = None;
        self.best_root_score = -INFINITE_SCORE;
        self.heuristics.new_search();

        let legal_moves = self.board.generate_moves();
        if legal_moves.is_empty() {
            return self.report();
        }
        // A forced move needs no search beyond bookkeeping.
        if legal_moves.len() == 1 && !self.limits.infinite && self.limits.multipv == 1 {
            self.best_root_move = Some(legal_moves[0]);
            self.best_root_score = 0;
            self.completed_depth = 1;
            return self.report();
        }

        let multipv = (self.limits.multipv.max(1) as usize).min(legal_moves.len());

        // Helper workers stagger their target depth to diversify the
        // shared transposition table.
        let depth_offset = u32::from(self.id % 2 == 1);
        let max_depth = self
            .limits
            .max_depth
            .saturating_add(depth_offset)
            .clamp(1, crate::board::MAX_PLY as u32 - 1);

        let mut excluded: Vec<Move> = Vec::new();
        let mut last_score = 0i32;
        let mut stability = 0u32;
        let mut previous_best: Option<Move> = None;

        for depth in 1..=max_depth {
            if self.stop.is_stopped() {
                break;
            }
            if self.should_stop_iteration(depth, stability, last_score) {
                break;
            }

            excluded.clear();
            let mut first_line_move = None;

            for pv_index in 1..=multipv {
                self.root_moves = legal_moves
                    .iter()
                    .filter(|m| !excluded.contains(m))
                    .copied()
                    .collect();
                if self.root_moves.is_empty() {
                    break;
                }

                let score = self.aspiration(depth, last_score);
                if self.stop.is_stopped() && self.completed_depth == 0 {
                    break;
                }

                let line_move = self.best_root_move;
                if pv_index == 1 {
                    first_line_move = line_move;
                    last_score = score;
                }
                if let Some(mv) = line_move {
                    excluded.push(mv);
                    self.emit_info(depth, pv_index as u32, score, mv);
                }
                if self.stop.is_stopped() {
                    break;
                }
            }

            if self.stop.is_stopped() {
                // Keep the previous iteration's result when this one
                // was cut short without finishing its first line.
                if first_line_move.is_none() {
                    self.best_root_move = previous_best.or(self.best_root_move);
                }
                break;
            }

            self.completed_depth = depth;
            self.best_root_move = first_line_move.or(self.best_root_move);

            if self.best_root_move == previous_best && previous_best.is_some() {
                stability = stability.saturating_add(1);
            } else {
                stability = 0;
            }
            previous_best = self.best_root_move;

            // A proven mate needs no deeper confirmation.
            if last_score.abs() >= MATE_THRESHOLD && depth >= 10 && !self.limits.infinite {
                break;
            }
        }

        // Fall back to any legal move if the search never completed.
        if self.best_root_move.is_none() {
            self.best_root_move = Some(legal_moves[0]);
        }

        self.best_root_score = last_score;
        self.report()
    }

    /// Aspiration window loop around one root search.
    fn aspiration(&mut self, depth: u32, previous_score: i32) -> i32 {
        let mut delta = self.params.aspiration_delta;
        let (mut alpha, mut beta) = if depth <= 4 {
            (-INFINITE_SCORE, INFINITE_SCORE)
        } else {
            (
                (previous_score - delta).max(-INFINITE_SCORE),
                (previous_score + delta).min(INFINITE_SCORE),
            )
        };

        loop {
            let value = self.alphabeta(depth, alpha, beta, false, 0, true);
            if self.stop.is_stopped() {
                return value;
            }
            if value.abs() >= MATE_THRESHOLD {
                return value;
            }
            if value <= alpha {
                // Fail low: drop the floor fast, it threatens the move.
                beta = (alpha + beta) / 2;
                alpha = (alpha - delta).max(-INFINITE_SCORE);
                delta += delta;
            } else if value >= beta {
                beta = (beta + delta).min(INFINITE_SCORE);
                delta += delta / 2;
            } else {
                return value;
            }
            if delta > 1200 {
                alpha = -INFINITE_SCORE;
                beta = INFINITE_SCORE;
            }
        }
    }

    /// Soft-time iteration gate: do not start a depth that cannot pay
    /// off, extending when the best move keeps changing.
    fn should_stop_iteration(&self, depth: u32, stability: u32, score: i32) -> bool {
        if self.limits.infinite || self.limits.soft_time_ms == 0 || depth <= 4 {
            return false;
        }
        let elapsed = self.start_time.elapsed().as_millis() as u64;
        let mut soft = self.limits.soft_time_ms;
        if stability < 2 {
            soft = soft.saturating_mul(130) / 100;
        } else if stability >= 6 {
            soft = soft.saturating_mul(75) / 100;
        }
        // A collapsing score buys more time.
        if score < self.best_root_score - 40 {
            soft = soft.saturating_mul(140) / 100;
        }
        elapsed >= soft
    }

    fn emit_info(&mut self, depth: u32, multipv: u32, score: i32, best: Move) {
        let Some(callback) = self.info_callback.clone() else {
            return;
        };
        let elapsed = self.start_time.elapsed().as_millis() as u64;
        let nps = if elapsed > 0 {
            self.nodes * 1000 / elapsed
        } else {
            0
        };
        let mate = if score >= MATE_THRESHOLD {
            Some((MATE_SCORE - score + 1) / 2)
        } else if score <= -MATE_THRESHOLD {
            Some(-(MATE_SCORE + score + 1) / 2)
        } else {
            None
        };
        let pv = self.extract_pv(best, depth as usize + 8);
        let info = SearchInfo {
            depth,
            seldepth: self.seldepth,
            multipv,
            score,
            mate,
            nodes: self.nodes,
            nps,
            time_ms: elapsed,
            hashfull: self.tt.hashfull_per_mille(),
            pv: self.format_pv(&pv),
        };
        callback(&info);
    }

    /// Assemble the final report, pulling the ponder move from the TT.
    fn report(&mut self) -> WorkerReport {
        let ponder_move = self.best_root_move.and_then(|mv| {
            let pv = self.extract_pv(mv, 2);
            pv.get(1).copied()
        });
        WorkerReport {
            worker_id: self.id,
            best_move: self.best_root_move,
            ponder_move,
            score: self.best_root_score,
            depth: self.completed_depth,
            nodes: self.nodes,
        }
    }
}
