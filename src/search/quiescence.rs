//! Quiescence search: resolve captures, promotions and first-ply quiet
//! checks until the position goes quiet, with stand-pat, delta and SEE
//! pruning.

use crate::board::{Move, Piece, MAX_PLY};
use crate::eval::NO_EVAL;
use crate::tt::Bound;

use super::constants::{
    mated_in, value_from_tt, value_to_tt, DRAW_SCORE, INFINITE_SCORE, MATE_THRESHOLD,
    MAX_QSEARCH_PLY,
};
use super::picker::{MovePicker, PickerKind};
use super::SearchWorker;

/// Margin a capture's victim must close to be worth trying when the
/// stand-pat is far below alpha.
const DELTA_MARGIN: i32 = 180;

impl SearchWorker {
    pub(crate) fn quiescence(
        &mut self,
        mut alpha: i32,
        beta: i32,
        ply: usize,
        qply: i32,
    ) -> i32 {
        self.nodes += 1;
        if ply as u32 + 1 > self.seldepth {
            self.seldepth = ply as u32 + 1;
        }
        if self.should_stop() || ply >= MAX_PLY {
            return DRAW_SCORE;
        }
        if self.board.is_repetition() || self.board.halfmove_clock() >= 100 {
            return DRAW_SCORE;
        }

        let in_check = self.board.in_check();

        // TT probe: order by the stored move, cut on fitting bounds.
        let tt_entry = self.tt.probe(self.board.hash());
        let tt_move = tt_entry.map_or(Move::NULL, |e| e.mv);
        if let Some(entry) = tt_entry {
            let value = value_from_tt(entry.value, ply);
            let cuts = match entry.bound {
                Bound::Exact => true,
                Bound::Lower => value >= beta,
                Bound::Upper => value <= alpha,
            };
            if cuts {
                return value;
            }
        }

        let prev_positional = if ply > 0 {
            self.ply_state(ply - 1).positional
        } else {
            NO_EVAL
        };
        let stand_pat = if in_check {
            -INFINITE_SCORE
        } else {
            let result = self
                .evaluator
                .evaluate(&self.board, alpha, beta, prev_positional);
            self.ply_state_mut(ply).positional = result.positional;
            result.value
        };
        self.ply_state_mut(ply).static_eval = if in_check { NO_EVAL } else { stand_pat };

        if !in_check {
            if qply >= MAX_QSEARCH_PLY {
                return stand_pat;
            }
            if stand_pat >= beta {
                return stand_pat;
            }
            if stand_pat > alpha {
                alpha = stand_pat;
            }
        }

        let kind = if in_check {
            PickerKind::Evasion
        } else {
            PickerKind::Quiescence {
                include_checks: qply == 0,
            }
        };
        let mut picker = MovePicker::new(kind, tt_move, [Move::NULL; 2], Move::NULL, None);

        let us = self.board.side_to_move();
        let mut best_value = if in_check { -INFINITE_SCORE } else { stand_pat };
        let mut best_move = Move::NULL;
        let mut moves_tried = 0usize;

        while let Some(mv) = picker.next(&mut self.board, &self.heuristics) {
            if mv.is_castling() && !self.board.castle_path_safe(mv) {
                continue;
            }

            if !in_check && mv.is_capture() {
                // Delta pruning: even winning the victim outright will
                // not bring the score near alpha.
                let victim = if mv.is_en_passant() {
                    Piece::Pawn.value()
                } else {
                    self.board.piece_at(mv.to()).map_or(0, |(_, p)| p.value())
                };
                let promo_gain = mv.promotion_piece().map_or(0, |p| p.value() - 100);
                if stand_pat + victim + promo_gain + DELTA_MARGIN <= alpha {
                    continue;
                }

                // Losing exchanges are not worth resolving here.
                if !self.board.see_ge(mv, 0) {
                    continue;
                }
            }

            let info = self.board.make_move(mv);
            if self.board.is_in_check(us) {
                self.board.unmake_move(mv, info);
                continue;
            }
            moves_tried += 1;
            {
                let state = self.ply_state_mut(ply);
                state.current_move = mv;
                state.moved_piece_to = None;
            }

            let value = -self.quiescence(-beta, -alpha, ply + 1, qply + 1);
            self.board.unmake_move(mv, info);

            if self.should_stop() {
                return DRAW_SCORE;
            }

            if value > best_value {
                best_value = value;
                best_move = mv;
                if value > alpha {
                    alpha = value;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        // In check with no legal evasion: mated.
        if in_check && moves_tried == 0 {
            return mated_in(ply);
        }

        if !self.should_stop() && best_value.abs() < MATE_THRESHOLD {
            let bound = if best_value >= beta {
                Bound::Lower
            } else {
                Bound::Upper
            };
            let stored_eval = if in_check { 0 } else { stand_pat };
            self.tt.store(
                self.board.hash(),
                value_to_tt(best_value, ply),
                bound,
                0,
                best_move,
                stored_eval,
            );
        }

        best_value
    }
}
