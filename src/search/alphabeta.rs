//! The alpha-beta node pipeline.
//!
//! Draw and mate-distance gates, TT probe, static eval, the node-level
//! prunes (razoring, reverse futility, null move, ProbCut), internal
//! iterative deepening, then the staged move loop with SEE/futility/
//! late-move pruning, log-log reductions, PVS re-searches, and the
//! check/singular/recapture/passed-push extensions.

use crate::board::{Color, Move, Piece, MAX_PLY};
use crate::eval::NO_EVAL;
use crate::tt::Bound;

use super::constants::{
    mated_in, value_from_tt, value_to_tt, DRAW_SCORE, INFINITE_SCORE, MATE_SCORE, MATE_THRESHOLD,
};
use super::picker::{MovePicker, PickerKind};
use super::SearchWorker;

/// Precomputed log-log LMR reduction table.
fn lmr_reduction(depth: u32, move_idx: usize) -> u32 {
    use once_cell::sync::Lazy;
    static TABLE: Lazy<[[u8; 64]; 64]> = Lazy::new(|| {
        let mut t = [[0u8; 64]; 64];
        for (d, row) in t.iter_mut().enumerate().skip(1) {
            for (m, cell) in row.iter_mut().enumerate().skip(1) {
                let r = 0.75 + (d as f64).ln() * (m as f64).ln() / 2.25;
                *cell = r as u8;
            }
        }
        t
    });
    u32::from(TABLE[depth.min(63) as usize][move_idx.min(63)])
}

impl SearchWorker {
    /// Full-width alpha-beta. `cut_node` marks expected fail-highs;
    /// `allow_null` is false directly after a null move.
    #[allow(clippy::too_many_lines)]
    pub(crate) fn alphabeta(
        &mut self,
        depth: u32,
        mut alpha: i32,
        mut beta: i32,
        cut_node: bool,
        ply: usize,
        allow_null: bool,
    ) -> i32 {
        let is_root = ply == 0;
        let is_pv = beta > alpha + 1;

        if depth == 0 || ply >= MAX_PLY {
            return self.quiescence(alpha, beta, ply, 0);
        }

        self.nodes += 1;
        if ply as u32 + 1 > self.seldepth {
            self.seldepth = ply as u32 + 1;
        }
        if self.should_stop() {
            return DRAW_SCORE;
        }

        let in_check = self.board.in_check();
        let excluded = self.ply_state(ply).excluded;
        let excluded_active = !excluded.is_null();

        // Upcoming repetition, fifty-move rule, insufficient material.
        if !is_root
            && (self.board.is_repetition()
                || self.board.halfmove_clock() >= 100
                || self.board.is_insufficient_material())
        {
            return DRAW_SCORE;
        }

        // Mate distance pruning: even a forced mate here cannot beat an
        // already-proven shorter one.
        if !is_root {
            alpha = alpha.max(mated_in(ply));
            beta = beta.min(-mated_in(ply + 1));
            if alpha >= beta {
                return alpha;
            }
        }

        // Transposition table.
        let tt_entry = if excluded_active {
            None
        } else {
            self.tt.probe(self.board.hash())
        };
        let mut tt_move = tt_entry.map_or(Move::NULL, |e| e.mv);
        let tt_value = tt_entry.map(|e| value_from_tt(e.value, ply));

        if let (Some(entry), Some(value)) = (tt_entry, tt_value) {
            let cutoff_ok = !is_pv && entry.depth >= depth && !self.board.is_repetition();
            if cutoff_ok {
                let cuts = match entry.bound {
                    Bound::Exact => true,
                    Bound::Lower => value >= beta,
                    Bound::Upper => value <= alpha,
                };
                if cuts {
                    return value;
                }
            }
        }

        // Static evaluation, cached on the stack for the children and
        // the improving heuristic. TT eval is reused when present.
        let prev_positional = if ply > 0 {
            self.ply_state(ply - 1).positional
        } else {
            NO_EVAL
        };
        let eval_result = self
            .evaluator
            .evaluate(&self.board, alpha, beta, prev_positional);
        let static_eval = if in_check {
            -INFINITE_SCORE
        } else {
            eval_result.value
        };
        {
            let state = self.ply_state_mut(ply);
            state.static_eval = if in_check { NO_EVAL } else { static_eval };
            state.positional = eval_result.positional;
        }
        let improving = !in_check
            && ply >= 2
            && self.ply_state(ply - 2).static_eval != NO_EVAL
            && static_eval > self.ply_state(ply - 2).static_eval;

        // --------------------------------------------------------------
        // Node-level pruning.
        // --------------------------------------------------------------
        if !is_pv && !in_check && !excluded_active {
            // Razoring: hopeless nodes drop straight into quiescence.
            if depth <= self.params.razor_depth
                && static_eval + self.params.razor_margin * depth as i32 <= alpha
            {
                let value = self.quiescence(alpha, beta, ply, 0);
                if value <= alpha {
                    return value;
                }
            }

            // Reverse futility: a comfortable static margin over beta.
            if depth <= self.params.rfp_depth
                && beta.abs() < MATE_THRESHOLD
                && static_eval - self.params.rfp_margin * (depth as i32 - i32::from(improving))
                    >= beta
                && self.board.non_pawn_material(self.board.side_to_move()) > 0
            {
                return static_eval;
            }

            // Null move: hand over the move and search reduced. Only
            // with non-pawn material, and verified at high depth.
            if allow_null
                && depth >= self.params.null_min_depth
                && static_eval >= beta
                && self.board.non_pawn_material(self.board.side_to_move()) > 0
            {
                let r = self.params.null_base_reduction
                    + depth / 4
                    + ((static_eval - beta) / 200).min(3) as u32;
                let reduced = depth.saturating_sub(r + 1);

                self.ply_state_mut(ply).current_move = Move::NULL;
                self.ply_state_mut(ply).moved_piece_to = None;
                let info = self.board.make_null_move();
                let value = -self.alphabeta(reduced, -beta, -beta + 1, !cut_node, ply + 1, false);
                self.board.unmake_null_move(info);

                if self.should_stop() {
                    return DRAW_SCORE;
                }
                if value >= beta {
                    // Never return unproven mates from a null search.
                    let value = value.min(MATE_THRESHOLD - 1);
                    if depth < self.params.null_verification_depth {
                        return value;
                    }
                    // Verification search without the null move.
                    let verified = self.alphabeta(reduced, beta - 1, beta, false, ply, false);
                    if verified >= beta {
                        return value;
                    }
                }
            }

            // ProbCut: a good capture beating beta by a margin at
            // reduced depth almost always beats it at full depth.
            if depth >= self.params.probcut_min_depth && beta.abs() < MATE_THRESHOLD {
                if let Some(value) = self.probcut(depth, beta, ply) {
                    return value;
                }
            }
        }

        // Internal iterative deepening: a PV node without a TT move
        // searches shallower first to find one.
        if is_pv && !excluded_active && tt_move.is_null() && depth >= self.params.iid_min_depth {
            self.alphabeta(depth - 2, alpha, beta, cut_node, ply, false);
            if let Some(entry) = self.tt.probe(self.board.hash()) {
                tt_move = entry.mv;
            }
        }

        // Singular extension probe: when the TT move alone beats a
        // lowered bound at reduced depth, it earns an extra ply.
        let mut singular_extension = 0u32;
        if !is_root
            && !excluded_active
            && depth >= self.params.singular_min_depth
            && !tt_move.is_null()
        {
            if let (Some(entry), Some(value)) = (tt_entry, tt_value) {
                if entry.depth + 3 >= depth
                    && matches!(entry.bound, Bound::Lower | Bound::Exact)
                    && value.abs() < MATE_THRESHOLD
                {
                    let singular_beta = value - self.params.singular_margin * depth as i32;
                    self.ply_state_mut(ply).excluded = tt_move;
                    let singular_value = self.alphabeta(
                        (depth - 1) / 2,
                        singular_beta - 1,
                        singular_beta,
                        cut_node,
                        ply,
                        false,
                    );
                    self.ply_state_mut(ply).excluded = Move::NULL;
                    if singular_value < singular_beta {
                        singular_extension = 1;
                    }
                }
            }
        }

        // --------------------------------------------------------------
        // Move loop.
        // --------------------------------------------------------------
        let kind = if in_check {
            PickerKind::Evasion
        } else {
            PickerKind::Main
        };
        let killers = self.heuristics.killers.get(ply);
        let counter = self.heuristics.counter_moves.get(self.previous_move(ply));
        let prev_piece_to = self.previous_piece_to(ply);
        let mut picker = MovePicker::new(kind, tt_move, killers, counter, prev_piece_to);

        let us = self.board.side_to_move();
        let mut best_value = -INFINITE_SCORE;
        let mut best_move = Move::NULL;
        let mut moves_tried = 0usize;
        let mut quiets_tried: [Move; 64] = [Move::NULL; 64];
        let mut quiets_count = 0usize;

        loop {
            let Some(mv) = picker.next(&mut self.board, &self.heuristics) else {
                break;
            };

            if mv == excluded {
                continue;
            }
            if is_root && !self.root_moves.is_empty() && !self.root_moves.contains(&mv) {
                continue;
            }
            if mv.is_castling() && !self.board.castle_path_safe(mv) {
                continue;
            }

            let is_quiet = mv.is_quiet();
            let gives_check = self.board.gives_check(mv);

            // Shallow-depth SEE pruning.
            if !is_root && best_value > -MATE_THRESHOLD {
                if is_quiet
                    && depth <= self.params.see_quiet_depth
                    && !in_check
                    && !gives_check
                    && moves_tried > 0
                    && !self.board.see_quiet_safe(mv)
                {
                    continue;
                }
                if mv.is_capture()
                    && depth <= self.params.see_capture_depth
                    && !in_check
                    && !self
                        .board
                        .see_ge(mv, -self.params.see_capture_margin * depth as i32)
                {
                    continue;
                }

                // Move-level futility: a quiet move with no hope of
                // raising alpha.
                if is_quiet
                    && !is_pv
                    && !in_check
                    && !gives_check
                    && depth <= self.params.futility_depth
                    && moves_tried > 0
                    && static_eval + self.params.futility_margin * depth as i32 <= alpha
                {
                    continue;
                }

                // Late move pruning.
                if is_quiet
                    && !is_pv
                    && !in_check
                    && !gives_check
                    && depth <= self.params.lmp_depth
                    && moves_tried > self.params.lmp_base + (depth as usize).pow(2)
                {
                    continue;
                }
            }

            let moved_piece = self.board.piece_at(mv.from()).map(|(_, p)| p);
            let recapture = {
                let prev = self.previous_move(ply);
                mv.is_capture() && !prev.is_null() && prev.to() == mv.to()
            };

            let info = self.board.make_move(mv);
            if self.board.is_in_check(us) {
                self.board.unmake_move(mv, info);
                continue;
            }

            moves_tried += 1;
            if is_quiet && quiets_count < quiets_tried.len() {
                quiets_tried[quiets_count] = mv;
                quiets_count += 1;
            }
            {
                let state = self.ply_state_mut(ply);
                state.current_move = mv;
                state.moved_piece_to = moved_piece.map(|p| (p, mv.to().index()));
            }

            // Extensions.
            let mut extension = 0u32;
            if gives_check {
                extension = 1;
            }
            if mv == tt_move && singular_extension > 0 {
                extension = extension.max(singular_extension);
            }
            if recapture && is_pv && depth <= 8 {
                extension = extension.max(1);
            }
            if moved_piece == Some(Piece::Pawn) {
                let rel = mv.to().relative_rank(us == Color::White);
                if rel >= 6 {
                    extension = extension.max(1);
                }
            }

            let new_depth = depth - 1 + extension;

            // Late move reduction for quiet, unexciting moves.
            let mut reduction = 0u32;
            if depth >= 3
                && moves_tried > 1 + usize::from(is_root)
                && is_quiet
                && !in_check
                && !gives_check
                && extension == 0
            {
                reduction = lmr_reduction(depth, moves_tried);
                if is_pv {
                    reduction = reduction.saturating_sub(1);
                }
                if !improving {
                    reduction += 1;
                }
                if cut_node {
                    reduction += 1;
                }
                let hist = self.heuristics.history.score(us, mv);
                if hist > 4000 {
                    reduction = reduction.saturating_sub(1);
                } else if hist < -4000 {
                    reduction += 1;
                }
                reduction = reduction.min(new_depth.saturating_sub(1));
            }

            let mut value;
            if moves_tried == 1 {
                value = -self.alphabeta(new_depth, -beta, -alpha, false, ply + 1, true);
            } else {
                // PVS: null-window probe, re-search on promise.
                value = -self.alphabeta(
                    new_depth - reduction.min(new_depth),
                    -alpha - 1,
                    -alpha,
                    true,
                    ply + 1,
                    true,
                );
                if value > alpha && reduction > 0 {
                    value = -self.alphabeta(new_depth, -alpha - 1, -alpha, !cut_node, ply + 1, true);
                }
                if value > alpha && value < beta {
                    value = -self.alphabeta(new_depth, -beta, -alpha, false, ply + 1, true);
                }
            }

            self.board.unmake_move(mv, info);

            if self.should_stop() {
                return DRAW_SCORE;
            }

            if value > best_value {
                best_value = value;
                best_move = mv;

                if is_root {
                    self.best_root_move = Some(mv);
                    self.best_root_score = value;
                }

                if value > alpha {
                    alpha = value;
                    if alpha >= beta {
                        self.on_beta_cutoff(mv, ply, depth, us, &quiets_tried[..quiets_count]);
                        break;
                    }
                }
            }
        }

        if moves_tried == 0 {
            // No legal move: mate or stalemate (unless a move was
            // excluded, in which case fail low for the singular probe).
            if excluded_active {
                return alpha;
            }
            return if in_check { mated_in(ply) } else { DRAW_SCORE };
        }

        // Store the result.
        if !excluded_active && !self.should_stop() {
            let bound = if best_value >= beta {
                Bound::Lower
            } else if is_pv && !best_move.is_null() && best_value > -INFINITE_SCORE {
                Bound::Exact
            } else {
                Bound::Upper
            };
            let stored_eval = if in_check { 0 } else { static_eval };
            self.tt.store(
                self.board.hash(),
                value_to_tt(best_value, ply),
                bound,
                depth,
                best_move,
                stored_eval.clamp(-MATE_SCORE, MATE_SCORE),
            );
        }

        best_value
    }

    /// ProbCut: try winning captures with a raised beta at reduced
    /// depth; a hit prunes the whole node.
    fn probcut(&mut self, depth: u32, beta: i32, ply: usize) -> Option<i32> {
        let probcut_beta = beta + self.params.probcut_margin;
        let reduced = depth.saturating_sub(self.params.probcut_reduction);
        let us = self.board.side_to_move();

        let mut captures = crate::board::MoveList::new();
        self.board.generate_captures(&mut captures);

        for mv in &captures {
            let mv = *mv;
            if !self.board.see_ge(mv, probcut_beta - self.ply_state(ply).static_eval) {
                continue;
            }
            let info = self.board.make_move(mv);
            if self.board.is_in_check(us) {
                self.board.unmake_move(mv, info);
                continue;
            }
            {
                let state = self.ply_state_mut(ply);
                state.current_move = mv;
                state.moved_piece_to = None;
            }
            let value = -self.alphabeta(reduced, -probcut_beta, -probcut_beta + 1, true, ply + 1, true);
            self.board.unmake_move(mv, info);

            if self.should_stop() {
                return None;
            }
            if value >= probcut_beta {
                return Some(value);
            }
        }
        None
    }

    /// Beta cutoff bookkeeping: killers, counter move, histories and
    /// the max-gain table; quiet alternatives get a negative nudge.
    fn on_beta_cutoff(
        &mut self,
        mv: Move,
        ply: usize,
        depth: u32,
        us: Color,
        quiets_tried: &[Move],
    ) {
        let bonus = (depth * depth + 2 * depth) as i32;
        let in_check = self.board.in_check();

        if mv.is_quiet() {
            self.heuristics.killers.update(ply, mv);

            let prev = self.previous_move(ply);
            if !prev.is_null() {
                self.heuristics.counter_moves.set(prev, mv);
            }

            if in_check {
                self.heuristics.evasion_history.update(us, mv, bonus);
            } else {
                self.heuristics.history.update(us, mv, bonus);
            }

            if let Some(prev_pt) = self.previous_piece_to(ply) {
                if let Some((_, piece)) = self.board.piece_at(mv.from()) {
                    self.heuristics
                        .continuation
                        .update(prev_pt, (piece, mv.to().index()), bonus);
                }
            }

            // Gain bookkeeping: how much static eval the move swung.
            let state_eval = self.ply_state(ply).static_eval;
            if state_eval != NO_EVAL && ply + 1 < MAX_PLY {
                let child_eval = self.ply_state(ply + 1).static_eval;
                if child_eval != NO_EVAL && child_eval != -INFINITE_SCORE {
                    self.heuristics.max_gain.update(mv, -child_eval - state_eval);
                }
            }

            // The quiets that failed to cut are demoted.
            for quiet in quiets_tried {
                if *quiet != mv {
                    self.heuristics.history.update(us, *quiet, -bonus);
                }
            }
        }
    }
}
