//! Staged move picker.
//!
//! Yields moves in the order the search wants to try them without
//! generating or scoring more than necessary: the TT move goes out
//! before any generation, captures are split into winning and losing
//! by static exchange, killers and the counter move come between, and
//! quiets are history-ordered with incremental selection. Evasion and
//! quiescence nodes get their own reduced stage chains.

use crate::board::{Board, Move, MoveList, Piece, ScoredMoveList};

use super::constants::{BAD_CAPTURE_BASE, GOOD_CAPTURE_BASE};
use super::history::Heuristics;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Stage {
    TtMove,
    GenCaptures,
    GoodCaptures,
    Killer1,
    Killer2,
    Counter,
    GenQuiets,
    Quiets,
    BadCaptures,
    GenEvasions,
    Evasions,
    QsGenCaptures,
    QsCaptures,
    QsGenChecks,
    QsChecks,
    Done,
}

/// What kind of node the picker serves.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum PickerKind {
    Main,
    Evasion,
    /// Quiescence; `include_checks` adds quiet checks after captures.
    Quiescence { include_checks: bool },
}

pub(crate) struct MovePicker {
    stage: Stage,
    kind: PickerKind,
    tt_move: Move,
    killers: [Move; 2],
    counter: Move,
    /// The previous (piece, to) for continuation-history scoring.
    prev_piece_to: Option<(Piece, usize)>,
    captures: ScoredMoveList,
    captures_idx: usize,
    bad_captures: ScoredMoveList,
    bad_idx: usize,
    quiets: ScoredMoveList,
    quiets_idx: usize,
}

impl MovePicker {
    pub(crate) fn new(
        kind: PickerKind,
        tt_move: Move,
        killers: [Move; 2],
        counter: Move,
        prev_piece_to: Option<(Piece, usize)>,
    ) -> Self {
        let stage = match kind {
            PickerKind::Main | PickerKind::Quiescence { .. } => Stage::TtMove,
            PickerKind::Evasion => Stage::TtMove,
        };
        MovePicker {
            stage,
            kind,
            tt_move,
            killers,
            counter,
            prev_piece_to,
            captures: ScoredMoveList::new(),
            captures_idx: 0,
            bad_captures: ScoredMoveList::new(),
            bad_idx: 0,
            quiets: ScoredMoveList::new(),
            quiets_idx: 0,
        }
    }

    /// Next pseudo-legal move, or `None` when exhausted. The caller is
    /// responsible for the final legality filter.
    pub(crate) fn next(&mut self, board: &mut Board, heuristics: &Heuristics) -> Option<Move> {
        loop {
            match self.stage {
                Stage::TtMove => {
                    self.stage = match self.kind {
                        PickerKind::Main => Stage::GenCaptures,
                        PickerKind::Evasion => Stage::GenEvasions,
                        PickerKind::Quiescence { .. } => Stage::QsGenCaptures,
                    };
                    if !self.tt_move.is_null() && board.is_pseudo_legal(self.tt_move) {
                        // Quiescence outside check only searches tactics
                        // (plus first-ply quiet checks).
                        let qs_quiet_skip = match self.kind {
                            PickerKind::Quiescence { include_checks } if self.tt_move.is_quiet() => {
                                !(include_checks && board.gives_check(self.tt_move))
                            }
                            _ => false,
                        };
                        if !qs_quiet_skip {
                            return Some(self.tt_move);
                        }
                    }
                }

                Stage::GenCaptures => {
                    let mut list = MoveList::new();
                    board.generate_captures(&mut list);
                    self.score_captures(board, &list);
                    self.stage = Stage::GoodCaptures;
                }

                Stage::GoodCaptures => match self.captures.pick_best(self.captures_idx) {
                    Some(scored) => {
                        self.captures_idx += 1;
                        let mv = scored.mv;
                        if mv == self.tt_move {
                            continue;
                        }
                        // Losing captures and underpromotions wait until
                        // the quiets have run out.
                        let under = matches!(
                            mv.promotion_piece(),
                            Some(p) if p != Piece::Queen
                        );
                        if !under && board.see_ge(mv, 0) {
                            return Some(mv);
                        }
                        self.bad_captures.push(mv, scored.score + BAD_CAPTURE_BASE);
                    }
                    None => self.stage = Stage::Killer1,
                },

                Stage::Killer1 => {
                    self.stage = Stage::Killer2;
                    let mv = self.killers[0];
                    if self.is_fresh_quiet(mv, board) {
                        return Some(mv);
                    }
                }

                Stage::Killer2 => {
                    self.stage = Stage::Counter;
                    let mv = self.killers[1];
                    if mv != self.killers[0] && self.is_fresh_quiet(mv, board) {
                        return Some(mv);
                    }
                }

                Stage::Counter => {
                    self.stage = Stage::GenQuiets;
                    let mv = self.counter;
                    if mv != self.killers[0]
                        && mv != self.killers[1]
                        && self.is_fresh_quiet(mv, board)
                    {
                        return Some(mv);
                    }
                }

                Stage::GenQuiets => {
                    let mut list = MoveList::new();
                    board.generate_quiets(&mut list);
                    self.score_quiets(board, heuristics, &list);
                    self.stage = Stage::Quiets;
                }

                Stage::Quiets => match self.quiets.pick_best(self.quiets_idx) {
                    Some(scored) => {
                        self.quiets_idx += 1;
                        let mv = scored.mv;
                        if mv == self.tt_move
                            || mv == self.killers[0]
                            || mv == self.killers[1]
                            || mv == self.counter
                        {
                            continue;
                        }
                        return Some(mv);
                    }
                    None => self.stage = Stage::BadCaptures,
                },

                Stage::BadCaptures => match self.bad_captures.pick_best(self.bad_idx) {
                    Some(scored) => {
                        self.bad_idx += 1;
                        return Some(scored.mv);
                    }
                    None => self.stage = Stage::Done,
                },

                Stage::GenEvasions => {
                    let mut list = MoveList::new();
                    board.generate_evasions(&mut list);
                    self.score_evasions(board, heuristics, &list);
                    self.stage = Stage::Evasions;
                }

                Stage::Evasions => match self.captures.pick_best(self.captures_idx) {
                    Some(scored) => {
                        self.captures_idx += 1;
                        if scored.mv == self.tt_move {
                            continue;
                        }
                        return Some(scored.mv);
                    }
                    None => self.stage = Stage::Done,
                },

                Stage::QsGenCaptures => {
                    let mut list = MoveList::new();
                    board.generate_captures(&mut list);
                    self.score_captures(board, &list);
                    self.stage = Stage::QsCaptures;
                }

                Stage::QsCaptures => match self.captures.pick_best(self.captures_idx) {
                    Some(scored) => {
                        self.captures_idx += 1;
                        if scored.mv == self.tt_move {
                            continue;
                        }
                        return Some(scored.mv);
                    }
                    None => {
                        self.stage = if matches!(
                            self.kind,
                            PickerKind::Quiescence { include_checks: true }
                        ) {
                            Stage::QsGenChecks
                        } else {
                            Stage::Done
                        };
                    }
                },

                Stage::QsGenChecks => {
                    let mut list = MoveList::new();
                    board.generate_quiet_checks(&mut list);
                    for mv in &list {
                        if *mv != self.tt_move {
                            self.quiets.push(*mv, 0);
                        }
                    }
                    self.stage = Stage::QsChecks;
                }

                Stage::QsChecks => match self.quiets.pick_best(self.quiets_idx) {
                    Some(scored) => {
                        self.quiets_idx += 1;
                        return Some(scored.mv);
                    }
                    None => self.stage = Stage::Done,
                },

                Stage::Done => return None,
            }
        }
    }

    /// A quiet candidate from the killer/counter slots, still pseudo-
    /// legal and not already yielded as the TT move.
    fn is_fresh_quiet(&self, mv: Move, board: &Board) -> bool {
        !mv.is_null() && mv != self.tt_move && mv.is_quiet() && board.is_pseudo_legal(mv)
    }

    /// MVV-LVA with a promotion lift: winning the most valuable victim
    /// with the least valuable attacker first.
    fn score_captures(&mut self, board: &Board, list: &MoveList) {
        for mv in list {
            let victim = if mv.is_en_passant() {
                Piece::Pawn.value()
            } else {
                board.piece_at(mv.to()).map_or(0, |(_, p)| p.value())
            };
            let attacker = board.piece_at(mv.from()).map_or(0, |(_, p)| p.value());
            let promo = mv.promotion_piece().map_or(0, Piece::value);
            let score = GOOD_CAPTURE_BASE + victim * 10 - attacker / 10 + promo;
            self.captures.push(*mv, score);
        }
    }

    fn score_quiets(&mut self, board: &Board, heuristics: &Heuristics, list: &MoveList) {
        let us = board.side_to_move();
        for mv in list {
            let mut score = heuristics.history.score(us, *mv) + heuristics.max_gain.get(*mv);
            if let Some(prev) = self.prev_piece_to {
                if let Some((_, piece)) = board.piece_at(mv.from()) {
                    score += heuristics.continuation.score(prev, (piece, mv.to().index()));
                }
            }
            self.quiets.push(*mv, score);
        }
    }

    /// Evasions order captures of the checker first, then quiets by the
    /// dedicated evasion history.
    fn score_evasions(&mut self, board: &Board, heuristics: &Heuristics, list: &MoveList) {
        let us = board.side_to_move();
        for mv in list {
            let score = if mv.is_capture() {
                let victim = if mv.is_en_passant() {
                    Piece::Pawn.value()
                } else {
                    board.piece_at(mv.to()).map_or(0, |(_, p)| p.value())
                };
                let attacker = board.piece_at(mv.from()).map_or(0, |(_, p)| p.value());
                GOOD_CAPTURE_BASE + victim * 10 - attacker / 10
            } else {
                heuristics.evasion_history.score(us, *mv)
            };
            self.captures.push(*mv, score);
        }
    }
}
