//! Static evaluation.
//!
//! The evaluator composes material, piece activity, pawn structure,
//! king safety, threats and passed pawns into a tapered middlegame/
//! endgame score. It is called at every quiet search node, so the heavy
//! sub-terms are fed by two per-worker caches (pawn structure and
//! material) and a lazy shortcut skips the full pass when the previous
//! ply's positional balance already decides the window.

mod material;
mod pawns;
mod tables;

pub use tables::{EvalParams, MAX_PHASE, SCALE_NORMAL};

use std::sync::Arc;

use crate::board::attacks::{
    bishop_attacks, king_attacks, knight_attacks, queen_attacks, rook_attacks,
};
use crate::board::geometry::{distance, king_flank, king_zone};
use crate::board::{Bitboard, Board, Color, Piece, Score, Square};

use material::MaterialCache;
use pawns::PawnCache;

/// Sentinel for "no cached positional balance".
pub const NO_EVAL: i32 = i32::MIN + 1;

/// Scores beyond this are reserved for forced mates and known wins;
/// the lazy shortcut stays out of such windows.
const WIN_SCORE: i32 = 9000;

const ALL: usize = 6;

/// Per-worker evaluator state: caches plus the adjustable parameters.
pub struct Evaluator {
    pub params: Arc<EvalParams>,
    pawn_cache: PawnCache,
    material_cache: MaterialCache,
    /// Contempt in centipawns, applied from `contempt_color`'s
    /// perspective and negated for the other side.
    pub contempt: i32,
    pub contempt_color: Color,
    /// Fifty-move fade onset, in plies of the halfmove clock.
    pub fifty_distance: i32,
}

/// Result of a full or lazy evaluation.
#[derive(Clone, Copy, Debug)]
pub struct EvalResult {
    /// Value in centipawns from the side-to-move's perspective.
    pub value: i32,
    /// Positional balance from white's perspective, for the next ply's
    /// lazy shortcut; `NO_EVAL` when unavailable.
    pub positional: i32,
}

impl Evaluator {
    #[must_use]
    pub fn new(params: Arc<EvalParams>) -> Self {
        Evaluator {
            params,
            pawn_cache: PawnCache::new(),
            material_cache: MaterialCache::new(),
            contempt: 0,
            contempt_color: Color::White,
            fifty_distance: 50,
        }
    }

    /// Drop all cached pawn/material entries (new game).
    pub fn clear_caches(&mut self) {
        self.pawn_cache.clear();
        self.material_cache.clear();
    }

    /// Evaluate `board` within the `(alpha, beta)` window.
    /// `prev_positional` is the positional balance the parent ply cached
    /// (white perspective), or `NO_EVAL`.
    #[must_use]
    pub fn evaluate(
        &mut self,
        board: &Board,
        alpha: i32,
        beta: i32,
        prev_positional: i32,
    ) -> EvalResult {
        // Check resolution is the search's job.
        if board.in_check() {
            return EvalResult {
                value: 0,
                positional: NO_EVAL,
            };
        }

        let params_arc = Arc::clone(&self.params);
        let params: &EvalParams = &params_arc;
        let material = self.material_cache.probe(board, params);

        // Recognized endgames answer directly.
        if let Some((endgame_fn, strong)) = material.endgame {
            let white_value = endgame_fn(board, strong);
            let value = self.finish(board, white_value, true);
            return EvalResult {
                value,
                positional: NO_EVAL,
            };
        }

        let phase = material.phase;
        let material_white = material.score.taper(phase, MAX_PHASE, SCALE_NORMAL, SCALE_NORMAL);

        // Lazy shortcut: with a sane window, a cached positional balance
        // and no promotion race in sight, material plus the previous
        // balance is close enough to prune a full pass.
        if prev_positional != NO_EVAL
            && alpha > -WIN_SCORE
            && beta < WIN_SCORE
            && board.non_pawn_material(Color::White) > Piece::Knight.value()
            && board.non_pawn_material(Color::Black) > Piece::Knight.value()
            && (board.pieces(Color::White, Piece::Pawn) & Bitboard::RANK_7).is_empty()
            && (board.pieces(Color::Black, Piece::Pawn) & Bitboard::RANK_2).is_empty()
        {
            let lazy_white = material_white + prev_positional;
            let lazy = self.finish(board, lazy_white, false);
            if lazy <= alpha || lazy >= beta {
                return EvalResult {
                    value: lazy,
                    positional: prev_positional,
                };
            }
        }

        // Full pass: pawn structure, attack map, per-piece terms.
        let pawn_entry = self.pawn_cache.probe(board, params);
        let mut score = material.score + pawn_entry.score;

        let mut info = AttackInfo::new(board, pawn_entry.attacks);

        for us in Color::BOTH {
            let side = eval_pieces(board, params, us, &mut info)
                + pawn_entry.king_shelter(board, params, us);
            score += if us == Color::White { side } else { -side };
        }

        let passed = [pawn_entry.passed[0], pawn_entry.passed[1]];
        let safe_for_pawn = pawn_entry.safe_for_pawn;
        let conversion_difficult = pawn_entry.conversion_difficult;
        let average_file = pawn_entry.average_file;
        let asymmetry = pawn_entry.asymmetry;
        let pawn_counts = pawn_entry.pawn_count;

        for us in Color::BOTH {
            let side = eval_king_attack(board, params, us, &info)
                + eval_threats(board, params, us, &info)
                + eval_passed_pawns(board, params, us, passed[us.index()], &info)
                + eval_space(board, params, us, safe_for_pawn[us.index()])
                + eval_flank_attack(board, params, us, &info)
                + eval_blocked_pawns(board, params, us);
            score += if us == Color::White { side } else { -side };
        }

        // Taper, scaling the endgame half toward the draw when the
        // leading side's material configuration converts poorly.
        let leading = if score.eg() >= 0 {
            Color::White
        } else {
            Color::Black
        };
        let scale = material.scale[leading.index()];
        let mut white_value = score.taper(phase, MAX_PHASE, scale, SCALE_NORMAL);

        // Initiative: open play favors the side with the better endgame.
        white_value += initiative(board, params, asymmetry, pawn_counts, score.eg());

        // Conversion: discount advantages that are hard to cash in
        // (few pawns, or all of them on one wing).
        let mut conversion = material.conversion[leading.index()];
        if conversion_difficult[leading.index()] {
            conversion = conversion * 3 / 4;
            // Pawns huddled at the rim convert worst of all.
            if !(4..=10).contains(&average_file[leading.index()]) {
                conversion = conversion * 7 / 8;
            }
        }
        white_value = white_value * conversion / material::CONVERSION_NORMAL;

        let positional = white_value - material_white;
        let value = self.finish(board, white_value, true);
        EvalResult { value, positional }
    }

    /// Shared tail: perspective flip, tempo, contempt, fifty-move fade
    /// and the bare-side draw clamp.
    fn finish(&self, board: &Board, white_value: i32, check_draw_clamp: bool) -> i32 {
        let stm = board.side_to_move();
        let mut value = if stm == Color::White {
            white_value
        } else {
            -white_value
        };
        value += self.params.tempo;

        if self.contempt != 0 {
            value += if stm == self.contempt_color {
                self.contempt
            } else {
                -self.contempt
            };
        }

        // Fade toward the draw as the fifty-move counter climbs.
        let counter = board.halfmove_clock() as i32;
        if counter > self.fifty_distance {
            value = value * (5 * (2 * self.fifty_distance - counter) + 6) / 256;
        }

        if check_draw_clamp && cannot_win(board, value) {
            value = 0;
        }

        value.clamp(-WIN_SCORE + 1, WIN_SCORE - 1)
    }
}

/// Stalemate-like clamp: the side the value favors has bare king and
/// pawns, every pawn is blocked, and none has passed.
fn cannot_win(board: &Board, value_stm: i32) -> bool {
    if value_stm == 0 {
        return false;
    }
    let stm = board.side_to_move();
    let winner = if value_stm > 0 { stm } else { stm.opponent() };
    if board.non_pawn_material(winner) > 0 {
        return false;
    }
    let pawns = board.pieces(winner, Piece::Pawn);
    if pawns.is_empty() {
        // Bare king cannot win.
        return true;
    }
    let blocked = pawns.shift_forward(winner) & board.occupied();
    if blocked.popcount() != pawns.popcount() {
        return false;
    }
    // All pawns rammed; without a passer the king has no target.
    for sq in pawns.iter() {
        if (crate::board::geometry::passed_span(winner, sq)
            & board.pieces(winner.opponent(), Piece::Pawn))
        .is_empty()
        {
            return false;
        }
    }
    true
}

/// Attack map shared by the whole-board terms.
struct AttackInfo {
    /// Attacks per (side, piece kind); index 6 is the union.
    attacks: [[Bitboard; 7]; 2],
    /// Squares attacked at least twice by the side.
    double: [Bitboard; 2],
    /// Squares usable for mobility counts (not own pawns, not squares
    /// covered by enemy pawns, not the own king).
    mobility_area: [Bitboard; 2],
    /// Zone around each side's own king.
    king_zone: [Bitboard; 2],
    /// Pieces of each side attacking the enemy king zone, and the
    /// accumulated attack weight.
    king_attackers: [i32; 2],
    king_attack_weight: [i32; 2],
    /// Pieces pinned to their own king.
    pinned: [Bitboard; 2],
}

impl AttackInfo {
    fn new(board: &Board, pawn_attacks: [Bitboard; 2]) -> Self {
        let mut info = AttackInfo {
            attacks: [[Bitboard::EMPTY; 7]; 2],
            double: [Bitboard::EMPTY; 2],
            mobility_area: [Bitboard::EMPTY; 2],
            king_zone: [Bitboard::EMPTY; 2],
            king_attackers: [0; 2],
            king_attack_weight: [0; 2],
            pinned: [Bitboard::EMPTY; 2],
        };
        for us in Color::BOTH {
            let them = us.opponent();
            let i = us.index();
            let king = board.king_square(us);

            info.attacks[i][Piece::Pawn.index()] = pawn_attacks[i];
            let king_att = king_attacks(king);
            info.attacks[i][Piece::King.index()] = king_att;
            info.double[i] = pawn_attacks[i] & king_att;
            info.attacks[i][ALL] = pawn_attacks[i] | king_att;

            info.king_zone[i] = king_zone(us, king);
            info.pinned[i] = board.pinned_pieces(us);
            info.mobility_area[i] = !(board.pieces(us, Piece::Pawn)
                | Bitboard::from_square(king)
                | pawn_attacks[them.index()]);
        }
        info
    }

    fn add(&mut self, us: Color, piece: Piece, attacks: Bitboard) {
        let i = us.index();
        self.double[i] |= self.attacks[i][ALL] & attacks;
        self.attacks[i][piece.index()] |= attacks;
        self.attacks[i][ALL] |= attacks;
    }
}

/// Per-piece terms for one side: mobility, outposts, file control,
/// pattern bonuses, and the king-zone attack accumulators.
fn eval_pieces(board: &Board, params: &EvalParams, us: Color, info: &mut AttackInfo) -> Score {
    let them = us.opponent();
    let mut score = Score::ZERO;
    let occupied = board.occupied();
    let own_pawns = board.pieces(us, Piece::Pawn);
    let their_pawns = board.pieces(them, Piece::Pawn);
    let own_king = board.king_square(us);
    let enemy_zone = info.king_zone[them.index()];
    let white = us == Color::White;

    for piece in Piece::MINOR_AND_MAJOR {
        for sq in board.pieces(us, piece).iter() {
            let attacks = match piece {
                Piece::Knight => knight_attacks(sq),
                Piece::Bishop => bishop_attacks(sq, occupied ^ board.pieces(us, Piece::Queen)),
                Piece::Rook => rook_attacks(
                    sq,
                    occupied ^ board.pieces(us, Piece::Queen) ^ board.pieces(us, Piece::Rook),
                ),
                _ => queen_attacks(sq, occupied),
            };
            info.add(us, piece, attacks);

            let pst_sq = if white { sq } else { sq.flip_vertical() };
            score += params.pst[piece.index()][pst_sq.index()];

            // Mobility over the safe area.
            let reach = (attacks & info.mobility_area[us.index()]).popcount() as usize;
            score += match piece {
                Piece::Knight => params.mobility_knight[reach.min(8)],
                Piece::Bishop => params.mobility_bishop[reach.min(13)],
                Piece::Rook => params.mobility_rook[reach.min(14)],
                _ => params.mobility_queen[reach.min(27)],
            };

            // King-zone pressure accumulates into the attack index.
            if attacks.intersects(enemy_zone) {
                info.king_attackers[us.index()] += 1;
                info.king_attack_weight[us.index()] += params.king_attack_weight[piece.index()];
            }

            if info.pinned[us.index()].contains(sq) {
                score += params.pinned_piece;
            }

            let rel_rank = sq.relative_rank(white);
            match piece {
                Piece::Knight => {
                    if is_outpost(sq, us, info, their_pawns) {
                        score += params.outpost_knight;
                    }
                    score += params.knight_king_distance * distance(sq, own_king) as i32;
                    if minor_shields_king(sq, own_king, us) {
                        score += params.minor_shield;
                    }
                }
                Piece::Bishop => {
                    if is_outpost(sq, us, info, their_pawns) {
                        score += params.outpost_bishop;
                    }
                    let same_color = if Bitboard::LIGHT_SQUARES.contains(sq) {
                        Bitboard::LIGHT_SQUARES
                    } else {
                        Bitboard::DARK_SQUARES
                    };
                    score += params.bishop_pawns_on_color
                        * (own_pawns & same_color).popcount() as i32;
                    if is_fianchetto(sq, us) {
                        score += params.fianchetto;
                    }
                    if is_trapped_bishop(board, sq, us) {
                        score += params.trapped_bishop;
                    }
                    if minor_shields_king(sq, own_king, us) {
                        score += params.minor_shield;
                    }
                }
                Piece::Rook => {
                    let file_bit = 1u8 << sq.file();
                    let own_open = board_half_open(board, us, file_bit);
                    let their_open = board_half_open(board, them, file_bit);
                    if own_open && their_open {
                        score += params.rook_open_file;
                    } else if own_open {
                        score += params.rook_half_open_file;
                    }
                    if rel_rank == 6 {
                        let their_king_back =
                            board.king_square(them).relative_rank(!white) <= 1;
                        let pawns_on_seventh = (their_pawns
                            & Bitboard::rank_mask(sq.rank()))
                        .any();
                        if their_king_back || pawns_on_seventh {
                            score += params.rook_on_seventh;
                        }
                    }
                }
                _ => {
                    // Queen centrality, stronger near the middle.
                    let center_dist = center_distance(sq);
                    score += params.queen_centrality * (3 - center_dist).max(0);
                }
            }
        }
    }

    let king_pst_sq = if white {
        own_king
    } else {
        own_king.flip_vertical()
    };
    score += params.pst[Piece::King.index()][king_pst_sq.index()];

    score
}

fn board_half_open(board: &Board, side: Color, file_bit: u8) -> bool {
    let mut occupied_files = 0u8;
    for sq in board.pieces(side, Piece::Pawn).iter() {
        occupied_files |= 1 << sq.file();
    }
    occupied_files & file_bit == 0
}

fn center_distance(sq: Square) -> i32 {
    let f = sq.file() as i32;
    let r = sq.rank() as i32;
    let df = (f - 3).max(4 - f).max(0);
    let dr = (r - 3).max(4 - r).max(0);
    df.max(dr)
}

/// A strong square: on ranks 4-6 relative, guarded by an own pawn, and
/// out of reach of enemy pawn contests.
fn is_outpost(sq: Square, us: Color, info: &AttackInfo, their_pawns: Bitboard) -> bool {
    let rel_rank = sq.relative_rank(us == Color::White);
    if !(3..=5).contains(&rel_rank) {
        return false;
    }
    if !info.attacks[us.index()][Piece::Pawn.index()].contains(sq) {
        return false;
    }
    let contest = crate::board::geometry::passed_span(us, sq)
        & !crate::board::geometry::forward_file(us, sq);
    (contest & their_pawns).is_empty()
}

fn is_fianchetto(sq: Square, us: Color) -> bool {
    let home = if us == Color::White { 1 } else { 6 };
    sq.rank() == home && (sq.file() == 1 || sq.file() == 6)
}

fn minor_shields_king(sq: Square, king: Square, us: Color) -> bool {
    sq.file() == king.file()
        && sq.index() as isize == king.index() as isize + us.pawn_push()
}

/// Corner-trapped bishop (the classic a7/h7 pawn grab gone wrong).
fn is_trapped_bishop(board: &Board, sq: Square, us: Color) -> bool {
    let them = us.opponent();
    let their_pawns = board.pieces(them, Piece::Pawn);
    let rel = |rank: usize, file: usize| -> Square {
        if us == Color::White {
            Square::new(rank, file)
        } else {
            Square::new(7 - rank, file)
        }
    };
    let traps: [(Square, [Square; 2]); 4] = [
        (rel(6, 0), [rel(5, 1), rel(6, 2)]), // a7 trapped by b6/c7
        (rel(6, 7), [rel(5, 6), rel(6, 5)]), // h7 trapped by g6/f7
        (rel(5, 0), [rel(4, 1), rel(5, 2)]), // a6 trapped by b5/c6
        (rel(5, 7), [rel(4, 6), rel(5, 5)]), // h6 trapped by g5/f6
    ];
    for (trap_sq, blockers) in traps {
        if sq == trap_sq
            && their_pawns.contains(blockers[0])
            && their_pawns.contains(blockers[1])
        {
            return true;
        }
    }
    false
}

/// King-attack term for `us` attacking the enemy king, mapped through
/// the safety table after clamping the accumulated index.
fn eval_king_attack(board: &Board, params: &EvalParams, us: Color, info: &AttackInfo) -> Score {
    let them = us.opponent();
    let i = us.index();
    if info.king_attackers[i] < 2 {
        return Score::ZERO;
    }

    let their_king = board.king_square(them);
    let their_king_ring = king_attacks(their_king);

    let mut index = info.king_attack_weight[i] * info.king_attackers[i] / 2;

    // Ring squares we hit that only the king defends.
    let weak_ring = their_king_ring
        & info.attacks[i][ALL]
        & !info.double[them.index()];
    index += params.king_ring_pressure * weak_ring.popcount() as i32;

    if info.pinned[them.index()].any() {
        index += params.pin_danger;
    }

    // Checking squares, safe when undefended or only king-defended while
    // we attack twice.
    let occupied = board.occupied();
    let check_ok = !board.occupied_by(us);
    let safe = !info.attacks[them.index()][ALL]
        | (info.double[i] & !info.double[them.index()] & their_king_ring);

    let knight_checks = knight_attacks(their_king) & check_ok;
    let bishop_checks = bishop_attacks(their_king, occupied) & check_ok;
    let rook_checks = rook_attacks(their_king, occupied) & check_ok;

    for (piece, mask) in [
        (Piece::Knight, knight_checks),
        (Piece::Bishop, bishop_checks),
        (Piece::Rook, rook_checks),
        (Piece::Queen, bishop_checks | rook_checks),
    ] {
        let giving = mask & info.attacks[i][piece.index()];
        if giving.any() {
            if (giving & safe).any() {
                index += params.safe_check[piece.index()];
            } else {
                index += params.unsafe_check[piece.index()];
            }
        }
    }

    params.safety(index)
}

/// Threat terms: hanging pieces, minors ganging up on majors, pawn
/// pushes that fork, and king grabs.
fn eval_threats(board: &Board, params: &EvalParams, us: Color, info: &AttackInfo) -> Score {
    let them = us.opponent();
    let i = us.index();
    let j = them.index();
    let mut score = Score::ZERO;

    let their_pieces = board.occupied_by(them) & !board.pieces(them, Piece::King);

    // Hanging: attacked, not defended at all.
    let hanging = their_pieces & info.attacks[i][ALL] & !info.attacks[j][ALL];
    score += params.hanging_piece * hanging.popcount() as i32;

    // Minors hitting rooks and queens.
    let minors_attacks =
        info.attacks[i][Piece::Knight.index()] | info.attacks[i][Piece::Bishop.index()];
    let majors = board.pieces(them, Piece::Rook) | board.pieces(them, Piece::Queen);
    score += params.threat_minor_on_major * (minors_attacks & majors).popcount() as i32;

    // Rooks hitting the queen.
    score += params.threat_rook_on_queen
        * (info.attacks[i][Piece::Rook.index()] & board.pieces(them, Piece::Queen)).popcount()
            as i32;

    // King picking up loose material next to it.
    let king_grabs = their_pieces & info.attacks[i][Piece::King.index()] & !info.attacks[j][ALL];
    score += params.king_threat * king_grabs.popcount() as i32;

    // Pawn pushes that create new attacks on pieces.
    let pushes = board.pieces(us, Piece::Pawn).shift_forward(us) & !board.occupied();
    let push_attacks = pushes.pawn_attacks(us);
    score += params.threat_pawn_push
        * (push_attacks & their_pieces & !board.pieces(them, Piece::Pawn)).popcount() as i32;

    score
}

/// Passed-pawn term: rank-graded, modulated by blockade, support and
/// the kings' distances to the stop square.
fn eval_passed_pawns(
    board: &Board,
    params: &EvalParams,
    us: Color,
    passed: Bitboard,
    info: &AttackInfo,
) -> Score {
    let them = us.opponent();
    let white = us == Color::White;
    let mut score = Score::ZERO;

    for sq in passed.iter() {
        let rel_rank = sq.relative_rank(white);
        let mut bonus = params.passed_rank[rel_rank.min(7)];

        let stop_idx = sq.index() as isize + us.pawn_push();
        if (0..64).contains(&stop_idx) {
            let stop = Square::from_index(stop_idx as usize);

            if board.occupied().contains(stop) {
                bonus += params.passed_blocked_penalty;
            }

            // King races matter from the fourth rank on.
            if rel_rank >= 3 {
                let weight = (rel_rank as i32 - 2) * (rel_rank as i32 - 2);
                let enemy_dist = distance(board.king_square(them), stop) as i32;
                let own_dist = distance(board.king_square(us), stop) as i32;
                bonus += Score::new(
                    0,
                    weight * (params.passed_enemy_king * enemy_dist
                        - params.passed_friendly_king * own_dist),
                );
            }
        }

        if info.attacks[us.index()][Piece::Pawn.index()].contains(sq) {
            bonus += params.passed_connected;
        }

        score += bonus;
    }
    score
}

/// Space: safe squares behind the pawn chain in the central files, only
/// while enough material remains to use them.
fn eval_space(board: &Board, params: &EvalParams, us: Color, safe_for_pawn: Bitboard) -> Score {
    let total_npm =
        board.non_pawn_material(Color::White) + board.non_pawn_material(Color::Black);
    if total_npm < params.space_threshold {
        return Score::ZERO;
    }
    let central = Bitboard::file_mask(2)
        | Bitboard::file_mask(3)
        | Bitboard::file_mask(4)
        | Bitboard::file_mask(5);
    let home_ranks = if us == Color::White {
        Bitboard::RANK_2 | Bitboard::RANK_3 | Bitboard::RANK_4
    } else {
        Bitboard::RANK_7 | Bitboard::RANK_6 | Bitboard::RANK_5
    };
    let safe = central & home_ranks & !board.pieces(us, Piece::Pawn) & safe_for_pawn;
    Score::new(params.space_bonus * safe.popcount() as i32, 0)
}

/// Double attacks on the enemy king's flank.
fn eval_flank_attack(board: &Board, params: &EvalParams, us: Color, info: &AttackInfo) -> Score {
    let them = us.opponent();
    let flank = king_flank(them, board.king_square(them).file());
    let doubled = info.double[us.index()] & flank;
    params.flank_double_attack * doubled.popcount() as i32
}

/// Rammed pawns clog the position.
fn eval_blocked_pawns(board: &Board, params: &EvalParams, us: Color) -> Score {
    let them = us.opponent();
    let blocked = board.pieces(us, Piece::Pawn).shift_forward(us)
        & board.pieces(them, Piece::Pawn);
    params.blocked_pawns * blocked.popcount() as i32
}

/// Initiative: pawn asymmetry, spread kings and remaining pawns favor
/// the side already ahead in the endgame; capped so it never flips the
/// sign of the balance.
fn initiative(
    board: &Board,
    params: &EvalParams,
    asymmetry: i32,
    pawn_counts: [i32; 2],
    eg: i32,
) -> i32 {
    let wk = board.king_square(Color::White);
    let bk = board.king_square(Color::Black);
    let k_distance =
        wk.file().abs_diff(bk.file()) as i32 - wk.rank().abs_diff(bk.rank()) as i32;
    let leading_pawns = if eg < 0 {
        pawn_counts[Color::Black.index()]
    } else {
        pawn_counts[Color::White.index()]
    };
    let raw = (2 * asymmetry + k_distance + 3 * leading_pawns - 15) * params.initiative_mult / 10;
    let sign = (eg > 0) as i32 - (eg < 0) as i32;
    sign * raw.max(-(eg.abs() >> 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STARTPOS_FEN;

    fn evaluator() -> Evaluator {
        Evaluator::new(Arc::new(EvalParams::new()))
    }

    fn full_eval(board: &Board) -> i32 {
        evaluator().evaluate(board, -30000, 30000, NO_EVAL).value
    }

    /// Mirror the position: swap colors, flip ranks.
    fn mirror(board: &Board) -> Board {
        let fen = board.to_fen();
        let parts: Vec<&str> = fen.split(' ').collect();
        let flipped_placement: Vec<String> = parts[0]
            .split('/')
            .rev()
            .map(|rank| {
                rank.chars()
                    .map(|c| {
                        if c.is_ascii_alphabetic() {
                            if c.is_uppercase() {
                                c.to_ascii_lowercase()
                            } else {
                                c.to_ascii_uppercase()
                            }
                        } else {
                            c
                        }
                    })
                    .collect()
            })
            .collect();
        let side = if parts[1] == "w" { "b" } else { "w" };
        let castling: String = if parts[2] == "-" {
            "-".to_string()
        } else {
            let mut sw: Vec<char> = parts[2]
                .chars()
                .map(|c| {
                    if c.is_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                })
                .collect();
            sw.sort_by_key(|c| (c.is_lowercase(), *c));
            sw.into_iter().collect()
        };
        let fen = format!(
            "{} {} {} - {} {}",
            flipped_placement.join("/"),
            side,
            castling,
            parts[4],
            parts[5]
        );
        Board::from_fen(&fen)
    }

    #[test]
    fn test_startpos_is_balanced() {
        let board = Board::from_fen(STARTPOS_FEN);
        let value = full_eval(&board);
        // Only the tempo bonus separates the sides.
        assert!(value.abs() <= 40, "startpos eval {value}");
    }

    #[test]
    fn test_eval_is_finite_and_bounded() {
        let fens = [
            STARTPOS_FEN,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen);
            let value = full_eval(&board);
            assert!(value.abs() < WIN_SCORE, "unbounded eval for {fen}");
        }
    }

    #[test]
    fn test_eval_mirror_symmetry() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
            "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen);
            let mirrored = mirror(&board);
            assert_eq!(
                full_eval(&board),
                full_eval(&mirrored),
                "mirror asymmetry for {fen}"
            );
        }
    }

    #[test]
    fn test_in_check_returns_zero() {
        let board =
            Board::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
        assert!(board.in_check());
        let result = evaluator().evaluate(&board, -30000, 30000, NO_EVAL);
        assert_eq!(result.value, 0);
        assert_eq!(result.positional, NO_EVAL);
    }

    #[test]
    fn test_material_advantage_registers() {
        // White is a queen up.
        let board = Board::from_fen("3qk3/8/8/8/8/8/3QK3/3Q4 w - - 0 1");
        assert!(full_eval(&board) > 500);
    }

    #[test]
    fn test_known_endgame_shortcut() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let value = full_eval(&board);
        assert!(value > 4000, "KRK should evaluate as winning, got {value}");
    }

    #[test]
    fn test_passed_pawn_valued() {
        let with_passer =
            Board::from_fen("4k3/8/8/3P4/8/8/8/4K3 w - - 0 1");
        let without =
            Board::from_fen("4k3/3p4/8/3P4/8/8/8/4K3 w - - 0 1");
        assert!(full_eval(&with_passer) > full_eval(&without));
    }

    #[test]
    fn test_fifty_move_fade() {
        let fen_fresh = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let fen_stale = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 96 60";
        let fresh = full_eval(&Board::from_fen(fen_fresh));
        let stale = full_eval(&Board::from_fen(fen_stale));
        assert!(
            stale.abs() < fresh.abs().max(20),
            "no fade: fresh {fresh} stale {stale}"
        );
    }

    #[test]
    fn test_contempt_applied_from_contempt_color() {
        let board = Board::from_fen(STARTPOS_FEN);
        let mut ev = evaluator();
        let neutral = ev.evaluate(&board, -30000, 30000, NO_EVAL).value;
        ev.contempt = 20;
        ev.contempt_color = Color::White;
        let for_white = ev.evaluate(&board, -30000, 30000, NO_EVAL).value;
        assert_eq!(for_white, neutral + 20);
        ev.contempt_color = Color::Black;
        let for_black = ev.evaluate(&board, -30000, 30000, NO_EVAL).value;
        assert_eq!(for_black, neutral - 20);
    }

    #[test]
    fn test_lazy_eval_outside_window() {
        // A queen-up position probed with a tiny faraway window should
        // trigger the lazy path once a positional balance is supplied.
        let board =
            Board::from_fen("rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        let mut ev = evaluator();
        let full = ev.evaluate(&board, -30000, 30000, NO_EVAL);
        assert!(full.positional != NO_EVAL);
        let lazy = ev.evaluate(&board, -5000, -4000, full.positional);
        assert!(lazy.value >= -4000, "lazy value should fail high");
    }

    #[test]
    fn test_rammed_pawn_fortress_is_drawn() {
        // Kings plus a single rammed pawn each: neither side can make
        // progress, the clamp forces the draw value.
        let board = Board::from_fen("4k3/4p3/4P3/8/8/8/8/4K3 w - - 0 1");
        assert_eq!(full_eval(&board), 0);
    }
}
