//! Board state: piece placement, bitboards, keys and draw detection.

use super::attack_tables::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use super::types::{
    Bitboard, Color, Piece, Square, CASTLE_BLACK_K, CASTLE_BLACK_Q, CASTLE_WHITE_K, CASTLE_WHITE_Q,
};
use crate::zobrist;

/// Phase weight per piece kind. The weights sum to 128 for the full
/// starting material, matching the 0..=128 game-phase scale.
pub(crate) const PHASE_WEIGHTS: [i32; 6] = [0, 5, 5, 10, 24, 0];

/// Maximum phase value (all non-pawn material on the board).
pub(crate) const MAX_PHASE: i32 = 128;

/// State saved by `make_move` and restored by `unmake_move`. The search
/// keeps one of these per ply on its stack.
#[derive(Clone, Copy, Debug)]
pub struct UnmakeInfo {
    pub(crate) captured: Option<Piece>,
    pub(crate) prev_en_passant: Option<Square>,
    pub(crate) prev_castling_rights: u8,
    pub(crate) prev_halfmove_clock: u32,
    pub(crate) prev_hash: u64,
    pub(crate) prev_pawn_hash: u64,
    pub(crate) prev_checkers: Bitboard,
}

/// State saved across a null move.
#[derive(Clone, Copy, Debug)]
pub struct NullMoveInfo {
    pub(crate) prev_en_passant: Option<Square>,
    pub(crate) prev_hash: u64,
    pub(crate) prev_checkers: Bitboard,
}

/// A chess position with incremental make/unmake.
#[derive(Clone, Debug)]
pub struct Board {
    pub(crate) piece_on: [Option<(Color, Piece)>; 64],
    pub(crate) pieces: [[Bitboard; 6]; 2],
    pub(crate) occupied: [Bitboard; 2],
    pub(crate) all_occupied: Bitboard,
    pub(crate) side_to_move: Color,
    pub(crate) en_passant_target: Option<Square>,
    pub(crate) castling_rights: u8,
    pub(crate) halfmove_clock: u32,
    pub(crate) fullmove_number: u32,
    pub(crate) game_ply: u32,
    pub(crate) hash: u64,
    pub(crate) pawn_hash: u64,
    pub(crate) checkers: Bitboard,
    pub(crate) phase: i32,
    pub(crate) non_pawn_material: [i32; 2],
    pub(crate) chess960: bool,
    /// Rook starting file per (color, wing): wing 0 = kingside, 1 =
    /// queenside. FEN parsing overwrites these for Chess960 setups.
    pub(crate) castle_rook_file: [[u8; 2]; 2],
    /// Castling rights cleared when a piece moves from or to a square.
    pub(crate) castle_rights_mask: [u8; 64],
    /// Hashes of all positions since the last irreversible reset point,
    /// used by the repetition back-scan.
    pub(crate) key_history: Vec<u64>,
}

impl Board {
    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (file, piece) in back_rank.iter().enumerate() {
            board.set_piece(Square::new(0, file), Color::White, *piece);
            board.set_piece(Square::new(7, file), Color::Black, *piece);
            board.set_piece(Square::new(1, file), Color::White, Piece::Pawn);
            board.set_piece(Square::new(6, file), Color::Black, Piece::Pawn);
        }
        board.castling_rights = CASTLE_WHITE_K | CASTLE_WHITE_Q | CASTLE_BLACK_K | CASTLE_BLACK_Q;
        board.rebuild_castle_masks();
        board.hash = board.compute_hash();
        board.pawn_hash = board.compute_pawn_hash();
        board.checkers = Bitboard::EMPTY;
        board.key_history.push(board.hash);
        board
    }

    pub(crate) fn empty() -> Self {
        Board {
            piece_on: [None; 64],
            pieces: [[Bitboard::EMPTY; 6]; 2],
            occupied: [Bitboard::EMPTY; 2],
            all_occupied: Bitboard::EMPTY,
            side_to_move: Color::White,
            en_passant_target: None,
            castling_rights: 0,
            halfmove_clock: 0,
            fullmove_number: 1,
            game_ply: 0,
            hash: 0,
            pawn_hash: 0,
            checkers: Bitboard::EMPTY,
            phase: 0,
            non_pawn_material: [0; 2],
            chess960: false,
            castle_rook_file: [[7, 0]; 2],
            castle_rights_mask: [0; 64],
            key_history: Vec::with_capacity(256),
        }
    }

    /// Rebuild the per-square rights-clearing mask from the current king
    /// and rook starting squares. Called after FEN setup.
    pub(crate) fn rebuild_castle_masks(&mut self) {
        use super::types::castle_bit;

        self.castle_rights_mask = [0; 64];
        for color in Color::BOTH {
            let rank = color.back_rank();
            if self.pieces(color, Piece::King).is_single() {
                let king = self.king_square(color);
                self.castle_rights_mask[king.index()] |=
                    castle_bit(color, true) | castle_bit(color, false);
            }
            for (wing, kingside) in [(0usize, true), (1usize, false)] {
                let rook_file = self.castle_rook_file[color.index()][wing] as usize;
                let rook_sq = Square::new(rank, rook_file);
                self.castle_rights_mask[rook_sq.index()] |= castle_bit(color, kingside);
            }
        }
    }

    /// Rook start and destination squares for a castle of `color` on the
    /// given wing.
    #[inline]
    #[must_use]
    pub(crate) fn castle_rook_squares(&self, color: Color, kingside: bool) -> (Square, Square) {
        let rank = color.back_rank();
        let wing = usize::from(!kingside);
        let rook_from = Square::new(rank, self.castle_rook_file[color.index()][wing] as usize);
        let rook_to = Square::new(rank, if kingside { 5 } else { 3 });
        (rook_from, rook_to)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    #[must_use]
    pub fn pawn_hash(&self) -> u64 {
        self.pawn_hash
    }

    #[inline]
    #[must_use]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    #[inline]
    #[must_use]
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    #[inline]
    #[must_use]
    pub fn game_ply(&self) -> u32 {
        self.game_ply
    }

    #[inline]
    #[must_use]
    pub fn is_chess960(&self) -> bool {
        self.chess960
    }

    pub fn set_chess960(&mut self, enabled: bool) {
        self.chess960 = enabled;
    }

    /// Game phase, 0 (bare endgame) to 128 (full material).
    #[inline]
    #[must_use]
    pub fn phase(&self) -> i32 {
        self.phase.clamp(0, MAX_PHASE)
    }

    /// Non-pawn material value for one side, in centipawns.
    #[inline]
    #[must_use]
    pub fn non_pawn_material(&self, color: Color) -> i32 {
        self.non_pawn_material[color.index()]
    }

    /// Bitboard of `piece` of `color`.
    #[inline]
    #[must_use]
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[color.index()][piece.index()]
    }

    /// All pieces of one color.
    #[inline]
    #[must_use]
    pub fn occupied_by(&self, color: Color) -> Bitboard {
        self.occupied[color.index()]
    }

    /// All pieces of both colors.
    #[inline]
    #[must_use]
    pub fn occupied(&self) -> Bitboard {
        self.all_occupied
    }

    /// The piece standing on `sq`, if any.
    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        self.piece_on[sq.index()]
    }

    #[inline]
    #[must_use]
    pub fn is_empty_square(&self, sq: Square) -> bool {
        self.piece_on[sq.index()].is_none()
    }

    /// The king square of `color`.
    ///
    /// Every legal position has exactly one king per side; FEN parsing
    /// enforces it.
    #[inline]
    #[must_use]
    pub fn king_square(&self, color: Color) -> Square {
        debug_assert!(self.pieces(color, Piece::King).is_single());
        self.pieces(color, Piece::King).lsb()
    }

    /// Enemy pieces currently giving check to the side to move.
    #[inline]
    #[must_use]
    pub fn checkers(&self) -> Bitboard {
        self.checkers
    }

    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.checkers.any()
    }

    /// Bishops and queens of both colors.
    #[inline]
    #[must_use]
    pub(crate) fn diagonal_sliders(&self) -> Bitboard {
        self.pieces[0][Piece::Bishop.index()]
            | self.pieces[1][Piece::Bishop.index()]
            | self.pieces[0][Piece::Queen.index()]
            | self.pieces[1][Piece::Queen.index()]
    }

    /// Rooks and queens of both colors.
    #[inline]
    #[must_use]
    pub(crate) fn straight_sliders(&self) -> Bitboard {
        self.pieces[0][Piece::Rook.index()]
            | self.pieces[1][Piece::Rook.index()]
            | self.pieces[0][Piece::Queen.index()]
            | self.pieces[1][Piece::Queen.index()]
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    pub(crate) fn set_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        debug_assert!(self.piece_on[sq.index()].is_none());
        let bit = Bitboard::from_square(sq);
        self.piece_on[sq.index()] = Some((color, piece));
        self.pieces[color.index()][piece.index()] |= bit;
        self.occupied[color.index()] |= bit;
        self.all_occupied |= bit;
        self.phase += PHASE_WEIGHTS[piece.index()];
        if piece != Piece::Pawn && piece != Piece::King {
            self.non_pawn_material[color.index()] += piece.value();
        }
    }

    pub(crate) fn remove_piece(&mut self, sq: Square, color: Color, piece: Piece) {
        debug_assert_eq!(self.piece_on[sq.index()], Some((color, piece)));
        let bit = Bitboard::from_square(sq);
        self.piece_on[sq.index()] = None;
        self.pieces[color.index()][piece.index()] ^= bit;
        self.occupied[color.index()] ^= bit;
        self.all_occupied ^= bit;
        self.phase -= PHASE_WEIGHTS[piece.index()];
        if piece != Piece::Pawn && piece != Piece::King {
            self.non_pawn_material[color.index()] -= piece.value();
        }
    }

    // ------------------------------------------------------------------
    // Attacks
    // ------------------------------------------------------------------

    /// All pieces (of either color) that attack `sq` under the given
    /// occupancy.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupancy: Bitboard) -> Bitboard {
        (pawn_attacks(Color::White, sq) & self.pieces(Color::Black, Piece::Pawn))
            | (pawn_attacks(Color::Black, sq) & self.pieces(Color::White, Piece::Pawn))
            | (knight_attacks(sq)
                & (self.pieces(Color::White, Piece::Knight)
                    | self.pieces(Color::Black, Piece::Knight)))
            | (bishop_attacks(sq, occupancy) & self.diagonal_sliders())
            | (rook_attacks(sq, occupancy) & self.straight_sliders())
            | (king_attacks(sq)
                & (self.pieces(Color::White, Piece::King) | self.pieces(Color::Black, Piece::King)))
    }

    /// True if `color` attacks `sq` under the current occupancy.
    #[must_use]
    pub fn attacked_by(&self, color: Color, sq: Square) -> bool {
        (self.attackers_to(sq, self.all_occupied) & self.occupied[color.index()]).any()
    }

    /// Enemy pieces checking `color`'s king.
    #[must_use]
    pub(crate) fn compute_checkers(&self, color: Color) -> Bitboard {
        let king = self.king_square(color);
        self.attackers_to(king, self.all_occupied) & self.occupied[color.opponent().index()]
    }

    /// True if `color`'s king is attacked.
    #[must_use]
    pub fn is_in_check(&self, color: Color) -> bool {
        self.compute_checkers(color).any()
    }

    /// Pieces of `color` pinned to their own king by enemy sliders.
    #[must_use]
    pub(crate) fn pinned_pieces(&self, color: Color) -> Bitboard {
        let king = self.king_square(color);
        let them = color.opponent();
        let mut pinned = Bitboard::EMPTY;

        let snipers = (bishop_attacks(king, Bitboard::EMPTY)
            & (self.pieces(them, Piece::Bishop) | self.pieces(them, Piece::Queen)))
            | (rook_attacks(king, Bitboard::EMPTY)
                & (self.pieces(them, Piece::Rook) | self.pieces(them, Piece::Queen)));

        for sniper in snipers.iter() {
            let blockers = super::masks::between(king, sniper) & self.all_occupied;
            if blockers.is_single() && blockers.intersects(self.occupied[color.index()]) {
                pinned |= blockers;
            }
        }
        pinned
    }

    // ------------------------------------------------------------------
    // Hashing
    // ------------------------------------------------------------------

    /// Full-position key rebuilt from scratch. The incremental key must
    /// equal this after every make/unmake.
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        let mut hash = 0u64;
        for idx in 0..64 {
            if let Some((color, piece)) = self.piece_on[idx] {
                hash ^= zobrist::piece_key(color, piece, Square::from_index(idx));
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= zobrist::side_key();
        }
        hash ^= zobrist::castling_key(self.castling_rights);
        if let Some(ep) = self.en_passant_target {
            hash ^= zobrist::en_passant_key(ep);
        }
        hash
    }

    /// Pawn-only key rebuilt from scratch.
    #[must_use]
    pub fn compute_pawn_hash(&self) -> u64 {
        let mut hash = 0u64;
        for color in Color::BOTH {
            for sq in self.pieces(color, Piece::Pawn).iter() {
                hash ^= zobrist::piece_key(color, Piece::Pawn, sq);
            }
        }
        hash
    }

    /// Compact material signature: piece counts packed into a u32.
    /// Layout per side: pawns 4 bits, then 2 bits each for N/B/R/Q,
    /// counts clamped to the field width.
    #[must_use]
    pub fn material_signature(&self) -> u32 {
        let mut sig = 0u32;
        for color in Color::BOTH {
            let base = color.index() as u32 * 12;
            let pawns = self.pieces(color, Piece::Pawn).popcount().min(15);
            sig |= pawns << base;
            for (i, piece) in Piece::MINOR_AND_MAJOR.iter().enumerate() {
                let count = self.pieces(color, *piece).popcount().min(3);
                sig |= count << (base + 4 + 2 * i as u32);
            }
        }
        sig
    }

    // ------------------------------------------------------------------
    // Draw detection
    // ------------------------------------------------------------------

    /// True if the current position occurred before within the span the
    /// fifty-move counter allows. One prior occurrence is enough for the
    /// search to score a draw.
    #[must_use]
    pub fn is_repetition(&self) -> bool {
        self.count_repetitions() >= 1
    }

    /// True on threefold repetition (two prior occurrences).
    #[must_use]
    pub fn is_threefold_repetition(&self) -> bool {
        self.count_repetitions() >= 2
    }

    fn count_repetitions(&self) -> u32 {
        let len = self.key_history.len();
        if len < 5 {
            return 0;
        }
        let span = (self.halfmove_clock as usize).min(len.saturating_sub(1));
        let mut count = 0;
        // Same side to move every other ply; castling/ep differences are
        // already folded into the keys.
        let mut back = 2;
        while back <= span {
            if self.key_history[len - 1 - back] == self.hash {
                count += 1;
            }
            back += 2;
        }
        count
    }

    /// Fifty-move rule, threefold repetition, or insufficient material.
    #[must_use]
    pub fn is_draw(&self) -> bool {
        if self.halfmove_clock >= 100 {
            return true;
        }
        if self.is_threefold_repetition() {
            return true;
        }
        self.is_insufficient_material()
    }

    /// Neither side can possibly deliver mate.
    #[must_use]
    pub fn is_insufficient_material(&self) -> bool {
        let pawns =
            self.pieces(Color::White, Piece::Pawn) | self.pieces(Color::Black, Piece::Pawn);
        if pawns.any() || self.straight_sliders().any() {
            return false;
        }

        let knights =
            self.pieces(Color::White, Piece::Knight) | self.pieces(Color::Black, Piece::Knight);
        let bishops =
            self.pieces(Color::White, Piece::Bishop) | self.pieces(Color::Black, Piece::Bishop);
        let minors = knights.popcount() + bishops.popcount();

        if minors <= 1 {
            return true;
        }
        // Two bishops on the same color complex cannot mate either.
        if knights.is_empty() && bishops.popcount() == 2 {
            return bishops.is_disjoint(Bitboard::LIGHT_SQUARES)
                || bishops.is_disjoint(Bitboard::DARK_SQUARES);
        }
        false
    }

    /// Assert the redundant board encodings agree. Test-suite helper;
    /// the hash recomputation is far too slow for the search path.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut occ = [Bitboard::EMPTY; 2];
        for idx in 0..64 {
            if let Some((color, piece)) = self.piece_on[idx] {
                let bit = Bitboard::from_square(Square::from_index(idx));
                assert!(
                    self.pieces[color.index()][piece.index()].intersects(bit),
                    "mailbox/bitboard mismatch at {}",
                    Square::from_index(idx)
                );
                occ[color.index()] |= bit;
            }
        }
        assert_eq!(occ[0], self.occupied[0]);
        assert_eq!(occ[1], self.occupied[1]);
        assert_eq!(occ[0] | occ[1], self.all_occupied);
        assert_eq!(self.pieces(Color::White, Piece::King).popcount(), 1);
        assert_eq!(self.pieces(Color::Black, Piece::King).popcount(), 1);
        assert_eq!(self.hash, self.compute_hash());
        assert_eq!(self.pawn_hash, self.compute_pawn_hash());
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_counts() {
        let board = Board::new();
        assert_eq!(board.occupied().popcount(), 32);
        assert_eq!(board.pieces(Color::White, Piece::Pawn).popcount(), 8);
        assert_eq!(board.king_square(Color::White), Square::new(0, 4));
        assert_eq!(board.king_square(Color::Black), Square::new(7, 4));
        assert_eq!(board.phase(), MAX_PHASE);
        assert!(!board.in_check());
    }

    #[test]
    fn test_startpos_hash_matches_recompute() {
        let board = Board::new();
        assert_eq!(board.hash(), board.compute_hash());
        assert_eq!(board.pawn_hash(), board.compute_pawn_hash());
    }

    #[test]
    fn test_attacked_by_startpos() {
        let board = Board::new();
        // e3 is attacked by white (pawns d2/f2), not by black
        let e3 = Square::new(2, 4);
        assert!(board.attacked_by(Color::White, e3));
        assert!(!board.attacked_by(Color::Black, e3));
    }

    #[test]
    fn test_non_pawn_material_startpos() {
        let board = Board::new();
        let expected = 2 * Piece::Knight.value()
            + 2 * Piece::Bishop.value()
            + 2 * Piece::Rook.value()
            + Piece::Queen.value();
        assert_eq!(board.non_pawn_material(Color::White), expected);
        assert_eq!(board.non_pawn_material(Color::Black), expected);
    }

    #[test]
    fn test_material_signature_startpos_symmetric() {
        let board = Board::new();
        let sig = board.material_signature();
        let white = sig & 0xFFF;
        let black = (sig >> 12) & 0xFFF;
        assert_eq!(white, black);
        assert_eq!(white & 0xF, 8); // eight pawns
    }

    #[test]
    fn test_set_remove_piece_roundtrip() {
        let mut board = Board::new();
        let e4 = Square::new(3, 4);
        board.set_piece(e4, Color::White, Piece::Knight);
        assert_eq!(board.piece_at(e4), Some((Color::White, Piece::Knight)));
        board.remove_piece(e4, Color::White, Piece::Knight);
        assert_eq!(board.piece_at(e4), None);
        assert_eq!(board.phase(), MAX_PHASE);
    }
}
