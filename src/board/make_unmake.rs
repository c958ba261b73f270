//! Incremental move application and reversal.

use super::attack_tables::{bishop_attacks, knight_attacks, pawn_attacks, rook_attacks};
use super::masks::between;
use super::state::{Board, NullMoveInfo, UnmakeInfo};
use super::types::{castle_bit, Bitboard, Color, Move, Piece, Square};
use crate::zobrist;

impl Board {
    /// Apply `mv` to the position. Returns the state needed to undo it.
    ///
    /// The move must be at least pseudo-legal; feeding garbage is a
    /// programming bug and trips debug assertions.
    pub fn make_move(&mut self, mv: Move) -> UnmakeInfo {
        let us = self.side_to_move;
        let them = us.opponent();
        let from = mv.from();
        let to = mv.to();

        let mut info = UnmakeInfo {
            captured: None,
            prev_en_passant: self.en_passant_target,
            prev_castling_rights: self.castling_rights,
            prev_halfmove_clock: self.halfmove_clock,
            prev_hash: self.hash,
            prev_pawn_hash: self.pawn_hash,
            prev_checkers: self.checkers,
        };

        let mut hash = self.hash ^ zobrist::side_key();
        hash ^= zobrist::castling_key(self.castling_rights);
        if let Some(ep) = self.en_passant_target {
            hash ^= zobrist::en_passant_key(ep);
        }
        self.en_passant_target = None;

        if mv.is_castling() {
            // Remove both pieces before placing either: in Chess960 the
            // king's path may cross the rook's starting square.
            let kingside = mv.is_castle_kingside();
            let (rook_from, rook_to) = self.castle_rook_squares(us, kingside);
            self.remove_piece(from, us, Piece::King);
            self.remove_piece(rook_from, us, Piece::Rook);
            self.set_piece(to, us, Piece::King);
            self.set_piece(rook_to, us, Piece::Rook);
            hash ^= zobrist::piece_key(us, Piece::King, from);
            hash ^= zobrist::piece_key(us, Piece::King, to);
            hash ^= zobrist::piece_key(us, Piece::Rook, rook_from);
            hash ^= zobrist::piece_key(us, Piece::Rook, rook_to);
            self.halfmove_clock += 1;
        } else {
            let (_, moving_piece) = self.piece_at(from).expect("make_move: empty from-square");

            // Remove the captured piece first.
            if mv.is_en_passant() {
                let cap_sq = Square::new(from.rank(), to.file());
                self.remove_piece(cap_sq, them, Piece::Pawn);
                hash ^= zobrist::piece_key(them, Piece::Pawn, cap_sq);
                self.pawn_hash ^= zobrist::piece_key(them, Piece::Pawn, cap_sq);
                info.captured = Some(Piece::Pawn);
            } else if mv.is_capture() {
                let (_, captured) = self.piece_at(to).expect("capture with empty target");
                debug_assert!(captured != Piece::King);
                self.remove_piece(to, them, captured);
                hash ^= zobrist::piece_key(them, captured, to);
                if captured == Piece::Pawn {
                    self.pawn_hash ^= zobrist::piece_key(them, Piece::Pawn, to);
                }
                info.captured = Some(captured);
            }

            // Move the piece (promotions swap the pawn for the new piece).
            self.remove_piece(from, us, moving_piece);
            hash ^= zobrist::piece_key(us, moving_piece, from);
            if moving_piece == Piece::Pawn {
                self.pawn_hash ^= zobrist::piece_key(us, Piece::Pawn, from);
            }

            let placed_piece = mv.promotion_piece().unwrap_or(moving_piece);
            self.set_piece(to, us, placed_piece);
            hash ^= zobrist::piece_key(us, placed_piece, to);
            if placed_piece == Piece::Pawn {
                self.pawn_hash ^= zobrist::piece_key(us, Piece::Pawn, to);
            }

            // New en-passant right after a double push, kept only if an
            // enemy pawn could actually take it.
            if mv.is_double_pawn_push() {
                let ep_sq = Square::new(usize::midpoint(from.rank(), to.rank()), from.file());
                if pawn_attacks(us, ep_sq).intersects(self.pieces(them, Piece::Pawn)) {
                    self.en_passant_target = Some(ep_sq);
                    hash ^= zobrist::en_passant_key(ep_sq);
                }
            }

            if moving_piece == Piece::Pawn || mv.is_capture() {
                self.halfmove_clock = 0;
            } else {
                self.halfmove_clock += 1;
            }
        }

        // Rights lost by moving from, or capturing on, a king/rook home.
        self.castling_rights &=
            !(self.castle_rights_mask[from.index()] | self.castle_rights_mask[to.index()]);
        hash ^= zobrist::castling_key(self.castling_rights);

        if us == Color::Black {
            self.fullmove_number += 1;
        }
        self.game_ply += 1;
        self.side_to_move = them;
        self.hash = hash;
        self.checkers = self.compute_checkers(them);
        self.key_history.push(hash);

        info
    }

    /// Undo the last `make_move`.
    pub fn unmake_move(&mut self, mv: Move, info: UnmakeInfo) {
        self.key_history.pop();
        let them = self.side_to_move;
        let us = them.opponent();
        let from = mv.from();
        let to = mv.to();

        if mv.is_castling() {
            let kingside = mv.is_castle_kingside();
            let (rook_from, rook_to) = self.castle_rook_squares(us, kingside);
            self.remove_piece(to, us, Piece::King);
            self.remove_piece(rook_to, us, Piece::Rook);
            self.set_piece(from, us, Piece::King);
            self.set_piece(rook_from, us, Piece::Rook);
        } else {
            let placed_piece = mv
                .promotion_piece()
                .unwrap_or_else(|| self.piece_at(to).expect("unmake_move: empty to-square").1);
            self.remove_piece(to, us, placed_piece);
            let moving_piece = if mv.is_promotion() {
                Piece::Pawn
            } else {
                placed_piece
            };
            self.set_piece(from, us, moving_piece);

            if let Some(captured) = info.captured {
                let cap_sq = if mv.is_en_passant() {
                    Square::new(from.rank(), to.file())
                } else {
                    to
                };
                self.set_piece(cap_sq, them, captured);
            }
        }

        self.side_to_move = us;
        self.en_passant_target = info.prev_en_passant;
        self.castling_rights = info.prev_castling_rights;
        self.halfmove_clock = info.prev_halfmove_clock;
        self.hash = info.prev_hash;
        self.pawn_hash = info.prev_pawn_hash;
        self.checkers = info.prev_checkers;
        self.game_ply -= 1;
        if us == Color::Black {
            self.fullmove_number -= 1;
        }
    }

    /// Pass the turn. Only callable when not in check.
    pub fn make_null_move(&mut self) -> NullMoveInfo {
        debug_assert!(!self.in_check());
        let info = NullMoveInfo {
            prev_en_passant: self.en_passant_target,
            prev_hash: self.hash,
            prev_checkers: self.checkers,
        };
        let mut hash = self.hash ^ zobrist::side_key();
        if let Some(ep) = self.en_passant_target {
            hash ^= zobrist::en_passant_key(ep);
        }
        self.en_passant_target = None;
        self.side_to_move = self.side_to_move.opponent();
        self.hash = hash;
        self.checkers = Bitboard::EMPTY;
        self.game_ply += 1;
        self.key_history.push(hash);
        info
    }

    /// Undo a null move.
    pub fn unmake_null_move(&mut self, info: NullMoveInfo) {
        self.key_history.pop();
        self.side_to_move = self.side_to_move.opponent();
        self.en_passant_target = info.prev_en_passant;
        self.hash = info.prev_hash;
        self.checkers = info.prev_checkers;
        self.game_ply -= 1;
    }

    // ------------------------------------------------------------------
    // Legality and check detection
    // ------------------------------------------------------------------

    /// True if the pseudo-legal `mv` does not leave the mover's king in
    /// check.
    #[must_use]
    pub fn is_legal(&mut self, mv: Move) -> bool {
        let us = self.side_to_move;
        if mv.is_castling() && !self.castle_path_safe(mv) {
            return false;
        }
        let info = self.make_move(mv);
        let legal = !self.is_in_check(us);
        self.unmake_move(mv, info);
        legal
    }

    /// True if none of the squares the king crosses while castling is
    /// attacked by the opponent.
    #[must_use]
    pub(crate) fn castle_path_safe(&self, mv: Move) -> bool {
        let us = self.side_to_move;
        let them = us.opponent();
        let path = between(mv.from(), mv.to())
            | Bitboard::from_square(mv.from())
            | Bitboard::from_square(mv.to());
        for sq in path.iter() {
            if self.attacked_by(them, sq) {
                return false;
            }
        }
        true
    }

    /// True if `mv` checks the opponent. Must be called before `make_move`.
    ///
    /// Ordinary moves are answered from the attack tables (direct checks
    /// and discovered checks along the vacated line). Castling, en
    /// passant and promotions change more than two squares, so they fall
    /// back to applying the move.
    #[must_use]
    pub fn gives_check(&mut self, mv: Move) -> bool {
        let us = self.side_to_move;
        let them = us.opponent();

        if mv.is_castling() || mv.is_en_passant() || mv.is_promotion() {
            let info = self.make_move(mv);
            let check = self.in_check();
            self.unmake_move(mv, info);
            return check;
        }

        let from = mv.from();
        let to = mv.to();
        let their_king = self.king_square(them);
        let (_, piece) = self.piece_at(from).expect("gives_check: empty from-square");

        // Direct check from the destination square.
        let occ_after =
            (self.all_occupied ^ Bitboard::from_square(from)) | Bitboard::from_square(to);
        let direct = match piece {
            Piece::Pawn => pawn_attacks(us, to),
            Piece::Knight => knight_attacks(to),
            Piece::Bishop => bishop_attacks(to, occ_after),
            Piece::Rook => rook_attacks(to, occ_after),
            Piece::Queen => bishop_attacks(to, occ_after) | rook_attacks(to, occ_after),
            Piece::King => Bitboard::EMPTY,
        };
        if direct.contains(their_king) {
            return true;
        }

        // Discovered check: vacating the from-square opens a line from an
        // own slider to the enemy king. The moving piece is masked out of
        // the slider sets since occupancy already relocated it.
        let from_bb = Bitboard::from_square(from);
        let diag = (self.pieces(us, Piece::Bishop) | self.pieces(us, Piece::Queen)) & !from_bb;
        let straight = (self.pieces(us, Piece::Rook) | self.pieces(us, Piece::Queen)) & !from_bb;
        (bishop_attacks(their_king, occ_after) & diag).any()
            || (rook_attacks(their_king, occ_after) & straight).any()
    }

    /// True if `mv` is pseudo-legal in this position: correct mover,
    /// plausible geometry, clear path. Used to validate TT moves before
    /// trying them without a full generation pass.
    #[must_use]
    pub(crate) fn is_pseudo_legal(&self, mv: Move) -> bool {
        if mv.is_null() {
            return false;
        }
        let us = self.side_to_move;
        let from = mv.from();
        let to = mv.to();
        let Some((color, piece)) = self.piece_at(from) else {
            return false;
        };
        if color != us {
            return false;
        }
        if mv.is_castling() {
            return piece == Piece::King && self.castle_pseudo_legal(mv, us);
        }
        if self.occupied_by(us).contains(to) {
            return false;
        }
        // The enemy king is never a legal capture target.
        if self.pieces(us.opponent(), Piece::King).contains(to) {
            return false;
        }

        match piece {
            Piece::Pawn => self.pawn_move_pseudo_legal(mv, us),
            _ => {
                if mv.is_en_passant() || mv.is_promotion() || mv.is_double_pawn_push() {
                    return false;
                }
                let attacks =
                    super::attack_tables::piece_attacks(us, piece, from, self.all_occupied);
                if !attacks.contains(to) {
                    return false;
                }
                mv.is_capture() == self.piece_at(to).is_some()
            }
        }
    }

    fn pawn_move_pseudo_legal(&self, mv: Move, us: Color) -> bool {
        let from = mv.from();
        let to = mv.to();
        let push = us.pawn_push();

        if mv.is_en_passant() {
            return self.en_passant_target == Some(to) && pawn_attacks(us, from).contains(to);
        }

        let promo_rank = if us == Color::White { 7 } else { 0 };
        if (to.rank() == promo_rank) != mv.is_promotion() {
            return false;
        }

        if mv.is_capture() {
            return pawn_attacks(us, from).contains(to) && self.piece_at(to).is_some();
        }
        if mv.is_double_pawn_push() {
            let start_rank = if us == Color::White { 1 } else { 6 };
            let mid = Square::new(usize::midpoint(from.rank(), to.rank()), from.file());
            return from.rank() == start_rank
                && to.index() as isize == from.index() as isize + 2 * push
                && self.is_empty_square(mid)
                && self.is_empty_square(to);
        }
        to.index() as isize == from.index() as isize + push && self.is_empty_square(to)
    }

    pub(crate) fn castle_pseudo_legal(&self, mv: Move, us: Color) -> bool {
        let kingside = mv.is_castle_kingside();
        if self.castling_rights & castle_bit(us, kingside) == 0 {
            return false;
        }
        if self.in_check() {
            return false;
        }
        let king_from = mv.from();
        if self.piece_at(king_from) != Some((us, Piece::King)) {
            return false;
        }
        let (rook_from, rook_to) = self.castle_rook_squares(us, kingside);
        if self.piece_at(rook_from) != Some((us, Piece::Rook)) {
            return false;
        }
        // Both travel paths must be clear, ignoring the two castlers.
        let occ = self.all_occupied
            ^ Bitboard::from_square(king_from)
            ^ Bitboard::from_square(rook_from);
        let king_path = between(king_from, mv.to()) | Bitboard::from_square(mv.to());
        let rook_path = between(rook_from, rook_to) | Bitboard::from_square(rook_to);
        (king_path & occ).is_empty() && (rook_path & occ).is_empty()
    }
}
