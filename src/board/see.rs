//! Static exchange evaluation.
//!
//! Resolves the capture sequence on one square with least-valuable
//! attackers first, revealing x-ray attackers as pieces come off, and
//! backs the gains up minimax-style.

use super::attack_tables::{bishop_attacks, rook_attacks};
use super::state::Board;
use super::types::{Bitboard, Color, Move, Piece, Square};

/// Piece values used by the exchange resolver.
const SEE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 20000];

impl Board {
    /// Material balance of the exchange started by `mv`, in centipawns
    /// from the mover's perspective. Positive means the capture wins
    /// material, zero an even trade.
    #[must_use]
    pub fn see(&self, mv: Move) -> i32 {
        let from = mv.from();
        let to = mv.to();

        let victim = match self.piece_at(to) {
            Some((_, piece)) => piece,
            None if mv.is_en_passant() => Piece::Pawn,
            None => return 0,
        };
        let Some((_, attacker)) = self.piece_at(from) else {
            return 0;
        };
        self.see_exchange(from, to, attacker, victim)
    }

    /// True if `see(mv)` meets `threshold`. Used for capture ordering.
    #[inline]
    #[must_use]
    pub(crate) fn see_ge(&self, mv: Move, threshold: i32) -> bool {
        self.see(mv) >= threshold
    }

    /// True if the quiet move `mv` does not simply hang the piece on its
    /// destination: unsafe when an enemy pawn covers the square, or when
    /// the square is attacked and nothing defends it after the move.
    #[must_use]
    pub(crate) fn see_quiet_safe(&self, mv: Move) -> bool {
        let Some((us, piece)) = self.piece_at(mv.from()) else {
            return true;
        };
        if piece == Piece::King {
            return true;
        }
        let them = us.opponent();
        let to = mv.to();
        if piece != Piece::Pawn {
            let enemy_pawns = super::attack_tables::pawn_attacks(us, to)
                & self.pieces(them, Piece::Pawn);
            if enemy_pawns.any() {
                return false;
            }
        }
        let from_bb = Bitboard::from_square(mv.from());
        let occupancy = (self.all_occupied ^ from_bb) | Bitboard::from_square(to);
        let all_attackers = self.attackers_to(to, occupancy);
        if (all_attackers & self.occupied_by(them) & occupancy).is_empty() {
            return true;
        }
        (all_attackers & self.occupied_by(us) & !from_bb).any()
    }

    fn see_exchange(&self, from: Square, to: Square, attacker: Piece, victim: Piece) -> i32 {
        const MAX_EXCHANGE: usize = 32;
        let mut gain = [0i32; MAX_EXCHANGE];
        let mut depth = 0usize;

        let mut occupancy = self.all_occupied;
        let mut attackers = self.attackers_to(to, occupancy);
        let mut side = self.side_to_move;
        let mut current = attacker;
        let mut from_bb = Bitboard::from_square(from);

        gain[0] = SEE_VALUES[victim.index()];

        loop {
            // Lift the capturing piece, revealing anything behind it.
            occupancy ^= from_bb;
            attackers &= !from_bb;

            if current == Piece::Pawn || current.attacks_diagonally() {
                attackers |= bishop_attacks(to, occupancy) & self.diagonal_sliders() & occupancy;
            }
            if current == Piece::Pawn || current.attacks_straight() {
                attackers |= rook_attacks(to, occupancy) & self.straight_sliders() & occupancy;
            }

            side = side.opponent();
            let side_attackers = attackers & self.occupied_by(side);
            if side_attackers.is_empty() {
                break;
            }

            depth += 1;
            if depth >= MAX_EXCHANGE {
                break;
            }

            let (lva_piece, lva_bb) = self.least_valuable_attacker(side_attackers, side);

            gain[depth] = SEE_VALUES[current.index()] - gain[depth - 1];

            // Neither side continues a sequence that is already lost.
            if (-gain[depth - 1]).max(gain[depth]) < 0 {
                break;
            }

            // The king cannot recapture into remaining enemy attackers.
            if lva_piece == Piece::King
                && (attackers & self.occupied_by(side.opponent())).any()
            {
                break;
            }

            current = lva_piece;
            from_bb = lva_bb;
        }

        while depth > 0 {
            depth -= 1;
            gain[depth] = -(-gain[depth]).max(gain[depth + 1]);
        }
        gain[0]
    }

    fn least_valuable_attacker(&self, attackers: Bitboard, side: Color) -> (Piece, Bitboard) {
        for piece in Piece::ALL {
            let candidates = attackers & self.pieces(side, piece);
            if candidates.any() {
                return (piece, Bitboard::from_square(candidates.lsb()));
            }
        }
        unreachable!("least_valuable_attacker called with no attackers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(board: &mut Board, text: &str) -> Move {
        let moves = board.generate_moves();
        for mv in &moves {
            if mv.to_string() == text {
                return *mv;
            }
        }
        panic!("move {text} not found");
    }

    #[test]
    fn test_see_free_pawn() {
        // Queen takes an undefended pawn.
        let mut board = Board::from_fen("4k3/8/8/3p4/8/8/3Q4/4K3 w - - 0 1");
        let mv = capture(&mut board, "d2d5");
        assert_eq!(board.see(mv), 100);
    }

    #[test]
    fn test_see_defended_pawn_loses_queen() {
        // Pawn on d5 defended by pawn e6: QxP loses queen for pawn.
        let mut board = Board::from_fen("4k3/8/4p3/3p4/8/8/3Q4/4K3 w - - 0 1");
        let mv = capture(&mut board, "d2d5");
        assert_eq!(board.see(mv), 100 - 900);
    }

    #[test]
    fn test_see_even_trade() {
        // Rook takes rook, recaptured by rook.
        let mut board = Board::from_fen("3rk3/8/8/8/8/8/8/3RK3 w - - 0 1");
        let mv = capture(&mut board, "d1d8");
        assert_eq!(board.see(mv), 0);
    }

    #[test]
    fn test_see_xray_support() {
        // Doubled rooks win the exchange on d8: RxR, rxR, Rxr.
        let mut board = Board::from_fen("3rk3/8/8/8/8/8/3R4/3RK3 w - - 0 1");
        let mv = capture(&mut board, "d2d8");
        assert_eq!(board.see(mv), 500);
    }

    #[test]
    fn test_see_knight_takes_defended_pawn() {
        // Nxd5 with the pawn defended by a pawn: 100 - 320 = -220.
        let mut board = Board::from_fen("4k3/4p3/8/3p4/8/4N3/8/4K3 w - - 0 1");
        let mv = capture(&mut board, "e3d5");
        assert_eq!(board.see(mv), 100 - 320);
    }

    #[test]
    fn test_see_quiet_safe() {
        // a5 is covered by the b6 pawn: moving the rook there hangs it.
        let mut board = Board::from_fen("4k3/8/1p6/8/8/8/8/R3K3 w - - 0 1");
        let moves = board.generate_moves();
        let to_a5 = moves
            .iter()
            .find(|m| m.to_string() == "a1a5")
            .copied()
            .unwrap();
        assert!(!board.see_quiet_safe(to_a5));
        let to_a3 = moves
            .iter()
            .find(|m| m.to_string() == "a1a3")
            .copied()
            .unwrap();
        assert!(board.see_quiet_safe(to_a3));
    }
}
