//! `attacked_by` validated against a naive per-piece scan.

use crate::board::attacks::{
    bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks,
};
use crate::board::{Board, Color, Piece, Square};

/// Naive scan: loop over every piece of `color` and ask its attack set
/// whether it covers `sq`.
fn attacked_by_naive(board: &Board, color: Color, sq: Square) -> bool {
    let occ = board.occupied();
    for piece in Piece::ALL {
        for from in board.pieces(color, piece).iter() {
            let attacks = match piece {
                Piece::Pawn => pawn_attacks(color, from),
                Piece::Knight => knight_attacks(from),
                Piece::Bishop => bishop_attacks(from, occ),
                Piece::Rook => rook_attacks(from, occ),
                Piece::Queen => bishop_attacks(from, occ) | rook_attacks(from, occ),
                Piece::King => king_attacks(from),
            };
            if attacks.contains(sq) {
                return true;
            }
        }
    }
    false
}

fn assert_attack_agreement(fen: &str) {
    let board = Board::from_fen(fen);
    for idx in 0..64 {
        let sq = Square::from_index(idx);
        for color in Color::BOTH {
            assert_eq!(
                board.attacked_by(color, sq),
                attacked_by_naive(&board, color, sq),
                "attack disagreement at {sq} for {color} in {fen}"
            );
        }
    }
}

#[test]
fn test_attacked_by_matches_naive_startpos() {
    assert_attack_agreement("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
}

#[test]
fn test_attacked_by_matches_naive_kiwipete() {
    assert_attack_agreement("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
}

#[test]
fn test_attacked_by_matches_naive_endgame() {
    assert_attack_agreement("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1");
}

#[test]
fn test_attacked_by_matches_naive_after_random_moves() {
    use rand::prelude::*;

    let mut board = Board::new();
    let mut rng = StdRng::seed_from_u64(0xA77AC4);
    for _ in 0..40 {
        let moves = board.generate_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        board.make_move(mv);

        for idx in (0..64).step_by(3) {
            let sq = Square::from_index(idx);
            for color in Color::BOTH {
                assert_eq!(
                    board.attacked_by(color, sq),
                    attacked_by_naive(&board, color, sq),
                    "disagreement at {sq} after random moves"
                );
            }
        }
    }
}
