//! Make/unmake round-trip tests over random playouts.

use rand::prelude::*;

use crate::board::{Board, Move, UnmakeInfo};

#[test]
fn test_legal_moves_stable_after_make_unmake() {
    let mut board = Board::new();
    let initial_moves = board.generate_moves();
    let mut initial: Vec<String> = initial_moves.iter().map(ToString::to_string).collect();
    initial.sort();

    for mv in &initial_moves {
        let info = board.make_move(*mv);
        board.unmake_move(*mv, info);
    }

    let mut after: Vec<String> = board
        .generate_moves()
        .iter()
        .map(ToString::to_string)
        .collect();
    after.sort();
    assert_eq!(initial, after);
}

#[test]
fn test_hash_matches_recompute_after_random_moves() {
    let mut board = Board::new();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut history: Vec<(Move, UnmakeInfo)> = Vec::new();

    for _ in 0..60 {
        let moves = board.generate_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let info = board.make_move(mv);
        history.push((mv, info));

        board.assert_consistent();
        assert_eq!(board.hash(), board.compute_hash());
        assert_eq!(board.pawn_hash(), board.compute_pawn_hash());
    }

    while let Some((mv, info)) = history.pop() {
        board.unmake_move(mv, info);
        board.assert_consistent();
        assert_eq!(board.hash(), board.compute_hash());
    }
}

#[test]
fn test_random_playout_restores_all_state() {
    let mut board = Board::new();
    let initial_hash = board.hash();
    let initial_pawn_hash = board.pawn_hash();
    let initial_fen = board.to_fen();
    let initial_castling = board.castling_rights;
    let initial_phase = board.phase();

    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut history: Vec<(Move, UnmakeInfo)> = Vec::new();

    for _ in 0..200 {
        let moves = board.generate_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let info = board.make_move(mv);
        history.push((mv, info));
    }

    while let Some((mv, info)) = history.pop() {
        board.unmake_move(mv, info);
    }

    assert_eq!(board.hash(), initial_hash);
    assert_eq!(board.pawn_hash(), initial_pawn_hash);
    assert_eq!(board.to_fen(), initial_fen);
    assert_eq!(board.castling_rights, initial_castling);
    assert_eq!(board.phase(), initial_phase);
    assert!(board.key_history.len() == 1);
}

#[test]
fn test_phase_and_material_track_captures() {
    use crate::board::{Color, Piece};

    let mut board =
        Board::from_fen("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
    let npm_before = board.non_pawn_material(Color::Black);
    let mv = board
        .generate_moves()
        .iter()
        .find(|m| m.to_string() == "e4d5")
        .copied()
        .unwrap();
    let info = board.make_move(mv);
    // A pawn capture leaves non-pawn material untouched.
    assert_eq!(board.non_pawn_material(Color::Black), npm_before);
    board.unmake_move(mv, info);

    // Capture the queen and the phase drops.
    let mut board = Board::from_fen("3qk3/8/8/8/8/8/8/3QK3 w - - 0 1");
    let phase_before = board.phase();
    let mv = board
        .generate_moves()
        .iter()
        .find(|m| m.to_string() == "d1d8")
        .copied()
        .unwrap();
    board.make_move(mv);
    assert!(board.phase() < phase_before);
    assert_eq!(board.pieces(Color::Black, Piece::Queen).popcount(), 0);
}
