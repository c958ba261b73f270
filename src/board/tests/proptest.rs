//! Property-based tests over random legal playouts.

use proptest::prelude::*;
use rand::prelude::*;
use rand::Rng as _;

use crate::board::{Board, Move, UnmakeInfo};

fn seed_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

fn move_count_strategy() -> impl Strategy<Value = usize> {
    1..=24usize
}

proptest! {
    /// make_move followed by unmake_move restores the position exactly:
    /// placement, castling, en passant, clocks and all keys.
    #[test]
    fn prop_make_unmake_restores_state(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        let initial_hash = board.hash();
        let initial_pawn_hash = board.pawn_hash();
        let initial_fen = board.to_fen();

        let mut history: Vec<(Move, UnmakeInfo)> = Vec::new();
        for _ in 0..num_moves {
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

        prop_assert_eq!(board.hash(), initial_hash);
        prop_assert_eq!(board.pawn_hash(), initial_pawn_hash);
        prop_assert_eq!(board.to_fen(), initial_fen);
    }

    /// The incremental hash always equals a from-scratch recomputation.
    #[test]
    fn prop_hash_consistency(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let moves = board.generate_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
            prop_assert_eq!(board.hash(), board.compute_hash());
            prop_assert_eq!(board.pawn_hash(), board.compute_pawn_hash());
        }
    }

    /// FEN round-trips preserve the position identity.
    #[test]
    fn prop_fen_roundtrip(seed in seed_strategy(), num_moves in move_count_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let moves = board.generate_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
        }

        let restored = Board::from_fen(&board.to_fen());
        prop_assert_eq!(board.hash(), restored.hash());
        prop_assert_eq!(board.side_to_move(), restored.side_to_move());
        prop_assert_eq!(board.castling_rights, restored.castling_rights);
        prop_assert_eq!(board.en_passant_target, restored.en_passant_target);
    }

    /// Every generated legal move leaves the own king safe, and the
    /// count matches a make/test/unmake filter of the pseudo-legal set.
    #[test]
    fn prop_legal_moves_are_legal(seed in seed_strategy()) {
        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..12 {
            let moves = board.generate_moves();
            if moves.is_empty() {
                break;
            }
            let us = board.side_to_move();
            for mv in &moves {
                let info = board.make_move(*mv);
                prop_assert!(!board.is_in_check(us), "move {} leaves king in check", mv);
                board.unmake_move(*mv, info);
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
        }
    }

    /// The evaluator stays finite on arbitrary reachable positions.
    #[test]
    fn prop_eval_is_finite(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use crate::eval::{EvalParams, Evaluator, NO_EVAL};
        use std::sync::Arc;

        let mut board = Board::new();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut evaluator = Evaluator::new(Arc::new(EvalParams::new()));

        for _ in 0..num_moves {
            let moves = board.generate_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            board.make_move(mv);
            let result = evaluator.evaluate(&board, -30000, 30000, NO_EVAL);
            prop_assert!(result.value.abs() < 10_000, "eval {} out of range", result.value);
        }
    }
}
