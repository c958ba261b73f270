//! Draw detection: repetition back-scan, fifty-move rule, insufficient
//! material.

use crate::board::Board;

fn play(board: &mut Board, moves: &[&str]) {
    for text in moves {
        let mv = board.parse_move(text).expect("legal move");
        board.make_move(mv);
    }
}

#[test]
fn test_threefold_repetition_detected() {
    let mut board = Board::new();
    // Shuffle the knights back and forth twice: the start position
    // recurs for the third time (castling and ep state unchanged).
    play(
        &mut board,
        &[
            "g1f3", "g8f6", "f3g1", "f6g8", // second occurrence
            "g1f3", "g8f6", "f3g1", "f6g8", // third occurrence
        ],
    );
    assert!(board.is_threefold_repetition());
    assert!(board.is_draw());
}

#[test]
fn test_single_repetition_flags_search_draw() {
    let mut board = Board::new();
    play(&mut board, &["g1f3", "g8f6", "f3g1", "f6g8"]);
    assert!(board.is_repetition());
    assert!(!board.is_threefold_repetition());
}

#[test]
fn test_irreversible_move_resets_repetition_scan() {
    let mut board = Board::new();
    play(&mut board, &["g1f3", "g8f6", "f3g1", "f6g8"]);
    assert!(board.is_repetition());
    // A pawn move resets the fifty counter: the old keys fall outside
    // the scan window.
    play(&mut board, &["e2e4", "e7e5"]);
    assert!(!board.is_repetition());
}

#[test]
fn test_fifty_move_rule() {
    let board = Board::from_fen("4k3/8/8/8/8/8/8/4KR2 w - - 100 80");
    assert!(board.is_draw());
    let board = Board::from_fen("4k3/8/8/8/8/8/8/4KR2 w - - 99 80");
    assert!(!board.is_draw());
}

#[test]
fn test_insufficient_material_cases() {
    // K vs K
    assert!(Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").is_insufficient_material());
    // K+B vs K
    assert!(Board::from_fen("4k3/8/8/8/8/8/8/2B1K3 w - - 0 1").is_insufficient_material());
    // K+N vs K
    assert!(Board::from_fen("4k3/8/8/8/8/8/8/1N2K3 w - - 0 1").is_insufficient_material());
    // Same-colored bishops cannot mate.
    assert!(
        Board::from_fen("2b1k3/8/8/8/8/8/8/2B1K3 w - - 0 1").is_insufficient_material()
    );
    // A pawn keeps the game alive.
    assert!(!Board::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").is_insufficient_material());
    // A rook keeps the game alive.
    assert!(!Board::from_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").is_insufficient_material());
}

#[test]
fn test_repetition_requires_same_side_to_move() {
    let mut board = Board::new();
    // Three plies: the position after white's knight retreat is new
    // (black to move now, was white to move at the start).
    play(&mut board, &["g1f3", "g8f6", "f3g1"]);
    assert!(!board.is_repetition());
}
