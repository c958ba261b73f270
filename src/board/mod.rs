//! Position representation: bitboards, move generation, make/unmake.

mod attack_tables;
mod error;
mod fen;
mod make_unmake;
mod masks;
mod movegen;
mod see;
mod state;
mod types;

#[cfg(test)]
mod tests;

pub use error::{FenError, MoveParseError, SquareError};
pub use fen::STARTPOS_FEN;
pub use state::{Board, NullMoveInfo, UnmakeInfo};
pub use types::{s, Bitboard, Color, Move, MoveList, Piece, Score, ScoredMove, Square, MAX_PLY};

pub(crate) use state::PHASE_WEIGHTS;
pub(crate) use types::ScoredMoveList;

pub(crate) mod attacks {
    //! Re-exports of the attack primitives for the evaluator and picker.
    pub(crate) use super::attack_tables::{
        bishop_attacks, king_attacks, knight_attacks, pawn_attacks, queen_attacks, rook_attacks,
    };
}

pub(crate) mod geometry {
    //! Re-exports of the precomputed mask helpers.
    pub(crate) use super::masks::{
        adjacent_files, between, distance, forward_file, king_flank, king_zone, passed_span,
    };
}
