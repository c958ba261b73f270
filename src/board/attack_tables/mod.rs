//! Attack generation: leaper tables and magic sliding lookups.

mod leapers;
mod magics;

pub(crate) use leapers::{KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};

use super::types::{Bitboard, Color, Piece, Square};

/// Bishop attacks from `sq` under `occupancy`.
#[inline]
#[must_use]
pub(crate) fn bishop_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    Bitboard(magics::BISHOP_TABLES.attacks(sq.index(), occupancy.0))
}

/// Rook attacks from `sq` under `occupancy`.
#[inline]
#[must_use]
pub(crate) fn rook_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    Bitboard(magics::ROOK_TABLES.attacks(sq.index(), occupancy.0))
}

/// Queen attacks from `sq` under `occupancy`.
#[inline]
#[must_use]
pub(crate) fn queen_attacks(sq: Square, occupancy: Bitboard) -> Bitboard {
    bishop_attacks(sq, occupancy) | rook_attacks(sq, occupancy)
}

/// Knight attacks from `sq`.
#[inline]
#[must_use]
pub(crate) fn knight_attacks(sq: Square) -> Bitboard {
    Bitboard(KNIGHT_ATTACKS[sq.index()])
}

/// King attacks from `sq`.
#[inline]
#[must_use]
pub(crate) fn king_attacks(sq: Square) -> Bitboard {
    Bitboard(KING_ATTACKS[sq.index()])
}

/// Pawn attacks of a pawn of `color` standing on `sq`.
#[inline]
#[must_use]
pub(crate) fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    Bitboard(PAWN_ATTACKS[color.index()][sq.index()])
}

/// Attacks of `piece` of `color` from `sq` under `occupancy`.
#[must_use]
pub(crate) fn piece_attacks(
    color: Color,
    piece: Piece,
    sq: Square,
    occupancy: Bitboard,
) -> Bitboard {
    match piece {
        Piece::Pawn => pawn_attacks(color, sq),
        Piece::Knight => knight_attacks(sq),
        Piece::Bishop => bishop_attacks(sq, occupancy),
        Piece::Rook => rook_attacks(sq, occupancy),
        Piece::Queen => queen_attacks(sq, occupancy),
        Piece::King => king_attacks(sq),
    }
}

/// Reference ray scanner used by tests to validate the magic tables.
#[cfg(test)]
pub(crate) fn sliding_attacks_reference(sq: Square, occupancy: Bitboard, bishop: bool) -> Bitboard {
    Bitboard(magics::sliding_attacks_slow(sq.index(), occupancy.0, bishop))
}
