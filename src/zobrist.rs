//! Zobrist hashing keys.
//!
//! Keys are drawn from a fixed-seed generator so hashes are stable
//! across runs and processes; the search and the tests both rely on
//! recomputing a hash and comparing it with the incremental one.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{Color, Piece, Square};

const ZOBRIST_SEED: u64 = 0x7A6B_2D4E_9C31_55F8;

pub struct Zobrist {
    /// Keys per (color, piece, square).
    pub piece_keys: [[[u64; 64]; 6]; 2],
    /// Keys per castling-rights bitmask (16 combinations).
    pub castling_keys: [u64; 16],
    /// Keys per en-passant file.
    pub en_passant_keys: [u64; 8],
    /// Key xored in when black is to move.
    pub side_key: u64,
}

pub static ZOBRIST: Lazy<Zobrist> = Lazy::new(|| {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
    let mut piece_keys = [[[0u64; 64]; 6]; 2];
    for color in &mut piece_keys {
        for piece in color.iter_mut() {
            for sq in piece.iter_mut() {
                *sq = rng.gen();
            }
        }
    }
    let mut castling_keys = [0u64; 16];
    // Index 0 (no rights) hashes to zero so rights can be xored in field-wise.
    for key in castling_keys.iter_mut().skip(1) {
        *key = rng.gen();
    }
    let mut en_passant_keys = [0u64; 8];
    for key in &mut en_passant_keys {
        *key = rng.gen();
    }
    Zobrist {
        piece_keys,
        castling_keys,
        en_passant_keys,
        side_key: rng.gen(),
    }
});

#[inline]
#[must_use]
pub fn piece_key(color: Color, piece: Piece, sq: Square) -> u64 {
    ZOBRIST.piece_keys[color.index()][piece.index()][sq.index()]
}

#[inline]
#[must_use]
pub fn castling_key(rights: u8) -> u64 {
    ZOBRIST.castling_keys[(rights & 0xF) as usize]
}

#[inline]
#[must_use]
pub fn en_passant_key(sq: Square) -> u64 {
    ZOBRIST.en_passant_keys[sq.file()]
}

#[inline]
#[must_use]
pub fn side_key() -> u64 {
    ZOBRIST.side_key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_stable() {
        // Fixed seed: spot-check a key is identical on repeated access.
        let k1 = piece_key(Color::White, Piece::Knight, Square::new(0, 1));
        let k2 = piece_key(Color::White, Piece::Knight, Square::new(0, 1));
        assert_eq!(k1, k2);
        assert_ne!(k1, 0);
    }

    #[test]
    fn test_no_rights_hashes_to_zero() {
        assert_eq!(castling_key(0), 0);
        assert_ne!(castling_key(0b0001), 0);
    }

    #[test]
    fn test_keys_distinct() {
        let a = piece_key(Color::White, Piece::Pawn, Square::new(1, 0));
        let b = piece_key(Color::Black, Piece::Pawn, Square::new(1, 0));
        let c = piece_key(Color::White, Piece::Pawn, Square::new(1, 1));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(side_key(), 0);
    }
}
