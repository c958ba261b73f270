//! FEN parsing/printing and UCI move notation.

use super::error::{FenError, MoveParseError};
use super::state::Board;
use super::types::{
    castle_bit, file_to_index, rank_to_index, Color, Move, Piece, Square,
};

/// The standard starting position.
pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Parse a position from FEN.
    ///
    /// Accepts classical `KQkq` castling rights and Shredder-style file
    /// letters (`HAha`) for Chess960 setups. Rejects malformed input
    /// with a [`FenError`]; never panics on engine input.
    pub fn try_from_fen(fen: &str) -> Result<Self, FenError> {
        let mut board = Board::empty();
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        // Piece placement, rank 8 first.
        for (rank_idx, rank_str) in parts[0].split('/').enumerate() {
            if rank_idx >= 8 {
                return Err(FenError::TooManyRanks);
            }
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { char: c })?;
                    let color = if c.is_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    if file >= 8 {
                        return Err(FenError::TooManyFiles { rank: rank_idx });
                    }
                    board.set_piece(Square::new(7 - rank_idx, file), color, piece);
                    file += 1;
                }
            }
            if file > 8 {
                return Err(FenError::TooManyFiles { rank: rank_idx });
            }
        }

        for color in Color::BOTH {
            let kings = board.pieces(color, Piece::King).popcount();
            if kings != 1 {
                return Err(FenError::BadKingCount {
                    color: if color == Color::White { "white" } else { "black" },
                    count: kings,
                });
            }
        }

        board.side_to_move = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        board.parse_castling_field(parts[2])?;
        board.rebuild_castle_masks();

        // En-passant square, kept only when a capture is actually possible.
        if parts[3] != "-" {
            let chars: Vec<char> = parts[3].chars().collect();
            if chars.len() != 2
                || !('a'..='h').contains(&chars[0])
                || !('1'..='8').contains(&chars[1])
            {
                return Err(FenError::InvalidEnPassant {
                    found: parts[3].to_string(),
                });
            }
            let ep = Square::new(rank_to_index(chars[1]), file_to_index(chars[0]));
            let us = board.side_to_move;
            let capturers = super::attack_tables::pawn_attacks(us.opponent(), ep)
                & board.pieces(us, Piece::Pawn);
            if capturers.any() {
                board.en_passant_target = Some(ep);
            }
        }

        if parts.len() >= 5 {
            board.halfmove_clock = parts[4].parse().unwrap_or(0);
        }
        if parts.len() >= 6 {
            board.fullmove_number = parts[5].parse().unwrap_or(1).max(1);
        }

        board.hash = board.compute_hash();
        board.pawn_hash = board.compute_pawn_hash();
        board.checkers = board.compute_checkers(board.side_to_move);
        board.key_history.push(board.hash);
        Ok(board)
    }

    fn parse_castling_field(&mut self, field: &str) -> Result<(), FenError> {
        for c in field.chars() {
            match c {
                '-' => {}
                'K' => self.add_castling_right(Color::White, true, None),
                'Q' => self.add_castling_right(Color::White, false, None),
                'k' => self.add_castling_right(Color::Black, true, None),
                'q' => self.add_castling_right(Color::Black, false, None),
                'A'..='H' => {
                    let file = c as usize - 'A' as usize;
                    let kingside = file > self.king_square(Color::White).file();
                    self.add_castling_right(Color::White, kingside, Some(file));
                }
                'a'..='h' => {
                    let file = c as usize - 'a' as usize;
                    let kingside = file > self.king_square(Color::Black).file();
                    self.add_castling_right(Color::Black, kingside, Some(file));
                }
                _ => return Err(FenError::InvalidCastling { char: c }),
            }
        }
        Ok(())
    }

    fn add_castling_right(&mut self, color: Color, kingside: bool, rook_file: Option<usize>) {
        self.castling_rights |= castle_bit(color, kingside);
        let file = rook_file.unwrap_or_else(|| {
            // Classical letters: find the outermost rook on the wing.
            let rank = color.back_rank();
            let king_file = self.king_square(color).file();
            let range: Vec<usize> = if kingside {
                ((king_file + 1)..8).rev().collect()
            } else {
                (0..king_file).collect()
            };
            for f in range {
                if self.piece_at(Square::new(rank, f)) == Some((color, Piece::Rook)) {
                    return f;
                }
            }
            if kingside {
                7
            } else {
                0
            }
        });
        let wing = usize::from(!kingside);
        self.castle_rook_file[color.index()][wing] = file as u8;
    }

    /// Parse a position from FEN, panicking on malformed input.
    /// Use [`Board::try_from_fen`] for fallible parsing.
    #[must_use]
    pub fn from_fen(fen: &str) -> Self {
        Self::try_from_fen(fen).expect("invalid FEN string")
    }

    /// Render the position as FEN.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut rows: Vec<String> = Vec::new();
        for rank in (0..8).rev() {
            let mut row = String::new();
            let mut empty = 0;
            for file in 0..8 {
                if let Some((color, piece)) = self.piece_at(Square::new(rank, file)) {
                    if empty > 0 {
                        row.push_str(&empty.to_string());
                        empty = 0;
                    }
                    row.push(piece.to_fen_char(color));
                } else {
                    empty += 1;
                }
            }
            if empty > 0 {
                row.push_str(&empty.to_string());
            }
            rows.push(row);
        }

        let active = if self.side_to_move == Color::White {
            "w"
        } else {
            "b"
        };
        let mut castling = String::new();
        for (color, kingside, c) in [
            (Color::White, true, 'K'),
            (Color::White, false, 'Q'),
            (Color::Black, true, 'k'),
            (Color::Black, false, 'q'),
        ] {
            if self.castling_rights & castle_bit(color, kingside) != 0 {
                castling.push(c);
            }
        }
        if castling.is_empty() {
            castling.push('-');
        }
        let ep = self
            .en_passant_target
            .map_or_else(|| "-".to_string(), |sq| sq.to_string());

        format!(
            "{} {} {} {} {} {}",
            rows.join("/"),
            active,
            castling,
            ep,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Parse a move in UCI long algebraic notation ("e2e4", "e7e8q").
    ///
    /// Classical castling arrives as the king's two-square jump; in
    /// Chess960 mode it arrives as king-takes-own-rook. Returns the
    /// matching legal move or an error.
    pub fn parse_move(&mut self, uci: &str) -> Result<Move, MoveParseError> {
        if uci.len() < 4 || uci.len() > 5 {
            return Err(MoveParseError::InvalidLength { len: uci.len() });
        }
        let chars: Vec<char> = uci.chars().collect();
        if !('a'..='h').contains(&chars[0])
            || !('1'..='8').contains(&chars[1])
            || !('a'..='h').contains(&chars[2])
            || !('1'..='8').contains(&chars[3])
        {
            return Err(MoveParseError::InvalidSquare {
                notation: uci.to_string(),
            });
        }
        let promo = if uci.len() == 5 {
            match Piece::from_char(chars[4]) {
                Some(p @ (Piece::Queen | Piece::Rook | Piece::Bishop | Piece::Knight)) => Some(p),
                _ => {
                    return Err(MoveParseError::InvalidPromotion { char: chars[4] });
                }
            }
        } else {
            None
        };

        let from = Square::new(rank_to_index(chars[1]), file_to_index(chars[0]));
        let to = Square::new(rank_to_index(chars[3]), file_to_index(chars[2]));

        let moves = self.generate_moves();
        for mv in &moves {
            if mv.promotion_piece() != promo {
                continue;
            }
            if mv.from() == from && mv.to() == to && !mv.is_castling() {
                return Ok(*mv);
            }
            if mv.is_castling() && mv.from() == from {
                // Accept both conventions: the king destination square,
                // and (for Chess960 GUIs) the rook's square.
                let (rook_from, _) =
                    self.castle_rook_squares(self.side_to_move, mv.is_castle_kingside());
                if to == mv.to() || to == rook_from {
                    return Ok(*mv);
                }
            }
        }
        Err(MoveParseError::IllegalMove {
            notation: uci.to_string(),
        })
    }

    /// Format a move for UCI output. Chess960 castling prints as
    /// king-takes-own-rook; everything else is plain from-to.
    #[must_use]
    pub fn format_move(&self, mv: Move) -> String {
        if self.chess960 && mv.is_castling() {
            let color = self
                .piece_at(mv.from())
                .map_or(self.side_to_move, |(c, _)| c);
            let (rook_from, _) = self.castle_rook_squares(color, mv.is_castle_kingside());
            return format!("{}{}", mv.from(), rook_from);
        }
        mv.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_roundtrip() {
        let board = Board::from_fen(STARTPOS_FEN);
        assert_eq!(board.to_fen(), STARTPOS_FEN);
        assert_eq!(board.hash(), Board::new().hash());
    }

    #[test]
    fn test_fen_side_and_clock_fields() {
        let board =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 12 7");
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.halfmove_clock(), 12);
        assert_eq!(board.fullmove_number, 7);
    }

    #[test]
    fn test_fen_rejects_malformed() {
        assert!(Board::try_from_fen("").is_err());
        assert!(Board::try_from_fen("8/8/8/8 w - -").is_err()); // no kings
        assert!(Board::try_from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1"
        )
        .is_err());
        assert!(Board::try_from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkz - 0 1"
        )
        .is_err());
        assert!(Board::try_from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq e9 0 1"
        )
        .is_err());
    }

    #[test]
    fn test_fen_ep_square_normalized() {
        // The ep square is only retained when a capture is possible.
        let board =
            Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1");
        assert_eq!(board.en_passant_target, None);

        let board =
            Board::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
        assert_eq!(board.en_passant_target, Some(Square::new(5, 5)));
    }

    #[test]
    fn test_shredder_castling_letters() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w HAha - 0 1");
        assert_eq!(board.castling_rights.count_ones(), 4);
        assert_eq!(board.castle_rook_file[0][0], 7);
        assert_eq!(board.castle_rook_file[0][1], 0);
    }

    #[test]
    fn test_parse_move_basics() {
        let mut board = Board::new();
        let mv = board.parse_move("e2e4").unwrap();
        assert_eq!(mv.to_string(), "e2e4");
        assert!(board.parse_move("e2e5").is_err());
        assert!(board.parse_move("xyz").is_err());
        assert!(board.parse_move("e7e8x").is_err());
    }

    #[test]
    fn test_parse_move_promotion() {
        let mut board = Board::from_fen("8/P7/8/8/8/8/k7/K7 w - - 0 1");
        let mv = board.parse_move("a7a8n").unwrap();
        assert_eq!(mv.promotion_piece(), Some(Piece::Knight));
    }

    #[test]
    fn test_parse_move_castle_both_conventions() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        let classic = board.parse_move("e1g1").unwrap();
        assert!(classic.is_castling());
        // King-takes-rook spelling is accepted too.
        let via_rook = board.parse_move("e1h1").unwrap();
        assert_eq!(classic, via_rook);
    }

    #[test]
    fn test_format_move_chess960_castle() {
        let mut board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        board.set_chess960(true);
        let mv = board.parse_move("e1g1").unwrap();
        assert_eq!(board.format_move(mv), "e1h1");
        board.set_chess960(false);
        assert_eq!(board.format_move(mv), "e1g1");
    }

    #[test]
    fn test_fen_fullmove_roundtrip_after_moves() {
        let mut board = Board::new();
        let e4 = board.parse_move("e2e4").unwrap();
        board.make_move(e4);
        let e5 = board.parse_move("e7e5").unwrap();
        board.make_move(e5);
        assert!(board.to_fen().ends_with("0 2"));
    }
}
