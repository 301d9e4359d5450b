use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{Color, Move, Piece, PieceKind, Position};

/// The pieces on each back rank, from the a-file to the h-file
const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// Storage for the 64 squares of a board
///
/// This holds no rules at all; see [`crate::Game`] for those. Cloning produces fully independent
/// storage, which is what move simulation relies on.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    /// Indexed by `[row - 1][col - 1]`
    squares: [[Option<Piece>; 8]; 8],
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PlacementParseError {
    #[error("expected 8 rows separated by '/', found {0}")]
    WrongRowCount(usize),
    #[error("row {row} does not describe exactly 8 squares")]
    WrongRowLength { row: u8 },
    #[error("unrecognized piece letter {0:?}")]
    UnknownPiece(char),
}

impl Board {
    /// A board with no pieces on it
    pub const fn empty() -> Self {
        Self {
            squares: [[None; 8]; 8],
        }
    }

    /// The arrangement at the start of a chess game
    pub fn initial() -> Self {
        let mut board = Self::empty();
        for (idx, kind) in BACK_RANK.into_iter().enumerate() {
            board.squares[0][idx] = Some(Piece::new(Color::White, kind));
            board.squares[1][idx] = Some(Piece::new(Color::White, PieceKind::Pawn));
            board.squares[6][idx] = Some(Piece::new(Color::Black, PieceKind::Pawn));
            board.squares[7][idx] = Some(Piece::new(Color::Black, kind));
        }
        board
    }

    /// Find the piece, if any, at the given square
    pub const fn get(&self, position: Position) -> Option<Piece> {
        self.squares[position.row() as usize - 1][position.col() as usize - 1]
    }

    /// Place the given piece on the given square, or clear it with `None`
    pub fn set(&mut self, position: Position, piece: Option<Piece>) {
        self.squares[position.row() as usize - 1][position.col() as usize - 1] = piece;
    }

    /// Every occupied square along with the piece on it, row by row
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(|position| Some((position, self.get(position)?)))
    }

    /// The square holding the given color's king, if there is one
    pub fn find_king(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, piece)| *piece == Piece::new(color, PieceKind::King))
            .map(|(position, _)| position)
    }

    /// Move a piece without checking any rules, returning whatever was captured
    ///
    /// The piece at the destination is overwritten, and a pawn given a promotion becomes that
    /// piece. If the starting square is empty, nothing happens.
    pub fn apply(&mut self, mv: Move) -> Option<Piece> {
        let mut piece = self.get(mv.start)?;
        if let Some(kind) = mv.promotion {
            piece.kind = kind;
        }
        let captured = self.get(mv.end);
        self.set(mv.start, None);
        self.set(mv.end, Some(piece));
        captured
    }

    /// Parse the piece placement field of a FEN string
    ///
    /// ```
    /// use board::{Board, Color, Piece, PieceKind, Position};
    /// let board = Board::from_placement("4k3/8/8/8/8/8/8/4K2R").unwrap();
    /// assert_eq!(
    ///     board.get(Position::new(1, 8).unwrap()),
    ///     Some(Piece::new(Color::White, PieceKind::Rook)),
    /// );
    /// assert_eq!(board.pieces().count(), 3);
    /// ```
    pub fn from_placement(placement: &str) -> Result<Self, PlacementParseError> {
        let rows: Vec<&str> = placement.split('/').collect();
        if rows.len() != 8 {
            return Err(PlacementParseError::WrongRowCount(rows.len()));
        }
        let mut board = Self::empty();
        // FEN lists row 8 first
        for (text, row) in rows.into_iter().zip((1..=8).rev()) {
            let mut col = 0u8;
            for letter in text.chars() {
                if let Some(skip) = letter.to_digit(10) {
                    col += skip as u8;
                } else {
                    let piece = Piece::from_fen_letter(letter)
                        .ok_or(PlacementParseError::UnknownPiece(letter))?;
                    col += 1;
                    let position = Position::new(row, col)
                        .ok_or(PlacementParseError::WrongRowLength { row })?;
                    board.set(position, Some(piece));
                }
                if col > 8 {
                    return Err(PlacementParseError::WrongRowLength { row });
                }
            }
            if col != 8 {
                return Err(PlacementParseError::WrongRowLength { row });
            }
        }
        Ok(board)
    }

    /// Convert to the piece placement field of a FEN string
    pub fn to_placement(&self) -> String {
        let mut placement = String::with_capacity(71);
        for row in (0..8).rev() {
            let mut empty = 0;
            for square in self.squares[row] {
                match square {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.fen_letter());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if row > 0 {
                placement.push('/');
            }
        }
        placement
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Board").field(&self.to_placement()).finish()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_placement())
    }
}
