//! Chess rules for an 8x8 board addressed by 1-based `(row, column)` positions.
//!
//! Row 1 is white's back rank and column 1 is the a-file, so `(2, 5)` is `e2`.

use core::{fmt, str::FromStr};
use std::error;

use serde::{Deserialize, Serialize};

mod board;
pub mod game;
pub mod movegen;

pub use crate::board::{Board, PlacementParseError};
pub use crate::game::{Game, GameEnd, GameStatus, MoveError};

/// The types of pieces there are
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PieceKind {
    King,
    Queen,
    Bishop,
    Knight,
    Rook,
    Pawn,
}
impl PieceKind {
    /// All the kinds of pieces there are
    pub const KINDS: [PieceKind; 6] = [
        Self::King,
        Self::Queen,
        Self::Bishop,
        Self::Knight,
        Self::Rook,
        Self::Pawn,
    ];

    /// The kinds a pawn may promote into, in the order promotion moves are generated
    pub const PROMOTIONS: [PieceKind; 4] = [Self::Queen, Self::Rook, Self::Bishop, Self::Knight];

    /// The capitalized version of the letter used for this piece in FEN
    pub const fn fen_letter(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Rook => 'R',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    /// Parse the FEN letter of a piece, ignoring case
    pub const fn from_fen_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'P' => Some(Self::Pawn),
            'R' => Some(Self::Rook),
            'N' => Some(Self::Knight),
            'B' => Some(Self::Bishop),
            'Q' => Some(Self::Queen),
            'K' => Some(Self::King),
            _ => None,
        }
    }

    /// Whether a pawn can promote into this kind of piece
    pub const fn is_promotable(self) -> bool {
        match self {
            PieceKind::Pawn | PieceKind::King => false,
            PieceKind::Rook | PieceKind::Queen | PieceKind::Knight | PieceKind::Bishop => true,
        }
    }
}

/// The colors a piece can have
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Color {
    White,
    Black,
}
impl Color {
    pub const fn other(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub const fn is_black(self) -> bool {
        match self {
            Color::White => false,
            Color::Black => true,
        }
    }

    pub const fn is_white(self) -> bool {
        match self {
            Color::White => true,
            Color::Black => false,
        }
    }
}
/// Upper-case, as the color appears in game notifications
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        })
    }
}

/// A piece
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    #[serde(rename = "teamColor")]
    pub color: Color,
    #[serde(rename = "pieceType")]
    pub kind: PieceKind,
}
impl Piece {
    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    pub const fn fen_letter(self) -> char {
        match self.color {
            Color::White => self.kind.fen_letter().to_ascii_uppercase(),
            Color::Black => self.kind.fen_letter().to_ascii_lowercase(),
        }
    }

    /// Parse a FEN letter, where upper-case is white and lower-case is black
    pub const fn from_fen_letter(letter: char) -> Option<Self> {
        let color = if letter.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        match PieceKind::from_fen_letter(letter) {
            Some(kind) => Some(Self { color, kind }),
            None => None,
        }
    }
}

/// A square on the board
///
/// Both `row` and `col` are always on the interval [1,8]. Row 1 is white's back rank and
/// column 1 is the a-file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPosition", into = "RawPosition")]
pub struct Position {
    row: u8,
    col: u8,
}
impl Position {
    /// Produce a position from the given row and column, returning `None` if either is off the
    /// board.
    ///
    /// ```
    /// use board::Position;
    /// assert!(Position::new(1, 8).is_some());
    /// assert!(Position::new(0, 4).is_none());
    /// assert!(Position::new(4, 9).is_none());
    /// ```
    pub const fn new(row: u8, col: u8) -> Option<Self> {
        if 1 <= row && row <= 8 && 1 <= col && col <= 8 {
            Some(Self { row, col })
        } else {
            None
        }
    }

    pub const fn row(self) -> u8 {
        self.row
    }

    pub const fn col(self) -> u8 {
        self.col
    }

    /// Offset the given number of rows and columns, returning `None` if that leaves the board.
    ///
    /// ```rust
    /// use board::Position;
    /// let d2 = Position::new(2, 4).unwrap();
    /// assert_eq!(Position::new(1, 1).unwrap().offset(1, 3), Some(d2));
    /// assert_eq!(d2.offset(0, 0), Some(d2));
    /// assert_eq!(Position::new(1, 4).unwrap().offset(-1, 0), None);
    /// assert_eq!(Position::new(4, 8).unwrap().offset(0, 1), None);
    /// assert_eq!(Position::new(8, 8).unwrap().offset(i8::MAX, 0), None);
    /// ```
    pub const fn offset(self, rows: i8, cols: i8) -> Option<Self> {
        let (Some(row), Some(col)) = (
            (self.row as i8).checked_add(rows),
            (self.col as i8).checked_add(cols),
        ) else {
            return None;
        };
        if row < 1 || col < 1 {
            return None;
        }
        Self::new(row as u8, col as u8)
    }

    /// An iterator over all squares on the board, row by row
    ///
    /// ```
    /// assert_eq!(board::Position::all().count(), 64);
    /// ```
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=8).flat_map(|row| (1..=8).map(move |col| Self { row, col }))
    }

    /// The letter of this square's file, `a` through `h`
    pub const fn file_letter(self) -> char {
        (b'a' + self.col - 1) as char
    }
}
impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("row", &self.row)
            .field("col", &self.col)
            .field("readable", &format_args!("{self}"))
            .finish()
    }
}
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_letter(), self.row)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PositionFromStrErr;
impl fmt::Display for PositionFromStrErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("board position string was invalid")
    }
}
impl error::Error for PositionFromStrErr {}
impl FromStr for Position {
    type Err = PositionFromStrErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let &[file @ b'a'..=b'h', rank @ b'1'..=b'8'] = s.as_bytes() else {
            return Err(PositionFromStrErr);
        };
        Ok(Self {
            row: rank - b'0',
            col: file - b'a' + 1,
        })
    }
}

/// How a position looks on the wire, before it has been checked to be on the board
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct RawPosition {
    row: i64,
    column: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PositionOutOfRange {
    pub row: i64,
    pub column: i64,
}
impl fmt::Display for PositionOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "position ({}, {}) is off the board, rows and columns run from 1 to 8",
            self.row, self.column
        )
    }
}
impl error::Error for PositionOutOfRange {}

impl TryFrom<RawPosition> for Position {
    type Error = PositionOutOfRange;

    fn try_from(raw: RawPosition) -> Result<Self, Self::Error> {
        let err = PositionOutOfRange {
            row: raw.row,
            column: raw.column,
        };
        let (Ok(row), Ok(col)) = (u8::try_from(raw.row), u8::try_from(raw.column)) else {
            return Err(err);
        };
        Self::new(row, col).ok_or(err)
    }
}
impl From<Position> for RawPosition {
    fn from(position: Position) -> Self {
        Self {
            row: position.row.into(),
            column: position.col.into(),
        }
    }
}

/// An offset between two squares, in rows and columns
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Offset {
    pub rows: i8,
    pub cols: i8,
}
impl Offset {
    /// The offsets corresponding to all possible knight moves
    pub const KNIGHT_MOVES: [Offset; 8] = [
        Self::new(2, 1),
        Self::new(2, -1),
        Self::new(-2, 1),
        Self::new(-2, -1),
        Self::new(1, 2),
        Self::new(1, -2),
        Self::new(-1, 2),
        Self::new(-1, -2),
    ];

    /// The offsets corresponding to all possible king moves
    pub const KING_MOVES: [Offset; 8] = [
        Self::new(1, 1),
        Self::new(1, 0),
        Self::new(1, -1),
        Self::new(0, 1),
        Self::new(0, -1),
        Self::new(-1, 1),
        Self::new(-1, 0),
        Self::new(-1, -1),
    ];

    /// The directions a rook slides in
    pub const ORTHOGONALS: [Offset; 4] = [
        Self::new(1, 0),
        Self::new(-1, 0),
        Self::new(0, 1),
        Self::new(0, -1),
    ];

    /// The directions a bishop slides in
    pub const DIAGONALS: [Offset; 4] = [
        Self::new(1, 1),
        Self::new(1, -1),
        Self::new(-1, 1),
        Self::new(-1, -1),
    ];

    pub const fn new(rows: i8, cols: i8) -> Self {
        Self { rows, cols }
    }

    /// Apply this offset to the given square, returning `None` if that leaves the board
    pub const fn apply(self, position: Position) -> Option<Position> {
        position.offset(self.rows, self.cols)
    }
}

/// A move of one piece from one square to another
///
/// `promotion` is set exactly when a pawn reaches the far row, and names the piece it becomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    #[serde(rename = "startPosition")]
    pub start: Position,
    #[serde(rename = "endPosition")]
    pub end: Position,
    #[serde(rename = "promotionPiece", default)]
    pub promotion: Option<PieceKind>,
}
impl Move {
    pub const fn new(start: Position, end: Position) -> Self {
        Self {
            start,
            end,
            promotion: None,
        }
    }

    pub const fn promoting(start: Position, end: Position, into: PieceKind) -> Self {
        Self {
            start,
            end,
            promotion: Some(into),
        }
    }
}
/// Long algebraic notation, e.g. `e2e4` or `e7e8q`
impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.start, self.end)?;
        if let Some(kind) = self.promotion {
            write!(f, "{}", kind.fen_letter().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MoveParseError;
impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("move string was not in long algebraic notation")
    }
}
impl error::Error for MoveParseError {}
impl FromStr for Move {
    type Err = MoveParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end, promotion) = match (s.get(0..2), s.get(2..4), s.get(4..)) {
            (Some(start), Some(end), Some(rest)) => (start, end, rest),
            _ => return Err(MoveParseError),
        };
        let start = start.parse().map_err(|_| MoveParseError)?;
        let end = end.parse().map_err(|_| MoveParseError)?;
        let mut letters = promotion.chars();
        let promotion = match (letters.next(), letters.next()) {
            (None, _) => None,
            (Some(letter), None) => match PieceKind::from_fen_letter(letter) {
                Some(kind) if kind.is_promotable() => Some(kind),
                _ => return Err(MoveParseError),
            },
            (Some(_), Some(_)) => return Err(MoveParseError),
        };
        Ok(Self {
            start,
            end,
            promotion,
        })
    }
}
