//! Candidate moves for a single piece
//!
//! Everything here is a pure function of the board it is given: whose turn it is and whether the
//! move leaves the mover's own king in check are both [`crate::Game`]'s concern.

use crate::{Board, Color, Move, Offset, Piece, PieceKind, Position};

/// All moves the piece at `from` could make, ignoring whether they leave its own king in check
///
/// An empty square yields no moves.
pub fn pseudo_moves(board: &Board, from: Position) -> Vec<Move> {
    let Some(piece) = board.get(from) else {
        return Vec::new();
    };
    let mut moves = Vec::new();
    match piece.kind {
        PieceKind::Bishop => slide(board, from, piece, &Offset::DIAGONALS, &mut moves),
        PieceKind::Rook => slide(board, from, piece, &Offset::ORTHOGONALS, &mut moves),
        // Break the queen down into a rook and a bishop
        PieceKind::Queen => {
            slide(board, from, piece, &Offset::ORTHOGONALS, &mut moves);
            slide(board, from, piece, &Offset::DIAGONALS, &mut moves);
        }
        PieceKind::Knight => step(board, from, piece, &Offset::KNIGHT_MOVES, &mut moves),
        PieceKind::King => step(board, from, piece, &Offset::KING_MOVES, &mut moves),
        PieceKind::Pawn => pawn(board, from, piece.color, &mut moves),
    }
    moves
}

/// Whether a piece of `color` may finish its move on `target`
fn is_open_to(board: &Board, target: Position, color: Color) -> bool {
    board.get(target).map_or(true, |other| other.color != color)
}

/// Walk each direction until leaving the board or running into a piece
fn slide(board: &Board, from: Position, piece: Piece, directions: &[Offset], moves: &mut Vec<Move>) {
    for &direction in directions {
        let mut target = direction.apply(from);
        while let Some(square) = target {
            match board.get(square) {
                None => moves.push(Move::new(from, square)),
                Some(other) => {
                    if other.color != piece.color {
                        moves.push(Move::new(from, square));
                    }
                    break;
                }
            }
            target = direction.apply(square);
        }
    }
}

/// Try each offset exactly once
fn step(board: &Board, from: Position, piece: Piece, offsets: &[Offset], moves: &mut Vec<Move>) {
    moves.extend(
        offsets
            .iter()
            .filter_map(|offset| offset.apply(from))
            .filter(|&target| is_open_to(board, target, piece.color))
            .map(|target| Move::new(from, target)),
    );
}

/// How pawns of one color move
struct PawnRules {
    /// `1` if the pawn moves towards row 8, `-1` towards row 1
    forward: i8,
    /// The row the pawns start on, from which they may advance two squares
    home_row: u8,
    /// The row farthest from the start, on which a pawn must promote
    promotion_row: u8,
}
impl PawnRules {
    const fn of(color: Color) -> Self {
        match color {
            Color::White => Self {
                forward: 1,
                home_row: 2,
                promotion_row: 8,
            },
            Color::Black => Self {
                forward: -1,
                home_row: 7,
                promotion_row: 1,
            },
        }
    }
}

fn pawn(board: &Board, from: Position, color: Color, moves: &mut Vec<Move>) {
    let rules = PawnRules::of(color);
    let mut push = |target: Position| {
        if target.row() == rules.promotion_row {
            moves.extend(
                PieceKind::PROMOTIONS
                    .into_iter()
                    .map(|kind| Move::promoting(from, target, kind)),
            );
        } else {
            moves.push(Move::new(from, target));
        }
    };

    if let Some(single) = from.offset(rules.forward, 0) {
        if board.get(single).is_none() {
            push(single);
            if from.row() == rules.home_row {
                if let Some(double) = single.offset(rules.forward, 0) {
                    if board.get(double).is_none() {
                        push(double);
                    }
                }
            }
        }
    }
    for side in [-1, 1] {
        if let Some(target) = from.offset(rules.forward, side) {
            if board.get(target).is_some_and(|other| other.color != color) {
                push(target);
            }
        }
    }
}
