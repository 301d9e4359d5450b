//! The rules of a game in progress: turns, legality, check, and the end of the game

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::{movegen::pseudo_moves, Board, Color, Move, PieceKind, Position};

/// Reasons a move is rejected
///
/// A rejected move never changes the game.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("the game is already over due to {0}")]
    GameOver(GameEnd),
    #[error("there is no piece at the start position")]
    NoPieceAtOrigin,
    #[error("it is not that piece's turn")]
    WrongTurn,
    #[error("that piece cannot move there")]
    IllegalMove,
    #[error("a pawn reaching the last row must be promoted")]
    PromotionRequired,
    #[error("that move leaves the king in check")]
    MoveLeavesKingInCheck,
}

/// How a game stands, derived from its board, turn and over flag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    /// The side to move is in check with no legal move
    Checkmate { loser: Color },
    /// The side to move is not in check but has no legal move
    Stalemate { stalled: Color },
    /// Over for some other reason, such as a resignation
    Ended,
}

/// Why a finished game finished
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEnd {
    Checkmate,
    Stalemate,
    Resignation,
}

impl fmt::Display for GameEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameEnd::Checkmate => "checkmate",
            GameEnd::Stalemate => "stalemate",
            GameEnd::Resignation => "resignation",
        })
    }
}

/// A chess game: the board, whose turn it is, and whether the game has finished
///
/// Once `over` is set it is never cleared; a finished game is replaced by a fresh one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    turn: Color,
    board: Board,
    over: bool,
}

impl Game {
    /// Create a new game with the chess starting board and white to move
    pub fn new() -> Self {
        Self::with_board(Board::initial(), Color::White)
    }

    /// Create an unfinished game from an arbitrary board
    pub fn with_board(board: Board, turn: Color) -> Self {
        Self {
            turn,
            board,
            over: false,
        }
    }

    /// The side to move, or the side left without moves once the game is over
    pub const fn turn(&self) -> Color {
        self.turn
    }

    pub const fn board(&self) -> &Board {
        &self.board
    }

    pub const fn is_over(&self) -> bool {
        self.over
    }

    /// End the game, e.g. on resignation. There is no way to resume it.
    pub fn set_over(&mut self) {
        self.over = true;
    }

    /// The legal moves for the piece at `from`, regardless of whose turn it is
    ///
    /// These are the piece's pseudo-moves minus those leaving its own king in check. An empty
    /// square yields no moves.
    pub fn valid_moves(&self, from: Position) -> Vec<Move> {
        let Some(piece) = self.board.get(from) else {
            return Vec::new();
        };
        pseudo_moves(&self.board, from)
            .into_iter()
            .filter(|&mv| !self.leaves_king_in_check(piece.color, mv))
            .collect()
    }

    /// Returns if `color`'s king is attacked by any opposing piece
    ///
    /// # Panics
    ///
    /// If `color` has no king on the board, since the question has no answer for a corrupt game.
    pub fn is_in_check(&self, color: Color) -> bool {
        king_attacked(&self.board, color)
    }

    /// In check with no legal move for any piece
    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.is_in_check(color) && !self.has_valid_move(color)
    }

    /// Not in check, but with no legal move for any piece
    pub fn is_in_stalemate(&self, color: Color) -> bool {
        !self.is_in_check(color) && !self.has_valid_move(color)
    }

    /// Make the given move, after checking it against the rules
    ///
    /// On success the turn passes to the other side. If that side is then checkmated or
    /// stalemated, the game is over and [`Self::turn`] stays on the side with no moves.
    pub fn make_move(&mut self, mv: Move) -> Result<(), MoveError> {
        if let Some(end) = self.ending() {
            return Err(MoveError::GameOver(end));
        }
        // Nothing below means anything unless both kings are present
        self.require_kings();
        let piece = self.board.get(mv.start).ok_or(MoveError::NoPieceAtOrigin)?;
        if piece.color != self.turn {
            return Err(MoveError::WrongTurn);
        }
        let candidates = pseudo_moves(&self.board, mv.start);
        if !candidates.contains(&mv) {
            let needs_promotion = piece.kind == PieceKind::Pawn
                && mv.promotion.is_none()
                && candidates
                    .iter()
                    .any(|candidate| candidate.end == mv.end && candidate.promotion.is_some());
            return Err(if needs_promotion {
                MoveError::PromotionRequired
            } else {
                MoveError::IllegalMove
            });
        }
        if self.leaves_king_in_check(piece.color, mv) {
            return Err(MoveError::MoveLeavesKingInCheck);
        }

        self.board.apply(mv);
        self.turn = self.turn.other();
        // Checkmate and stalemate both come down to the side now to move having nothing to play
        if !self.has_valid_move(self.turn) {
            self.over = true;
        }
        Ok(())
    }

    /// Classify the game from its current state
    pub fn status(&self) -> GameStatus {
        if !self.over {
            GameStatus::InProgress
        } else if self.is_in_checkmate(self.turn) {
            GameStatus::Checkmate { loser: self.turn }
        } else if self.is_in_stalemate(self.turn) {
            GameStatus::Stalemate {
                stalled: self.turn,
            }
        } else {
            GameStatus::Ended
        }
    }

    /// Why the game finished, or `None` while it is still going
    pub fn ending(&self) -> Option<GameEnd> {
        match self.status() {
            GameStatus::InProgress => None,
            GameStatus::Checkmate { .. } => Some(GameEnd::Checkmate),
            GameStatus::Stalemate { .. } => Some(GameEnd::Stalemate),
            GameStatus::Ended => Some(GameEnd::Resignation),
        }
    }

    fn require_kings(&self) {
        for color in [Color::White, Color::Black] {
            if self.board.find_king(color).is_none() {
                missing_king(color, &self.board);
            }
        }
    }

    /// Simulate the move on a scratch board and see if `color`'s king ends up attacked
    ///
    /// The live board is never touched.
    fn leaves_king_in_check(&self, color: Color, mv: Move) -> bool {
        let mut scratch = self.board.clone();
        scratch.apply(mv);
        king_attacked(&scratch, color)
    }

    fn has_valid_move(&self, color: Color) -> bool {
        self.board
            .pieces()
            .filter(|(_, piece)| piece.color == color)
            .any(|(position, _)| !self.valid_moves(position).is_empty())
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_king(color: Color, board: &Board) -> ! {
    panic!("no {color} king on the board: {board}")
}

fn king_attacked(board: &Board, color: Color) -> bool {
    let Some(king) = board.find_king(color) else {
        missing_king(color, board);
    };
    board
        .pieces()
        .filter(|(_, piece)| piece.color != color)
        .any(|(position, _)| {
            pseudo_moves(board, position)
                .iter()
                .any(|mv| mv.end == king)
        })
}
