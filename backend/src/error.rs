use board::MoveError;

use crate::protocol::{CommandType, GameId};

/// Failure of a collaborator holding auth tokens or game records
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Failure to hand a frame to a connection
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection is closed")]
    Closed,
    #[error("outbound queue is full")]
    Full,
}

/// Why a command was rejected
///
/// Every variant is reported back to the sender as an `ERROR` message and nothing else; a
/// rejected command never changes a game or the session registry.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{command} requires a {field}")]
    MissingPayload {
        command: CommandType,
        field: &'static str,
    },
    #[error("frame longer than {max} bytes")]
    FrameTooLong { max: usize },

    #[error("unauthorized")]
    Unauthenticated,
    #[error("game {0} does not exist")]
    GameNotFound(GameId),
    #[error("observers cannot move pieces")]
    ObserverCannotMove,
    #[error("you cannot move your opponent's pieces")]
    NotYourPiece,
    #[error("observers cannot resign")]
    ObserverCannotResign,

    #[error(transparent)]
    Rule(#[from] MoveError),

    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Broad classes of [`CommandError`], used to pick how loudly to log
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Protocol,
    Authorization,
    Rule,
    Internal,
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Malformed(_) | Self::MissingPayload { .. } | Self::FrameTooLong { .. } => {
                ErrorKind::Protocol
            }
            Self::Unauthenticated
            | Self::GameNotFound(_)
            | Self::ObserverCannotMove
            | Self::NotYourPiece
            | Self::ObserverCannotResign => ErrorKind::Authorization,
            Self::Rule(_) => ErrorKind::Rule,
            Self::Store(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use board::GameEnd;

    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(CommandError::Unauthenticated.to_string(), "unauthorized");
        assert_eq!(
            CommandError::Rule(MoveError::WrongTurn).to_string(),
            "it is not that piece's turn"
        );
        assert_eq!(
            CommandError::MissingPayload {
                command: CommandType::MakeMove,
                field: "move"
            }
            .to_string(),
            "MAKE_MOVE requires a move"
        );
        assert_eq!(
            CommandError::GameNotFound(GameId(7)).to_string(),
            "game 7 does not exist"
        );
    }

    #[test]
    fn test_kinds() {
        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(CommandError::from(malformed).kind(), ErrorKind::Protocol);
        assert_eq!(CommandError::NotYourPiece.kind(), ErrorKind::Authorization);
        assert_eq!(
            CommandError::from(MoveError::GameOver(GameEnd::Resignation)).kind(),
            ErrorKind::Rule
        );
        let store = StoreError::Unavailable {
            reason: "down".into(),
        };
        assert_eq!(CommandError::from(store).kind(), ErrorKind::Internal);
    }
}
