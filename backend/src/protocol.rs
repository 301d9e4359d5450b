//! The JSON messages exchanged with clients, one per frame

use core::fmt;

use board::{Game, Move, Position};
use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Identifies a stored game
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u32);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandType {
    Connect,
    MakeMove,
    Leave,
    Resign,
    #[serde(alias = "DISPLAY_MOVES")]
    RequestLegalMoves,
    Redraw,
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "CONNECT",
            Self::MakeMove => "MAKE_MOVE",
            Self::Leave => "LEAVE",
            Self::Resign => "RESIGN",
            Self::RequestLegalMoves => "REQUEST_LEGAL_MOVES",
            Self::Redraw => "REDRAW",
        })
    }
}

/// A command sent by a client
///
/// `move` is only meaningful for [`CommandType::MakeMove`] and `position` only for
/// [`CommandType::RequestLegalMoves`]; both are ignored on other commands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGameCommand {
    pub command_type: CommandType,
    pub auth_token: String,
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    #[serde(rename = "move", default, skip_serializing_if = "Option::is_none")]
    pub mv: Option<Move>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl UserGameCommand {
    pub fn new(command_type: CommandType, auth_token: impl Into<String>, game_id: GameId) -> Self {
        Self {
            command_type,
            auth_token: auth_token.into(),
            game_id,
            mv: None,
            position: None,
        }
    }

    pub fn make_move(auth_token: impl Into<String>, game_id: GameId, mv: Move) -> Self {
        Self {
            mv: Some(mv),
            ..Self::new(CommandType::MakeMove, auth_token, game_id)
        }
    }

    pub fn request_legal_moves(
        auth_token: impl Into<String>,
        game_id: GameId,
        position: Position,
    ) -> Self {
        Self {
            position: Some(position),
            ..Self::new(CommandType::RequestLegalMoves, auth_token, game_id)
        }
    }
}

/// A message sent by the server, tagged by `serverMessageType`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "serverMessageType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    /// The full state of a game, sent after anything changes it
    LoadGame { game: Game },
    Notification { message: String },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
    /// The legal moves of one piece, in reply to a request for them
    Moves { moves: Vec<Move> },
}

impl ServerMessage {
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }

    /// The reply for a rejected command. Clients look for the `Error` prefix.
    pub fn error(err: &CommandError) -> Self {
        Self::Error {
            error_message: format!("Error: {err}"),
        }
    }

    /// Serialize into a single frame
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_connect() {
        let command: UserGameCommand = serde_json::from_value(json!({
            "commandType": "CONNECT",
            "authToken": "abc",
            "gameID": 3,
        }))
        .unwrap();
        assert_eq!(
            command,
            UserGameCommand::new(CommandType::Connect, "abc", GameId(3))
        );
    }

    #[test]
    fn test_decode_make_move() {
        let command: UserGameCommand = serde_json::from_value(json!({
            "commandType": "MAKE_MOVE",
            "authToken": "abc",
            "gameID": 1,
            "move": {
                "startPosition": {"row": 7, "column": 1},
                "endPosition": {"row": 8, "column": 1},
                "promotionPiece": "QUEEN",
            },
        }))
        .unwrap();
        assert_eq!(command.mv, Some("a7a8q".parse().unwrap()));
    }

    #[test]
    fn test_display_moves_alias() {
        let command: UserGameCommand = serde_json::from_value(json!({
            "commandType": "DISPLAY_MOVES",
            "authToken": "abc",
            "gameID": 1,
            "position": {"row": 2, "column": 5},
        }))
        .unwrap();
        assert_eq!(command.command_type, CommandType::RequestLegalMoves);
        assert_eq!(command.position, Some("e2".parse().unwrap()));
    }

    #[test]
    fn test_reject_bad_commands() {
        for bad in [
            json!({"commandType": "DANCE", "authToken": "abc", "gameID": 1}),
            json!({"commandType": "CONNECT", "gameID": 1}),
            json!({"commandType": "CONNECT", "authToken": "abc", "gameID": "one"}),
            json!({
                "commandType": "REQUEST_LEGAL_MOVES",
                "authToken": "abc",
                "gameID": 1,
                "position": {"row": 9, "column": 1},
            }),
        ] {
            assert!(
                serde_json::from_value::<UserGameCommand>(bad.clone()).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_encode_server_messages() {
        let encoded = ServerMessage::notification("hello").encode().unwrap();
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&encoded).unwrap(),
            json!({"serverMessageType": "NOTIFICATION", "message": "hello"})
        );

        let error = ServerMessage::error(&CommandError::Unauthenticated);
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({"serverMessageType": "ERROR", "errorMessage": "Error: unauthorized"})
        );

        let load = serde_json::to_value(ServerMessage::LoadGame { game: Game::new() }).unwrap();
        assert_eq!(load["serverMessageType"], "LOAD_GAME");
        assert_eq!(load["game"]["turn"], "WHITE");

        let moves = ServerMessage::Moves {
            moves: vec!["e2e4".parse().unwrap()],
        };
        let value = serde_json::to_value(&moves).unwrap();
        assert_eq!(value["serverMessageType"], "MOVES");
        assert_eq!(value["moves"][0]["endPosition"], json!({"row": 4, "column": 5}));
        assert_eq!(
            serde_json::from_value::<ServerMessage>(value).unwrap(),
            moves
        );
    }
}
