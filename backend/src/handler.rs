//! Turning client commands into game changes and the messages that announce them

use std::{panic::AssertUnwindSafe, sync::Arc};

use board::{GameStatus, MoveError};
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::{
    error::{CommandError, ErrorKind},
    protocol::{CommandType, ServerMessage, UserGameCommand},
    registry::{GameGuard, GameRegistry},
    session::{Connection, PeerId, SessionRegistry, Transport},
    store::{AuthLookup, GameRecord, Role},
};

/// One client connection as the handler sees it
///
/// The identity is bound by a successful `CONNECT` and is what a later `LEAVE` or a close
/// deregisters.
#[derive(Debug)]
pub struct Peer {
    id: PeerId,
    transport: Arc<dyn Transport>,
    identity: Option<String>,
}

impl Peer {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            id: PeerId::next(),
            transport,
            identity: None,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Send straight to this peer, whether or not it is registered
    pub fn send(&self, message: &ServerMessage) {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(err) => {
                warn!(peer = %self.id, error = %err, "could not encode message");
                return;
            }
        };
        if let Err(err) = self.transport.send(&frame) {
            debug!(peer = %self.id, error = %err, "could not reply to peer");
        }
    }
}

/// Handles every command from every connection
///
/// Commands touching a game run entirely while holding that game's lock, so they are applied
/// and announced one at a time, and every connection sees a game's messages in the same order.
pub struct Handler {
    auth: Arc<dyn AuthLookup>,
    games: GameRegistry,
    sessions: Arc<SessionRegistry>,
}

impl Handler {
    pub fn new(
        auth: Arc<dyn AuthLookup>,
        games: GameRegistry,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            auth,
            games,
            sessions,
        }
    }

    /// Handle one inbound frame
    ///
    /// Any failure, including a panic while handling the command, is reported to the sender as
    /// an `ERROR` message, and the connection stays usable.
    pub async fn handle(&self, peer: &mut Peer, frame: &str) {
        let outcome = AssertUnwindSafe(self.dispatch(peer, frame))
            .catch_unwind()
            .await;
        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(panic) => {
                let info = if let Some(s) = panic.downcast_ref::<&str>() {
                    (*s).to_owned()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_owned()
                };
                CommandError::Internal(info)
            }
        };
        match err.kind() {
            ErrorKind::Internal => error!(peer = %peer.id, error = %err, "command failed"),
            _ => debug!(peer = %peer.id, error = %err, "command rejected"),
        }
        peer.send(&ServerMessage::error(&err));
    }

    /// Report a frame the transport could not decode
    pub fn reject(&self, peer: &Peer, err: CommandError) {
        debug!(peer = %peer.id, error = %err, "frame rejected");
        peer.send(&ServerMessage::error(&err));
    }

    /// The connection went away without a `LEAVE`
    ///
    /// The user is deregistered but keeps their seat, so they can reconnect to it.
    pub fn on_close(&self, peer: &Peer) {
        if let Some(identity) = peer.identity() {
            if let Some(connection) = self.sessions.disconnect_peer(identity, peer.id) {
                info!(
                    user = %identity,
                    game_id = %connection.game_id,
                    peer = %peer.id,
                    "connection closed",
                );
            }
        }
    }

    async fn dispatch(&self, peer: &mut Peer, frame: &str) -> Result<(), CommandError> {
        let command: UserGameCommand = serde_json::from_str(frame)?;
        debug!(
            peer = %peer.id,
            game_id = %command.game_id,
            command = %command.command_type,
            "received command",
        );
        match command.command_type {
            CommandType::Connect => self.connect(peer, &command).await,
            CommandType::MakeMove => self.make_move(&command).await,
            CommandType::Leave => self.leave(peer, &command).await,
            CommandType::Resign => self.resign(&command).await,
            CommandType::RequestLegalMoves => self.legal_moves(peer, &command).await,
            CommandType::Redraw => self.redraw(peer, &command).await,
        }
    }

    async fn authenticate(&self, command: &UserGameCommand) -> Result<String, CommandError> {
        self.auth
            .username(&command.auth_token)
            .await?
            .ok_or(CommandError::Unauthenticated)
    }

    async fn connect(&self, peer: &mut Peer, command: &UserGameCommand) -> Result<(), CommandError> {
        let username = self.authenticate(command).await?;
        let game_id = command.game_id;
        let guard = self.games.lock(game_id).await;
        let record = load(&guard).await?;

        // The same socket connecting as someone else stops speaking for its old identity
        if let Some(previous) = peer.identity.take() {
            if previous != username {
                self.sessions.disconnect_peer(&previous, peer.id);
            }
        }
        self.sessions.connect(Connection {
            identity: username.clone(),
            game_id,
            peer: peer.id,
            transport: peer.transport.clone(),
        });
        peer.identity = Some(username.clone());

        let role = record.role_of(&username);
        info!(user = %username, %game_id, peer = %peer.id, %role, "joined game");
        peer.send(&ServerMessage::LoadGame { game: record.game });
        self.sessions.broadcast_except(
            game_id,
            &username,
            &ServerMessage::notification(format!("{username} joined as {role}")),
        );
        Ok(())
    }

    async fn make_move(&self, command: &UserGameCommand) -> Result<(), CommandError> {
        let mv = command.mv.ok_or(CommandError::MissingPayload {
            command: command.command_type,
            field: "move",
        })?;
        let username = self.authenticate(command).await?;
        let game_id = command.game_id;
        let guard = self.games.lock(game_id).await;
        let mut record = load(&guard).await?;

        let piece = record
            .game
            .board()
            .get(mv.start)
            .ok_or(MoveError::NoPieceAtOrigin)?;
        if record.seat(piece.color) != Some(username.as_str()) {
            return Err(match record.role_of(&username) {
                Role::Observer => CommandError::ObserverCannotMove,
                Role::Player(_) => CommandError::NotYourPiece,
            });
        }
        record.game.make_move(mv)?;
        // Worked out before saving, so a corrupt board fails the command with nothing persisted
        let announcements = status_announcements(&record);
        guard.save(&record).await?;
        info!(user = %username, %game_id, %mv, "move made");

        self.sessions.broadcast(
            game_id,
            &ServerMessage::LoadGame {
                game: record.game.clone(),
            },
        );
        self.sessions.broadcast_except(
            game_id,
            &username,
            &ServerMessage::notification(format!(
                "{username} moved from {} to {}",
                mv.start, mv.end
            )),
        );
        for message in announcements {
            self.sessions
                .broadcast(game_id, &ServerMessage::notification(message));
        }
        Ok(())
    }

    async fn leave(&self, peer: &mut Peer, command: &UserGameCommand) -> Result<(), CommandError> {
        // Nothing to do for a connection that never joined
        let Some(username) = peer.identity.take() else {
            return Ok(());
        };
        self.sessions.disconnect_peer(&username, peer.id);

        let game_id = command.game_id;
        let guard = self.games.lock(game_id).await;
        let Some(mut record) = guard.load().await? else {
            return Ok(());
        };
        if record.vacate(&username) {
            guard.save(&record).await?;
        }
        info!(user = %username, %game_id, peer = %peer.id, "left game");
        self.sessions.broadcast(
            game_id,
            &ServerMessage::notification(format!("{username} left the game")),
        );
        Ok(())
    }

    async fn resign(&self, command: &UserGameCommand) -> Result<(), CommandError> {
        let username = self.authenticate(command).await?;
        let game_id = command.game_id;
        let guard = self.games.lock(game_id).await;
        let mut record = load(&guard).await?;

        if let Some(end) = record.game.ending() {
            return Err(MoveError::GameOver(end).into());
        }
        let Role::Player(color) = record.role_of(&username) else {
            return Err(CommandError::ObserverCannotResign);
        };
        record.game.set_over();
        guard.save(&record).await?;
        info!(user = %username, %game_id, %color, "resigned");
        self.sessions.broadcast(
            game_id,
            &ServerMessage::notification(format!("{username} resigned")),
        );
        Ok(())
    }

    async fn legal_moves(&self, peer: &Peer, command: &UserGameCommand) -> Result<(), CommandError> {
        let position = command.position.ok_or(CommandError::MissingPayload {
            command: command.command_type,
            field: "position",
        })?;
        self.authenticate(command).await?;
        let game_id = command.game_id;
        let guard = self.games.lock(game_id).await;
        let record = load(&guard).await?;
        peer.send(&ServerMessage::Moves {
            moves: record.game.valid_moves(position),
        });
        Ok(())
    }

    async fn redraw(&self, peer: &Peer, command: &UserGameCommand) -> Result<(), CommandError> {
        self.authenticate(command).await?;
        let game_id = command.game_id;
        let guard = self.games.lock(game_id).await;
        let record = load(&guard).await?;
        peer.send(&ServerMessage::LoadGame { game: record.game });
        Ok(())
    }
}

/// What to tell everyone in the game about check, checkmate, or stalemate after a move
fn status_announcements(record: &GameRecord) -> Vec<String> {
    let game_id = record.game_id;
    match record.game.status() {
        GameStatus::InProgress => {
            let turn = record.game.turn();
            if record.game.is_in_check(turn) {
                vec![format!("Check! {turn} is in check!")]
            } else {
                Vec::new()
            }
        }
        GameStatus::Checkmate { loser } => {
            info!(%game_id, %loser, "checkmate");
            vec![format!("Checkmate! {loser} loses!"), "Game Over!".to_owned()]
        }
        GameStatus::Stalemate { .. } => {
            info!(%game_id, "stalemate");
            vec!["Stalemate!".to_owned(), "Game Over!".to_owned()]
        }
        GameStatus::Ended => vec!["Game Over!".to_owned()],
    }
}

/// Load the game behind `guard`, which must exist
async fn load(guard: &GameGuard<'_>) -> Result<GameRecord, CommandError> {
    guard
        .load()
        .await?
        .ok_or(CommandError::GameNotFound(guard.game_id()))
}
