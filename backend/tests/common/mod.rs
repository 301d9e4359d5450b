#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use backend::{
    error::TransportError,
    registry::GameRegistry,
    session::{SessionRegistry, Transport},
    store::{AuthLookup, GameStore, MemoryAuth, MemoryGameStore},
    CommandType, GameId, Handler, Peer, ServerMessage, UserGameCommand,
};
use parking_lot::Mutex;

/// Keeps every frame sent to it, or fails every send once broken
#[derive(Debug, Default)]
pub struct RecordingTransport {
    frames: Mutex<Vec<String>>,
    broken: AtomicBool,
}

impl RecordingTransport {
    pub fn break_it(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Everything received since the last call
    pub fn take(&self) -> Vec<ServerMessage> {
        std::mem::take(&mut *self.frames.lock())
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap())
            .collect()
    }

    /// The notification texts received since the last call, ignoring other messages
    pub fn notifications(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .filter_map(|message| match message {
                ServerMessage::Notification { message } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl Transport for RecordingTransport {
    fn send(&self, frame: &str) -> Result<(), TransportError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.frames.lock().push(frame.to_owned());
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}

pub struct Client {
    pub peer: Peer,
    pub transport: Arc<RecordingTransport>,
    pub token: String,
}

impl Client {
    pub async fn send(&mut self, handler: &Handler, command: &UserGameCommand) {
        let frame = serde_json::to_string(command).unwrap();
        handler.handle(&mut self.peer, &frame).await;
    }

    pub async fn connect(&mut self, handler: &Handler, game_id: GameId) {
        let command = UserGameCommand::new(CommandType::Connect, self.token.clone(), game_id);
        self.send(handler, &command).await;
    }

    pub async fn command(&mut self, handler: &Handler, command_type: CommandType, game_id: GameId) {
        let command = UserGameCommand::new(command_type, self.token.clone(), game_id);
        self.send(handler, &command).await;
    }

    pub async fn make_move(&mut self, handler: &Handler, game_id: GameId, mv: &str) {
        let command = UserGameCommand::make_move(self.token.clone(), game_id, mv.parse().unwrap());
        self.send(handler, &command).await;
    }

    pub fn take(&self) -> Vec<ServerMessage> {
        self.transport.take()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.transport.notifications()
    }

    /// The single error message received since the last check
    pub fn expect_error(&self) -> String {
        match &self.take()[..] {
            [ServerMessage::Error { error_message }] => error_message.clone(),
            other => panic!("expected a single error, got {other:?}"),
        }
    }
}

/// A handler with alice (white) and bob (black) seated at game 1 and carol free to observe
pub struct Fixture {
    pub auth: Arc<MemoryAuth>,
    pub store: Arc<MemoryGameStore>,
    pub sessions: Arc<SessionRegistry>,
    pub handler: Arc<Handler>,
    pub game: GameId,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryGameStore::new());
        let game = store.create("friendly", Some("alice".into()), Some("bob".into()));
        Self::with_store(store.clone(), store, game)
    }

    /// Use `games` for the handler while keeping `store` for inspecting and seeding
    pub fn with_store(
        store: Arc<MemoryGameStore>,
        games: Arc<dyn GameStore>,
        game: GameId,
    ) -> Self {
        let auth = Arc::new(MemoryAuth::new());
        for user in ["alice", "bob", "carol"] {
            auth.insert(format!("{user}-token"), user);
        }
        let sessions = Arc::new(SessionRegistry::new());
        let handler = Arc::new(Handler::new(
            auth.clone() as Arc<dyn AuthLookup>,
            GameRegistry::new(games),
            sessions.clone(),
        ));
        Self {
            auth,
            store,
            sessions,
            handler,
            game,
        }
    }

    pub fn client(&self, user: &str) -> Client {
        let transport = Arc::new(RecordingTransport::default());
        Client {
            peer: Peer::new(transport.clone()),
            transport,
            token: format!("{user}-token"),
        }
    }

    /// A client that has connected to the fixture's game, with its inbox cleared
    pub async fn joined(&self, user: &str) -> Client {
        let mut client = self.client(user);
        client.connect(&self.handler, self.game).await;
        client.take();
        client
    }

    pub async fn record(&self) -> backend::store::GameRecord {
        self.store.load(self.game).await.unwrap().unwrap()
    }
}
