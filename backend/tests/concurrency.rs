mod common;

use std::sync::Arc;

use backend::{GameId, ServerMessage};
use board::{Color, Piece, PieceKind};
use common::Fixture;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_conflicting_moves_apply_once() {
    for _ in 0..20 {
        let fixture = Fixture::new();
        let game = fixture.game;
        let observer = fixture.joined("carol").await;

        let tasks: Vec<_> = ["e2e4", "d2d4"]
            .into_iter()
            .map(|mv| {
                let handler = fixture.handler.clone();
                let mut client = fixture.client("alice");
                tokio::spawn(async move {
                    client.make_move(&handler, game, mv).await;
                    client.take()
                })
            })
            .collect();
        let mut errors = 0;
        for task in tasks {
            let received = task.await.unwrap();
            errors += received
                .iter()
                .filter(|message| matches!(message, ServerMessage::Error { .. }))
                .count();
        }
        assert_eq!(errors, 1, "exactly one of the two moves must be rejected");

        let record = fixture.record().await;
        assert_eq!(record.game.turn(), Color::Black);
        let pawn = Some(Piece::new(Color::White, PieceKind::Pawn));
        let advanced = ["e4", "d4"]
            .into_iter()
            .filter(|square| record.game.board().get(square.parse().unwrap()) == pawn)
            .count();
        assert_eq!(advanced, 1);

        // The observer saw exactly one move
        let loads = observer
            .take()
            .into_iter()
            .filter(|message| matches!(message, ServerMessage::LoadGame { .. }))
            .count();
        assert_eq!(loads, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_observers_see_one_order() {
    let fixture = Fixture::new();
    let game = fixture.game;
    let first = fixture.joined("carol").await;
    let mut alice = fixture.joined("alice").await;
    let mut bob = fixture.joined("bob").await;
    first.take();
    alice.take();

    // Alternate moves from two tasks racing to each apply theirs
    let handler = fixture.handler.clone();
    let white = tokio::spawn({
        let handler = handler.clone();
        async move {
            for mv in ["b1c3", "c3b1", "b1c3", "c3b1"] {
                loop {
                    alice.make_move(&handler, game, mv).await;
                    let rejected = alice
                        .take()
                        .iter()
                        .any(|message| matches!(message, ServerMessage::Error { .. }));
                    if !rejected {
                        break;
                    }
                    tokio::task::yield_now().await;
                }
            }
        }
    });
    let black = tokio::spawn(async move {
        for mv in ["b8c6", "c6b8", "b8c6", "c6b8"] {
            loop {
                bob.make_move(&handler, game, mv).await;
                let rejected = bob
                    .take()
                    .iter()
                    .any(|message| matches!(message, ServerMessage::Error { .. }));
                if !rejected {
                    break;
                }
                tokio::task::yield_now().await;
            }
        }
    });
    white.await.unwrap();
    black.await.unwrap();

    let notifications = first.notifications();
    assert_eq!(
        notifications,
        [
            "alice moved from b1 to c3",
            "bob moved from b8 to c6",
            "alice moved from c3 to b1",
            "bob moved from c6 to b8",
            "alice moved from b1 to c3",
            "bob moved from b8 to c6",
            "alice moved from c3 to b1",
            "bob moved from c6 to b8",
        ]
    );
    assert_eq!(fixture.record().await.game.turn(), Color::White);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_separate_games_progress_together() {
    let fixture = Arc::new(Fixture::new());
    let games: Vec<GameId> = (0..8)
        .map(|idx| {
            fixture
                .store
                .create(format!("game {idx}"), Some("alice".into()), Some("bob".into()))
        })
        .collect();

    let tasks: Vec<_> = games
        .iter()
        .map(|&game| {
            let fixture = fixture.clone();
            tokio::spawn(async move {
                let mut alice = fixture.client("alice");
                let mut bob = fixture.client("bob");
                for (white, black) in [("e2e4", "e7e5"), ("g1f3", "b8c6"), ("f1b5", "a7a6")] {
                    alice.make_move(&fixture.handler, game, white).await;
                    bob.make_move(&fixture.handler, game, black).await;
                }
                assert!(alice.take().is_empty());
                assert!(bob.take().is_empty());
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    for game in games {
        let record = fixture.store.records()[game.0 as usize - 1].clone();
        assert_eq!(
            record.game.board().to_placement(),
            "r1bqkbnr/1ppp1ppp/p1n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R"
        );
    }
}
