//! Leaderboard and per-player voting stats through the service surface.

mod common;

use common::{harness, settings_1v1, settle};
use crowdchess::GameError;
use uuid::Uuid;

#[tokio::test(start_paused = true)]
async fn stats_queries_require_an_authenticated_session() {
    let h = harness(settings_1v1());
    match h.service.leaderboard(Uuid::new_v4()).await {
        Err(GameError::Unauthenticated) => {}
        other => panic!("expected Unauthenticated, got {other:?}"),
    }
    match h.service.player_stats(Uuid::new_v4()).await {
        Err(GameError::Unauthenticated) => {}
        other => panic!("expected Unauthenticated, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn a_won_game_feeds_the_leaderboard_and_player_stats() {
    let h = harness(settings_1v1());
    let (white, black) = h.start_1v1().await;

    // Black wins by fool's mate; every vote in a 1v1 is the applied move.
    for (conn_id, san) in [
        (white.conn_id, "f3"),
        (black.conn_id, "e5"),
        (white.conn_id, "g4"),
        (black.conn_id, "Qh4"),
    ] {
        h.service.vote(conn_id, san).unwrap();
        settle().await;
    }
    settle().await;

    let board = h.service.leaderboard(black.conn_id).await.unwrap();
    // Only votes from the winning team count.
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].name, "black@test");
    assert_eq!(board[0].winning_votes, 2);

    let black_stats = h.service.player_stats(black.conn_id).await.unwrap();
    assert_eq!(black_stats.votes, 2);
    assert_eq!(black_stats.accepted, 2);
    assert_eq!(black_stats.winning, 2);

    let white_stats = h.service.player_stats(white.conn_id).await.unwrap();
    assert_eq!(white_stats.votes, 2);
    assert_eq!(white_stats.accepted, 2);
    assert_eq!(white_stats.winning, 0);
}
