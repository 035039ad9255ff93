//! Voting-round behavior: quorum tallies, tie-breaks, rejection paths.

mod common;

use std::time::Duration;

use common::{harness, round_results, settings_1v1, settle, Harness};
use crowdchess::config::MatchSettings;
use crowdchess::domain::{GameStatus, Team};
use crowdchess::store::GameStore;
use crowdchess::ws::protocol::ServerMsg;
use crowdchess::GameError;
use uuid::Uuid;

fn settings_2v1() -> MatchSettings {
    MatchSettings {
        required_players_per_team: 1,
        vote_threshold: 1.0,
        ..settings_1v1()
    }
}

async fn start_2v1(h: &Harness) -> (common::Client, common::Client, common::Client) {
    let a1 = h.join_as("a1@test", Team::One).await;
    let a2 = h.join_as("a2@test", Team::One).await;
    let b = h.join_as("b@test", Team::Two).await;
    tokio::time::sleep(common::INTERGAME_DELAY + Duration::from_millis(100)).await;
    settle().await;
    (a1, a2, b)
}

#[tokio::test(start_paused = true)]
async fn single_vote_reaches_quorum_and_advances_the_round() {
    let h = harness(settings_1v1());
    let (mut white, mut black) = h.start_1v1().await;
    white.drain();
    black.drain();

    h.service.vote(white.conn_id, "e4").unwrap();
    settle().await;

    let overview = h.service.overview();
    assert_eq!(overview.status, GameStatus::Playing);
    assert_eq!(overview.round_index, 1);
    // The applied move flipped the side to move.
    assert!(overview.position_fen.contains(" b "));

    let white_msgs = white.drain();
    assert_eq!(round_results(&white_msgs), vec![vec![("e4".to_string(), 1)]]);

    // A fresh round opens for the other side, with a fresh deadline.
    let (fen, next_vote_time) = white_msgs
        .iter()
        .find_map(|m| match m {
            ServerMsg::State {
                fen,
                next_vote_time,
            } => Some((fen.clone(), *next_vote_time)),
            _ => None,
        })
        .expect("board state after tally");
    assert!(fen.contains(" b "));
    assert!(next_vote_time > 0);

    // The ranked result goes to the voting team only.
    let black_msgs = black.drain();
    assert!(round_results(&black_msgs).is_empty());
    assert!(black_msgs
        .iter()
        .any(|m| matches!(m, ServerMsg::State { .. })));

    // Round outcome and vote history are persisted.
    let games = h.store.games();
    assert_eq!(games.len(), 1);
    let moves = h.store.applied_moves(games[0].id);
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].san, "e4");
    assert_eq!(moves[0].round, 0);
    assert_eq!(moves[0].votes_for, 1);
    assert_eq!(moves[0].total_votes, 1);
}

#[tokio::test(start_paused = true)]
async fn equal_votes_resolve_to_exactly_one_deterministic_move() {
    let h = harness(settings_2v1());
    let (mut a1, mut a2, _b) = start_2v1(&h).await;
    a1.drain();
    a2.drain();

    h.service.vote(a1.conn_id, "e4").unwrap();
    h.service.vote(a2.conn_id, "d4").unwrap();
    settle().await;

    // 1-1 tie: the lexically smaller move wins, and both voters see the
    // same single ranking.
    let expected = vec![("d4".to_string(), 1), ("e4".to_string(), 1)];
    assert_eq!(round_results(&a1.drain()), vec![expected.clone()]);
    assert_eq!(round_results(&a2.drain()), vec![expected]);

    let games = h.store.games();
    let moves = h.store.applied_moves(games[0].id);
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].san, "d4");
    assert_eq!(moves[0].total_votes, 2);
}

#[tokio::test(start_paused = true)]
async fn votes_below_quorum_broadcast_progress() {
    let h = harness(settings_2v1());
    let (mut a1, mut a2, mut b) = start_2v1(&h).await;
    a1.drain();
    a2.drain();
    b.drain();

    h.service.vote(a1.conn_id, "e4").unwrap();

    // 1 of 2 eligible: no tally yet, progress goes to everyone.
    assert_eq!(h.service.overview().round_index, 0);
    for client in [&mut a1, &mut a2, &mut b] {
        let msgs = client.drain();
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMsg::VotingUpdate {
                votes_cast: 1,
                eligible: 2
            }
        )));
        assert!(round_results(&msgs).is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_votes_mutate_nothing() {
    let h = harness(settings_1v1());
    let waiting_voter = h.join_as("early@test", Team::One).await;

    // No game in play yet.
    assert_eq!(
        h.service.vote(waiting_voter.conn_id, "e4"),
        Err(GameError::GameNotInPlay)
    );

    let black = h.join_as("black@test", Team::Two).await;
    tokio::time::sleep(common::INTERGAME_DELAY + Duration::from_millis(100)).await;
    settle().await;

    // Unknown connections are unauthenticated.
    assert_eq!(
        h.service.vote(Uuid::new_v4(), "e4"),
        Err(GameError::Unauthenticated)
    );
    // White to move: black may not vote.
    assert_eq!(
        h.service.vote(black.conn_id, "e5"),
        Err(GameError::WrongTurn)
    );
    // Illegal move text is rejected by the validator.
    assert_eq!(
        h.service.vote(waiting_voter.conn_id, "Ke2"),
        Err(GameError::IllegalMove)
    );

    let overview = h.service.overview();
    assert_eq!(overview.round_index, 0);
    assert_eq!(overview.status, GameStatus::Playing);
    // Nothing was tallied or persisted.
    assert!(h.store.applied_moves(h.store.games()[0].id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn a_session_votes_at_most_once_per_round() {
    let h = harness(settings_2v1());
    let (a1, _a2, _b) = start_2v1(&h).await;

    h.service.vote(a1.conn_id, "e4").unwrap();
    assert_eq!(
        h.service.vote(a1.conn_id, "d4"),
        Err(GameError::AlreadyVoted)
    );
}

#[tokio::test(start_paused = true)]
async fn one_identity_cannot_vote_twice_across_sessions() {
    let settings = MatchSettings {
        allow_role_override: true,
        ..settings_2v1()
    };
    let h = harness(settings);
    h.store
        .register_player("dup@test", "dup@test", Team::One)
        .await
        .unwrap();
    let s1 = h.join("dup@test").await.unwrap();
    let s2 = h.join("dup@test").await.unwrap();
    let _b = h.join_as("b@test", Team::Two).await;
    tokio::time::sleep(common::INTERGAME_DELAY + Duration::from_millis(100)).await;
    settle().await;

    h.service.vote(s1.conn_id, "e4").unwrap();
    assert_eq!(
        h.service.vote(s2.conn_id, "d4"),
        Err(GameError::AlreadyVoted)
    );
}
