//! Shared harness for match-flow integration tests.
//!
//! Drives [`MatchService`] directly through the same outbound channels the
//! websocket actors use, so whole scenarios run without a socket. Tests
//! run on a paused tokio clock; sleeping past a deadline fires it
//! deterministically.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use uuid::Uuid;

use crowdchess::auth::PlainVerifier;
use crowdchess::config::{IdentityAllowlist, MatchSettings};
use crowdchess::domain::Team;
use crowdchess::services::match_flow::MatchService;
use crowdchess::store::{GameStore, MemoryStore};
use crowdchess::validator::{ChessRules, MoveValidator};
use crowdchess::ws::protocol::ServerMsg;
use crowdchess::GameError;

pub const INTERGAME_DELAY: Duration = Duration::from_secs(5);
pub const ROUND_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Harness {
    pub service: Arc<MatchService>,
    pub store: Arc<MemoryStore>,
}

#[derive(Debug)]
pub struct Client {
    pub conn_id: Uuid,
    pub rx: UnboundedReceiver<ServerMsg>,
}

/// 1-per-team match with full-turnout quorum, the shape most scenarios use.
pub fn settings_1v1() -> MatchSettings {
    MatchSettings {
        required_players_per_team: 1,
        vote_threshold: 1.0,
        round_timeout: ROUND_TIMEOUT,
        intergame_delay: INTERGAME_DELAY,
        skip_prune_threshold: 3,
        allow_role_override: false,
        exempt_identities: IdentityAllowlist::default(),
    }
}

pub fn harness(settings: MatchSettings) -> Harness {
    harness_with_board(settings, Box::new(ChessRules::new()))
}

pub fn harness_with_board(settings: MatchSettings, board: Box<dyn MoveValidator>) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let service = MatchService::new(settings, store.clone(), Arc::new(PlainVerifier), board);
    Harness { service, store }
}

impl Harness {
    /// Join with a pre-seeded team so assignment is deterministic.
    pub async fn join_as(&self, identity: &str, team: Team) -> Client {
        self.store
            .register_player(identity, identity, team)
            .await
            .expect("memory store never fails");
        self.join(identity).await.expect("join should succeed")
    }

    pub async fn join(&self, identity: &str) -> Result<Client, GameError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        self.service.join(conn_id, identity, tx).await?;
        Ok(Client { conn_id, rx })
    }

    /// Start a 1v1 game: join both players and run the intergame delay out.
    pub async fn start_1v1(&self) -> (Client, Client) {
        let white = self.join_as("white@test", Team::One).await;
        let black = self.join_as("black@test", Team::Two).await;
        tokio::time::sleep(INTERGAME_DELAY + Duration::from_millis(100)).await;
        settle().await;
        (white, black)
    }
}

impl Client {
    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            out.push(msg);
        }
        out
    }

    /// True once the match flow dropped our sender (prune / forced
    /// disconnect) and the queue is empty.
    pub fn is_closed(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(_) => continue,
                Err(TryRecvError::Disconnected) => return true,
                Err(TryRecvError::Empty) => return false,
            }
        }
    }
}

/// Let fire-and-forget store tasks run to completion.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub fn winners(msgs: &[ServerMsg]) -> Vec<(Team, bool)> {
    msgs.iter()
        .filter_map(|m| match m {
            ServerMsg::Winner { team, timeout } => Some((*team, *timeout)),
            _ => None,
        })
        .collect()
}

pub fn round_results(msgs: &[ServerMsg]) -> Vec<Vec<(String, u32)>> {
    msgs.iter()
        .filter_map(|m| match m {
            ServerMsg::RoundResult { ranked } => Some(
                ranked
                    .iter()
                    .map(|r| (r.san.clone(), r.votes))
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        })
        .collect()
}

pub fn last_game_info(msgs: &[ServerMsg]) -> Option<&ServerMsg> {
    msgs.iter()
        .rev()
        .find(|m| matches!(m, ServerMsg::GameInfo { .. }))
}

#[ctor::ctor]
fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = std::env::var("TEST_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_test_writer()
        .without_time()
        .try_init()
        .ok();
}
