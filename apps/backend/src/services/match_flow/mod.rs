//! Match orchestration: session registry, voting rounds, and the
//! Waiting/Playing lifecycle, behind a single lock.
//!
//! Inbound client actions and timer callbacks are processed one at a time
//! against [`MatchState`]; no two mutations interleave. Store writes are
//! fire-and-forget tasks whose outcome never gates a transition. Timer
//! callbacks capture a generation (rounds) or epoch (games) at schedule
//! time and no-op when it no longer matches, so a stale deadline or
//! restart can never act on a superseded round or game.

mod orchestration;
mod player_actions;
mod round_lifecycle;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::auth::IdentityVerifier;
use crate::config::MatchSettings;
use crate::domain::{GameStatus, Team, TeamColor, WaitingReason};
use crate::store::GameStore;
use crate::timer::ManagedTimer;
use crate::validator::MoveValidator;
use crate::ws::protocol::ServerMsg;

/// Orchestrator for one crowd-voted match.
pub struct MatchService {
    weak: Weak<MatchService>,
    settings: MatchSettings,
    store: Arc<dyn GameStore>,
    verifier: Arc<dyn IdentityVerifier>,
    state: Mutex<MatchState>,
}

/// One connected, authenticated participant.
struct Session {
    identity: String,
    team: Team,
    has_voted: bool,
    skipped_rounds: u32,
    outbound: UnboundedSender<ServerMsg>,
}

/// The round in flight: move text → vote count, plus the identities that
/// already voted and the deadline racing the quorum trigger.
struct VotingRound {
    votes: HashMap<String, u32>,
    voters: HashSet<String>,
    deadline: ManagedTimer,
}

struct MatchState {
    sessions: HashMap<Uuid, Session>,
    populations: [u32; 2],
    wins: [u64; 2],
    status: GameStatus,
    waiting_reason: Option<WaitingReason>,
    team_one_color: TeamColor,
    /// Bumped whenever a game starts or closes; guards restart timers and
    /// late game-id adoption.
    game_epoch: u64,
    /// Bumped whenever a round opens or is invalidated; guards round
    /// deadline callbacks.
    round_generation: u64,
    game_id: Option<i64>,
    round_index: u32,
    round: Option<VotingRound>,
    restart: Option<ManagedTimer>,
    board: Box<dyn MoveValidator>,
}

/// Read-only view of the match, for stats surfaces and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOverview {
    pub status: GameStatus,
    pub reason: Option<WaitingReason>,
    pub populations: [u32; 2],
    pub wins: [u64; 2],
    pub round_index: u32,
    pub position_fen: String,
}

impl MatchService {
    pub fn new(
        settings: MatchSettings,
        store: Arc<dyn GameStore>,
        verifier: Arc<dyn IdentityVerifier>,
        board: Box<dyn MoveValidator>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            weak: weak.clone(),
            settings,
            store,
            verifier,
            state: Mutex::new(MatchState {
                sessions: HashMap::new(),
                populations: [0, 0],
                wins: [0, 0],
                status: GameStatus::Waiting,
                waiting_reason: Some(WaitingReason::NoPlayers),
                // Flipped on every game start, so team one opens white.
                team_one_color: TeamColor::Black,
                game_epoch: 0,
                round_generation: 0,
                game_id: None,
                round_index: 0,
                round: None,
                restart: None,
                board,
            }),
        })
    }

    /// Seed cumulative win counters from the store at startup.
    pub async fn load_win_stats(&self) {
        match self.store.win_stats().await {
            Ok(wins) => self.state.lock().wins = wins,
            Err(err) => tracing::warn!(error = %err, "could not load win stats"),
        }
    }

    pub fn overview(&self) -> MatchOverview {
        let state = self.state.lock();
        MatchOverview {
            status: state.status,
            reason: state.waiting_reason,
            populations: state.populations,
            wins: state.wins,
            round_index: state.round_index,
            position_fen: state.board.position_fen(),
        }
    }
}
