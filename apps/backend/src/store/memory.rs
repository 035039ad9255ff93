//! In-memory [`GameStore`] implementation.
//!
//! The reference store for a single-process deployment and for tests.
//! Row layout mirrors what a relational gateway would keep: users keyed by
//! identity, games keyed by id, votes and applied moves as append-only
//! logs.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GameStore, LeaderboardEntry, PlayerVoteStats, StoreError};
use crate::domain::Team;

#[derive(Debug, Clone)]
struct UserRow {
    name: String,
    team: Team,
}

#[derive(Debug, Clone)]
struct GameRow {
    white_team: Team,
    winner: Option<Team>,
    timeout: bool,
}

#[derive(Debug, Clone)]
struct VoteRow {
    game_id: i64,
    round: u32,
    identity: String,
    san: String,
    accepted: bool,
}

/// A snapshot of one stored game, for inspection by tooling and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGame {
    pub id: i64,
    pub white_team: Team,
    pub winner: Option<Team>,
    pub timeout: bool,
}

/// One applied round result, for inspection by tooling and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub round: u32,
    pub san: String,
    pub votes_for: u32,
    pub total_votes: u32,
}

#[derive(Debug, Clone)]
struct MoveRow {
    game_id: i64,
    applied: AppliedMove,
}

#[derive(Default)]
struct Tables {
    next_game_id: i64,
    users: HashMap<String, UserRow>,
    games: BTreeMap<i64, GameRow>,
    votes: Vec<VoteRow>,
    moves: Vec<MoveRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored game, in creation order.
    pub fn games(&self) -> Vec<StoredGame> {
        let tables = self.tables.lock();
        tables
            .games
            .iter()
            .map(|(id, row)| StoredGame {
                id: *id,
                white_team: row.white_team,
                winner: row.winner,
                timeout: row.timeout,
            })
            .collect()
    }

    /// The applied-move history of one game, in round order.
    pub fn applied_moves(&self, game_id: i64) -> Vec<AppliedMove> {
        let tables = self.tables.lock();
        tables
            .moves
            .iter()
            .filter(|m| m.game_id == game_id)
            .map(|m| m.applied.clone())
            .collect()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn register_player(
        &self,
        identity: &str,
        name: &str,
        team: Team,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables
            .users
            .entry(identity.to_string())
            .or_insert_with(|| UserRow {
                name: name.to_string(),
                team,
            });
        Ok(())
    }

    async fn team_for(&self, identity: &str) -> Result<Option<Team>, StoreError> {
        Ok(self.tables.lock().users.get(identity).map(|u| u.team))
    }

    async fn new_game(&self, white_team: Team) -> Result<i64, StoreError> {
        let mut tables = self.tables.lock();
        tables.next_game_id += 1;
        let id = tables.next_game_id;
        tables.games.insert(
            id,
            GameRow {
                white_team,
                winner: None,
                timeout: false,
            },
        );
        Ok(id)
    }

    async fn complete_game(
        &self,
        game_id: i64,
        winner: Team,
        timeout: bool,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if let Some(game) = tables.games.get_mut(&game_id) {
            game.winner = Some(winner);
            game.timeout = timeout;
        }
        Ok(())
    }

    async fn register_vote(
        &self,
        game_id: i64,
        round: u32,
        identity: &str,
        san: &str,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock();
        let duplicate = tables
            .votes
            .iter()
            .any(|v| v.game_id == game_id && v.round == round && v.identity == identity);
        if duplicate {
            return Ok(false);
        }
        tables.votes.push(VoteRow {
            game_id,
            round,
            identity: identity.to_string(),
            san: san.to_string(),
            accepted: false,
        });
        Ok(true)
    }

    async fn register_voting_results(
        &self,
        game_id: i64,
        round: u32,
        san: &str,
        votes_for: u32,
        total_votes: u32,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        tables.moves.push(MoveRow {
            game_id,
            applied: AppliedMove {
                round,
                san: san.to_string(),
                votes_for,
                total_votes,
            },
        });
        for vote in tables
            .votes
            .iter_mut()
            .filter(|v| v.game_id == game_id && v.round == round && v.san == san)
        {
            vote.accepted = true;
        }
        Ok(())
    }

    async fn win_stats(&self) -> Result<[u64; 2], StoreError> {
        let tables = self.tables.lock();
        let mut wins = [0u64; 2];
        for game in tables.games.values() {
            if let Some(winner) = game.winner {
                wins[winner.index()] += 1;
            }
        }
        Ok(wins)
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let tables = self.tables.lock();
        let mut totals: HashMap<&str, u64> = HashMap::new();
        for vote in tables.votes.iter().filter(|v| v.accepted) {
            let Some(user) = tables.users.get(&vote.identity) else {
                continue;
            };
            let won = tables
                .games
                .get(&vote.game_id)
                .is_some_and(|g| g.winner == Some(user.team));
            if won {
                *totals.entry(vote.identity.as_str()).or_default() += 1;
            }
        }
        let mut entries: Vec<LeaderboardEntry> = totals
            .into_iter()
            .filter_map(|(identity, winning_votes)| {
                tables.users.get(identity).map(|u| LeaderboardEntry {
                    name: u.name.clone(),
                    winning_votes,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.winning_votes
                .cmp(&a.winning_votes)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    async fn player_stats(
        &self,
        identity: &str,
        team: Team,
    ) -> Result<PlayerVoteStats, StoreError> {
        let tables = self.tables.lock();
        let mut stats = PlayerVoteStats {
            votes: 0,
            accepted: 0,
            winning: 0,
        };
        for vote in tables.votes.iter().filter(|v| v.identity == identity) {
            stats.votes += 1;
            if vote.accepted {
                stats.accepted += 1;
                let won = tables
                    .games
                    .get(&vote.game_id)
                    .is_some_and(|g| g.winner == Some(team));
                if won {
                    stats.winning += 1;
                }
            }
        }
        Ok(stats)
    }
}
