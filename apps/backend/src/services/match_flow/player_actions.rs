//! Inbound client actions: join, vote, disconnect, stats queries.

use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{MatchService, Session};
use crate::domain::{team_of, GameStatus, Team};
use crate::errors::GameError;
use crate::store::{LeaderboardEntry, PlayerVoteStats};
use crate::ws::protocol::ServerMsg;

impl MatchService {
    /// Verify the caller's identity and register a session.
    ///
    /// On success the caller is on a team, counted in its population, and
    /// already holds a game-info snapshot (plus board state if a round is
    /// running). Everyone else sees refreshed team counts.
    pub async fn join(
        &self,
        conn_id: Uuid,
        token: &str,
        outbound: UnboundedSender<ServerMsg>,
    ) -> Result<(), GameError> {
        let identity = self.verifier.verify(token).map_err(|err| {
            info!(error = %err, "join rejected: identity verification failed");
            GameError::Unauthenticated
        })?;

        // Team preference is a store read; resolve it before the lock.
        let preferred = match self.store.team_for(&identity.id).await {
            Ok(team) => team,
            Err(err) => {
                warn!(error = %err, "team preference lookup failed");
                None
            }
        };

        let mut state = self.state.lock();
        let state = &mut *state;

        let exempt = self.settings.exempt_identities.contains(&identity.id);
        if !self.settings.allow_role_override
            && !exempt
            && state.sessions.values().any(|s| s.identity == identity.id)
        {
            return Err(GameError::AlreadyJoined);
        }

        let team = preferred.unwrap_or_else(|| {
            if rand::rng().random_bool(0.5) {
                Team::Two
            } else {
                Team::One
            }
        });

        let was_ready = self.teams_ready(state);
        state.sessions.insert(
            conn_id,
            Session {
                identity: identity.id.clone(),
                team,
                has_voted: false,
                skipped_rounds: 0,
                outbound,
            },
        );
        state.populations[team.index()] += 1;
        info!(
            identity = %identity.id,
            team = %team,
            populations = ?state.populations,
            "session joined"
        );

        let store = self.store.clone();
        let id = identity.id.clone();
        let name = identity.name.clone();
        tokio::spawn(async move {
            if let Err(err) = store.register_player(&id, &name, team).await {
                warn!(error = %err, "player registration failed");
            }
        });

        match state.status {
            GameStatus::Waiting => {
                // A join that freshly satisfies the population requirement
                // supersedes any pending restart.
                if !was_ready && self.teams_ready(state) {
                    if let Some(timer) = state.restart.take() {
                        timer.cancel();
                    }
                    self.schedule_restart_locked(state);
                }
            }
            GameStatus::Playing => self.evaluate_tally_locked(state),
        }

        // The tally trigger may just have ended the round; send board
        // state only if one is still running.
        if state.status == GameStatus::Playing {
            if let (Some(round), Some(session)) = (&state.round, state.sessions.get(&conn_id)) {
                let _ = session.outbound.send(ServerMsg::State {
                    fen: state.board.position_fen(),
                    next_vote_time: round.deadline.deadline_unix_ms(),
                });
            }
        }
        self.broadcast_game_info_locked(state);
        Ok(())
    }

    /// Cast a vote for the current round.
    ///
    /// The move is validated against the current position and immediately
    /// undone; it is only ever applied by the tally.
    pub fn vote(&self, conn_id: Uuid, san: &str) -> Result<(), GameError> {
        let mut state = self.state.lock();
        let state = &mut *state;

        if state.status != GameStatus::Playing || state.round.is_none() {
            return Err(GameError::GameNotInPlay);
        }
        let Some(session) = state.sessions.get(&conn_id) else {
            return Err(GameError::Unauthenticated);
        };
        let identity = session.identity.clone();
        let has_voted = session.has_voted;

        let voting_team = team_of(state.board.side_to_move(), state.team_one_color);
        if session.team != voting_team {
            return Err(GameError::WrongTurn);
        }
        {
            let Some(round) = state.round.as_ref() else {
                return Err(GameError::GameNotInPlay);
            };
            if has_voted || round.voters.contains(&identity) {
                return Err(GameError::AlreadyVoted);
            }
        }

        let Some(applied) = state.board.try_move(san) else {
            return Err(GameError::IllegalMove);
        };
        state.board.undo_last();

        let Some(round) = state.round.as_mut() else {
            return Err(GameError::GameNotInPlay);
        };
        *round.votes.entry(applied.clone()).or_insert(0) += 1;
        round.voters.insert(identity.clone());
        if let Some(session) = state.sessions.get_mut(&conn_id) {
            session.has_voted = true;
        }
        debug!(identity = %identity, san = %applied, round = state.round_index, "vote cast");

        if let Some(game_id) = state.game_id {
            let round_index = state.round_index;
            let store = self.store.clone();
            tokio::spawn(async move {
                match store
                    .register_vote(game_id, round_index, &identity, &applied)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!(game_id, round = round_index, "store rejected duplicate vote")
                    }
                    Err(err) => warn!(error = %err, "vote registration failed"),
                }
            });
        }

        self.evaluate_tally_locked(state);
        Ok(())
    }

    /// Tear down a session. Safe to call for connections that never
    /// authenticated.
    pub fn disconnect(&self, conn_id: Uuid) {
        let mut state = self.state.lock();
        let state = &mut *state;
        let Some(session) = state.sessions.remove(&conn_id) else {
            return;
        };
        let team = session.team;
        state.populations[team.index()] = state.populations[team.index()].saturating_sub(1);
        info!(
            identity = %session.identity,
            team = %team,
            populations = ?state.populations,
            "session left"
        );

        match state.status {
            GameStatus::Playing => {
                if !self.teams_ready(state) {
                    self.abandon_locked(state);
                } else {
                    // A leaver on the voting team can push the quorum
                    // ratio over the threshold.
                    self.evaluate_tally_locked(state);
                }
            }
            GameStatus::Waiting => {
                if state.restart.is_some() && !self.teams_ready(state) {
                    if let Some(timer) = state.restart.take() {
                        timer.cancel();
                    }
                    state.game_epoch += 1;
                    state.waiting_reason = Some(crate::domain::WaitingReason::NoPlayers);
                }
            }
        }
        self.broadcast_game_info_locked(state);
    }

    /// Ranked contributors, for an authenticated caller.
    pub async fn leaderboard(&self, conn_id: Uuid) -> Result<Vec<LeaderboardEntry>, GameError> {
        if !self.state.lock().sessions.contains_key(&conn_id) {
            return Err(GameError::Unauthenticated);
        }
        match self.store.leaderboard().await {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(error = %err, "leaderboard query failed");
                Ok(Vec::new())
            }
        }
    }

    /// Voting totals for the calling session's identity.
    pub async fn player_stats(&self, conn_id: Uuid) -> Result<PlayerVoteStats, GameError> {
        let (identity, team) = {
            let state = self.state.lock();
            let Some(session) = state.sessions.get(&conn_id) else {
                return Err(GameError::Unauthenticated);
            };
            (session.identity.clone(), session.team)
        };
        match self.store.player_stats(&identity, team).await {
            Ok(stats) => Ok(stats),
            Err(err) => {
                warn!(error = %err, "player stats query failed");
                Ok(PlayerVoteStats {
                    votes: 0,
                    accepted: 0,
                    winning: 0,
                })
            }
        }
    }
}
