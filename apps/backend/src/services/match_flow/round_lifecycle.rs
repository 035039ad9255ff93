//! Voting rounds: opening, the quorum/deadline race, tally, pruning.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, info, warn};

use super::{MatchService, MatchState, VotingRound};
use crate::domain::{rank_votes, team_of, GameStatus, Team, WaitingReason, RESULT_BROADCAST_LIMIT};
use crate::timer::ManagedTimer;
use crate::ws::protocol::ServerMsg;

impl MatchService {
    /// Open the next voting round: fresh vote map, new generation, and a
    /// deadline timer racing the quorum trigger.
    pub(super) fn begin_round_locked(&self, state: &mut MatchState) {
        state.round_generation += 1;
        let generation = state.round_generation;
        for session in state.sessions.values_mut() {
            session.has_voted = false;
        }

        let weak = self.weak.clone();
        let deadline = ManagedTimer::schedule(self.settings.round_timeout, move || {
            if let Some(service) = weak.upgrade() {
                service.on_round_deadline(generation);
            }
        });
        let next_vote_time = deadline.deadline_unix_ms();
        state.round = Some(VotingRound {
            votes: HashMap::new(),
            voters: HashSet::new(),
            deadline,
        });
        debug!(round = state.round_index, generation, "voting round opened");

        let fen = state.board.position_fen();
        self.broadcast_locked(state, &ServerMsg::State {
            fen,
            next_vote_time,
        });
        self.send_voting_update_locked(state);
    }

    /// Deadline callback. The captured generation makes late callbacks
    /// no-ops once the round was tallied early or otherwise superseded.
    fn on_round_deadline(&self, generation: u64) {
        let mut state = self.state.lock();
        let state = &mut *state;
        if state.round_generation != generation || state.round.is_none() {
            debug!(
                generation,
                current = state.round_generation,
                "stale round deadline ignored"
            );
            return;
        }
        info!(round = state.round_index, "round deadline reached");
        self.tally_locked(state);
    }

    /// Quorum trigger, re-evaluated after every vote and every population
    /// change. Whichever of this and the deadline happens first runs the
    /// tally; the other is canceled or invalidated by generation.
    pub(super) fn evaluate_tally_locked(&self, state: &mut MatchState) {
        if state.status != GameStatus::Playing {
            return;
        }
        let Some(round) = state.round.as_ref() else {
            return;
        };
        let voting_team = team_of(state.board.side_to_move(), state.team_one_color);
        let eligible = state.populations[voting_team.index()];
        let cast: u32 = round.votes.values().sum();
        if eligible == 0 || f64::from(cast) / f64::from(eligible) >= self.settings.vote_threshold {
            self.tally_locked(state);
        } else {
            self.send_voting_update_locked(state);
        }
    }

    /// Close the round: prune silent sessions, rank the votes, apply the
    /// winner (or forfeit), then either finish the game or open the next
    /// round for the other side.
    pub(super) fn tally_locked(&self, state: &mut MatchState) {
        let Some(round) = state.round.take() else {
            return;
        };
        round.deadline.cancel();
        if let Some(timer) = state.restart.take() {
            timer.cancel();
        }
        // Invalidate the trigger that lost the race.
        state.round_generation += 1;

        let voting_team = team_of(state.board.side_to_move(), state.team_one_color);
        let pruned_any = self.prune_locked(state, voting_team);

        let mut ranked = rank_votes(&round.votes);
        info!(
            round = state.round_index,
            distinct_moves = ranked.len(),
            team = %voting_team,
            "tallying round"
        );

        if ranked.is_empty() {
            // Forfeit: the side to move never voted.
            state.status = GameStatus::Waiting;
            state.waiting_reason = Some(WaitingReason::NoVotes);
            self.finish_locked(state, voting_team.other(), true);
            if state.populations.iter().all(|&p| p >= 1) {
                self.schedule_restart_locked(state);
            }
            self.broadcast_game_info_locked(state);
            return;
        }

        let top = ranked[0].clone();
        if state.board.try_move(&top.san).is_none() {
            // Every vote was validated against this exact position, so the
            // winner must still be legal. Reopen the round rather than
            // guess at a move.
            error!(san = %top.san, "tallied move rejected by the validator; reopening round");
            self.begin_round_locked(state);
            return;
        }

        let total_votes: u32 = ranked.iter().map(|r| r.votes).sum();
        if let Some(game_id) = state.game_id {
            let round_index = state.round_index;
            let store = self.store.clone();
            let san = top.san.clone();
            let votes_for = top.votes;
            tokio::spawn(async move {
                if let Err(err) = store
                    .register_voting_results(game_id, round_index, &san, votes_for, total_votes)
                    .await
                {
                    warn!(error = %err, game_id, "could not record round result");
                }
            });
        }

        ranked.truncate(RESULT_BROADCAST_LIMIT);
        let result = ServerMsg::RoundResult { ranked };
        for session in state.sessions.values().filter(|s| s.team == voting_team) {
            let _ = session.outbound.send(result.clone());
        }

        state.round_index += 1;

        if state.board.is_checkmate() {
            state.status = GameStatus::Waiting;
            state.waiting_reason = Some(WaitingReason::GameCompleted);
            self.finish_locked(state, voting_team, false);
            self.schedule_restart_locked(state);
            self.broadcast_game_info_locked(state);
        } else if state.board.is_draw() {
            // Drawn games restart without recording a winner.
            info!("game drawn");
            state.status = GameStatus::Waiting;
            state.waiting_reason = Some(WaitingReason::GameCompleted);
            state.game_id = None;
            state.game_epoch += 1;
            self.schedule_restart_locked(state);
            self.broadcast_game_info_locked(state);
        } else if !self.teams_ready(state) {
            // Pruning emptied a team below the minimum.
            self.abandon_locked(state);
        } else {
            if pruned_any {
                // Team counts changed; refresh everyone's snapshot.
                self.broadcast_game_info_locked(state);
            }
            self.begin_round_locked(state);
        }
    }

    /// Track per-session skip streaks and disconnect chronic non-voters,
    /// then recompute populations from the survivors. Returns whether any
    /// session was removed.
    fn prune_locked(&self, state: &mut MatchState, voting_team: Team) -> bool {
        let threshold = self.settings.skip_prune_threshold;
        let mut pruned = Vec::new();
        for (conn_id, session) in state.sessions.iter_mut() {
            if session.team == voting_team {
                if session.has_voted {
                    session.skipped_rounds = 0;
                } else {
                    session.skipped_rounds += 1;
                }
                if threshold > 0
                    && session.skipped_rounds >= threshold
                    && !self.settings.exempt_identities.contains(&session.identity)
                {
                    pruned.push(*conn_id);
                }
            }
            session.has_voted = false;
        }

        let pruned_any = !pruned.is_empty();
        for conn_id in pruned {
            if let Some(session) = state.sessions.remove(&conn_id) {
                warn!(
                    identity = %session.identity,
                    skipped = session.skipped_rounds,
                    "pruning chronically silent session"
                );
                let _ = session.outbound.send(ServerMsg::Error {
                    message: "You have been disconnected for not voting".to_string(),
                });
                // Dropping the sender ends the outbound stream and closes
                // the socket.
            }
        }

        let mut populations = [0u32; 2];
        for session in state.sessions.values() {
            populations[session.team.index()] += 1;
        }
        state.populations = populations;
        pruned_any
    }
}
