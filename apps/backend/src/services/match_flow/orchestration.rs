//! Game lifecycle transitions and outbound broadcasts.

use tracing::{debug, info, warn};

use super::{MatchService, MatchState};
use crate::domain::{color_of, team_of, GameStatus, Team, TeamColor, WaitingReason};
use crate::timer::ManagedTimer;
use crate::ws::protocol::ServerMsg;

impl MatchService {
    pub(super) fn teams_ready(&self, state: &MatchState) -> bool {
        let required = self.settings.required_players_per_team;
        state.populations.iter().all(|&p| p >= required)
    }

    /// Schedule the next game start after the intergame delay, replacing
    /// any pending restart.
    pub(super) fn schedule_restart_locked(&self, state: &mut MatchState) {
        if let Some(timer) = state.restart.take() {
            timer.cancel();
        }
        let epoch = state.game_epoch;
        let weak = self.weak.clone();
        let timer = ManagedTimer::schedule(self.settings.intergame_delay, move || {
            if let Some(service) = weak.upgrade() {
                service.on_restart_due(epoch);
            }
        });
        debug!(epoch, next_game_time = timer.deadline_unix_ms(), "restart scheduled");
        state.restart = Some(timer);
    }

    /// Restart callback. The captured epoch makes callbacks from canceled
    /// or superseded restarts no-ops.
    fn on_restart_due(&self, epoch: u64) {
        let mut state = self.state.lock();
        let state = &mut *state;
        if state.game_epoch != epoch || state.status == GameStatus::Playing {
            debug!(epoch, current = state.game_epoch, "stale restart ignored");
            return;
        }
        state.restart = None;
        if !self.teams_ready(state) {
            // Populations decayed while the delay ran.
            state.waiting_reason = Some(WaitingReason::NoPlayers);
            self.broadcast_game_info_locked(state);
            return;
        }
        self.start_game_locked(state);
    }

    /// Waiting → Playing: swap team colors, reset the board, open round 0.
    fn start_game_locked(&self, state: &mut MatchState) {
        state.game_epoch += 1;
        let epoch = state.game_epoch;
        state.status = GameStatus::Playing;
        state.waiting_reason = None;
        state.team_one_color = state.team_one_color.other();
        state.board.reset();
        state.round_index = 0;
        state.game_id = None;

        let white_team = team_of(TeamColor::White, state.team_one_color);
        info!(epoch, white_team = %white_team, "game starting");

        // The store issues the durable game id; adopt it when it arrives
        // instead of blocking the event sequence on the write.
        let store = self.store.clone();
        let weak = self.weak.clone();
        tokio::spawn(async move {
            match store.new_game(white_team).await {
                Ok(game_id) => {
                    if let Some(service) = weak.upgrade() {
                        service.adopt_game_id(epoch, game_id);
                    }
                }
                Err(err) => warn!(error = %err, "could not open stored game"),
            }
        });

        self.begin_round_locked(state);
        self.broadcast_game_info_locked(state);
    }

    fn adopt_game_id(&self, epoch: u64, game_id: i64) {
        let mut state = self.state.lock();
        if state.game_epoch == epoch && state.status == GameStatus::Playing {
            state.game_id = Some(game_id);
        } else {
            debug!(epoch, game_id, "stored game id arrived for a closed game");
        }
    }

    /// Record a winner, notify everyone, and close the stored game.
    pub(super) fn finish_locked(&self, state: &mut MatchState, winner: Team, timeout: bool) {
        info!(winner = %winner, timeout, "game finished");
        self.broadcast_locked(
            state,
            &ServerMsg::Winner {
                team: winner,
                timeout,
            },
        );
        state.wins[winner.index()] += 1;
        if let Some(game_id) = state.game_id.take() {
            let store = self.store.clone();
            tokio::spawn(async move {
                if let Err(err) = store.complete_game(game_id, winner, timeout).await {
                    warn!(error = %err, game_id, "could not record game result");
                }
            });
        }
        state.game_epoch += 1;
    }

    /// The population invariant broke mid-game: cancel every timer, record
    /// no result, and wait for players.
    pub(super) fn abandon_locked(&self, state: &mut MatchState) {
        info!(populations = ?state.populations, "abandoning game: team below minimum");
        if let Some(round) = state.round.take() {
            round.deadline.cancel();
        }
        if let Some(timer) = state.restart.take() {
            timer.cancel();
        }
        state.round_generation += 1;
        state.game_epoch += 1;
        state.status = GameStatus::Waiting;
        state.waiting_reason = Some(WaitingReason::NoPlayers);
        state.game_id = None;
        self.broadcast_game_info_locked(state);
    }

    pub(super) fn broadcast_locked(&self, state: &MatchState, msg: &ServerMsg) {
        for session in state.sessions.values() {
            let _ = session.outbound.send(msg.clone());
        }
    }

    pub(super) fn send_voting_update_locked(&self, state: &MatchState) {
        let Some(round) = state.round.as_ref() else {
            return;
        };
        let voting_team = team_of(state.board.side_to_move(), state.team_one_color);
        let msg = ServerMsg::VotingUpdate {
            votes_cast: round.votes.values().sum(),
            eligible: state.populations[voting_team.index()],
        };
        self.broadcast_locked(state, &msg);
    }

    /// Personalized snapshot to every session; sent on any status or
    /// team-count change.
    pub(super) fn broadcast_game_info_locked(&self, state: &MatchState) {
        let next_game_time = state.restart.as_ref().map(|t| t.deadline_unix_ms());
        for session in state.sessions.values() {
            let msg = ServerMsg::GameInfo {
                status: state.status,
                reason: state.waiting_reason,
                color: color_of(session.team, state.team_one_color),
                team: session.team,
                populations: state.populations,
                wins: state.wins,
                next_game_time,
            };
            let _ = session.outbound.send(msg);
        }
    }
}
