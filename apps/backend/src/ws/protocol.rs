//! JSON websocket protocol.
//!
//! Text frames carry one tagged message each. Outbound messages are built
//! by the match flow; the session actor only serializes and forwards.

use serde::{Deserialize, Serialize};

use crate::domain::{GameStatus, RankedMove, Team, TeamColor, WaitingReason};
use crate::store::{LeaderboardEntry, PlayerVoteStats};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Authenticate and join a team. Must precede every other message.
    Auth { token: String },
    /// Propose a move for the current round.
    Vote { san: String },
    Leaderboard,
    PlayerStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    Error {
        message: String,
    },

    /// Board position and the current round's deadline.
    State {
        fen: String,
        next_vote_time: i64,
    },

    /// Vote progress for the round in flight.
    VotingUpdate {
        votes_cast: u32,
        eligible: u32,
    },

    /// Ranked result of a finished round; sent to the voting team only.
    RoundResult {
        ranked: Vec<RankedMove>,
    },

    /// Full per-session match snapshot.
    GameInfo {
        status: GameStatus,
        reason: Option<WaitingReason>,
        color: TeamColor,
        team: Team,
        populations: [u32; 2],
        wins: [u64; 2],
        /// Deadline of a pending restart, unix ms; absent when no start
        /// is scheduled or a game is already running.
        next_game_time: Option<i64>,
    },

    Winner {
        team: Team,
        timeout: bool,
    },

    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },

    PlayerStats {
        stats: PlayerVoteStats,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let msg: ClientMsg = serde_json::from_str(r#"{"type":"auth","token":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Auth { token } if token == "abc"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"vote","san":"e4"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Vote { san } if san == "e4"));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"leaderboard"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Leaderboard));

        assert!(serde_json::from_str::<ClientMsg>(r#"{"type":"resign"}"#).is_err());
    }

    #[test]
    fn winner_serializes_with_numeric_team() {
        let json = serde_json::to_string(&ServerMsg::Winner {
            team: Team::Two,
            timeout: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"winner","team":2,"timeout":true}"#);
    }

    #[test]
    fn game_info_round_trips() {
        let msg = ServerMsg::GameInfo {
            status: GameStatus::Waiting,
            reason: Some(WaitingReason::NoVotes),
            color: TeamColor::Black,
            team: Team::One,
            populations: [3, 2],
            wins: [1, 4],
            next_game_time: Some(1_700_000_000_000),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"game_info""#));
        assert!(json.contains(r#""reason":"no_votes""#));
        assert!(json.contains(r#""color":"b""#));
        let back: ServerMsg = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ServerMsg::GameInfo { team: Team::One, .. }));
    }
}
