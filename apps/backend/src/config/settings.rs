//! Match configuration.
//!
//! Settings are read from the environment (the runtime supplies them via
//! its env file, same as the bind address in `main`). Anything missing or
//! unparseable falls back to a default with a warning, so a misconfigured
//! deployment still comes up in a sane state.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use super::allowlist::IdentityAllowlist;

#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Minimum players on each team before a game can start.
    pub required_players_per_team: u32,
    /// Fraction of the eligible team that must vote to force an early
    /// tally. Valid range (0, 1]; 1.0 means every player must vote.
    pub vote_threshold: f64,
    /// Length of one voting round.
    pub round_timeout: Duration,
    /// Delay between a game ending and the next one starting.
    pub intergame_delay: Duration,
    /// Consecutive skipped rounds before a session is pruned. 0 disables
    /// pruning.
    pub skip_prune_threshold: u32,
    /// Allow one identity to hold several concurrent sessions.
    pub allow_role_override: bool,
    /// Identities exempt from duplicate rejection and pruning.
    pub exempt_identities: IdentityAllowlist,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            required_players_per_team: 1,
            vote_threshold: 0.5,
            round_timeout: Duration::from_secs(20),
            intergame_delay: Duration::from_secs(15),
            skip_prune_threshold: 3,
            allow_role_override: false,
            exempt_identities: IdentityAllowlist::default(),
        }
    }
}

impl MatchSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let vote_threshold = clamp_threshold(env_or(
            "CROWDCHESS_VOTE_THRESHOLD",
            defaults.vote_threshold,
        ));
        Self {
            required_players_per_team: env_or(
                "CROWDCHESS_MIN_PLAYERS",
                defaults.required_players_per_team,
            ),
            vote_threshold,
            round_timeout: Duration::from_secs(env_or(
                "CROWDCHESS_ROUND_TIMEOUT_SECS",
                defaults.round_timeout.as_secs(),
            )),
            intergame_delay: Duration::from_secs(env_or(
                "CROWDCHESS_INTERGAME_DELAY_SECS",
                defaults.intergame_delay.as_secs(),
            )),
            skip_prune_threshold: env_or(
                "CROWDCHESS_SKIP_PRUNE_THRESHOLD",
                defaults.skip_prune_threshold,
            ),
            allow_role_override: env_or("CROWDCHESS_ALLOW_ROLE_OVERRIDE", false),
            exempt_identities: IdentityAllowlist::from_env("CROWDCHESS_EXEMPT_IDENTITIES"),
        }
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(var: &str, default: T) -> T {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(var, raw = %raw, %default, "unparseable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn clamp_threshold(value: f64) -> f64 {
    if value > 0.0 && value <= 1.0 {
        value
    } else {
        let default = MatchSettings::default().vote_threshold;
        warn!(value, default, "vote threshold outside (0, 1], using default");
        default
    }
}
