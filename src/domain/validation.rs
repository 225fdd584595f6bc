use std::collections::HashMap;
use std::hash::Hash;

use thiserror::Error;

use super::models::MatchBlob;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("num_players ({declared:?}) does not match number of players ({actual})")]
    PlayerCountMismatch { declared: Option<i64>, actual: usize },
    #[error("odd number of players: {0}")]
    OddPlayerCount(usize),
    #[error("player at position {0} is missing civ")]
    MissingCiv(usize),
    #[error("player at position {0} is missing profile_id")]
    MissingProfileId(usize),
    #[error("unusual number of teams: {0}")]
    UnusualTeamCount(usize),
    #[error("teams not evenly divided")]
    UnevenTeams,
    #[error("unreasonable number of win conditions: {0}")]
    UnusualWinConditions(usize),
    #[error("wins not evenly divided")]
    UnevenWins,
}

/// Structural checks a match has to pass before it is turned into rows.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    validate_wins: bool,
}

impl Validator {
    pub fn new(validate_wins: bool) -> Self {
        Self { validate_wins }
    }

    /// Validator for per-player history pages, whose win flags are unreliable.
    pub fn without_wins() -> Self {
        Self::new(false)
    }

    pub fn validate(&self, blob: &MatchBlob) -> Result<(), ValidationError> {
        let players = &blob.players;
        if blob.num_players != Some(players.len() as i64) {
            return Err(ValidationError::PlayerCountMismatch {
                declared: blob.num_players,
                actual: players.len(),
            });
        }
        if players.len() % 2 != 0 {
            return Err(ValidationError::OddPlayerCount(players.len()));
        }

        let mut teams = HashMap::new();
        let mut wins = HashMap::new();
        for (position, player) in players.iter().enumerate() {
            if player.civ.is_none() {
                return Err(ValidationError::MissingCiv(position));
            }
            if player.profile_id.is_none() {
                return Err(ValidationError::MissingProfileId(position));
            }
            *teams.entry(player.team).or_insert(0usize) += 1;
            *wins.entry(player.won).or_insert(0usize) += 1;
        }

        if teams.len() != 2 {
            return Err(ValidationError::UnusualTeamCount(teams.len()));
        }
        if !all_equal(&teams) {
            return Err(ValidationError::UnevenTeams);
        }
        if self.validate_wins {
            if wins.len() != 2 {
                return Err(ValidationError::UnusualWinConditions(wins.len()));
            }
            if !all_equal(&wins) {
                return Err(ValidationError::UnevenWins);
            }
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(true)
    }
}

fn all_equal<K: Eq + Hash>(counts: &HashMap<K, usize>) -> bool {
    let mut values = counts.values();
    match values.next() {
        Some(first) => values.all(|count| count == first),
        None => true,
    }
}
