use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::models::MatchBlob;

/// Ladder codes used by aoe2.net.
pub mod codes {
    pub const DEATHMATCH_1V1: i64 = 1;
    pub const RANDOM_MAP_1V1: i64 = 2;
    pub const DEATHMATCH_TEAM: i64 = 3;
    pub const RANDOM_MAP_TEAM: i64 = 4;
    pub const BATTLE_ROYALE: i64 = 9;
    pub const EMPIRE_WARS_1V1: i64 = 13;
    pub const EMPIRE_WARS_TEAM: i64 = 14;
}

/// Game type codes that have a ladder equivalent.
pub mod game_types {
    pub const RANDOM_MAP: i64 = 0;
    pub const DEATHMATCH: i64 = 2;
    pub const BATTLE_ROYALE: i64 = 12;
    pub const EMPIRE_WARS: i64 = 13;
    pub const CO_OP: i64 = 15;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamSizeClass {
    OneVsOne,
    Team,
}

impl TeamSizeClass {
    pub fn of(blob: &MatchBlob) -> Self {
        if blob.num_players == Some(2) {
            Self::OneVsOne
        } else {
            Self::Team
        }
    }
}

/// How a row's rating type is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingTypePolicy {
    /// Keep the API value; matches without one are dropped.
    Declared,
    /// Fall back to the game type table when the API value is missing.
    Deduced,
}

#[derive(Debug, Error)]
#[error("unknown rating type policy {0:?} (expected \"declared\" or \"deduced\")")]
pub struct UnknownPolicy(String);

impl FromStr for RatingTypePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "declared" => Ok(Self::Declared),
            "deduced" => Ok(Self::Deduced),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for RatingTypePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared => write!(f, "declared"),
            Self::Deduced => write!(f, "deduced"),
        }
    }
}

/// (team size class, game type) -> rating type.
#[derive(Debug, Clone)]
pub struct RatingTypeTable {
    entries: HashMap<(TeamSizeClass, i64), i64>,
}

impl Default for RatingTypeTable {
    fn default() -> Self {
        use TeamSizeClass::{OneVsOne, Team};

        let entries = [
            ((OneVsOne, game_types::RANDOM_MAP), codes::RANDOM_MAP_1V1),
            ((OneVsOne, game_types::DEATHMATCH), codes::DEATHMATCH_1V1),
            ((OneVsOne, game_types::BATTLE_ROYALE), codes::BATTLE_ROYALE),
            ((OneVsOne, game_types::EMPIRE_WARS), codes::EMPIRE_WARS_1V1),
            ((Team, game_types::RANDOM_MAP), codes::RANDOM_MAP_TEAM),
            ((Team, game_types::DEATHMATCH), codes::DEATHMATCH_TEAM),
            ((Team, game_types::BATTLE_ROYALE), codes::BATTLE_ROYALE),
            ((Team, game_types::EMPIRE_WARS), codes::EMPIRE_WARS_TEAM),
        ];
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl RatingTypeTable {
    pub fn lookup(&self, class: TeamSizeClass, game_type: i64) -> Option<i64> {
        self.entries.get(&(class, game_type)).copied()
    }
}

pub struct RatingTypeResolver {
    table: RatingTypeTable,
    policy: RatingTypePolicy,
}

impl RatingTypeResolver {
    pub fn new(table: RatingTypeTable, policy: RatingTypePolicy) -> Self {
        Self { table, policy }
    }

    pub fn with_policy(policy: RatingTypePolicy) -> Self {
        Self::new(RatingTypeTable::default(), policy)
    }

    pub fn policy(&self) -> RatingTypePolicy {
        self.policy
    }

    pub fn resolve(&self, blob: &MatchBlob) -> Option<i64> {
        if let Some(declared) = blob.declared_rating_type() {
            return Some(declared);
        }
        match self.policy {
            RatingTypePolicy::Declared => None,
            RatingTypePolicy::Deduced => self.deduce(blob),
        }
    }

    fn deduce(&self, blob: &MatchBlob) -> Option<i64> {
        let game_type = blob.game_type?;
        self.table.lookup(TeamSizeClass::of(blob), game_type)
    }
}
