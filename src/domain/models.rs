use serde::{Deserialize, Deserializer, Serialize};

// --- API Response Structures ---

/// One match as returned by aoe2.net.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MatchBlob {
    #[serde(default, deserialize_with = "deserialize_match_id")]
    pub match_id: Option<String>,
    #[serde(default)]
    pub map_type: Option<i64>,
    #[serde(default)]
    pub rating_type: Option<i64>,
    #[serde(default)]
    pub game_type: Option<i64>,
    #[serde(default)]
    pub num_players: Option<i64>,
    #[serde(default)]
    pub started: Option<i64>,
    #[serde(default)]
    pub finished: Option<i64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub ranked: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub players: Vec<PlayerBlob>,
}

impl MatchBlob {
    pub fn is_ranked(&self) -> bool {
        self.ranked.unwrap_or(false)
    }

    pub fn declared_rating_type(&self) -> Option<i64> {
        self.rating_type.filter(|code| *code != 0)
    }

    pub fn declared_version(&self) -> Option<&str> {
        self.version.as_deref().filter(|v| !v.is_empty())
    }

    pub fn team_size(&self) -> i64 {
        self.num_players.unwrap_or(0) / 2
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlayerBlob {
    #[serde(default)]
    pub profile_id: Option<i64>,
    #[serde(default)]
    pub civ: Option<i64>,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub team: Option<i64>,
    #[serde(default)]
    pub won: Option<bool>,
}

/// A page of blobs plus how many items the API actually sent.
///
/// `received` drives exhaustion checks; elements that failed to decode are
/// counted there but missing from `blobs`.
#[derive(Debug, Clone, Default)]
pub struct MatchPage {
    pub received: usize,
    pub blobs: Vec<MatchBlob>,
}

impl MatchPage {
    pub fn from_blobs(blobs: Vec<MatchBlob>) -> Self {
        Self {
            received: blobs.len(),
            blobs,
        }
    }

    pub fn is_short(&self, page_size: usize) -> bool {
        self.received < page_size
    }
}

// --- Stored Rows ---

/// One (match, player) row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: String,
    pub map_type: i64,
    pub rating_type: i64,
    pub version: Option<String>,
    pub started: i64,
    pub finished: Option<i64>,
    pub team_size: i64,
    pub game_type: Option<i64>,
    pub player_id: i64,
    pub civ_id: i64,
    pub rating: Option<i64>,
    pub won: bool,
    pub mirror: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMatchId {
    Text(String),
    Number(i64),
}

fn deserialize_match_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawMatchId>::deserialize(deserializer)?;
    Ok(raw.map(|id| match id {
        RawMatchId::Text(text) => text,
        RawMatchId::Number(number) => number.to_string(),
    }))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
