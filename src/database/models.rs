use std::fmt;
use std::ops::AddAssign;

/// The two tables a match row can land in, chosen by the API's `ranked` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTable {
    Ranked,
    Unranked,
}

impl MatchTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Ranked => "ranked_matches",
            Self::Unranked => "unranked_matches",
        }
    }
}

impl fmt::Display for MatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Clone)]
pub struct StoredMatchRow {
    pub id: i64,
    pub match_id: String,
    pub rating_type: i64,
    pub version: Option<String>,
    pub started: i64,
    pub player_id: i64,
    pub civ_id: i64,
    pub won: bool,
    pub mirror: bool,
}

/// Outcome of one `insert_many` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    /// Rows actually written.
    pub rows: usize,
    /// Distinct match ids that gained at least one row.
    pub matches: usize,
}

impl AddAssign for InsertReport {
    fn add_assign(&mut self, other: Self) {
        self.rows += other.rows;
        self.matches += other.matches;
    }
}
