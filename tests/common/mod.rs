#![allow(dead_code)]

use anyhow::Result;
use serde_json::{Value, json};

use aoe2stats::api::MatchSource;
use aoe2stats::config::settings::IngestSettings;
use aoe2stats::domain::{MatchBlob, MatchPage, MatchRecord};

pub fn match_json(match_id: i64, started: i64, ranked: bool) -> Value {
    json!({
        "match_id": match_id.to_string(),
        "map_type": 9,
        "rating_type": if ranked { 2 } else { 4 },
        "game_type": 0,
        "num_players": 2,
        "started": started,
        "finished": started + 1500,
        "version": null,
        "ranked": ranked,
        "players": [
            { "profile_id": 1000 + match_id, "civ": 5, "rating": 1800, "team": 1, "won": true },
            { "profile_id": 2000 + match_id, "civ": 12, "rating": 1790, "team": 2, "won": false },
        ],
    })
}

pub fn blob(match_id: i64, started: i64) -> MatchBlob {
    serde_json::from_value(match_json(match_id, started, true)).unwrap()
}

pub fn stored_rows(match_id: i64, started: i64) -> Vec<MatchRecord> {
    [1000, 2000]
        .into_iter()
        .map(|base| MatchRecord {
            match_id: match_id.to_string(),
            map_type: 9,
            rating_type: 2,
            version: None,
            started,
            finished: None,
            team_size: 1,
            game_type: Some(0),
            player_id: base + match_id,
            civ_id: 5,
            rating: None,
            won: base == 1000,
            mirror: false,
        })
        .collect()
}

pub fn settings(page_size: usize) -> IngestSettings {
    IngestSettings {
        page_size,
        page_delay_ms: 0,
        ..IngestSettings::default()
    }
}

/// Hands out pre-built pages in order and records each `since`.
pub struct QueuedSource {
    pages: Vec<MatchPage>,
    pub requests: Vec<i64>,
}

impl QueuedSource {
    pub fn new(mut pages: Vec<MatchPage>) -> Self {
        pages.reverse();
        Self {
            pages,
            requests: Vec::new(),
        }
    }
}

impl MatchSource for QueuedSource {
    async fn fetch_page(&mut self, since: i64, _count: usize) -> Result<MatchPage> {
        self.requests.push(since);
        Ok(self.pages.pop().unwrap_or_default())
    }

    async fn fetch_player_history(&mut self, _: i64, _: usize, _: usize) -> Result<MatchPage> {
        Ok(MatchPage::default())
    }
}

/// Answers "since" queries from a fixed list of (match_id, started).
pub struct WorldSource {
    matches: Vec<(i64, i64)>,
    pub requests: Vec<i64>,
}

impl WorldSource {
    pub fn new(mut matches: Vec<(i64, i64)>) -> Self {
        matches.sort_by_key(|(_, started)| *started);
        Self {
            matches,
            requests: Vec::new(),
        }
    }
}

impl MatchSource for WorldSource {
    async fn fetch_page(&mut self, since: i64, count: usize) -> Result<MatchPage> {
        self.requests.push(since);
        let blobs = self
            .matches
            .iter()
            .filter(|(_, started)| *started >= since)
            .take(count)
            .map(|(id, started)| blob(*id, *started))
            .collect();
        Ok(MatchPage::from_blobs(blobs))
    }

    async fn fetch_player_history(&mut self, _: i64, _: usize, _: usize) -> Result<MatchPage> {
        Ok(MatchPage::default())
    }
}
