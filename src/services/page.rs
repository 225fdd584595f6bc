use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::domain::{MatchPage, MatchRecord, RecordBuilder, RejectReason};

/// Per-reason count of dropped matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionTally {
    counts: BTreeMap<&'static str, usize>,
}

impl RejectionTally {
    pub fn record(&mut self, reason: &RejectReason) {
        *self.counts.entry(reason.label()).or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        for (label, count) in &other.counts {
            *self.counts.entry(*label).or_insert(0) += count;
        }
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn count(&self, label: &str) -> usize {
        self.counts.get(label).copied().unwrap_or(0)
    }
}

impl fmt::Display for RejectionTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return write!(f, "none");
        }
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Rows from one page, already split by the API's `ranked` flag.
#[derive(Debug, Default)]
pub struct PageBatch {
    pub received: usize,
    pub ranked: Vec<MatchRecord>,
    pub unranked: Vec<MatchRecord>,
    /// Start time of every accepted match.
    pub started: Vec<i64>,
    pub rejections: RejectionTally,
}

impl PageBatch {
    pub fn accepted(&self) -> usize {
        self.started.len()
    }
}

pub struct PageProcessor<'a> {
    builder: RecordBuilder<'a>,
}

impl<'a> PageProcessor<'a> {
    pub fn new(builder: RecordBuilder<'a>) -> Self {
        Self { builder }
    }

    pub fn process(&self, page: MatchPage) -> PageBatch {
        let mut batch = PageBatch {
            received: page.received,
            ..PageBatch::default()
        };

        for blob in &page.blobs {
            match self.builder.build(blob) {
                Ok(rows) => {
                    let Some(first) = rows.first() else { continue };
                    batch.started.push(first.started);
                    if blob.is_ranked() {
                        batch.ranked.extend(rows);
                    } else {
                        batch.unranked.extend(rows);
                    }
                }
                Err(reason) => {
                    debug!("Dropping match {:?}: {reason}", blob.match_id);
                    batch.rejections.record(&reason);
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VersionTable;
    use crate::domain::{MatchBlob, RatingTypePolicy, RatingTypeResolver, Validator};
    use serde_json::{Value, json};

    fn blob(match_id: &str, started: i64, ranked: bool) -> Value {
        json!({
            "match_id": match_id,
            "map_type": 9,
            "rating_type": if ranked { 2 } else { 0 },
            "game_type": 0,
            "num_players": 2,
            "started": started,
            "ranked": ranked,
            "players": [
                { "profile_id": 1, "civ": 5, "team": 1, "won": true },
                { "profile_id": 2, "civ": 7, "team": 2, "won": false },
            ],
        })
    }

    fn page(values: Vec<Value>) -> MatchPage {
        let blobs: Vec<MatchBlob> = values
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect();
        MatchPage::from_blobs(blobs)
    }

    fn processor(versions: &VersionTable, policy: RatingTypePolicy) -> PageProcessor<'_> {
        PageProcessor::new(RecordBuilder::new(
            Validator::default(),
            RatingTypeResolver::with_policy(policy),
            versions,
        ))
    }

    #[test]
    fn test_buckets_follow_ranked_flag() {
        let versions = VersionTable::default();
        let batch = processor(&versions, RatingTypePolicy::Deduced).process(page(vec![
            blob("1", 100, true),
            blob("2", 200, false),
        ]));

        assert_eq!(batch.ranked.len(), 2);
        assert_eq!(batch.unranked.len(), 2);
        // Deduced from the game type even though the match is unranked.
        assert!(batch.unranked.iter().all(|row| row.rating_type == 2));
        assert_eq!(batch.started, vec![100, 200]);
    }

    #[test]
    fn test_rejections_are_tallied_and_skipped() {
        let versions = VersionTable::default();
        let mut no_map = blob("3", 300, true);
        no_map["map_type"] = Value::Null;
        let mut bad_count = blob("4", 400, true);
        bad_count["num_players"] = json!(4);

        let batch = processor(&versions, RatingTypePolicy::Declared).process(page(vec![
            blob("1", 100, true),
            blob("2", 200, false),
            no_map,
            bad_count,
        ]));

        assert_eq!(batch.received, 4);
        assert_eq!(batch.accepted(), 1);
        assert_eq!(batch.rejections.total(), 3);
        assert_eq!(batch.rejections.count("missing rating_type"), 1);
        assert_eq!(batch.rejections.count("missing map_type"), 1);
        assert_eq!(batch.rejections.count("invalid players"), 1);
    }

    #[test]
    fn test_tally_merge_and_display() {
        let mut total = RejectionTally::default();
        let mut page = RejectionTally::default();
        page.record(&RejectReason::MissingMapType);
        page.record(&RejectReason::MissingMapType);
        total.merge(&page);
        total.merge(&page);

        assert_eq!(total.count("missing map_type"), 4);
        assert_eq!(total.to_string(), "missing map_type: 4");
        assert_eq!(RejectionTally::default().to_string(), "none");
    }
}
