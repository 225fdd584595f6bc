use std::collections::HashSet;

use anyhow::{Context, Result};
use log::info;

use super::page::{PageProcessor, RejectionTally};
use crate::api::MatchSource;
use crate::config::VersionTable;
use crate::config::settings::BackfillSettings;
use crate::database::{InsertReport, MatchStore, MatchTable};
use crate::domain::{RatingTypePolicy, RatingTypeResolver, RecordBuilder, Validator};
use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone, Default)]
pub struct PlayerBackfill {
    pub profile_id: i64,
    pub pages: usize,
    pub received: usize,
    pub ranked: InsertReport,
    pub unranked: InsertReport,
    pub rejections: RejectionTally,
}

#[derive(Debug, Clone, Default)]
pub struct BackfillSummary {
    pub players: Vec<PlayerBackfill>,
}

impl BackfillSummary {
    pub fn pages(&self) -> usize {
        self.players.iter().map(|p| p.pages).sum()
    }

    pub fn ranked_rows(&self) -> usize {
        self.players.iter().map(|p| p.ranked.rows).sum()
    }

    pub fn unranked_rows(&self) -> usize {
        self.players.iter().map(|p| p.unranked.rows).sum()
    }
}

/// Re-fetches the full match history of a fixed set of players.
///
/// History pages carry unreliable win flags, so wins are not validated, and
/// missing rating types are always deduced.
pub struct BackfillService<'a, S: MatchSource> {
    source: S,
    store: MatchStore,
    processor: PageProcessor<'a>,
    settings: BackfillSettings,
    rate_limiter: RateLimiter,
}

impl<'a, S: MatchSource> BackfillService<'a, S> {
    pub fn new(source: S, store: MatchStore, versions: &'a VersionTable, settings: BackfillSettings) -> Self {
        let builder = RecordBuilder::new(
            Validator::without_wins(),
            RatingTypeResolver::with_policy(RatingTypePolicy::Deduced),
            versions,
        );
        Self {
            source,
            store,
            processor: PageProcessor::new(builder),
            rate_limiter: RateLimiter::new(settings.page_delay()),
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn run(&mut self, profile_ids: &[i64]) -> Result<BackfillSummary> {
        info!("=== Starting Player Backfill ===\n");

        let players = unique_in_order(profile_ids);
        let mut summary = BackfillSummary::default();

        for (idx, profile_id) in players.iter().enumerate() {
            info!("Player {}/{}: {}", idx + 1, players.len(), profile_id);
            let player = self.backfill_player(*profile_id).await?;
            info!(
                "  → {} pages, {} ranked / {} unranked rows inserted, dropped: {}",
                player.pages, player.ranked.rows, player.unranked.rows, player.rejections
            );
            summary.players.push(player);
        }

        info!("=== Backfill Complete ===");
        Ok(summary)
    }

    async fn backfill_player(&mut self, profile_id: i64) -> Result<PlayerBackfill> {
        let page_size = self.settings.page_size;
        let mut player = PlayerBackfill {
            profile_id,
            ..PlayerBackfill::default()
        };
        let mut offset = 0;

        loop {
            self.rate_limiter.wait().await;
            let page = self
                .source
                .fetch_player_history(profile_id, offset, page_size)
                .await
                .with_context(|| format!("Failed to fetch history of player {profile_id} at offset {offset}"))?;
            let exhausted = page.is_short(page_size);

            let batch = self.processor.process(page);
            player.ranked += self.store.insert_many(MatchTable::Ranked, &batch.ranked)?;
            player.unranked += self.store.insert_many(MatchTable::Unranked, &batch.unranked)?;
            player.pages += 1;
            player.received += batch.received;
            player.rejections.merge(&batch.rejections);

            if exhausted {
                break;
            }
            offset += page_size;
        }
        Ok(player)
    }
}

fn unique_in_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
