use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};

use super::cursor::{Advance, CursorSettings, IngestionCursor, PageObservation, ScanMode};
use super::page::{PageBatch, PageProcessor, RejectionTally};
use super::progress::ScanProgress;
use crate::api::MatchSource;
use crate::config::VersionTable;
use crate::config::settings::IngestSettings;
use crate::database::{InsertReport, MatchStore, MatchTable};
use crate::domain::clock::format_ts;
use crate::domain::{RatingTypeResolver, RecordBuilder, Validator};
use crate::rate_limiter::RateLimiter;

/// Time range for one update run.
#[derive(Debug, Clone, Copy)]
pub struct IngestWindow {
    pub start: i64,
    pub end: Option<i64>,
    /// Wall-clock time the run is planned against.
    pub now: i64,
}

#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    pub pages: usize,
    pub received: usize,
    pub accepted: usize,
    pub ranked: InsertReport,
    pub unranked: InsertReport,
    pub gaps: usize,
    pub forced: usize,
    pub rejections: RejectionTally,
    pub last_start: i64,
}

impl IngestSummary {
    fn record_page(&mut self, batch: &PageBatch, ranked: InsertReport, unranked: InsertReport, advance: &Advance) {
        self.pages += 1;
        self.received += batch.received;
        self.accepted += batch.accepted();
        self.ranked += ranked;
        self.unranked += unranked;
        self.gaps += usize::from(advance.gap.is_some());
        self.forced += usize::from(advance.forced);
        self.rejections.merge(&batch.rejections);
        self.last_start = advance.next_start;
    }
}

/// Incremental "matches since T" ingestion.
pub struct IngestionService<'a, S: MatchSource> {
    source: S,
    store: MatchStore,
    processor: PageProcessor<'a>,
    settings: IngestSettings,
    rate_limiter: RateLimiter,
}

impl<'a, S: MatchSource> IngestionService<'a, S> {
    pub fn new(source: S, store: MatchStore, versions: &'a VersionTable, settings: IngestSettings) -> Self {
        let builder = RecordBuilder::new(
            Validator::default(),
            RatingTypeResolver::with_policy(settings.rating_type_policy),
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

    pub async fn run(&mut self, window: IngestWindow) -> Result<IngestSummary> {
        info!("=== Starting Match Update ===\n");

        let mut cursor = IngestionCursor::for_window(
            window.start,
            window.end,
            window.now,
            CursorSettings::from(&self.settings),
        );
        self.log_plan(&cursor);

        let mut progress = ScanProgress::new(window.now);
        let mut summary = IngestSummary::default();

        loop {
            let (batch, ranked, unranked) = self.ingest_page(cursor.fetch_start()).await?;
            let advance = cursor.advance(PageObservation {
                received: batch.received,
                started: &batch.started,
                new_matches: ranked.matches + unranked.matches,
            });

            self.log_page(&batch, ranked, unranked, &advance);
            summary.record_page(&batch, ranked, unranked, &advance);

            if advance.resumed_forward_at.is_some() {
                progress.restart(Utc::now().timestamp());
            }
            if let Some(reason) = advance.stop {
                info!("  → Stopping: {reason}");
                break;
            }
            if let Some(origin) = cursor.forward_origin() {
                progress.log(Utc::now().timestamp(), origin, cursor.fetch_start(), cursor.end());
            }
        }

        info!(
            "  → {} pages, {} new ranked rows, {} new unranked rows, dropped: {}",
            summary.pages, summary.ranked.rows, summary.unranked.rows, summary.rejections
        );
        info!("=== Match Update Complete ===");
        Ok(summary)
    }

    async fn ingest_page(&mut self, fetch_start: i64) -> Result<(PageBatch, InsertReport, InsertReport)> {
        self.rate_limiter.wait().await;
        info!("Fetching matches since {} ({fetch_start})", format_ts(fetch_start));

        let page = self
            .source
            .fetch_page(fetch_start, self.settings.page_size)
            .await
            .with_context(|| format!("Failed to fetch matches since {fetch_start}"))?;
        let batch = self.processor.process(page);

        let ranked = self.store.insert_many(MatchTable::Ranked, &batch.ranked)?;
        let unranked = self.store.insert_many(MatchTable::Unranked, &batch.unranked)?;
        Ok((batch, ranked, unranked))
    }

    // --- Helper Methods ---

    fn log_plan(&self, cursor: &IngestionCursor) {
        let end = cursor
            .end()
            .map(format_ts)
            .unwrap_or_else(|| "live".to_string());
        info!(
            "Scanning from {} to {} ({} mode, {} per page)",
            format_ts(cursor.fetch_start()),
            end,
            cursor.mode(),
            cursor.page_size()
        );
        if let ScanMode::Backward { .. } = cursor.mode() {
            info!("Store is behind, walking back until pages stop adding matches");
        }
    }

    fn log_page(&self, batch: &PageBatch, ranked: InsertReport, unranked: InsertReport, advance: &Advance) {
        info!(
            "  → {} received, {} accepted, {} ranked / {} unranked rows inserted ({} new matches)",
            batch.received,
            batch.accepted(),
            ranked.rows,
            unranked.rows,
            ranked.matches + unranked.matches
        );
        if let Some(gap) = advance.gap {
            warn!(
                "  → Gap of {}s after {}, continuing from {}",
                gap.seconds(),
                format_ts(gap.before),
                format_ts(advance.next_start)
            );
        }
        if advance.forced {
            info!(
                "  → No progress past {}, stepping to {}",
                format_ts(advance.previous_start),
                format_ts(advance.next_start)
            );
        }
        if let Some(resume) = advance.resumed_forward_at {
            info!("  → Reached covered history, scanning forward from {}", format_ts(resume));
        }
    }
}
