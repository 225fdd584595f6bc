use anyhow::Result;

use super::connection::{DbPool, create_memory_pool, create_pool, get_connection};
use super::matches;
use super::models::{InsertReport, MatchTable};
use super::setup::ensure_schema;
use crate::config::settings::DatabaseSettings;
use crate::domain::MatchRecord;

/// Pool-backed handle the services write through.
#[derive(Clone)]
pub struct MatchStore {
    pool: DbPool,
    batch_size: usize,
}

impl MatchStore {
    pub fn open(settings: &DatabaseSettings) -> Result<Self> {
        let pool = create_pool(&settings.path)?;
        Self::with_pool(pool, settings.batch_size)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_pool(create_memory_pool()?, DatabaseSettings::default().batch_size)
    }

    fn with_pool(pool: DbPool, batch_size: usize) -> Result<Self> {
        let mut conn = get_connection(&pool)?;
        ensure_schema(&mut conn)?;
        Ok(Self { pool, batch_size })
    }

    pub fn insert_many(&self, table: MatchTable, rows: &[MatchRecord]) -> Result<InsertReport> {
        if rows.is_empty() {
            return Ok(InsertReport::default());
        }
        let mut conn = get_connection(&self.pool)?;
        matches::insert_many(&mut conn, table, rows, self.batch_size)
    }

    pub fn max_started(&self, table: MatchTable) -> Result<Option<i64>> {
        let mut conn = get_connection(&self.pool)?;
        matches::max_started(&mut conn, table)
    }

    pub fn count_rows(&self, table: MatchTable) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        matches::count_rows(&mut conn, table)
    }
}
