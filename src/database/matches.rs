use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::params;

use super::connection::DbConn;
use super::models::{InsertReport, MatchTable, StoredMatchRow};
use crate::domain::MatchRecord;

/// Inserts rows in transactions of `batch_size`, skipping rows whose
/// (match_id, player_id) is already stored.
pub fn insert_many(
    conn: &mut DbConn,
    table: MatchTable,
    rows: &[MatchRecord],
    batch_size: usize,
) -> Result<InsertReport> {
    let mut inserted = 0;
    let mut new_matches = HashSet::new();

    for (idx, batch) in rows.chunks(batch_size.max(1)).enumerate() {
        let written = insert_batch(conn, table, batch)
            .with_context(|| format!("Failed to insert batch {} into {table}", idx + 1))?;
        inserted += written.len();
        new_matches.extend(written);
    }

    Ok(InsertReport {
        rows: inserted,
        matches: new_matches.len(),
    })
}

/// Returns the match ids of rows that were actually written.
fn insert_batch<'r>(
    conn: &mut DbConn,
    table: MatchTable,
    batch: &'r [MatchRecord],
) -> Result<Vec<&'r str>> {
    let sql = format!(
        "INSERT INTO {} (match_id, map_type, rating_type, version, started, finished, team_size, game_type, player_id, civ_id, rating, won, mirror) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13) \
         ON CONFLICT (match_id, player_id) DO NOTHING",
        table.table_name()
    );

    let tx = conn.transaction()?;
    let mut written = Vec::new();
    {
        let mut stmt = tx.prepare_cached(&sql)?;
        for row in batch {
            let changed = stmt.execute(params![
                row.match_id,
                row.map_type,
                row.rating_type,
                row.version,
                row.started,
                row.finished,
                row.team_size,
                row.game_type,
                row.player_id,
                row.civ_id,
                row.rating,
                row.won,
                row.mirror,
            ])?;
            if changed > 0 {
                written.push(row.match_id.as_str());
            }
        }
    }
    tx.commit()?;
    Ok(written)
}

pub fn max_started(conn: &mut DbConn, table: MatchTable) -> Result<Option<i64>> {
    let sql = format!("SELECT MAX(started) FROM {}", table.table_name());
    conn.query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("Failed to read latest match time from {table}"))
}

pub fn count_rows(conn: &mut DbConn, table: MatchTable) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", table.table_name());
    conn.query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("Failed to count rows in {table}"))
}

pub fn list_by_match(conn: &mut DbConn, table: MatchTable, match_id: &str) -> Result<Vec<StoredMatchRow>> {
    let sql = format!(
        "SELECT id, match_id, rating_type, version, started, player_id, civ_id, won, mirror FROM {} WHERE match_id = ?1 ORDER BY player_id",
        table.table_name()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![match_id], parse_match_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(rows)
}

fn parse_match_row(row: &rusqlite::Row) -> rusqlite::Result<StoredMatchRow> {
    Ok(StoredMatchRow {
        id: row.get(0)?,
        match_id: row.get(1)?,
        rating_type: row.get(2)?,
        version: row.get(3)?,
        started: row.get(4)?,
        player_id: row.get(5)?,
        civ_id: row.get(6)?,
        won: row.get(7)?,
        mirror: row.get(8)?,
    })
}
