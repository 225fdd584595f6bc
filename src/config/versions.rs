use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};

/// Game patches with their release dates, oldest first.
const RELEASES: &[(&str, (i32, u32, u32))] = &[
    ("42848", (2020, 11, 17)),
    ("43210", (2020, 11, 24)),
    ("44725", (2021, 1, 25)),
    ("44834", (2021, 1, 28)),
    ("45185", (2021, 2, 11)),
    ("45340", (2021, 2, 12)),
    ("46295", (2021, 3, 24)),
    ("47820", (2021, 5, 3)),
    ("50292", (2021, 7, 6)),
    ("50700", (2021, 7, 12)),
    ("51737", (2021, 8, 10)),
    ("53347", (2021, 9, 8)),
    ("54480", (2021, 10, 5)),
    ("54684", (2021, 10, 7)),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub released: NaiveDate,
}

/// Maps a match date to the game version that was live on that date.
#[derive(Debug, Clone)]
pub struct VersionTable {
    releases: Vec<Release>,
}

impl Default for VersionTable {
    fn default() -> Self {
        let releases = RELEASES
            .iter()
            .filter_map(|(version, (y, m, d))| {
                NaiveDate::from_ymd_opt(*y, *m, *d).map(|released| Release {
                    version: version.to_string(),
                    released,
                })
            })
            .collect();
        Self::new(releases)
    }
}

impl VersionTable {
    pub fn new(mut releases: Vec<Release>) -> Self {
        releases.sort_by(|a, b| a.released.cmp(&b.released));
        Self { releases }
    }

    /// Loads `{ "<version>": "YYYY-MM-DD", ... }` from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read version table {}", path.display()))?;
        Self::from_json_str(&raw)
            .with_context(|| format!("Failed to parse version table {}", path.display()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let entries: BTreeMap<String, String> = serde_json::from_str(raw)?;
        let releases = entries
            .into_iter()
            .map(|(version, date)| {
                let released = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .with_context(|| format!("Invalid release date {date:?} for {version}"))?;
                Ok(Release { version, released })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(releases))
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    /// Latest release on or before `date`.
    pub fn version_for_date(&self, date: NaiveDate) -> Option<&str> {
        self.releases
            .iter()
            .take_while(|release| release.released <= date)
            .last()
            .map(|release| release.version.as_str())
    }

    pub fn version_for_timestamp(&self, started: i64) -> Option<&str> {
        let date = DateTime::from_timestamp(started, 0)?.date_naive();
        self.version_for_date(date)
    }
}
