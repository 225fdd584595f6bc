use std::collections::HashSet;

use thiserror::Error;

use super::models::{MatchBlob, MatchRecord};
use super::rating_type::{RatingTypePolicy, RatingTypeResolver};
use super::validation::{ValidationError, Validator};
use crate::config::VersionTable;

/// Why a blob did not produce any rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing map_type")]
    MissingMapType,
    #[error("missing match_id")]
    MissingMatchId,
    #[error("missing started timestamp")]
    MissingStarted,
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("no rating_type declared")]
    MissingRatingType,
    #[error("no rating type for game_type {game_type:?}")]
    UnclassifiedRatingType { game_type: Option<i64> },
}

impl RejectReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingMapType => "missing map_type",
            Self::MissingMatchId => "missing match_id",
            Self::MissingStarted => "missing started",
            Self::Invalid(_) => "invalid players",
            Self::MissingRatingType => "missing rating_type",
            Self::UnclassifiedRatingType { .. } => "no rating type",
        }
    }
}

/// Turns validated blobs into per-player rows.
pub struct RecordBuilder<'a> {
    validator: Validator,
    resolver: RatingTypeResolver,
    versions: &'a VersionTable,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(validator: Validator, resolver: RatingTypeResolver, versions: &'a VersionTable) -> Self {
        Self {
            validator,
            resolver,
            versions,
        }
    }

    pub fn build(&self, blob: &MatchBlob) -> Result<Vec<MatchRecord>, RejectReason> {
        let map_type = blob
            .map_type
            .filter(|map| *map != 0)
            .ok_or(RejectReason::MissingMapType)?;
        self.validator.validate(blob)?;
        let match_id = blob.match_id.clone().ok_or(RejectReason::MissingMatchId)?;
        let started = blob.started.ok_or(RejectReason::MissingStarted)?;
        let rating_type = self.resolve_rating_type(blob)?;

        let shared = MatchRecord {
            match_id,
            map_type,
            rating_type,
            version: self.resolve_version(blob, started),
            started,
            finished: blob.finished,
            team_size: blob.team_size(),
            game_type: blob.game_type,
            player_id: 0,
            civ_id: 0,
            rating: None,
            won: false,
            mirror: false,
        };
        Ok(expand_players(blob, shared))
    }

    fn resolve_rating_type(&self, blob: &MatchBlob) -> Result<i64, RejectReason> {
        match (self.resolver.resolve(blob), self.resolver.policy()) {
            (Some(rating_type), _) => Ok(rating_type),
            (None, RatingTypePolicy::Declared) => Err(RejectReason::MissingRatingType),
            (None, RatingTypePolicy::Deduced) => Err(RejectReason::UnclassifiedRatingType {
                game_type: blob.game_type,
            }),
        }
    }

    fn resolve_version(&self, blob: &MatchBlob, started: i64) -> Option<String> {
        blob.declared_version()
            .or_else(|| self.versions.version_for_timestamp(started))
            .map(str::to_string)
    }
}

fn expand_players(blob: &MatchBlob, shared: MatchRecord) -> Vec<MatchRecord> {
    let mut rows: Vec<MatchRecord> = blob
        .players
        .iter()
        .filter_map(|player| {
            Some(MatchRecord {
                player_id: player.profile_id?,
                civ_id: player.civ?,
                rating: player.rating,
                won: player.won.unwrap_or(false),
                ..shared.clone()
            })
        })
        .collect();

    let mirror = is_mirror(&rows);
    for row in &mut rows {
        row.mirror = mirror;
    }
    rows
}

fn is_mirror(rows: &[MatchRecord]) -> bool {
    rows.iter().map(|row| row.civ_id).collect::<HashSet<_>>().len() == 1
}
