use anyhow::Result;

use crate::domain::MatchPage;

/// Where match pages come from.
#[allow(async_fn_in_trait)]
pub trait MatchSource {
    /// Up to `count` matches that started at or after `since`.
    async fn fetch_page(&mut self, since: i64, count: usize) -> Result<MatchPage>;

    /// One page of a player's full history, newest first.
    async fn fetch_player_history(
        &mut self,
        profile_id: i64,
        offset: usize,
        count: usize,
    ) -> Result<MatchPage>;
}
