//! Game data sources.
//!
//! The evaluator only consumes CSV tables; sources feed the cache that those
//! tables are derived from. No network client ships here: a live provider
//! implements [`GameSource`] and is wrapped by [`CachedGameSource`] as its
//! upstream.

mod cached;

pub use cached::CachedGameSource;

use serde_json::Value;

use crate::domain::GameCode;
use crate::error::Result;

/// Raw provider payloads for one competition.
pub trait GameSource {
    /// Game metadata for a season, one JSON object per game.
    fn season_games(&self, season: i64) -> Result<Vec<Value>>;

    fn boxscore(&self, season: i64, game_code: &GameCode) -> Result<Value>;

    fn play_by_play(&self, season: i64, game_code: &GameCode) -> Result<Value>;
}

impl<S: GameSource + ?Sized> GameSource for Box<S> {
    fn season_games(&self, season: i64) -> Result<Vec<Value>> {
        (**self).season_games(season)
    }

    fn boxscore(&self, season: i64, game_code: &GameCode) -> Result<Value> {
        (**self).boxscore(season, game_code)
    }

    fn play_by_play(&self, season: i64, game_code: &GameCode) -> Result<Value> {
        (**self).play_by_play(season, game_code)
    }
}

/// Concatenate game metadata across seasons, in the order given.
pub fn collect_games<S, I>(source: &S, seasons: I) -> Result<Vec<Value>>
where
    S: GameSource + ?Sized,
    I: IntoIterator<Item = i64>,
{
    let mut games = Vec::new();
    for season in seasons {
        let batch = source.season_games(season)?;
        tracing::debug!(season, games = batch.len(), "collected season games");
        games.extend(batch);
    }
    Ok(games)
}
