use serde_json::Value;
use tracing::{debug, info};

use super::GameSource;
use crate::config::EuroleagueConfig;
use crate::domain::GameCode;
use crate::error::{ElwfError, Result};
use crate::persistence::JsonCache;

/// File-backed [`GameSource`] over a [`JsonCache`].
///
/// Without an upstream, a missing payload is an error. With one, misses are
/// fetched from the upstream and stored before being returned.
pub struct CachedGameSource {
    cache: JsonCache,
    competition: String,
    upstream: Option<Box<dyn GameSource>>,
}

impl CachedGameSource {
    pub fn new(cache: JsonCache, competition: impl Into<String>) -> Self {
        Self {
            cache,
            competition: competition.into(),
            upstream: None,
        }
    }

    pub fn with_upstream(mut self, upstream: Box<dyn GameSource>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    pub fn cache(&self) -> &JsonCache {
        &self.cache
    }

    fn season_key(&self, season: i64) -> String {
        format!("games/{}/{season}", self.competition)
    }

    fn game_key(&self, kind: &str, season: i64, game_code: &GameCode) -> String {
        format!("{kind}/{}/{season}/{game_code}", self.competition)
    }

    fn read_through<F>(&self, key: &str, fetch: F) -> Result<Value>
    where
        F: FnOnce(&dyn GameSource) -> Result<Value>,
    {
        if let Some(payload) = self.cache.load(key)? {
            debug!(key, "cache hit");
            return Ok(payload);
        }
        let upstream = self.upstream.as_deref().ok_or_else(|| {
            ElwfError::InvalidData(format!(
                "no cached payload for {key} under {}",
                self.cache.root().display()
            ))
        })?;
        let payload = fetch(upstream)?;
        self.cache.store(key, &payload)?;
        info!(key, "fetched and cached payload");
        Ok(payload)
    }
}

impl From<&EuroleagueConfig> for CachedGameSource {
    fn from(cfg: &EuroleagueConfig) -> Self {
        Self::new(JsonCache::new(cfg.cache_dir.clone()), cfg.competition_code.clone())
    }
}

impl GameSource for CachedGameSource {
    fn season_games(&self, season: i64) -> Result<Vec<Value>> {
        let payload = self.read_through(&self.season_key(season), |up| {
            up.season_games(season).map(Value::Array)
        })?;
        // Providers wrap lists as {"data": [...]}
        match payload {
            Value::Array(games) => Ok(games),
            Value::Object(mut obj) => match obj.remove("data") {
                Some(Value::Array(games)) => Ok(games),
                _ => Err(ElwfError::InvalidData(format!(
                    "season {season} payload has no game list"
                ))),
            },
            _ => Err(ElwfError::InvalidData(format!(
                "season {season} payload has no game list"
            ))),
        }
    }

    fn boxscore(&self, season: i64, game_code: &GameCode) -> Result<Value> {
        self.read_through(&self.game_key("boxscore", season, game_code), |up| {
            up.boxscore(season, game_code)
        })
    }

    fn play_by_play(&self, season: i64, game_code: &GameCode) -> Result<Value> {
        self.read_through(&self.game_key("pbp", season, game_code), |up| {
            up.play_by_play(season, game_code)
        })
    }
}
