use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{FeaturesArgs, FitArgs, GamesArgs, PredictArgs, WalkforwardArgs};
use crate::adapters::{collect_games, CachedGameSource};
use crate::backtest::{run_walkforward, WalkForwardConfig, WalkForwardEvaluator, WalkForwardResult};
use crate::config::AppConfig;
use crate::domain::{FeatureSelector, GameTable};
use crate::features::FeatureBuilder;
use crate::ml::{GameWinnerModel, LogisticConfig, LogisticRegression, SavedGameModel};
use crate::persistence::{
    read_game_table_with, read_team_games, write_game_table, write_report, write_scores, ReportPaths,
};

/// Read a CSV game table; only columns accepted by `required` must be numeric.
fn read_table<F: Fn(&str) -> bool>(path: &Path, name: &str, required: F) -> Result<GameTable> {
    read_game_table_with(path, name, required)
        .with_context(|| format!("failed to read {name} table {}", path.display()))
}

fn selector(flag: Option<Vec<String>>, config: &AppConfig) -> FeatureSelector {
    match flag {
        Some(cols) => FeatureSelector::explicit(cols),
        None => WalkForwardConfig::from(&config.evaluation).features,
    }
}

pub fn walkforward(args: WalkforwardArgs, config: &AppConfig) -> Result<WalkForwardResult> {
    let mut wf = WalkForwardConfig::from(&config.evaluation);
    if let Some(target) = args.target {
        wf.target_col = target;
    }
    if let Some(round_col) = args.round_col {
        wf.round_col = round_col;
    }
    if let Some(min_train_size) = args.min_train_size {
        wf.min_train_size = min_train_size;
    }
    wf.features = selector(args.feature_cols, config);

    let evaluator = WalkForwardEvaluator::new(wf, LogisticRegression::new(LogisticConfig::from(&config.model)));
    let cfg = evaluator.config();
    let required =
        |c: &str| c == cfg.target_col || c == cfg.round_col || cfg.features.accepts(c);
    let games = read_table(&args.games, "games", required)?;
    let features = read_table(&args.features, "features", required)?;
    let upcoming = args
        .upcoming
        .as_deref()
        .map(|p| read_table(p, "upcoming", required))
        .transpose()?;

    let result = run_walkforward(&games, &features, &evaluator, upcoming.as_ref())?;

    let out = args
        .out
        .unwrap_or_else(|| config.output.dir.join("walkforward.csv"));
    let paths = ReportPaths::from_predictions(&out);
    write_report(&paths, &result, &evaluator.config().target_col)?;

    println!("{}", result.summary());
    println!("Saved predictions to {}", paths.predictions.display());
    println!("Saved metrics to {}", paths.metrics.display());
    println!("Saved round diagnostics to {}", paths.rounds.display());
    if result.upcoming.is_some() {
        println!("Saved upcoming predictions to {}", paths.upcoming.display());
    }
    Ok(result)
}

pub fn features(args: FeaturesArgs, config: &AppConfig) -> Result<()> {
    let window = args.window.unwrap_or(config.features.window);
    let team_games = read_team_games(&args.team_games)
        .with_context(|| format!("failed to read team games {}", args.team_games.display()))?;

    let table = FeatureBuilder::new(window)
        .with_prefix(config.features.prefix.clone())
        .build(&team_games)?;

    let out = args
        .out
        .unwrap_or_else(|| config.output.dir.join("game_features.csv"));
    write_game_table(&out, &table)?;

    info!(games = table.len(), window, out = %out.display(), "wrote game features");
    println!("Saved {} game feature rows to {}", table.len(), out.display());
    Ok(())
}

pub fn fit(args: FitArgs, config: &AppConfig) -> Result<()> {
    let target = args
        .target
        .unwrap_or_else(|| config.evaluation.target_col.clone());
    let features = selector(args.feature_cols, config);
    let table = read_table(&args.table, "training", |c| c == target || features.accepts(c))?;

    let mut model = GameWinnerModel::new(LogisticRegression::new(LogisticConfig::from(&config.model)))
        .with_selector(features)
        .with_min_rows(args.min_rows.unwrap_or(config.single_split.min_rows));
    model.fit(&table, &target)?;

    if let Some(parent) = args.model_out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    SavedGameModel::from_model(&model, &target)?.to_file(&args.model_out)?;

    println!(
        "Fitted on {} games with {} features; saved model to {}",
        table.len(),
        model.feature_cols().len(),
        args.model_out.display()
    );
    Ok(())
}

pub fn predict(args: PredictArgs) -> Result<()> {
    let saved = SavedGameModel::from_file(&args.model)
        .with_context(|| format!("failed to load model {}", args.model.display()))?;
    let table = read_table(&args.table, "prediction", |c| saved.feature_cols.iter().any(|f| f == c))?;
    let probabilities = saved.predict_proba(&table)?;
    write_scores(&args.out, &table, &probabilities)?;

    println!("Saved {} predictions to {}", probabilities.len(), args.out.display());
    Ok(())
}

/// Write the cached game lists of `args.seasons` to one JSON array.
///
/// Reads the cache under `euroleague.cache_dir` only; a missing season fails.
pub fn games(args: GamesArgs, config: &AppConfig) -> Result<PathBuf> {
    let mut source_cfg = config.euroleague.clone();
    if let Some(competition) = args.competition {
        source_cfg.competition_code = competition;
    }
    let source = CachedGameSource::from(&source_cfg);
    let games = collect_games(&source, args.seasons.iter().copied()).with_context(|| {
        format!(
            "failed to read {} games from cache {}",
            source_cfg.competition_code,
            source_cfg.cache_dir.display()
        )
    })?;

    let out = args.out.unwrap_or_else(|| {
        config
            .output
            .dir
            .join(format!("games_{}.json", source_cfg.competition_code))
    });
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&out, serde_json::to_vec_pretty(&games)?)?;

    info!(games = games.len(), seasons = args.seasons.len(), out = %out.display(), "exported games");
    println!("Saved {} games to {}", games.len(), out.display());
    Ok(out)
}
