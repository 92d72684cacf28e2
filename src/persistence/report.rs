//! Walk-forward artifacts: predictions, metrics, round diagnostics and
//! upcoming fixtures.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backtest::{Metrics, Prediction, RoundDiagnostic, UpcomingPrediction, WalkForwardResult};
use crate::domain::{GameTable, GAME_CODE_COL, SEASON_COL};
use crate::error::{ElwfError, Result};

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Headers are written explicitly so empty outputs still carry them.
fn writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    ensure_parent(path)?;
    Ok(csv::WriterBuilder::new().has_headers(false).from_path(path)?)
}

const ROUND_HEADER: [&str; 9] = [
    "round",
    "train_size",
    "test_size",
    "skipped",
    "reason",
    "logloss",
    "brier",
    "acc@0.5",
    "n",
];
const UPCOMING_HEADER: [&str; 5] = [SEASON_COL, "round", GAME_CODE_COL, "p_home_win", "is_future"];

/// `season, round, game_code, <target>, p_home_win`
pub fn write_predictions<P: AsRef<Path>>(path: P, predictions: &[Prediction], target_col: &str) -> Result<()> {
    let mut w = writer(path.as_ref())?;
    w.write_record([SEASON_COL, "round", GAME_CODE_COL, target_col, "p_home_win"])?;
    for p in predictions {
        w.serialize((p.season, p.round, &p.game_code, p.label, p.p_home_win))?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_metrics_json<P: AsRef<Path>>(path: P, metrics: &Metrics) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(metrics)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn read_metrics_json<P: AsRef<Path>>(path: P) -> Result<Metrics> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Flat CSV form of a [`RoundDiagnostic`].
#[derive(Serialize)]
struct RoundRow<'a> {
    round: i64,
    train_size: usize,
    test_size: usize,
    skipped: bool,
    reason: &'a str,
    logloss: Option<f64>,
    brier: Option<f64>,
    #[serde(rename = "acc@0.5")]
    accuracy: Option<f64>,
    n: Option<usize>,
}

impl<'a> From<&'a RoundDiagnostic> for RoundRow<'a> {
    fn from(r: &'a RoundDiagnostic) -> Self {
        Self {
            round: r.round,
            train_size: r.train_size,
            test_size: r.test_size,
            skipped: r.skipped,
            reason: &r.reason,
            logloss: r.metrics.map(|m| m.logloss),
            brier: r.metrics.map(|m| m.brier),
            accuracy: r.metrics.map(|m| m.accuracy),
            n: r.metrics.map(|m| m.n),
        }
    }
}

/// One row per visited round; metric cells are empty for skipped rounds.
pub fn write_rounds<P: AsRef<Path>>(path: P, rounds: &[RoundDiagnostic]) -> Result<()> {
    let mut w = writer(path.as_ref())?;
    w.write_record(ROUND_HEADER)?;
    for r in rounds {
        w.serialize(RoundRow::from(r))?;
    }
    w.flush()?;
    Ok(())
}

/// `season, round, game_code, p_home_win, is_future`; `round` is empty when
/// the fixtures carried no round column.
pub fn write_upcoming<P: AsRef<Path>>(path: P, upcoming: &[UpcomingPrediction]) -> Result<()> {
    let mut w = writer(path.as_ref())?;
    w.write_record(UPCOMING_HEADER)?;
    for u in upcoming {
        w.serialize(u)?;
    }
    w.flush()?;
    Ok(())
}

/// `season, game_code, p_home_win` for a statically fitted model.
pub fn write_scores<P: AsRef<Path>>(path: P, table: &GameTable, probabilities: &[f64]) -> Result<()> {
    if table.len() != probabilities.len() {
        return Err(ElwfError::Validation(format!(
            "{} probabilities for {} games",
            probabilities.len(),
            table.len()
        )));
    }
    let mut w = writer(path.as_ref())?;
    w.write_record([SEASON_COL, GAME_CODE_COL, "p_home_win"])?;
    for (record, p) in table.records().iter().zip(probabilities) {
        w.serialize((record.season, &record.game_code, p))?;
    }
    w.flush()?;
    Ok(())
}

/// Where a run writes its artifacts, derived from the predictions path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub predictions: PathBuf,
    pub metrics: PathBuf,
    pub rounds: PathBuf,
    pub upcoming: PathBuf,
}

impl ReportPaths {
    /// `out.csv` → `out.metrics.json`, `out.rounds.csv`, `out.upcoming.csv`.
    pub fn from_predictions<P: AsRef<Path>>(predictions: P) -> Self {
        let predictions = predictions.as_ref().to_path_buf();
        let sibling = |suffix: &str| {
            let mut stem = predictions.clone();
            stem.set_extension("");
            let mut name = stem.into_os_string();
            name.push(suffix);
            PathBuf::from(name)
        };
        Self {
            metrics: sibling(".metrics.json"),
            rounds: sibling(".rounds.csv"),
            upcoming: sibling(".upcoming.csv"),
            predictions,
        }
    }
}

/// Write every artifact of a walk-forward run.
pub fn write_report(paths: &ReportPaths, result: &WalkForwardResult, target_col: &str) -> Result<()> {
    write_predictions(&paths.predictions, &result.predictions, target_col)?;
    write_metrics_json(&paths.metrics, &result.metrics)?;
    write_rounds(&paths.rounds, &result.rounds)?;
    if let Some(upcoming) = &result.upcoming {
        write_upcoming(&paths.upcoming, upcoming)?;
    }
    info!(
        predictions = %paths.predictions.display(),
        metrics = %paths.metrics.display(),
        rounds = %paths.rounds.display(),
        "wrote walk-forward report"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GameCode, GameRecord};
    use tempfile::TempDir;

    fn metrics() -> Metrics {
        Metrics {
            logloss: 0.65,
            brier: 0.23,
            accuracy: 0.6,
            n: 10,
        }
    }

    #[test]
    fn test_report_paths() {
        let paths = ReportPaths::from_predictions("artifacts/wf.csv");
        assert_eq!(paths.metrics, PathBuf::from("artifacts/wf.metrics.json"));
        assert_eq!(paths.rounds, PathBuf::from("artifacts/wf.rounds.csv"));
        assert_eq!(paths.upcoming, PathBuf::from("artifacts/wf.upcoming.csv"));
    }

    #[test]
    fn test_metrics_json_uses_accuracy_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("m.json");
        write_metrics_json(&path, &metrics()).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["acc@0.5"], 0.6);
        assert_eq!(raw["n"], 10);
        assert_eq!(read_metrics_json(&path).unwrap(), metrics());
    }

    #[test]
    fn test_predictions_header_uses_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.csv");
        let preds = vec![Prediction {
            season: 2023,
            round: 3,
            game_code: GameCode::Numeric(21),
            label: 1,
            p_home_win: 0.75,
        }];
        write_predictions(&path, &preds, "home_won").unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert_eq!(body, "season,round,game_code,home_won,p_home_win\n2023,3,21,1,0.75\n");
    }

    #[test]
    fn test_rounds_leave_skipped_metrics_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.csv");
        let rounds = vec![
            RoundDiagnostic::skipped(1, 0, 10, "train_size<20".to_string()),
            RoundDiagnostic::trained(2, 20, 10, Some(metrics())),
        ];
        write_rounds(&path, &rounds).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines[0], "round,train_size,test_size,skipped,reason,logloss,brier,acc@0.5,n");
        assert_eq!(lines[1], "1,0,10,true,train_size<20,,,,");
        assert_eq!(lines[2], "2,20,10,false,,0.65,0.23,0.6,10");
    }

    #[test]
    fn test_upcoming_round_optional() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("u.csv");
        let upcoming = vec![UpcomingPrediction {
            season: 2024,
            round: None,
            game_code: GameCode::Numeric(99),
            p_home_win: 0.5,
            is_future: true,
        }];
        write_upcoming(&path, &upcoming).unwrap();
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.ends_with("2024,,99,0.5,true\n"));
    }

    #[test]
    fn test_upcoming_text_codes_and_empty_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("u.csv");
        let upcoming = vec![UpcomingPrediction {
            season: 2024,
            round: Some(35),
            game_code: GameCode::Text("E2024.1".to_string()),
            p_home_win: 0.25,
            is_future: true,
        }];
        write_upcoming(&path, &upcoming).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "season,round,game_code,p_home_win,is_future\n2024,35,E2024.1,0.25,true\n"
        );

        write_upcoming(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "season,round,game_code,p_home_win,is_future\n"
        );
    }

    #[test]
    fn test_scores_length_mismatch() {
        let dir = TempDir::new().unwrap();
        let table = GameTable::from_records(
            ["f_x"],
            vec![GameRecord::new(2023, 1).with("f_x", 0.0)],
        )
        .unwrap();
        let err = write_scores(dir.path().join("s.csv"), &table, &[]).unwrap_err();
        assert!(matches!(err, ElwfError::Validation(_)));
    }
}
