use elwf::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level. When `logging.dir` is set, a
/// daily rotated `elwf.log` is written there as well; the returned guard must
/// live until exit so buffered lines are flushed.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,elwf={}", config.level)));

    let mut guard = None;
    let file_layer = config.dir.as_ref().and_then(|log_dir| {
        // rolling::daily panics (abort in release) if the first file cannot be created
        if let Err(e) = prepare_log_dir(log_dir) {
            eprintln!(
                "Warning: Could not write to log directory {} ({}), file logging disabled",
                log_dir.display(),
                e
            );
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(log_dir, "elwf.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
    });

    // Console goes to stderr so command output on stdout stays clean
    let console_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
    });
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    if let Some(dir) = &config.dir {
        if guard.is_some() {
            eprintln!("Logging to: {}/elwf.log", dir.display());
        }
    }
    guard
}

/// Create `log_dir` and check a file can be opened for append inside it.
fn prepare_log_dir(log_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let test_path = log_dir.join(".elwf_write_test");
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&test_path)?;
    let _ = std::fs::remove_file(&test_path);
    Ok(())
}
