use std::path::Path;

use dotenv::dotenv;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use super::AppResult;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Maps the `-v` count of the command line to a default filter directive.
/// `RUST_LOG` still wins when it is set.
pub fn verbosity_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Console-only subscriber, used by tests and short-lived commands.
pub fn setup_local_tracing() -> AppResult<()> {
    dotenv().ok();
    let timer = ChronoLocal::new(TIME_FORMAT.to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_line_number(true);
    // a second call (another test in the same binary) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(EnvFilter::from_default_env())
        .try_init();
    Ok(())
}

/// Console plus an hourly rolling file under `log_dir`.
///
/// The returned guard flushes the file writer on drop, so it has to live as
/// long as the process does.
pub fn setup_tracing(log_dir: impl AsRef<Path>, verbose: u8) -> AppResult<WorkerGuard> {
    let file_appender = tracing_appender::rolling::hourly(log_dir, "kafkascope.log");
    let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
    let writer = non_blocking.and(std::io::stdout);

    let timer = ChronoLocal::new(TIME_FORMAT.to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(timer)
        .with_target(true)
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(writer);

    let subscriber = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(verbosity_filter(verbose));
    tracing::subscriber::set_global_default(subscriber)?;

    Ok(worker_guard)
}
