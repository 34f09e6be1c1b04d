use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,tower_http=warn,hyper=warn";
const FILTER_ENV: &str = "CHATLINE_LOG_FILTER";
const FORMAT_ENV: &str = "CHATLINE_LOG_FORMAT";

/// Keeps the non-blocking writer alive; drop it only on shutdown.
pub struct LoggingHandle {
    pub guard: WorkerGuard,
}

pub fn init_logging() -> anyhow::Result<LoggingHandle> {
    let filter = std::env::var(FILTER_ENV)
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    let format = std::env::var(FORMAT_ENV).unwrap_or_else(|_| "pretty".into());

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .json()
                    .flatten_event(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true)
                    .with_current_span(true),
            )
            .try_init()?;
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .try_init()?;
    }

    tracing::info!(
        component = "logging",
        event = "logging.initialized",
        format = %format,
        filter = %std::env::var(FILTER_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_FILTER.to_string()),
    );

    Ok(LoggingHandle { guard })
}
