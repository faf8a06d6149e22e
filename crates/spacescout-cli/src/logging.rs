use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Set up tracing with a pretty stdout layer and a plain rolling file.
/// The returned guard flushes the file writer on drop.
pub fn init_logger() -> impl Drop {
    let filter = EnvFilter::new(env::var("SPACESCOUT_LOG").unwrap_or_else(|_| "info".to_string()));

    let log_file = env::var("SPACESCOUT_LOG_FILE")
        .unwrap_or_else(|_| "./logs/spacescout.log".to_string());
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never("./", log_file));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}
