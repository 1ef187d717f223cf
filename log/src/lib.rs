use std::sync::Mutex;

use slog::Drain;
use slog::Fuse;
use slog_async::Async;
use slog_json::Json;

pub use slog::{debug, error, info, o, trace, warn, Logger};

#[cfg(feature = "env_logging")]
pub use slog_scope::GlobalLoggerGuard;

/// Builds the root logger: JSON lines on stderr, written from a
/// background thread.
pub fn initialize_logger() -> Logger {
    let drain = Mutex::new(Json::default(std::io::stderr())).map(Fuse);
    let drain = Async::new(drain).build().fuse();

    Logger::root(
        drain,
        o!(
            "service" => info::NAME,
            "version" => info::VERSION,
            "revision" => info::REVISION,
            "build_timestamp" => info::BUILD_TIMESTAMP
        ),
    )
}

/// A logger that drops everything. Used where no output is wanted,
/// mostly in tests.
pub fn discard() -> Logger {
    Logger::root(slog::Discard, o!())
}

/// Installs a global logger configured through `RUST_LOG` and returns
/// the guard that keeps it alive.
#[cfg(feature = "env_logging")]
pub fn initialize_env_logger() -> Result<GlobalLoggerGuard, String> {
    slog_envlogger::init().map_err(|e| format!("{}", e))
}

/// The logger installed by [`initialize_env_logger`].
#[cfg(feature = "env_logging")]
pub fn scoped() -> Logger {
    slog_scope::logger()
}
