use std::io::Write;
use std::path::Path;

use nextmac_shared::constants::filenames;
use nextmac_shared::errors::{MacError, MacResult};
use tempfile::NamedTempFile;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::runtime::options::LogOptions;

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG` wins over `config.level`. With a `log_dir` set, events go to
/// `<log_dir>/nextmac.log`; otherwise to stderr. A subscriber installed
/// earlier in the process is left in place.
pub fn init_logging(config: &LogOptions) -> MacResult<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| MacError::Config(format!("invalid log level '{}': {}", config.level, e)))?;

    let (non_blocking, guard) = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir).map_err(|e| {
                MacError::Storage(format!("failed to create {}: {}", log_dir.display(), e))
            })?;
            let file_appender = tracing_appender::rolling::never(log_dir, filenames::LOG_FILE);
            tracing_appender::non_blocking(file_appender)
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    register_to_tracing(non_blocking, env_filter);
    Ok(guard)
}

pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init();
}

/// Replace `path` with `contents` in one rename.
///
/// The temporary file lives in the same directory so the rename never
/// crosses filesystems. Readers see either the old or the new file.
pub fn write_atomic(path: &Path, contents: &str) -> MacResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| MacError::Storage(format!("failed to create {}: {}", parent.display(), e)))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| {
        MacError::Storage(format!(
            "failed to create temp file in {}: {}",
            parent.display(),
            e
        ))
    })?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| {
            MacError::Storage(format!("failed to write {}: {}", tmp.path().display(), e))
        })?;
    tmp.persist(path).map_err(|e| {
        MacError::Storage(format!("failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

/// Remove `path`, treating an already missing file as success.
pub fn remove_if_exists(path: &Path) -> MacResult<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(MacError::Storage(format!(
            "failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}
