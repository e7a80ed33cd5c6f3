use std::env;
use std::fs::OpenOptions;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

static ENABLE_LOGGING: AtomicBool = AtomicBool::new(false);

/// Initializes logging based on environment variables:
/// - FTM_LOGGING: enables/disables logging (true/false, disabled when unset)
/// - FTM_LOG_FILE: when set, logs are appended to this file instead of stdout
/// - RUST_LOG: filter directives, `info` when unset
///
/// To enable logging in tests, run: FTM_LOGGING=true cargo test -- --nocapture
pub fn init_logging() {
    match env::var("FTM_LOGGING").as_deref() {
        Ok("true") => ENABLE_LOGGING.store(true, Ordering::SeqCst),
        Ok("false") | Err(_) => {
            ENABLE_LOGGING.store(false, Ordering::SeqCst);
            return;
        }
        Ok(other) => {
            eprintln!("FTM_LOGGING must be 'true' or 'false' (got '{}'), logging stays disabled", other);
            ENABLE_LOGGING.store(false, Ordering::SeqCst);
            return;
        }
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    // A subscriber may already be installed by an earlier call; keep that one
    let installed = match env::var("FTM_LOG_FILE") {
        Ok(path) => match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).try_init().is_ok(),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}, logging to stdout", path, e);
                builder.try_init().is_ok()
            }
        },
        Err(_) => builder.try_init().is_ok(),
    };
    if !installed {
        tracing::debug!("Logging subscriber already installed");
    }
}

pub fn is_enabled() -> bool {
    ENABLE_LOGGING.load(Ordering::SeqCst)
}

/// Logs a message under a component prefix, e.g. `log("SWEEP", "run 1/3 done")`
pub fn log(prefix: &str, message: &str) {
    if is_enabled() {
        tracing::info!("[{}] {}", prefix, message);
    }
}
