use std::fmt::Display;

use tracing::error;

/// Log `result`'s error, prefixed with `message` when non-empty.
///
/// Returns `true` if there was an error.
pub fn check_error<T, E: Display>(message: &str, result: &Result<T, E>) -> bool {
    match result {
        Ok(_) => false,
        Err(err) => {
            log_error(message, err);
            true
        }
    }
}

/// Like [`check_error`], but terminates the process with status 1 on error.
pub fn check_error_fatal<T, E: Display>(message: &str, result: &Result<T, E>) {
    if check_error(message, result) {
        std::process::exit(1);
    }
}

fn log_error(message: &str, err: &dyn Display) {
    if message.is_empty() {
        error!("{err}");
    } else {
        error!(error = %err, "{message}");
    }
}
