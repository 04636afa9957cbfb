//! Process-wide default logger.
//!
//! # Init order
//!
//! The default instance is created on the first call to [`global`]. To
//! replace it, call [`init_global`] before anything logs through
//! [`global`]; once the default exists it stays for the life of the
//! process, although its filters can still be changed through
//! [`Logger::insert`], [`Logger::close`] or
//! [`Logger::load_configuration`].

use std::sync::OnceLock;

use crate::log::{log_level::Level, logger::Logger};

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Returns the process-wide logger, creating it with one console filter at
/// `DEBUG` if nothing was installed first.
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(|| Logger::with_console(Level::Debug))
}

/// Installs `logger` as the process-wide logger.
///
/// # Errors
///
/// Hands `logger` back if the global instance already exists.
pub fn init_global(logger: Logger) -> Result<(), Logger> {
    GLOBAL.set(logger)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn second_init_is_refused() {
        let _ = global();
        let rejected = init_global(Logger::new());
        assert!(rejected.is_err());
        assert!(global().is_enabled(Level::Debug));
    }
}
