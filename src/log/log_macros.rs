//! Leveled logging macros over a [`Logger`](crate::Logger).
//!
//! Every macro takes the logger first, then one of three message shapes:
//!
//! - a format literal and its arguments: `info!(log, "took {}ms", ms)`
//! - a closure, run at most once and only if some filter accepts:
//!   `debug!(log, || dump(&state))`
//! - any other `Display` values, joined with spaces: `info!(log, user, action)`
//!
//! The source tag is always `module_path!()` at the call site.
//!
//! A literal in first position is always taken as a format string, so a
//! print-style call must not start with a number or other non-string
//! literal: `access!(log, 200, user)` does not compile. Start with a
//! variable, wrap the literal in parentheses (`access!(log, (200), user)`)
//! or use a format string (`access!(log, "{} {}", 200, user)`).
//!
//! `warn!`, `error!` and `critical!` evaluate to a [`LoggedError`](crate::LoggedError)
//! carrying the message so callers can log and return in one go; those
//! macros build the message even when nothing listens. `critical!` also
//! appends the call stack to the logged record.
//!
//! `crash!` and `exit!` log, close every writer and then panic or end the
//! process; neither returns.

// ============================================================================
// 1. GENERIC INTERNAL MACROS (The "Workers")
// ============================================================================

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($logger:expr, $lvl:expr, || $body:expr) => {{
        $logger.log_with($lvl, module_path!(), || ::std::string::ToString::to_string(&$body))
    }};
    ($logger:expr, $lvl:expr, $fmt:literal $(, $($arg:tt)*)?) => {{
        $logger.logf($lvl, module_path!(), format_args!($fmt $(, $($arg)*)?))
    }};
    ($logger:expr, $lvl:expr, $($arg:expr),+ $(,)?) => {{
        $logger.log_with($lvl, module_path!(), || $crate::__join!($($arg),+))
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __message {
    (|| $body:expr) => {
        ::std::string::ToString::to_string(&$body)
    };
    ($fmt:literal $(, $($arg:tt)*)?) => {
        format!($fmt $(, $($arg)*)?)
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::__join!($($arg),+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __join {
    ($($arg:expr),+) => {
        [$(::std::string::ToString::to_string(&$arg)),+].join(" ")
    };
}

// ============================================================================
// 2. LEVEL-SPECIFIC MACROS
// ============================================================================

#[macro_export]
macro_rules! finest { ($logger:expr, $($msg:tt)+) => { $crate::__log_at!($logger, $crate::Level::Finest, $($msg)+) } }

#[macro_export]
macro_rules! fine { ($logger:expr, $($msg:tt)+) => { $crate::__log_at!($logger, $crate::Level::Fine, $($msg)+) } }

#[macro_export]
macro_rules! debug { ($logger:expr, $($msg:tt)+) => { $crate::__log_at!($logger, $crate::Level::Debug, $($msg)+) } }

#[macro_export]
macro_rules! trace { ($logger:expr, $($msg:tt)+) => { $crate::__log_at!($logger, $crate::Level::Trace, $($msg)+) } }

#[macro_export]
macro_rules! info { ($logger:expr, $($msg:tt)+) => { $crate::__log_at!($logger, $crate::Level::Info, $($msg)+) } }

#[macro_export]
macro_rules! access { ($logger:expr, $($msg:tt)+) => { $crate::__log_at!($logger, $crate::Level::Access, $($msg)+) } }

// ---------------------- LOG AND RETURN ----------------------

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($msg:tt)+) => {
        $logger.report($crate::Level::Warning, module_path!(), $crate::__message!($($msg)+))
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($msg:tt)+) => {
        $logger.report($crate::Level::Error, module_path!(), $crate::__message!($($msg)+))
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($msg:tt)+) => {
        $logger.critical(module_path!(), $crate::__message!($($msg)+))
    };
}

// ---------------------- LOG AND STOP ----------------------

#[macro_export]
macro_rules! crash {
    ($logger:expr, $($msg:tt)+) => {
        $logger.crash(module_path!(), $crate::__message!($($msg)+))
    };
}

#[macro_export]
macro_rules! exit {
    ($logger:expr, $($msg:tt)+) => {
        $logger.exit(module_path!(), $crate::__message!($($msg)+))
    };
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use crate::{Level, Logger, writers::MemoryWriter};
    use std::{
        cell::Cell,
        sync::Arc,
    };

    fn setup(level: Level) -> (Logger, Arc<MemoryWriter>) {
        let logger = Logger::new();
        let mem = Arc::new(MemoryWriter::new());
        logger.add_filter("mem", level, mem.clone());
        (logger, mem)
    }

    #[test]
    fn format_shape() {
        let (log, mem) = setup(Level::Finest);
        let ms = 12;
        crate::info!(log, "took {}ms", ms);
        crate::debug!(log, "inline {ms}");
        assert_eq!(mem.messages(), ["took 12ms", "inline 12"]);
        assert_eq!(mem.records()[0].source(), module_path!());
    }

    #[test]
    fn closure_shape_is_lazy() {
        let (log, mem) = setup(Level::Info);
        let calls = Cell::new(0);
        crate::debug!(log, || {
            calls.set(calls.get() + 1);
            "hidden"
        });
        crate::info!(log, || {
            calls.set(calls.get() + 1);
            "shown"
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(mem.messages(), ["shown"]);
    }

    #[test]
    fn print_shape_joins_with_spaces() {
        let (log, mem) = setup(Level::Finest);
        let user = "ann";
        crate::access!(log, user, 200, 1.5);
        assert_eq!(mem.messages(), ["ann 200 1.5"]);
    }

    #[test]
    fn leading_number_needs_parentheses_or_a_format_string() {
        let (log, mem) = setup(Level::Finest);
        let user = "ann";
        let code = 200;
        crate::access!(log, code, user);
        crate::access!(log, (200), user);
        crate::access!(log, "{} {}", 200, user);
        assert_eq!(mem.messages(), ["200 ann", "200 ann", "200 ann"]);
    }

    #[test]
    fn crash_logs_closes_and_panics() {
        let (log, mem) = setup(Level::Error);
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            crate::crash!(log, "lost {} shards", 3)
        }))
        .unwrap_err();
        assert_eq!(payload.downcast_ref::<String>().unwrap(), "lost 3 shards");
        assert_eq!(mem.messages(), ["lost 3 shards"]);
        assert_eq!(mem.records()[0].level(), Level::Critical);
        assert!(mem.is_closed());
    }

    #[test]
    fn warn_and_error_return_the_message() {
        let (log, mem) = setup(Level::Critical);
        let err = crate::warn!(log, "retry {} of {}", 2, 3);
        assert_eq!(err.message(), "retry 2 of 3");
        let err = crate::error!(log, || "built anyway");
        assert_eq!(err.message(), "built anyway");
        assert!(mem.records().is_empty());
    }

    #[test]
    fn critical_logs_with_stack() {
        let (log, mem) = setup(Level::Error);
        let err = crate::critical!(log, "state {}", "corrupt");
        assert_eq!(err.message(), "state corrupt");
        assert!(mem.messages()[0].starts_with("state corrupt\n"));
        assert_eq!(mem.records()[0].level(), Level::Critical);
    }
}
