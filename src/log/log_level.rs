use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Serialize, Serializer};

use crate::error::ConfigError;

/// Defines the severity levels for log records.
///
/// Ordering is by [`Level::rank`], never by the order names appear in any
/// configuration syntax. `Access` sits between `Info` and `Warning` so that
/// an access log filter at `ACCESS` skips ordinary informational traffic
/// while still receiving warnings and errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Level {
    /// Very fine-grained tracing of internals.
    Finest,
    /// Fine-grained tracing.
    Fine,
    /// Designates fine-grained informational events that are most useful to debug an application.
    Debug,
    /// Designates execution tracing at a coarser grain than `Debug`.
    Trace,
    /// Designates informational messages that highlight the progress of the application.
    Info,
    /// Request/access log entries.
    Access,
    /// Designates potentially harmful situations.
    Warning,
    /// Designates error events that might still allow the application to continue running.
    Error,
    /// Designates failures the application cannot recover from locally.
    Critical,
}

impl Level {
    pub const ALL: [Level; 9] = [
        Level::Finest,
        Level::Fine,
        Level::Debug,
        Level::Trace,
        Level::Info,
        Level::Access,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Numeric rank used for every threshold comparison.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Level::Finest => 0,
            Level::Fine => 1,
            Level::Debug => 2,
            Level::Trace => 3,
            Level::Info => 4,
            Level::Access => 5,
            Level::Warning => 6,
            Level::Error => 7,
            Level::Critical => 8,
        }
    }

    /// Configuration name, e.g. `WARNING`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Level::Finest => "FINEST",
            Level::Fine => "FINE",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
            Level::Info => "INFO",
            Level::Access => "ACCESS",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        }
    }

    /// Fixed-width code rendered by the `%L` format token.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Level::Finest => "FNST",
            Level::Fine => "FINE",
            Level::Debug => "DEBG",
            Level::Trace => "TRAC",
            Level::Info => "INFO",
            Level::Access => "ACCS",
            Level::Warning => "WARN",
            Level::Error => "EROR",
            Level::Critical => "CRIT",
        }
    }
}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Level::ALL
            .into_iter()
            .find(|lvl| lvl.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ConfigError::UnknownLevel(wanted.to_string()))
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
