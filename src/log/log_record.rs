use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;

use crate::log::log_level::Level;

/// Represents a single emitted log event.
///
/// A record is built once per accepted log call and never mutated; each
/// accepting writer receives its own clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    level: Level,
    created: DateTime<Local>,
    source: String,
    message: String,
}

impl Record {
    /// Creates a record stamped with the current local time.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity of the event.
    /// * `source` - Component identifier, typically `module_path!()`.
    /// * `message` - The rendered message text.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rotalog::{Level, Record};
    ///
    /// let rec = Record::new(Level::Info, "app::db", "connection established");
    /// assert_eq!(rec.source(), "app::db");
    /// ```
    pub fn new(level: Level, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_created(level, Local::now(), source, message)
    }

    /// Creates a record with an explicit creation time.
    pub fn with_created(
        level: Level,
        created: DateTime<Local>,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            level,
            created,
            source: source.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn created(&self) -> DateTime<Local> {
        self.created
    }

    /// Local calendar day the record belongs to; drives daily rotation.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.created.date_naive()
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
