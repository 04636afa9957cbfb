use std::{fmt, sync::Arc};

use crate::log::{log_level::Level, log_writer::LogWriter};

/// Pairs a threshold and exclude patterns with one writer.
///
/// An exclude pattern matches a source tag when the tag starts with it, so
/// `"app::db"` silences `app::db` and `app::db::pool`. Empty patterns never
/// match.
#[derive(Clone)]
pub struct Filter {
    level: Level,
    writer: Arc<dyn LogWriter>,
    excludes: Vec<String>,
}

impl Filter {
    pub fn new(level: Level, writer: Arc<dyn LogWriter>) -> Self {
        Self {
            level,
            writer,
            excludes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes
            .into_iter()
            .map(Into::into)
            .filter(|p: &String| !p.is_empty())
            .collect();
        self
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub(crate) fn writer(&self) -> &Arc<dyn LogWriter> {
        &self.writer
    }

    #[must_use]
    pub fn is_excluded(&self, source: &str) -> bool {
        self.excludes.iter().any(|p| source.starts_with(p.as_str()))
    }

    /// `true` iff `level` meets the threshold and `source` is not excluded.
    #[must_use]
    pub fn accepts(&self, level: Level, source: &str) -> bool {
        level >= self.level && !self.is_excluded(source)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("level", &self.level)
            .field("excludes", &self.excludes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::writers::MemoryWriter;

    fn filter(level: Level, excludes: &[&str]) -> Filter {
        Filter::new(level, Arc::new(MemoryWriter::new())).with_excludes(excludes.iter().copied())
    }

    #[test]
    fn threshold_is_inclusive() {
        let f = filter(Level::Info, &[]);
        assert!(!f.accepts(Level::Debug, "app"));
        assert!(f.accepts(Level::Info, "app"));
        assert!(f.accepts(Level::Critical, "app"));
    }

    #[test]
    fn exclude_matches_source_prefix() {
        let f = filter(Level::Finest, &["noisy", "app::db"]);
        assert!(!f.accepts(Level::Error, "noisy"));
        assert!(!f.accepts(Level::Error, "app::db::pool"));
        assert!(f.accepts(Level::Error, "app::http"));
    }

    #[test]
    fn empty_pattern_is_ignored() {
        let f = filter(Level::Finest, &["", "x"]);
        assert_eq!(f.excludes(), ["x".to_string()]);
        assert!(f.accepts(Level::Info, "app"));
    }

    #[test]
    fn raising_threshold_only_shrinks_accepted_set() {
        for (i, low) in Level::ALL.iter().enumerate() {
            for high in &Level::ALL[i..] {
                let lo = filter(*low, &["skip"]);
                let hi = filter(*high, &["skip"]);
                for lvl in Level::ALL {
                    for src in ["skip::me", "keep"] {
                        if hi.accepts(lvl, src) {
                            assert!(lo.accepts(lvl, src));
                        }
                    }
                }
            }
        }
    }
}
