use std::{backtrace::Backtrace, collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;

use crate::{
    error::LoggedError,
    log::{
        filter::Filter,
        log_level::Level,
        log_record::Record,
        log_writer::{CloseReport, LogWriter},
    },
    writers::ConsoleWriter,
};

/// Named collection of filters; the dispatch fan-out point.
///
/// Every `log*` call runs on the caller's thread up to the point where the
/// record is handed to each accepting writer. The filter map is guarded by a
/// reader-writer lock so configuration reloads can race with logging; the
/// lock is released before any message is built or any writer is called.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use rotalog::{Level, Logger, writers::MemoryWriter};
///
/// let logger = Logger::new();
/// let mem = Arc::new(MemoryWriter::new());
/// logger.add_filter("mem", Level::Info, mem.clone());
///
/// logger.log(Level::Debug, "app", "dropped");
/// logger.log(Level::Info, "app", "kept");
/// assert_eq!(mem.messages(), ["kept"]);
/// ```
#[derive(Default)]
pub struct Logger {
    filters: RwLock<HashMap<String, Filter>>,
}

impl Logger {
    /// Creates a logger with no filters; every call is a no-op until one is added.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger with a single console filter named `stdout`.
    #[must_use]
    pub fn with_console(level: Level) -> Self {
        let logger = Self::new();
        logger.add_filter("stdout", level, Arc::new(ConsoleWriter::new()));
        logger
    }

    /// Inserts `writer` under `name` with the given threshold and no excludes.
    pub fn add_filter(&self, name: impl Into<String>, level: Level, writer: Arc<dyn LogWriter>) {
        self.insert(name, Filter::new(level, writer));
    }

    /// Inserts or replaces the filter stored under `name`.
    ///
    /// A replaced writer that no other filter references is closed.
    pub fn insert(&self, name: impl Into<String>, filter: Filter) {
        let replaced = {
            let mut filters = self.filters.write();
            let old = filters.insert(name.into(), filter);
            old.filter(|old| {
                !filters
                    .values()
                    .any(|f| Arc::ptr_eq(f.writer(), old.writer()))
            })
        };
        if let Some(old) = replaced {
            report_losses("replace", old.writer().close());
        }
    }

    /// Names of the installed filters, sorted.
    #[must_use]
    pub fn filter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.filters.read().keys().cloned().collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.read().is_empty()
    }

    /// `true` iff some filter's threshold is at or below `level`.
    #[must_use]
    pub fn is_enabled(&self, level: Level) -> bool {
        self.filters.read().values().any(|f| level >= f.level())
    }

    pub fn is_finest_enabled(&self) -> bool {
        self.is_enabled(Level::Finest)
    }

    pub fn is_fine_enabled(&self) -> bool {
        self.is_enabled(Level::Fine)
    }

    pub fn is_debug_enabled(&self) -> bool {
        self.is_enabled(Level::Debug)
    }

    pub fn is_trace_enabled(&self) -> bool {
        self.is_enabled(Level::Trace)
    }

    pub fn is_info_enabled(&self) -> bool {
        self.is_enabled(Level::Info)
    }

    pub fn is_warn_enabled(&self) -> bool {
        self.is_enabled(Level::Warning)
    }

    pub fn is_error_enabled(&self) -> bool {
        self.is_enabled(Level::Error)
    }

    /// Sends a ready-made message from `source` to every accepting filter.
    pub fn log(&self, level: Level, source: &str, message: impl Into<String>) {
        let writers = self.accepting(level, source);
        if !writers.is_empty() {
            deliver(writers, Record::new(level, source, message));
        }
    }

    /// Formats `args` once, and only if at least one filter accepts.
    pub fn logf(&self, level: Level, source: &str, args: fmt::Arguments<'_>) {
        self.log_with(level, source, || args.to_string());
    }

    /// Runs `build` at most once, and only if at least one filter accepts
    /// `level` from `source`.
    ///
    /// A panic raised by `build` propagates to the caller.
    pub fn log_with<F>(&self, level: Level, source: &str, build: F)
    where
        F: FnOnce() -> String,
    {
        let writers = self.accepting(level, source);
        if !writers.is_empty() {
            deliver(writers, Record::new(level, source, build()));
        }
    }

    /// Logs `message` and returns it as an error value.
    ///
    /// Used by the `warn!`/`error!` entry points; the message has already
    /// been built because the caller needs the error either way.
    pub fn report(&self, level: Level, source: &str, message: String) -> LoggedError {
        self.log(level, source, message.as_str());
        LoggedError::new(message)
    }

    /// Logs `message` at `Critical` with the current call stack appended,
    /// then returns the bare message as an error value.
    ///
    /// The stack is captured only when a filter will receive the record.
    pub fn critical(&self, source: &str, message: String) -> LoggedError {
        self.log_with(Level::Critical, source, || {
            format!("{message}\n{}", Backtrace::force_capture())
        });
        LoggedError::new(message)
    }

    /// Logs `message` at `Critical`, closes every writer so queued records
    /// reach their files, then panics with `message`.
    pub fn crash(&self, source: &str, message: String) -> ! {
        self.log_and_close(Level::Critical, source, &message);
        panic!("{message}");
    }

    /// Logs `message` at `Error`, closes every writer, then exits the process
    /// with status 0.
    pub fn exit(&self, source: &str, message: String) -> ! {
        self.log_and_close(Level::Error, source, &message);
        std::process::exit(0);
    }

    fn log_and_close(&self, level: Level, source: &str, message: &str) -> CloseReport {
        self.log(level, source, message);
        self.close()
    }

    /// Closes every distinct writer exactly once and empties the filter map.
    ///
    /// Safe to call repeatedly and on a logger without filters.
    pub fn close(&self) -> CloseReport {
        let drained: Vec<Filter> = {
            let mut filters = self.filters.write();
            filters.drain().map(|(_, f)| f).collect()
        };

        let report = close_writers(drained, &[]);
        report_losses("close", report);
        report
    }

    /// Swaps the whole filter map for `filters` in one step, then closes the
    /// writers no longer referenced. Later entries win on duplicate names.
    pub(crate) fn replace_all(&self, filters: Vec<(String, Filter)>) -> CloseReport {
        let mut incoming = HashMap::with_capacity(filters.len());
        let mut retired = Vec::new();
        for (name, filter) in filters {
            retired.extend(incoming.insert(name, filter));
        }

        let live: Vec<Arc<dyn LogWriter>> =
            incoming.values().map(|f| Arc::clone(f.writer())).collect();
        let previous = std::mem::replace(&mut *self.filters.write(), incoming);
        retired.extend(previous.into_values());

        let report = close_writers(retired, &live);
        report_losses("reload", report);
        report
    }

    fn accepting(&self, level: Level, source: &str) -> Vec<Arc<dyn LogWriter>> {
        self.filters
            .read()
            .values()
            .filter(|f| f.accepts(level, source))
            .map(|f| Arc::clone(f.writer()))
            .collect()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("filters", &*self.filters.read())
            .finish()
    }
}

fn deliver(mut writers: Vec<Arc<dyn LogWriter>>, record: Record) {
    let last = writers.pop();
    for writer in writers {
        writer.accept(record.clone());
    }
    if let Some(writer) = last {
        writer.accept(record);
    }
}

/// Closes each distinct writer of `filters` once, skipping any in `keep`.
fn close_writers(filters: Vec<Filter>, keep: &[Arc<dyn LogWriter>]) -> CloseReport {
    let mut closed: Vec<Arc<dyn LogWriter>> = Vec::with_capacity(filters.len());
    let mut report = CloseReport::default();
    for filter in filters {
        let writer = filter.writer();
        if keep.iter().chain(&closed).any(|w| Arc::ptr_eq(w, writer)) {
            continue;
        }
        report += writer.close();
        closed.push(Arc::clone(writer));
    }
    report
}

fn report_losses(during: &str, report: CloseReport) {
    if !report.is_clean() {
        tracing::warn!(during, %report, "log records were not delivered");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::writers::MemoryWriter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn logger_with(level: Level) -> (Logger, Arc<MemoryWriter>) {
        let logger = Logger::new();
        let mem = Arc::new(MemoryWriter::new());
        logger.add_filter("mem", level, mem.clone());
        (logger, mem)
    }

    #[test]
    fn closure_not_called_when_no_filter_listens() {
        let (logger, mem) = logger_with(Level::Error);
        let calls = AtomicUsize::new(0);

        logger.log_with(Level::Info, "app", || {
            calls.fetch_add(1, Ordering::SeqCst);
            "expensive".to_string()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(mem.records().is_empty());
    }

    #[test]
    fn closure_called_once_for_many_filters() {
        let (logger, mem) = logger_with(Level::Debug);
        let other = Arc::new(MemoryWriter::new());
        logger.add_filter("other", Level::Info, other.clone());
        let calls = AtomicUsize::new(0);

        logger.log_with(Level::Warning, "app", || {
            calls.fetch_add(1, Ordering::SeqCst);
            "built".to_string()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(mem.messages(), ["built"]);
        assert_eq!(other.messages(), ["built"]);
    }

    #[test]
    fn logf_formats_arguments() {
        let (logger, mem) = logger_with(Level::Finest);
        logger.logf(Level::Info, "app", format_args!("{} + {} = {}", 1, 2, 3));
        assert_eq!(mem.messages(), ["1 + 2 = 3"]);
        assert_eq!(mem.records()[0].source(), "app");
    }

    #[test]
    fn filters_apply_their_own_excludes() {
        let logger = Logger::new();
        let all = Arc::new(MemoryWriter::new());
        let quiet = Arc::new(MemoryWriter::new());
        logger.add_filter("all", Level::Debug, all.clone());
        logger.insert(
            "quiet",
            Filter::new(Level::Debug, quiet.clone()).with_excludes(["noisy"]),
        );

        logger.log(Level::Info, "noisy::loop", "tick");
        logger.log(Level::Info, "app", "hello");

        assert_eq!(all.messages(), ["tick", "hello"]);
        assert_eq!(quiet.messages(), ["hello"]);
    }

    #[test]
    fn is_enabled_checks_any_threshold() {
        let (logger, _mem) = logger_with(Level::Warning);
        assert!(!logger.is_info_enabled());
        assert!(logger.is_warn_enabled());
        assert!(logger.is_error_enabled());
        assert!(!Logger::new().is_enabled(Level::Critical));
    }

    #[test]
    fn replacing_a_filter_closes_the_old_writer() {
        let (logger, first) = logger_with(Level::Info);
        let second = Arc::new(MemoryWriter::new());
        logger.add_filter("mem", Level::Info, second.clone());

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_eq!(logger.filter_names(), ["mem"]);
    }

    #[test]
    fn shared_writer_closed_once() {
        let logger = Logger::new();
        let mem = Arc::new(MemoryWriter::new());
        logger.add_filter("a", Level::Info, mem.clone());
        logger.add_filter("b", Level::Error, mem.clone());

        logger.close();
        assert_eq!(mem.close_count(), 1);
    }

    #[test]
    fn close_is_idempotent() {
        let (logger, mem) = logger_with(Level::Info);
        assert!(logger.close().is_clean());
        assert!(logger.close().is_clean());
        assert!(logger.is_empty());
        assert!(mem.is_closed());

        logger.log(Level::Error, "app", "after close");
        assert!(mem.records().is_empty());
        assert!(Logger::new().close().is_clean());
    }

    #[test]
    fn report_returns_message_as_error() {
        let (logger, mem) = logger_with(Level::Finest);
        let err = logger.report(Level::Error, "app", "disk full".into());
        assert_eq!(err.to_string(), "disk full");
        assert_eq!(mem.messages(), ["disk full"]);
    }

    #[test]
    fn critical_appends_stack_but_error_is_bare() {
        let (logger, mem) = logger_with(Level::Finest);
        let err = logger.critical("app", "boom".into());
        assert_eq!(err.message(), "boom");

        let logged = mem.messages();
        assert_eq!(logged.len(), 1);
        assert!(logged[0].starts_with("boom\n"));
        assert!(logged[0].len() > "boom\n".len());
    }

    #[test]
    fn replace_all_keeps_reused_writers_open() {
        let (logger, kept) = logger_with(Level::Info);
        let dropped = Arc::new(MemoryWriter::new());
        logger.add_filter("old", Level::Info, dropped.clone());

        let shadowed = Arc::new(MemoryWriter::new());
        logger.replace_all(vec![
            ("a".into(), Filter::new(Level::Debug, shadowed.clone())),
            ("a".into(), Filter::new(Level::Debug, kept.clone())),
        ]);

        assert_eq!(logger.filter_names(), ["a"]);
        assert!(dropped.is_closed());
        assert!(shadowed.is_closed());
        assert!(!kept.is_closed());

        logger.log(Level::Debug, "app", "after reload");
        assert_eq!(kept.messages(), ["after reload"]);
    }

    #[test]
    fn crash_flushes_queued_records_before_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Logger::new();
        let file = crate::writers::FileWriter::builder(&path)
            .format(crate::writers::FormatTemplate::new("%L %M"))
            .build()
            .unwrap();
        logger.add_filter("file", Level::Info, Arc::new(file));

        logger.log(Level::Info, "app", "last words");
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            logger.crash("app", "state corrupt".into())
        }))
        .unwrap_err();

        assert_eq!(payload.downcast_ref::<String>().unwrap(), "state corrupt");
        assert!(logger.is_empty());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "INFO last words\nCRIT state corrupt\n"
        );
    }

    #[test]
    fn exit_path_logs_at_error_then_closes() {
        let (logger, mem) = logger_with(Level::Finest);
        let report = logger.log_and_close(Level::Error, "app", "shutting down");
        assert!(report.is_clean());
        assert_eq!(mem.messages(), ["shutting down"]);
        assert_eq!(mem.records()[0].level(), Level::Error);
        assert!(mem.is_closed());
    }
}
