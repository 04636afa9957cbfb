use std::io::{self, Write};

use parking_lot::Mutex;

use crate::{
    log::{
        log_level::Level,
        log_record::Record,
        log_writer::{CloseReport, LogWriter},
    },
    writers::format::FormatTemplate,
};

type Stream = Box<dyn Write + Send>;

/// Synchronous, unbuffered writer to the process's standard streams.
///
/// Records are rendered and written on the caller's thread. When a
/// `stderr_level` is set, records at or above it go to stderr and the rest to
/// stdout; otherwise everything goes to stdout.
pub struct ConsoleWriter {
    format: FormatTemplate,
    stderr_level: Option<Level>,
    out: Mutex<Stream>,
    err: Mutex<Stream>,
}

impl ConsoleWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_streams(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Uses the given streams in place of stdout/stderr.
    #[must_use]
    pub fn with_streams(out: Stream, err: Stream) -> Self {
        Self {
            format: FormatTemplate::default(),
            stderr_level: None,
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    #[must_use]
    pub fn format(mut self, format: FormatTemplate) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn stderr_level(mut self, level: Option<Level>) -> Self {
        self.stderr_level = level;
        self
    }
}

impl Default for ConsoleWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogWriter for ConsoleWriter {
    fn accept(&self, record: Record) {
        let mut line = self.format.render(&record);
        line.push('\n');

        let to_err = self.stderr_level.is_some_and(|lvl| record.level() >= lvl);
        let mut stream = if to_err { self.err.lock() } else { self.out.lock() };
        // Console output is best effort; a closed pipe must not fail the caller.
        let _ = stream.write_all(line.as_bytes());
        let _ = stream.flush();
    }

    fn close(&self) -> CloseReport {
        CloseReport::default()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Shared {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    #[test]
    fn splits_streams_by_level() {
        let (out, err) = (Shared::default(), Shared::default());
        let writer = ConsoleWriter::with_streams(Box::new(out.clone()), Box::new(err.clone()))
            .format(FormatTemplate::new("%L %M"))
            .stderr_level(Some(Level::Error));

        writer.accept(Record::new(Level::Info, "app", "hello"));
        writer.accept(Record::new(Level::Error, "app", "broken"));

        assert_eq!(out.text(), "INFO hello\n");
        assert_eq!(err.text(), "EROR broken\n");
    }

    #[test]
    fn everything_to_stdout_by_default() {
        let (out, err) = (Shared::default(), Shared::default());
        let writer = ConsoleWriter::with_streams(Box::new(out.clone()), Box::new(err.clone()))
            .format(FormatTemplate::new("%M"));

        writer.accept(Record::new(Level::Critical, "app", "x"));
        assert!(writer.close().is_clean());
        assert_eq!(out.text(), "x\n");
        assert!(err.text().is_empty());
    }
}
