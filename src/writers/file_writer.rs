use std::path::{Path, PathBuf};

use crate::{
    error::WriterError,
    log::{
        log_record::Record,
        log_writer::{CloseReport, LogWriter},
    },
    writers::{
        format::FormatTemplate,
        queued_worker::{QueueOptions, QueuedWriter, RecordSink},
        rotating_file::{RotatingFile, RotationPolicy, count_lines, line_units},
    },
};

/// Rotating text file writer.
///
/// Records are rendered through a [`FormatTemplate`] on a dedicated worker
/// thread; the caller only pays for queueing. Output order matches the
/// order in which [`accept`](LogWriter::accept) was called.
///
/// # Example
///
/// ```rust,no_run
/// use rotalog::writers::FileWriter;
///
/// let writer = FileWriter::builder("logs/app.log")
///     .max_lines(100_000)
///     .max_size(10 * 1024 * 1024)
///     .daily(true)
///     .rotate(true)
///     .build()?;
/// # Ok::<(), rotalog::WriterError>(())
/// ```
pub struct FileWriter {
    path: PathBuf,
    queue: QueuedWriter,
}

impl FileWriter {
    pub fn builder(path: impl Into<PathBuf>) -> FileWriterBuilder {
        FileWriterBuilder {
            path: path.into(),
            format: FormatTemplate::default(),
            policy: RotationPolicy::default(),
            queue: QueueOptions::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records accepted but not yet written.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.queue.pending()
    }
}

impl LogWriter for FileWriter {
    fn accept(&self, record: Record) {
        self.queue.submit(record);
    }

    fn close(&self) -> CloseReport {
        self.queue.close()
    }
}

#[derive(Debug, Clone)]
pub struct FileWriterBuilder {
    path: PathBuf,
    format: FormatTemplate,
    policy: RotationPolicy,
    queue: QueueOptions,
}

impl FileWriterBuilder {
    #[must_use]
    pub fn format(mut self, format: FormatTemplate) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn max_lines(mut self, lines: u64) -> Self {
        self.policy.max_units = lines;
        self
    }

    #[must_use]
    pub fn max_size(mut self, bytes: u64) -> Self {
        self.policy.max_size = bytes;
        self
    }

    #[must_use]
    pub fn daily(mut self, daily: bool) -> Self {
        self.policy.daily = daily;
        self
    }

    #[must_use]
    pub fn rotate(mut self, rotate: bool) -> Self {
        self.policy.rotate = rotate;
        self
    }

    #[must_use]
    pub fn queue(mut self, options: QueueOptions) -> Self {
        self.queue = options;
        self
    }

    /// Opens (or reuses) the file and starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`WriterError`] if the file cannot be opened or an existing
    /// file cannot be rotated out of the way.
    pub fn build(self) -> Result<FileWriter, WriterError> {
        let file = RotatingFile::open(&self.path, self.policy, count_lines)?;
        let sink = TextSink {
            file,
            format: self.format,
        };
        let name = self
            .path
            .file_name()
            .map_or_else(|| "file".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(FileWriter {
            queue: QueuedWriter::spawn(&name, sink, self.queue),
            path: self.path,
        })
    }
}

struct TextSink {
    file: RotatingFile,
    format: FormatTemplate,
}

impl RecordSink for TextSink {
    fn write_record(&mut self, record: &Record) -> Result<(), WriterError> {
        let mut line = self.format.render(record);
        line.push('\n');
        let bytes = line.as_bytes();
        self.file.write(bytes, line_units(bytes), record.day())
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        self.file.flush()
    }

    fn finish(&mut self) -> Result<(), WriterError> {
        self.file.finish()
    }
}
