use std::path::{Path, PathBuf};

use crate::{
    error::WriterError,
    log::{
        log_record::Record,
        log_writer::{CloseReport, LogWriter},
    },
    writers::{
        queued_worker::{QueueOptions, QueuedWriter, RecordSink},
        rotating_file::{RotatingFile, RotationPolicy, count_records},
    },
};

/// Rotating file writer that stores one `<record>` element per record.
///
/// Uses the same queueing and rotation model as
/// [`FileWriter`](crate::writers::FileWriter), counting records instead of
/// lines:
///
/// ```xml
/// <record level="INFO">
///     <timestamp>2024-03-09T07:05:02.120+01:00</timestamp>
///     <source>app::db</source>
///     <message>connected</message>
/// </record>
/// ```
pub struct XmlFileWriter {
    path: PathBuf,
    queue: QueuedWriter,
}

impl XmlFileWriter {
    pub fn builder(path: impl Into<PathBuf>) -> XmlFileWriterBuilder {
        XmlFileWriterBuilder {
            path: path.into(),
            policy: RotationPolicy::default(),
            queue: QueueOptions::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogWriter for XmlFileWriter {
    fn accept(&self, record: Record) {
        self.queue.submit(record);
    }

    fn close(&self) -> CloseReport {
        self.queue.close()
    }
}

#[derive(Debug, Clone)]
pub struct XmlFileWriterBuilder {
    path: PathBuf,
    policy: RotationPolicy,
    queue: QueueOptions,
}

impl XmlFileWriterBuilder {
    #[must_use]
    pub fn max_records(mut self, records: u64) -> Self {
        self.policy.max_units = records;
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

    /// # Errors
    ///
    /// Returns [`WriterError`] if the file cannot be opened or rotated.
    pub fn build(self) -> Result<XmlFileWriter, WriterError> {
        let file = RotatingFile::open(&self.path, self.policy, count_records)?;
        Ok(XmlFileWriter {
            queue: QueuedWriter::spawn("xml", XmlSink { file }, self.queue),
            path: self.path,
        })
    }
}

struct XmlSink {
    file: RotatingFile,
}

impl RecordSink for XmlSink {
    fn write_record(&mut self, record: &Record) -> Result<(), WriterError> {
        self.file.write(render_element(record).as_bytes(), 1, record.day())
    }

    fn flush(&mut self) -> Result<(), WriterError> {
        self.file.flush()
    }

    fn finish(&mut self) -> Result<(), WriterError> {
        self.file.finish()
    }
}

fn render_element(record: &Record) -> String {
    format!(
        "<record level=\"{}\">\n\t<timestamp>{}</timestamp>\n\t<source>{}</source>\n\t<message>{}</message>\n</record>\n",
        record.level(),
        record.created().to_rfc3339(),
        escape(record.source()),
        escape(record.message()),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
