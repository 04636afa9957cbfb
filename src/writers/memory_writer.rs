use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::log::{
    log_record::Record,
    log_writer::{CloseReport, LogWriter},
};

/// Keeps every accepted record in memory.
///
/// Handy for tests and for applications that surface recent log lines in a
/// UI. Records offered after [`close`](LogWriter::close) are rejected.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    records: Mutex<Vec<Record>>,
    closed: AtomicBool,
    close_calls: AtomicU64,
    rejected: AtomicU64,
}

impl MemoryWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records accepted so far.
    #[must_use]
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of times `close` was called, including no-op repeats.
    #[must_use]
    pub fn close_count(&self) -> u64 {
        self.close_calls.load(Ordering::Relaxed)
    }
}

impl LogWriter for MemoryWriter {
    fn accept(&self, record: Record) {
        if self.is_closed() {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.records.lock().push(record);
    }

    fn close(&self) -> CloseReport {
        self.close_calls.fetch_add(1, Ordering::Relaxed);
        if self.closed.swap(true, Ordering::AcqRel) {
            return CloseReport::default();
        }
        CloseReport {
            rejected: self.rejected.load(Ordering::Relaxed),
            ..CloseReport::default()
        }
    }
}
