use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, SyncSender},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Mutex, RwLock};

use crate::{
    error::WriterError,
    log::{log_record::Record, log_writer::CloseReport},
};

/// Flush to disk every 1000 records even while the queue stays busy.
const FLUSH_BATCH_SIZE: u32 = 1_000;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1_024;
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Work performed on the background thread for each queued record.
///
/// The sink is owned by the worker thread alone, so it needs no locking.
pub(crate) trait RecordSink: Send + 'static {
    fn write_record(&mut self, record: &Record) -> Result<(), WriterError>;

    fn flush(&mut self) -> Result<(), WriterError>;

    /// Flushes and releases the underlying resource.
    fn finish(&mut self) -> Result<(), WriterError>;
}

/// Queue sizing and shutdown behaviour for background writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// Bounded queue length; a full queue blocks the caller.
    pub capacity: usize,
    /// Longest `close` waits for queued records before abandoning them.
    pub drain_timeout: Duration,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    pending: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    rejected: AtomicU64,
    abandon: AtomicBool,
}

/// Bounded, single-consumer queue drained by one dedicated thread.
///
/// # Architecture
///
/// 1. **Producers**: logging callers call [`submit`](Self::submit).
/// 2. **Queue**: a bounded `sync_channel` keeps submission order.
/// 3. **Consumer**: the worker thread hands each record to its sink and
///    flushes in batches or whenever the queue runs dry.
/// 4. **Shutdown**: [`close`](Self::close) disconnects the queue, waits up to
///    the drain timeout, and reports what could not be delivered.
pub(crate) struct QueuedWriter {
    tx: RwLock<Option<SyncSender<Record>>>,
    closing: AtomicBool,
    counters: Arc<Counters>,
    done_rx: Mutex<Option<Receiver<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    drain_timeout: Duration,
}

impl QueuedWriter {
    /// Spawns the worker thread that owns `sink`.
    ///
    /// If the thread cannot be spawned the writer starts closed and every
    /// record is rejected.
    pub(crate) fn spawn<S: RecordSink>(name: &str, sink: S, options: QueueOptions) -> Self {
        let (tx, rx) = mpsc::sync_channel::<Record>(options.capacity.max(1));
        let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
        let counters = Arc::new(Counters::default());

        let worker_counters = Arc::clone(&counters);
        let thread = thread::Builder::new()
            .name(format!("rotalog-{name}"))
            .spawn(move || {
                drain(sink, rx, &worker_counters);
                let _ = done_tx.send(());
            });

        let (tx, closing, thread) = match thread {
            Ok(handle) => (Some(tx), false, Some(handle)),
            Err(e) => {
                tracing::error!(writer = name, error = %e, "could not spawn log writer thread");
                (None, true, None)
            }
        };

        Self {
            tx: RwLock::new(tx),
            closing: AtomicBool::new(closing),
            counters,
            done_rx: Mutex::new(Some(done_rx)),
            thread: Mutex::new(thread),
            drain_timeout: options.drain_timeout,
        }
    }

    /// Queues `record`, blocking while the queue is full.
    pub(crate) fn submit(&self, record: Record) {
        if self.closing.load(Ordering::Acquire) {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            return;
        }
        {
            let guard = self.tx.read();
            let Some(tx) = guard.as_ref() else {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return;
            };
            self.counters.pending.fetch_add(1, Ordering::AcqRel);
            if tx.send(record).is_err() {
                self.counters.pending.fetch_sub(1, Ordering::AcqRel);
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            }
        }
        // A close that gave up while this call was blocked left the sender
        // behind; the last blocked caller out disconnects the worker.
        if self.closing.load(Ordering::Acquire) {
            self.release_sender();
        }
    }

    /// Disconnects the worker unless a blocked sender still holds the queue.
    fn release_sender(&self) {
        if let Some(mut tx) = self.tx.try_write() {
            drop(tx.take());
        }
    }

    /// Records queued but not yet handled by the worker.
    pub(crate) fn pending(&self) -> u64 {
        self.counters.pending.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) -> CloseReport {
        if self.closing.swap(true, Ordering::AcqRel) {
            return CloseReport::default();
        }
        let deadline = Instant::now() + self.drain_timeout;

        // Senders blocked on a full queue hold the read lock; they only
        // return once the worker makes room.
        match self.tx.try_write_for(self.drain_timeout) {
            Some(mut tx) => drop(tx.take()),
            None => return self.abandon(),
        }

        let Some(done_rx) = self.done_rx.lock().take() else {
            return self.report();
        };
        match done_rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(handle) = self.thread.lock().take() {
                    if handle.join().is_err() {
                        tracing::error!("log writer thread panicked");
                    }
                }
                let lost = self.counters.pending.swap(0, Ordering::AcqRel);
                self.counters.discarded.fetch_add(lost, Ordering::AcqRel);
                self.report()
            }
            Err(RecvTimeoutError::Timeout) => self.abandon(),
        }
    }

    fn abandon(&self) -> CloseReport {
        self.counters.abandon.store(true, Ordering::Release);
        self.release_sender();
        let pending = self.counters.pending.load(Ordering::Acquire);
        tracing::warn!(
            pending,
            timeout_ms = self.drain_timeout.as_millis() as u64,
            "log writer did not drain in time; abandoning queued records"
        );
        CloseReport {
            discarded: pending,
            ..self.report()
        }
    }

    fn report(&self) -> CloseReport {
        CloseReport {
            discarded: self.counters.discarded.load(Ordering::Acquire),
            rejected: self.counters.rejected.load(Ordering::Acquire),
            failed: self.counters.failed.load(Ordering::Acquire),
        }
    }
}

impl Drop for QueuedWriter {
    fn drop(&mut self) {
        self.close();
    }
}

fn drain<S: RecordSink>(mut sink: S, rx: Receiver<Record>, counters: &Counters) {
    let mut since_flush: u32 = 0;

    while let Ok(record) = rx.recv() {
        if counters.abandon.load(Ordering::Acquire) {
            counters.discarded.fetch_add(1, Ordering::AcqRel);
            counters.pending.fetch_sub(1, Ordering::AcqRel);
            continue;
        }

        if let Err(e) = sink.write_record(&record) {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "dropping log record");
        }
        since_flush = since_flush.wrapping_add(1);

        // Decrement only after the write so `pending == 0` means on disk.
        let left = counters
            .pending
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        if left == 0 || since_flush >= FLUSH_BATCH_SIZE {
            if let Err(e) = sink.flush() {
                tracing::warn!(error = %e, "log flush failed");
            }
            since_flush = 0;
        }
    }

    if let Err(e) = sink.finish() {
        tracing::warn!(error = %e, "log writer did not close cleanly");
    }
}
