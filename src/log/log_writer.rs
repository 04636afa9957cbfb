use std::{fmt, ops::AddAssign};

use crate::log::log_record::Record;

/// A sink that consumes accepted records.
///
/// Implementations must never fail the caller: I/O problems are handled
/// (and counted) inside the writer.
pub trait LogWriter: Send + Sync {
    /// Hands one record to the writer.
    fn accept(&self, record: Record);

    /// Releases the writer's resources after delivering everything accepted
    /// so far. Calling it again is a no-op that returns an empty report.
    fn close(&self) -> CloseReport;
}

/// Summary of records a writer could not deliver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloseReport {
    /// Queued records abandoned because the drain deadline expired.
    pub discarded: u64,
    /// Records offered after the writer was closed.
    pub rejected: u64,
    /// Records lost to I/O failures (write, rotate or send).
    pub failed: u64,
}

impl CloseReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.discarded == 0 && self.rejected == 0 && self.failed == 0
    }
}

impl AddAssign for CloseReport {
    fn add_assign(&mut self, rhs: Self) {
        self.discarded += rhs.discarded;
        self.rejected += rhs.rejected;
        self.failed += rhs.failed;
    }
}

impl fmt::Display for CloseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} discarded, {} rejected, {} failed",
            self.discarded, self.rejected, self.failed
        )
    }
}
