//! rotalog is a leveled logging library built around named filters.
//!
//! A [`Logger`] holds any number of filters. Each filter pairs a threshold
//! [`Level`] and a list of excluded source prefixes with a writer: console,
//! rotating text file, rotating XML file or network socket. A record is
//! delivered to every filter that accepts it.
//!
//! File writers hand records to a bounded queue drained by one background
//! thread per writer, and rotate by line count, size or calendar day.
//!
//! ```rust
//! use std::sync::Arc;
//! use rotalog::{Level, Logger, writers::MemoryWriter};
//!
//! let logger = Logger::new();
//! let mem = Arc::new(MemoryWriter::new());
//! logger.add_filter("mem", Level::Info, mem.clone());
//!
//! rotalog::info!(logger, "listening on {}", 8080);
//! rotalog::debug!(logger, || "not built");
//! let err = rotalog::error!(logger, "bind failed");
//!
//! assert_eq!(err.message(), "bind failed");
//! assert_eq!(mem.messages(), ["listening on 8080", "bind failed"]);
//! logger.close();
//! ```

/// Filter descriptions, INI/JSON parsing and the loader.
pub mod config;
/// Error types shared by the crate.
pub mod error;
/// Levels, records, filters and the logger itself.
pub mod log;
/// Console, file, XML, socket and in-memory writers.
pub mod writers;

pub use config::{FileSetup, FilterSpec, Loader};
pub use error::{ConfigError, LoggedError, WriterError};
pub use log::{
    CloseReport, Filter, Level, LogWriter, Logger, Record, RecoverMessage, global, init_global,
    recover, recover_and_resume,
};
