//! Writers: the sinks filters deliver accepted records to.
//!
//! Console and socket writers do their I/O on the caller's thread. The two
//! file writers hand records to a bounded queue drained by one worker
//! thread per writer instance.

pub mod console_writer;
pub mod file_writer;
pub mod format;
pub mod memory_writer;
pub mod queued_worker;
pub mod rotating_file;
pub mod socket_writer;
pub mod xml_writer;

pub use console_writer::ConsoleWriter;
pub use file_writer::{FileWriter, FileWriterBuilder};
pub use format::{DEFAULT_FORMAT, FormatTemplate};
pub use memory_writer::MemoryWriter;
pub use queued_worker::QueueOptions;
pub use rotating_file::{MAX_ROTATIONS, RotationPolicy};
pub use socket_writer::{Protocol, SocketWriter};
pub use xml_writer::{XmlFileWriter, XmlFileWriterBuilder};
