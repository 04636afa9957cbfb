pub mod filter;
pub mod global;
pub mod log_level;
pub mod log_macros;
pub mod log_record;
pub mod log_writer;
pub mod logger;
pub mod recover;

pub use filter::Filter;
pub use global::{global, init_global};
pub use log_level::Level;
pub use log_record::Record;
pub use log_writer::{CloseReport, LogWriter};
pub use logger::Logger;
pub use recover::{RecoverMessage, recover, recover_and_resume};
