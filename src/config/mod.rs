//! Configuration: INI/JSON filter descriptions and the loader that turns
//! them into filters on a [`Logger`](crate::Logger).
//!
//! An INI file declares one section per filter:
//!
//! ```ini
//! [filter.stdout]
//! enabled = true
//! level = INFO
//! type = console
//!
//! [filter.file]
//! enabled = true
//! level = ERROR
//! type = file
//! exclude = hyper, mio
//! filename = logs/app.log
//! maxsize = 10M
//! rotate = true
//! ```

pub mod filter_spec;
pub mod ini_config;
pub mod loader;
pub mod num_suffix;
pub mod paths;

pub use filter_spec::{FileSetup, FilterSpec};
pub use ini_config::IniConfig;
pub use loader::Loader;
pub use num_suffix::{KIBI, THOUSANDS, parse_num_suffix};
