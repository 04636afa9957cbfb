use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::{error::LoggedError, log::logger::Logger};

/// Builds the critical message logged when [`recover`] catches a panic.
pub enum RecoverMessage {
    /// Fixed text; the panic payload is appended on its own line.
    Text(String),
    /// Built on demand; the panic payload is appended on its own line.
    Lazy(Box<dyn FnOnce() -> String>),
    /// Receives the panic payload and builds the whole message.
    WithPanic(Box<dyn FnOnce(&str) -> String>),
}

impl RecoverMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn lazy(build: impl FnOnce() -> String + 'static) -> Self {
        Self::Lazy(Box::new(build))
    }

    pub fn with_panic(build: impl FnOnce(&str) -> String + 'static) -> Self {
        Self::WithPanic(Box::new(build))
    }

    fn render(self, panic: &str) -> String {
        match self {
            Self::Text(text) => format!("{text}\n{panic}"),
            Self::Lazy(build) => format!("{}\n{panic}", build()),
            Self::WithPanic(build) => build(panic),
        }
    }
}

impl fmt::Debug for RecoverMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
            Self::WithPanic(_) => f.write_str("WithPanic(..)"),
        }
    }
}

/// Runs `body`; if it panics, logs a critical record (with stack) built from
/// `message` and the panic payload, and returns it as an error.
///
/// The panic is considered handled: control returns to the caller normally.
///
/// # Example
///
/// ```rust
/// use rotalog::{Logger, RecoverMessage, recover};
///
/// let logger = Logger::new();
/// let out = recover::<(), _>(&logger, module_path!(), RecoverMessage::text("worker died"), || {
///     panic!("bad input")
/// });
/// assert!(out.unwrap_err().message().contains("bad input"));
/// ```
pub fn recover<R, F>(
    logger: &Logger,
    source: &str,
    message: RecoverMessage,
    body: F,
) -> Result<R, LoggedError>
where
    F: FnOnce() -> R,
{
    panic::catch_unwind(AssertUnwindSafe(body))
        .map_err(|payload| logger.critical(source, message.render(&panic_text(&*payload))))
}

/// Like [`recover`], but the panic keeps unwinding after it has been logged.
///
/// For callers that want the crash recorded without changing whether it
/// crashes.
pub fn recover_and_resume<R, F>(
    logger: &Logger,
    source: &str,
    message: RecoverMessage,
    body: F,
) -> R
where
    F: FnOnce() -> R,
{
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(payload) => {
            logger.critical(source, message.render(&panic_text(&*payload)));
            panic::resume_unwind(payload)
        }
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
