#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    fs,
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;
use rotalog::{
    Filter, Level, Loader, Logger, RecoverMessage,
    writers::{ConsoleWriter, FileWriter, FormatTemplate, MemoryWriter},
};

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Vec<u8>>>);

impl Shared {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }
}

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn console_and_file_filters_apply_independently() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.log");
    let out = Shared::default();

    let logger = Logger::new();
    let console = ConsoleWriter::with_streams(Box::new(out.clone()), Box::new(io::sink()))
        .format(FormatTemplate::new("%L %S %M"));
    logger.add_filter("stdout", Level::Info, Arc::new(console));
    let file = FileWriter::builder(&path)
        .format(FormatTemplate::new("%L %S %M"))
        .build()
        .unwrap();
    logger.insert(
        "file",
        Filter::new(Level::Error, Arc::new(file)).with_excludes(["noisy"]),
    );

    logger.log(Level::Debug, "noisy", "debug from noisy");
    logger.log(Level::Info, "noisy", "info from noisy");
    logger.log(Level::Error, "noisy", "error from noisy");
    logger.log(Level::Error, "app", "error from app");

    assert!(logger.close().is_clean());
    assert!(logger.close().is_clean());

    assert_eq!(
        out.text(),
        "INFO noisy info from noisy\nEROR noisy error from noisy\nEROR app error from app\n"
    );
    assert_eq!(fs::read_to_string(&path).unwrap(), "EROR app error from app\n");
}

#[test]
fn configuration_file_drives_the_logger() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("log.ini");
    fs::write(
        &cfg,
        "# two filters, one disabled\n\
         [filter.file]\n\
         enabled = true\n\
         level = INFO\n\
         type = file\n\
         filename = logs/app.log\n\
         format = %L|%M\n\
         maxlines = 2\n\
         rotate = true\n\
         exclude = chatty\n\
         \n\
         [filter.net]\n\
         enabled = false\n\
         level = DEBUG\n\
         type = socket\n",
    )
    .unwrap();

    let logger = Logger::new();
    logger
        .load_configuration_with(&Loader::with_base_dir(dir.path()), &cfg)
        .unwrap();
    assert_eq!(logger.filter_names(), ["file"]);

    for n in 1..=5 {
        rotalog::info!(logger, "line {}", n);
    }
    rotalog::info!(logger, "last");
    logger.log(Level::Warning, "chatty::mod", "excluded");
    assert!(logger.close().is_clean());

    let logs = dir.path().join("logs");
    let first = fs::read_to_string(logs.join("app.1.log")).unwrap();
    let second = fs::read_to_string(logs.join("app.2.log")).unwrap();
    let active = fs::read_to_string(logs.join("app.log")).unwrap();
    assert_eq!(first, "INFO|line 1\nINFO|line 2\n");
    assert_eq!(second, "INFO|line 3\nINFO|line 4\n");
    assert_eq!(active, "INFO|line 5\nINFO|last\n");
}

#[test]
fn reload_replaces_filters_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("log.json");
    fs::write(
        &cfg,
        r#"[{"name":"file","enabled":true,"level":"WARNING","type":"file",
             "properties":{"filename":"app.log"}}]"#,
    )
    .unwrap();

    let logger = Logger::new();
    let mem = Arc::new(MemoryWriter::new());
    logger.add_filter("mem", Level::Finest, mem.clone());

    logger
        .load_configuration_with(&Loader::with_base_dir(dir.path()), &cfg)
        .unwrap();
    assert!(mem.is_closed());
    assert_eq!(logger.filter_names(), ["file"]);
    assert!(!logger.is_info_enabled());
    assert!(logger.is_warn_enabled());
    logger.close();
}

#[test]
fn recovered_panic_reaches_the_writers() {
    let logger = Logger::new();
    let mem = Arc::new(MemoryWriter::new());
    logger.add_filter("mem", Level::Error, mem.clone());

    let result = rotalog::recover::<u32, _>(
        &logger,
        "worker",
        RecoverMessage::with_panic(|p| format!("worker crashed: {p}")),
        || panic!("queue poisoned"),
    );

    assert_eq!(result.unwrap_err().message(), "worker crashed: queue poisoned");
    let records = mem.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level(), Level::Critical);
    assert_eq!(records[0].source(), "worker");
}
