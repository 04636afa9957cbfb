//! Turns [`FilterSpec`]s into live filters.
//!
//! Loading runs in two passes. The first validates every spec and collects
//! all problems so one error lists everything wrong with the file. The
//! second opens files and sockets; if any writer fails to start, the ones
//! already built are closed again and nothing is installed.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    config::{
        filter_spec::{FileSetup, FilterSpec, parse_flag, trim_value},
        ini_config::IniConfig,
        num_suffix::{KIBI, THOUSANDS, parse_num_suffix},
        paths::{ensure_parent, exe_dir_fallback_cwd, resolve},
    },
    error::ConfigError,
    log::{filter::Filter, log_level::Level, log_writer::LogWriter, logger::Logger},
    writers::{
        ConsoleWriter, FileWriter, FormatTemplate, Protocol, QueueOptions, RotationPolicy,
        SocketWriter, XmlFileWriter,
    },
};

/// Builds filters from specs, resolving relative filenames against a base
/// directory.
#[derive(Debug, Clone)]
pub struct Loader {
    base_dir: PathBuf,
    queue: QueueOptions,
}

/// A validated writer, not yet started.
#[derive(Debug)]
enum WriterPlan {
    Console {
        format: FormatTemplate,
        stderr_level: Option<Level>,
    },
    File {
        path: PathBuf,
        format: FormatTemplate,
        policy: RotationPolicy,
    },
    Xml {
        path: PathBuf,
        policy: RotationPolicy,
    },
    Socket {
        protocol: Protocol,
        endpoint: String,
    },
}

#[derive(Debug)]
struct Planned {
    name: String,
    level: Level,
    excludes: Vec<String>,
    writer: WriterPlan,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Resolves relative filenames against the executable's directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_dir(exe_dir_fallback_cwd())
    }

    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            queue: QueueOptions::default(),
        }
    }

    /// Queue settings for the file-backed writers this loader builds.
    #[must_use]
    pub fn queue(mut self, options: QueueOptions) -> Self {
        self.queue = options;
        self
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Validates and builds every enabled spec, in order.
    ///
    /// Disabled specs are checked but produce no filter.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] listing every problem found, or the first
    /// writer that failed to start.
    pub fn build(&self, specs: &[FilterSpec]) -> Result<Vec<(String, Filter)>, ConfigError> {
        let mut problems = Vec::new();
        let mut planned = Vec::new();
        for spec in specs {
            if let Some(plan) = self.plan(spec, &mut problems) {
                planned.push(plan);
            }
        }
        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems));
        }

        let mut built: Vec<(String, Filter)> = Vec::with_capacity(planned.len());
        for plan in planned {
            match self.start(plan.writer) {
                Ok(writer) => {
                    let filter = Filter::new(plan.level, writer).with_excludes(plan.excludes);
                    built.push((plan.name, filter));
                }
                Err(problem) => {
                    for (_, filter) in &built {
                        filter.writer().close();
                    }
                    return Err(ConfigError::Invalid(vec![format!(
                        "filter {:?}: {problem}",
                        plan.name
                    )]));
                }
            }
        }
        Ok(built)
    }

    /// Returns `None` for disabled or broken specs; problems go to `problems`.
    fn plan(&self, spec: &FilterSpec, problems: &mut Vec<String>) -> Option<Planned> {
        let label = if spec.name.is_empty() {
            "<unnamed>"
        } else {
            spec.name.as_str()
        };
        let before = problems.len();

        if spec.enabled.is_none() {
            problems.push(format!("filter {label:?}: required attribute \"enabled\" missing"));
        }
        if spec.name.trim().is_empty() {
            problems.push(format!("filter {label:?}: required field \"name\" missing"));
        }
        if spec.writer_type.trim().is_empty() {
            problems.push(format!("filter {label:?}: required field \"type\" missing"));
        }
        let level = if spec.level.trim().is_empty() {
            problems.push(format!("filter {label:?}: required field \"level\" missing"));
            None
        } else {
            match spec.level.parse::<Level>() {
                Ok(level) => Some(level),
                Err(err) => {
                    problems.push(format!("filter {label:?}: {err}"));
                    None
                }
            }
        };

        let enabled = spec.enabled.unwrap_or(false);
        let writer = match trim_value(&spec.writer_type) {
            "" => None,
            "console" => Some(self.console_plan(label, &spec.properties, problems)),
            "file" => self.file_plan(label, &spec.properties, enabled, problems),
            "xml" => self.xml_plan(label, &spec.properties, enabled, problems),
            "socket" => self.socket_plan(label, &spec.properties, enabled, problems),
            other => {
                problems.push(format!("filter {label:?}: unknown filter type {other:?}"));
                None
            }
        };

        if problems.len() > before || !enabled {
            return None;
        }
        Some(Planned {
            name: spec.name.trim().to_string(),
            level: level?,
            excludes: spec.exclude.clone(),
            writer: writer?,
        })
    }

    fn console_plan<'a>(
        &self,
        label: &str,
        props: impl IntoIterator<Item = (&'a String, &'a String)>,
        problems: &mut Vec<String>,
    ) -> WriterPlan {
        let mut format = FormatTemplate::default();
        let mut stderr_level = None;
        for (key, value) in props {
            let value = trim_value(value);
            match key.as_str() {
                "format" => format = FormatTemplate::new(value),
                "stderr_level" => match value.parse::<Level>() {
                    Ok(level) => stderr_level = Some(level),
                    Err(err) => problems.push(format!("filter {label:?}: stderr_level: {err}")),
                },
                _ => unknown_property(label, "console", key),
            }
        }
        WriterPlan::Console {
            format,
            stderr_level,
        }
    }

    fn file_plan<'a>(
        &self,
        label: &str,
        props: impl IntoIterator<Item = (&'a String, &'a String)>,
        enabled: bool,
        problems: &mut Vec<String>,
    ) -> Option<WriterPlan> {
        let mut path = None;
        let mut format = FormatTemplate::default();
        let mut policy = RotationPolicy::default();
        for (key, value) in props {
            let value = trim_value(value);
            match key.as_str() {
                "filename" if !value.is_empty() => path = Some(resolve(&self.base_dir, value)),
                "filename" => {}
                "format" => format = FormatTemplate::new(value),
                "maxlines" => policy.max_units = parse_num_suffix(value, THOUSANDS),
                "maxsize" => policy.max_size = parse_num_suffix(value, KIBI),
                "daily" => policy.daily = parse_flag(value),
                "rotate" => policy.rotate = parse_flag(value),
                _ => unknown_property(label, "file", key),
            }
        }
        let path = required_filename(label, "file", path, enabled, problems)?;
        Some(WriterPlan::File {
            path,
            format,
            policy,
        })
    }

    fn xml_plan<'a>(
        &self,
        label: &str,
        props: impl IntoIterator<Item = (&'a String, &'a String)>,
        enabled: bool,
        problems: &mut Vec<String>,
    ) -> Option<WriterPlan> {
        let mut path = None;
        let mut policy = RotationPolicy::default();
        for (key, value) in props {
            let value = trim_value(value);
            match key.as_str() {
                "filename" if !value.is_empty() => path = Some(resolve(&self.base_dir, value)),
                "filename" => {}
                "maxrecords" => policy.max_units = parse_num_suffix(value, THOUSANDS),
                "maxsize" => policy.max_size = parse_num_suffix(value, KIBI),
                "daily" => policy.daily = parse_flag(value),
                "rotate" => policy.rotate = parse_flag(value),
                _ => unknown_property(label, "xml", key),
            }
        }
        let path = required_filename(label, "xml", path, enabled, problems)?;
        Some(WriterPlan::Xml { path, policy })
    }

    fn socket_plan<'a>(
        &self,
        label: &str,
        props: impl IntoIterator<Item = (&'a String, &'a String)>,
        enabled: bool,
        problems: &mut Vec<String>,
    ) -> Option<WriterPlan> {
        let mut endpoint = String::new();
        let mut protocol = Protocol::default();
        for (key, value) in props {
            let value = trim_value(value);
            match key.as_str() {
                "endpoint" => endpoint = value.to_string(),
                "protocol" => match value.parse::<Protocol>() {
                    Ok(p) => protocol = p,
                    Err(err) => problems.extend(
                        flatten(err)
                            .into_iter()
                            .map(|p| format!("filter {label:?}: {p}")),
                    ),
                },
                _ => unknown_property(label, "socket", key),
            }
        }
        if endpoint.is_empty() {
            if enabled {
                problems.push(format!(
                    "filter {label:?}: required property \"endpoint\" for socket filter missing"
                ));
            }
            return None;
        }
        Some(WriterPlan::Socket { protocol, endpoint })
    }

    fn start(&self, plan: WriterPlan) -> Result<Arc<dyn LogWriter>, String> {
        match plan {
            WriterPlan::Console {
                format,
                stderr_level,
            } => Ok(Arc::new(
                ConsoleWriter::new()
                    .format(format)
                    .stderr_level(stderr_level),
            )),
            WriterPlan::File {
                path,
                format,
                policy,
            } => {
                prepare_dir(&path)?;
                let writer = FileWriter::builder(path)
                    .format(format)
                    .max_lines(policy.max_units)
                    .max_size(policy.max_size)
                    .daily(policy.daily)
                    .rotate(policy.rotate)
                    .queue(self.queue)
                    .build()
                    .map_err(|e| e.to_string())?;
                Ok(Arc::new(writer))
            }
            WriterPlan::Xml { path, policy } => {
                prepare_dir(&path)?;
                let writer = XmlFileWriter::builder(path)
                    .max_records(policy.max_units)
                    .max_size(policy.max_size)
                    .daily(policy.daily)
                    .rotate(policy.rotate)
                    .queue(self.queue)
                    .build()
                    .map_err(|e| e.to_string())?;
                Ok(Arc::new(writer))
            }
            WriterPlan::Socket { protocol, endpoint } => {
                Ok(Arc::new(SocketWriter::new(protocol, endpoint)))
            }
        }
    }
}

impl Logger {
    /// Builds `specs` with a default [`Loader`] and installs them in place of
    /// the current filters.
    ///
    /// # Errors
    ///
    /// On any problem the current filters are left untouched.
    pub fn configure(&self, specs: &[FilterSpec]) -> Result<(), ConfigError> {
        self.configure_with(&Loader::new(), specs)
    }

    /// Like [`Logger::configure`], with an explicit loader.
    ///
    /// # Errors
    ///
    /// On any problem the current filters are left untouched.
    pub fn configure_with(&self, loader: &Loader, specs: &[FilterSpec]) -> Result<(), ConfigError> {
        let filters = loader.build(specs)?;
        tracing::debug!(filters = filters.len(), "installing log filters");
        self.replace_all(filters);
        Ok(())
    }

    /// Loads a configuration file and installs its filters in place of the
    /// current ones.
    ///
    /// Files ending in `.json` hold an array of filter objects; anything
    /// else is read as INI with one `[filter.<name>]` section per filter.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the file cannot be read or parsed, or any filter in
    /// it is invalid. The current filters stay installed in that case.
    pub fn load_configuration(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        self.load_configuration_with(&Loader::new(), path)
    }

    /// Like [`Logger::load_configuration`], with an explicit loader.
    ///
    /// # Errors
    ///
    /// See [`Logger::load_configuration`].
    pub fn load_configuration_with(
        &self,
        loader: &Loader,
        path: impl AsRef<Path>,
    ) -> Result<(), ConfigError> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "loading log configuration");
        let specs = read_specs(path)?;
        self.configure_with(loader, &specs)
    }

    /// Installs (or replaces) a single rotating file filter named `file` from
    /// a [`FileSetup`] JSON document. Other filters are kept.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the JSON is malformed or the file filter is invalid.
    pub fn setup_file_log(&self, json: &str) -> Result<(), ConfigError> {
        self.setup_file_log_with(&Loader::new(), json)
    }

    /// Like [`Logger::setup_file_log`], with an explicit loader.
    ///
    /// # Errors
    ///
    /// See [`Logger::setup_file_log`].
    pub fn setup_file_log_with(&self, loader: &Loader, json: &str) -> Result<(), ConfigError> {
        let setup: FileSetup = serde_json::from_str(json)?;
        for (name, filter) in loader.build(&[setup.into_spec()])? {
            self.insert(name, filter);
        }
        Ok(())
    }
}

fn read_specs(path: &Path) -> Result<Vec<FilterSpec>, ConfigError> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(FilterSpec::from_ini(&IniConfig::load(path)?))
    }
}

fn required_filename(
    label: &str,
    kind: &str,
    path: Option<PathBuf>,
    enabled: bool,
    problems: &mut Vec<String>,
) -> Option<PathBuf> {
    if path.is_none() && enabled {
        problems.push(format!(
            "filter {label:?}: required property \"filename\" for {kind} filter missing"
        ));
    }
    path
}

fn prepare_dir(path: &Path) -> Result<(), String> {
    ensure_parent(path).map_err(|e| format!("could not create directory for {path:?}: {e}"))
}

fn unknown_property(label: &str, kind: &str, key: &str) {
    tracing::warn!(filter = label, property = key, "unknown property for {kind} filter");
}

fn flatten(err: ConfigError) -> Vec<String> {
    match err {
        ConfigError::Invalid(problems) => problems,
        other => vec![other.to_string()],
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::collections::BTreeMap;

    fn spec(name: &str, level: &str, kind: &str, props: &[(&str, &str)]) -> FilterSpec {
        FilterSpec {
            name: name.to_string(),
            enabled: Some(true),
            level: level.to_string(),
            writer_type: kind.to_string(),
            properties: props
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            exclude: Vec::new(),
        }
    }

    fn invalid(err: ConfigError) -> Vec<String> {
        match err {
            ConfigError::Invalid(problems) => problems,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn builds_enabled_filters_and_skips_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let loader = Loader::with_base_dir(dir.path());
        let mut off = spec("off", "DEBUG", "file", &[]);
        off.enabled = Some(false);

        let built = loader
            .build(&[
                spec("stdout", "INFO", "console", &[("format", "%L %M")]),
                spec("file", "ERROR", "file", &[("filename", "logs/app.log")]),
                off,
            ])
            .unwrap();

        let names: Vec<&str> = built.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["stdout", "file"]);
        assert_eq!(built[1].1.level(), Level::Error);
        assert!(dir.path().join("logs/app.log").exists());

        for (_, filter) in built {
            filter.writer().close();
        }
    }

    #[test]
    fn every_problem_is_reported_at_once() {
        let loader = Loader::with_base_dir("/nonexistent");
        let mut no_enabled = spec("a", "INFO", "console", &[]);
        no_enabled.enabled = None;

        let problems = invalid(
            loader
                .build(&[
                    no_enabled,
                    spec("b", "LOUD", "console", &[]),
                    spec("c", "INFO", "carrier-pigeon", &[]),
                    spec("d", "INFO", "file", &[]),
                    spec("e", "INFO", "socket", &[("protocol", "sctp"), ("endpoint", "x:1")]),
                ])
                .unwrap_err(),
        );

        assert_eq!(problems.len(), 5, "{problems:#?}");
        assert!(problems[0].contains("\"enabled\""));
        assert!(problems[1].contains("LOUD"));
        assert!(problems[2].contains("carrier-pigeon"));
        assert!(problems[3].contains("\"filename\""));
        assert!(problems[4].contains("sctp"));
    }

    #[test]
    fn disabled_filter_may_omit_required_properties() {
        let loader = Loader::with_base_dir("/nonexistent");
        let mut file = spec("file", "INFO", "file", &[]);
        file.enabled = Some(false);
        let mut sock = spec("sock", "INFO", "socket", &[]);
        sock.enabled = Some(false);
        assert!(loader.build(&[file, sock]).unwrap().is_empty());
    }

    #[test]
    fn disabled_filter_still_needs_a_known_level() {
        let loader = Loader::with_base_dir("/nonexistent");
        let mut bad = spec("x", "VERBOSE", "console", &[]);
        bad.enabled = Some(false);
        assert_eq!(invalid(loader.build(&[bad]).unwrap_err()).len(), 1);
    }

    #[test]
    fn unknown_properties_are_not_fatal() {
        let loader = Loader::with_base_dir("/nonexistent");
        let built = loader
            .build(&[spec("stdout", "INFO", "console", &[("colour", "yes")])])
            .unwrap();
        assert_eq!(built.len(), 1);
    }

    #[test]
    fn load_configuration_keeps_old_filters_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("log.ini");
        fs::write(&cfg, "[filter.stdout]\nenabled = true\nlevel = NOPE\ntype = console\n")
            .unwrap();

        let logger = Logger::with_console(Level::Warning);
        let err = logger
            .load_configuration_with(&Loader::with_base_dir(dir.path()), &cfg)
            .unwrap_err();
        assert!(err.to_string().contains("NOPE"));
        assert_eq!(logger.filter_names(), ["stdout"]);
        assert!(!logger.is_enabled(Level::Info));
    }

    #[test]
    fn load_json_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("log.json");
        fs::write(
            &cfg,
            r#"[
                {"name":"xml","enabled":true,"level":"TRACE","type":"xml",
                 "properties":{"filename":"out/app.xml","maxrecords":"1K"}},
                {"name":"net","enabled":false,"level":"INFO","type":"socket"}
            ]"#,
        )
        .unwrap();

        let logger = Logger::new();
        logger
            .load_configuration_with(&Loader::with_base_dir(dir.path()), &cfg)
            .unwrap();
        assert_eq!(logger.filter_names(), ["xml"]);
        assert!(logger.is_trace_enabled());
        assert!(!logger.is_debug_enabled());
        assert!(dir.path().join("out/app.xml").exists());
        logger.close();
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let logger = Logger::new();
        let err = logger
            .load_configuration("/definitely/not/here.ini")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn setup_file_log_adds_a_rotating_file_filter() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Logger::with_console(Level::Error);
        logger
            .setup_file_log_with(
                &Loader::with_base_dir(dir.path()),
                r#"{"level":"DEBUG","filename":"app.log","maxlines":"2","excludes":"noisy"}"#,
            )
            .unwrap();

        assert_eq!(logger.filter_names(), ["file", "stdout"]);
        logger.log(Level::Debug, "noisy::db", "dropped");
        logger.log(Level::Debug, "app", "one");
        logger.log(Level::Debug, "app", "two");
        logger.log(Level::Debug, "app", "three");
        assert!(logger.close().is_clean());

        let active = fs::read_to_string(dir.path().join("app.log")).unwrap();
        let rotated = fs::read_to_string(dir.path().join("app.1.log")).unwrap();
        assert_eq!(rotated.lines().count(), 2);
        assert!(active.ends_with("three\n"));
        assert!(!rotated.contains("dropped"));
    }

    #[test]
    fn setup_file_log_rejects_bad_json() {
        let logger = Logger::new();
        let err = logger.setup_file_log("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
