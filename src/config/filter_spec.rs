use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::ini_config::IniConfig;

/// INI sections describing filters are named `filter.<name>`.
pub const FILTER_SECTION_PREFIX: &str = "filter.";

/// One filter as read from configuration, before validation.
///
/// `enabled`, `name`, `level` and `writer_type` are required; the loader
/// reports every missing one in a single error.
///
/// JSON form:
///
/// ```json
/// {
///   "name": "file",
///   "enabled": true,
///   "level": "INFO",
///   "type": "file",
///   "properties": { "filename": "logs/app.log", "maxsize": "10M", "rotate": "true" },
///   "exclude": ["hyper::proto"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    #[serde(alias = "tag")]
    pub name: String,
    pub enabled: Option<bool>,
    pub level: String,
    #[serde(rename = "type")]
    pub writer_type: String,
    pub properties: BTreeMap<String, String>,
    #[serde(alias = "excludes")]
    pub exclude: Vec<String>,
}

impl FilterSpec {
    /// Reads every `[filter.<name>]` section, sorted by name.
    ///
    /// `enabled`, `level`, `type` and `exclude` (comma separated) are filter
    /// keys; every other key becomes a writer property.
    #[must_use]
    pub fn from_ini(ini: &IniConfig) -> Vec<Self> {
        ini.sections_with_prefix(FILTER_SECTION_PREFIX)
            .into_iter()
            .map(|(name, keys)| {
                let mut spec = FilterSpec {
                    name: name.to_string(),
                    ..FilterSpec::default()
                };
                for (key, value) in keys {
                    match key.as_str() {
                        "enabled" => spec.enabled = Some(parse_flag(value)),
                        "level" => spec.level = value.clone(),
                        "type" => spec.writer_type = value.clone(),
                        "exclude" => spec.exclude = split_list(value),
                        _ => {
                            spec.properties.insert(key.clone(), value.clone());
                        }
                    }
                }
                spec
            })
            .collect()
    }
}

/// Quick single-file setup, all values as strings:
///
/// ```json
/// {
///   "level": "DEBUG",
///   "filename": "logs/app.log",
///   "format": "[%D %T] [%L] (%S) %M",
///   "maxlines": "10K",
///   "maxsize": "10M",
///   "excludes": "hyper,mio"
/// }
/// ```
///
/// The resulting filter is named `file` and always rotates daily.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileSetup {
    pub level: String,
    pub filename: String,
    pub format: String,
    pub maxlines: String,
    pub maxsize: String,
    pub excludes: String,
}

impl FileSetup {
    pub const FILTER_NAME: &'static str = "file";

    #[must_use]
    pub fn into_spec(self) -> FilterSpec {
        let mut properties = BTreeMap::new();
        properties.insert("filename".to_string(), self.filename);
        if !self.format.trim().is_empty() {
            properties.insert("format".to_string(), self.format);
        }
        if !self.maxlines.trim().is_empty() {
            properties.insert("maxlines".to_string(), self.maxlines);
        }
        if !self.maxsize.trim().is_empty() {
            properties.insert("maxsize".to_string(), self.maxsize);
        }
        properties.insert("daily".to_string(), "true".to_string());
        properties.insert("rotate".to_string(), "true".to_string());

        FilterSpec {
            name: Self::FILTER_NAME.to_string(),
            enabled: Some(true),
            level: self.level,
            writer_type: "file".to_string(),
            properties,
            exclude: split_list(&self.excludes),
        }
    }
}

/// Trims spaces and line endings the way every property value is trimmed.
pub(crate) fn trim_value(value: &str) -> &str {
    value.trim_matches(|c| c == ' ' || c == '\r' || c == '\n')
}

/// Anything other than `false` switches a flag on.
pub(crate) fn parse_flag(value: &str) -> bool {
    trim_value(value) != "false"
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
