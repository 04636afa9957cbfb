use std::{collections::HashMap, fs, path::Path};

use crate::error::ConfigError;

/// Minimal INI document: `[section]` headers, `key = value` pairs and `#`
/// comments. A repeated key replaces the earlier value; keys outside any
/// section are ignored.
#[derive(Debug, Default)]
pub struct IniConfig {
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl IniConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                current_section = Some(name.to_string());
                sections.entry(name.to_string()).or_default();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            match &current_section {
                Some(sec) => {
                    sections.entry(sec.clone()).or_default().insert(
                        key.to_string(),
                        value.trim().trim_matches('"').to_string(),
                    );
                }
                None => tracing::warn!(key, "ignoring configuration key outside any section"),
            }
        }
        Self { sections }
    }

    /// Sections whose name starts with `prefix`, sorted by name, with the
    /// prefix stripped.
    #[must_use]
    pub fn sections_with_prefix<'a>(
        &'a self,
        prefix: &str,
    ) -> Vec<(&'a str, &'a HashMap<String, String>)> {
        let mut found: Vec<_> = self
            .sections
            .iter()
            .filter_map(|(name, keys)| name.strip_prefix(prefix).map(|n| (n, keys)))
            .collect();
        found.sort_by(|a, b| a.0.cmp(b.0));
        found
    }
}
