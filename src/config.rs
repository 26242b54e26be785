//! Persisted settings in `<config dir>/kommit/config.toml`.
//!
//! The file is edited in place with `toml_edit` so user comments and layout
//! survive `kommit config set`. Every key can be overridden for a single run
//! with a `KOMMIT_<SECTION>_<NAME>` environment variable.

use std::env;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tempfile::NamedTempFile;
use toml_edit::{Array, DocumentMut, Item, Value};
use tracing::debug;

use crate::error::ConfigError;

/// Fallback environment variable for the API key.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Shape of a settings value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
    List,
}

impl ValueKind {
    fn describe(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "positive integer",
            ValueKind::Boolean => "boolean (true/false)",
            ValueKind::List => "list",
        }
    }
}

/// A recognised settings key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    ApiKey,
    ApiModel,
    ApiBaseUrl,
    CommitLanguage,
    CommitMaxLength,
    CommitIssuePatterns,
    StageAll,
    AutoSelect,
    NoConfirm,
    Quiet,
    Push,
    DryRun,
    ShowDiff,
    NoVerify,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 14] = [
        ConfigKey::ApiKey,
        ConfigKey::ApiModel,
        ConfigKey::ApiBaseUrl,
        ConfigKey::CommitLanguage,
        ConfigKey::CommitMaxLength,
        ConfigKey::CommitIssuePatterns,
        ConfigKey::StageAll,
        ConfigKey::AutoSelect,
        ConfigKey::NoConfirm,
        ConfigKey::Quiet,
        ConfigKey::Push,
        ConfigKey::DryRun,
        ConfigKey::ShowDiff,
        ConfigKey::NoVerify,
    ];

    /// Dotted name, e.g. `commit.max_length`.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "api.key",
            ConfigKey::ApiModel => "api.model",
            ConfigKey::ApiBaseUrl => "api.baseurl",
            ConfigKey::CommitLanguage => "commit.language",
            ConfigKey::CommitMaxLength => "commit.max_length",
            ConfigKey::CommitIssuePatterns => "commit.issue_patterns",
            ConfigKey::StageAll => "behavior.stage_all",
            ConfigKey::AutoSelect => "behavior.auto_select",
            ConfigKey::NoConfirm => "behavior.no_confirm",
            ConfigKey::Quiet => "behavior.quiet",
            ConfigKey::Push => "behavior.push",
            ConfigKey::DryRun => "behavior.dry_run",
            ConfigKey::ShowDiff => "behavior.show_diff",
            ConfigKey::NoVerify => "behavior.no_verify",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            ConfigKey::ApiKey
            | ConfigKey::ApiModel
            | ConfigKey::ApiBaseUrl
            | ConfigKey::CommitLanguage => ValueKind::String,
            ConfigKey::CommitMaxLength => ValueKind::Integer,
            ConfigKey::CommitIssuePatterns => ValueKind::List,
            _ => ValueKind::Boolean,
        }
    }

    fn section_and_field(self) -> (&'static str, &'static str) {
        self.name().split_once('.').unwrap_or(("", self.name()))
    }

    /// Environment override, e.g. `KOMMIT_COMMIT_MAX_LENGTH`.
    pub fn env_var(self) -> String {
        format!("KOMMIT_{}", self.name().replace('.', "_").to_uppercase())
    }

    fn is_secret(self) -> bool {
        self == ConfigKey::ApiKey
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// Settings file contents plus environment overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    path: PathBuf,
    doc: DocumentMut,
}

impl Settings {
    /// `<config dir>/kommit/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("kommit").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load settings from `path`, or the default location when `None`.
    ///
    /// A missing file is an empty configuration.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!("No settings file at {}", path.display());
            return Ok(Self {
                path,
                doc: DocumentMut::new(),
            });
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let doc = contents
            .parse::<DocumentMut>()
            .map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_item(&self, key: ConfigKey) -> Option<&Item> {
        let (section, field) = key.section_and_field();
        self.doc
            .get(section)
            .and_then(|s| s.get(field))
            .filter(|item| !item.is_none())
    }

    fn env_value(key: ConfigKey) -> Option<String> {
        env::var(key.env_var()).ok().filter(|v| !v.is_empty())
    }

    fn invalid(key: ConfigKey, value: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: key.name().to_string(),
            value: value.into(),
            expected: key.kind().describe(),
        }
    }

    /// Effective string value: environment, then file.
    pub fn string(&self, key: ConfigKey) -> Result<Option<String>, ConfigError> {
        if let Some(value) = Self::env_value(key) {
            return Ok(Some(value));
        }
        match self.file_item(key) {
            None => Ok(None),
            Some(item) => item
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| Self::invalid(key, item.to_string().trim())),
        }
    }

    /// Effective boolean value: environment, then file.
    pub fn boolean(&self, key: ConfigKey) -> Result<Option<bool>, ConfigError> {
        if let Some(value) = Self::env_value(key) {
            return parse_bool(&value)
                .map(Some)
                .ok_or_else(|| Self::invalid(key, value));
        }
        match self.file_item(key) {
            None => Ok(None),
            Some(item) => item
                .as_bool()
                .map(Some)
                .ok_or_else(|| Self::invalid(key, item.to_string().trim())),
        }
    }

    /// Effective positive integer value: environment, then file.
    pub fn integer(&self, key: ConfigKey) -> Result<Option<usize>, ConfigError> {
        if let Some(value) = Self::env_value(key) {
            return parse_positive(&value)
                .map(Some)
                .ok_or_else(|| Self::invalid(key, value));
        }
        match self.file_item(key) {
            None => Ok(None),
            Some(item) => item
                .as_integer()
                .and_then(|n| usize::try_from(n).ok())
                .filter(|n| *n > 0)
                .map(Some)
                .ok_or_else(|| Self::invalid(key, item.to_string().trim())),
        }
    }

    /// Effective list value: environment, then file.
    ///
    /// An environment override is either a TOML array literal or one element.
    pub fn list(&self, key: ConfigKey) -> Result<Option<Vec<String>>, ConfigError> {
        if let Some(value) = Self::env_value(key) {
            if value.trim_start().starts_with('[') {
                let parsed = value
                    .parse::<Value>()
                    .ok()
                    .and_then(|v| v.as_array().and_then(array_strings))
                    .ok_or_else(|| Self::invalid(key, value.clone()))?;
                return Ok(Some(parsed));
            }
            return Ok(Some(vec![value]));
        }
        match self.file_item(key) {
            None => Ok(None),
            Some(item) => item
                .as_array()
                .and_then(array_strings)
                .map(Some)
                .ok_or_else(|| Self::invalid(key, item.to_string().trim())),
        }
    }

    /// API key from `KOMMIT_API_KEY`, the file, then `GEMINI_API_KEY`.
    pub fn api_key(&self) -> Result<Option<String>, ConfigError> {
        if let Some(key) = self.string(ConfigKey::ApiKey)? {
            return Ok(Some(key));
        }
        Ok(env::var(GEMINI_API_KEY_ENV).ok().filter(|v| !v.is_empty()))
    }

    /// Effective value rendered for display, or `None` when unset.
    pub fn display_value(&self, key: ConfigKey) -> Result<Option<String>, ConfigError> {
        let value = match key.kind() {
            ValueKind::String => self.string(key)?,
            ValueKind::Integer => self.integer(key)?.map(|n| n.to_string()),
            ValueKind::Boolean => self.boolean(key)?.map(|b| b.to_string()),
            ValueKind::List => self.list(key)?.map(|items| items.join(", ")),
        };
        Ok(value)
    }

    /// Like [`Settings::display_value`], with secrets masked.
    pub fn masked_value(&self, key: ConfigKey) -> Result<Option<String>, ConfigError> {
        let value = self.display_value(key)?;
        if key.is_secret() {
            return Ok(value.map(|v| mask_secret(&v)));
        }
        Ok(value)
    }

    /// Every key with its masked display value.
    pub fn entries(&self) -> Result<Vec<(ConfigKey, Option<String>)>, ConfigError> {
        ConfigKey::ALL
            .into_iter()
            .map(|key| Ok((key, self.masked_value(key)?)))
            .collect()
    }

    /// Validate `values` against the key's kind and write them to the document.
    ///
    /// Lists take every value as one element; other kinds join the values
    /// with spaces.
    pub fn set(&mut self, key: ConfigKey, values: &[String]) -> Result<(), ConfigError> {
        let joined = values.join(" ");
        if joined.trim().is_empty() {
            return Err(Self::invalid(key, joined));
        }

        let value: Value = match key.kind() {
            ValueKind::String => joined.trim().into(),
            ValueKind::Integer => {
                let n = parse_positive(&joined).ok_or_else(|| Self::invalid(key, joined.clone()))?;
                let n = i64::try_from(n).map_err(|_| Self::invalid(key, joined.clone()))?;
                n.into()
            }
            ValueKind::Boolean => parse_bool(&joined)
                .ok_or_else(|| Self::invalid(key, joined.clone()))?
                .into(),
            ValueKind::List => values.iter().map(String::as_str).collect::<Array>().into(),
        };

        let (section, field) = key.section_and_field();
        let table = self
            .doc
            .entry(section)
            .or_insert(toml_edit::table())
            .as_table_like_mut()
            .ok_or_else(|| Self::invalid(key, format!("[{section}] is not a table")))?;
        table.insert(field, Item::Value(value));
        Ok(())
    }

    /// Atomically write the document back to its path.
    pub fn save(&self) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
        tmp.write_all(self.doc.to_string().as_bytes())
            .map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

fn array_strings(array: &Array) -> Option<Vec<String>> {
    array
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

fn mask_secret(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("****{tail}")
}
