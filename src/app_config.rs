//! Config file loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use novel_importer::EngineConfig;

/// Directory name under the user's config home.
const APP_DIR: &str = "novel-importer";

/// `key = value` file configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// SQLite database file.
    pub db_path: Option<PathBuf>,
    /// Request gate size (1..=50).
    pub max_concurrent: Option<usize>,
    /// Retries per chapter after the first attempt (0..=5).
    pub max_retries: Option<u32>,
    /// Minimum spacing between requests to one host in milliseconds (0..=60000).
    pub chapter_delay_ms: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    /// Probe connectivity before each request.
    pub connectivity_check: Option<bool>,
}

impl FileConfig {
    /// Validates values against the ranges the engine accepts.
    pub fn validate(&self) -> Result<()> {
        if let Some(max_concurrent) = self.max_concurrent
            && !(1..=50).contains(&max_concurrent)
        {
            bail!(
                "Invalid config value for `max_concurrent`: {max_concurrent}. Expected range: 1..=50"
            );
        }

        if let Some(max_retries) = self.max_retries
            && max_retries > 5
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 0..=5");
        }

        if let Some(delay) = self.chapter_delay_ms
            && delay > 60_000
        {
            bail!("Invalid config value for `chapter_delay_ms`: {delay}. Expected range: 0..=60000");
        }

        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;

        if let Some(user_agent) = &self.user_agent
            && user_agent.trim().is_empty()
        {
            bail!("Invalid config value for `user_agent`: must not be empty");
        }

        Ok(())
    }

    /// Overlays these values on `base`.
    #[must_use]
    pub fn apply_to(&self, mut base: EngineConfig) -> EngineConfig {
        if let Some(max_concurrent) = self.max_concurrent {
            base.max_concurrent = max_concurrent;
        }
        if let Some(max_retries) = self.max_retries {
            base.max_retries = max_retries;
        }
        if let Some(delay) = self.chapter_delay_ms {
            base.chapter_delay = Duration::from_millis(delay);
        }
        if let Some(secs) = self.connect_timeout_secs {
            base.transport.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.read_timeout_secs {
            base.transport.read_timeout = Duration::from_secs(secs);
        }
        if let Some(user_agent) = &self.user_agent {
            base.transport.user_agent.clone_from(user_agent);
        }
        if let Some(check) = self.connectivity_check {
            base.connectivity_check = check;
        }
        base
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/novel-importer/config.toml`
/// 2. `$HOME/.config/novel-importer/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config_home).join(APP_DIR).join("config.toml"));
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join("config.toml"),
    )
}

/// Default database location: `$XDG_DATA_HOME/novel-importer/library.db`,
/// then `$HOME/.local/share/...`, then the working directory.
#[must_use]
pub fn default_db_path() -> PathBuf {
    if let Some(data_home) = env_var_non_empty_os("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR).join("library.db");
    }
    match env_var_non_empty_os("HOME") {
        Some(home) => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR)
            .join("library.db"),
        None => PathBuf::from("library.db"),
    }
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file at `explicit`, or at the default path if present.
///
/// An explicit path that does not exist is an error; a missing default file is not.
pub fn load_file_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = read_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(read_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "db_path" => {
                cfg.db_path = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "max_concurrent" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.max_concurrent = Some(usize::try_from(parsed).with_context(invalid)?);
            }
            "max_retries" => {
                let parsed = parse_integer_u64(value).with_context(invalid)?;
                cfg.max_retries = Some(u32::try_from(parsed).with_context(invalid)?);
            }
            "chapter_delay_ms" => {
                cfg.chapter_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "user_agent" => {
                cfg.user_agent = Some(parse_string_literal(value).with_context(invalid)?);
            }
            "connectivity_check" => {
                cfg.connectivity_check = Some(parse_boolean(value).with_context(invalid)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}
