use std::{
    env, fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::{Deserialize, Serialize};

use crate::args::BaseArgs;
use crate::error::{Error, Result};
use crate::metrics::Metric;
use crate::rule::Condition;
use crate::sa360::{CustomerId, DEFAULT_API_URL};
use crate::ui::{print_command_status, CommandStatus};

/// On-disk configuration. Everything is stored as strings and validated only
/// when a run resolves them into typed settings, so a half-filled config file
/// never blocks `sal config` itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub customer_id: Option<String>,
    pub control_column: Option<String>,
    pub condition: Option<String>,
    pub threshold1: Option<String>,
    pub threshold2: Option<String>,
    pub label: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub api_url: Option<String>,
    pub log_file: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub const KNOWN_KEYS: &[&str] = &[
    "customer_id",
    "control_column",
    "condition",
    "threshold1",
    "threshold2",
    "label",
    "start_date",
    "end_date",
    "api_url",
    "log_file",
];

impl Config {
    pub fn get_field(&self, key: &str) -> Option<&str> {
        match key {
            "customer_id" => self.customer_id.as_deref(),
            "control_column" => self.control_column.as_deref(),
            "condition" => self.condition.as_deref(),
            "threshold1" => self.threshold1.as_deref(),
            "threshold2" => self.threshold2.as_deref(),
            "label" => self.label.as_deref(),
            "start_date" => self.start_date.as_deref(),
            "end_date" => self.end_date.as_deref(),
            "api_url" => self.api_url.as_deref(),
            "log_file" => self.log_file.as_deref(),
            _ => None,
        }
    }

    pub fn set_field(&mut self, key: &str, value: String) -> bool {
        match key {
            "customer_id" => self.customer_id = Some(value),
            "control_column" => self.control_column = Some(value),
            "condition" => self.condition = Some(value),
            "threshold1" => self.threshold1 = Some(value),
            "threshold2" => self.threshold2 = Some(value),
            "label" => self.label = Some(value),
            "start_date" => self.start_date = Some(value),
            "end_date" => self.end_date = Some(value),
            "api_url" => self.api_url = Some(value),
            "log_file" => self.log_file = Some(value),
            _ => return false,
        }
        true
    }

    pub fn unset_field(&mut self, key: &str) -> bool {
        match key {
            "customer_id" => self.customer_id = None,
            "control_column" => self.control_column = None,
            "condition" => self.condition = None,
            "threshold1" => self.threshold1 = None,
            "threshold2" => self.threshold2 = None,
            "label" => self.label = None,
            "start_date" => self.start_date = None,
            "end_date" => self.end_date = None,
            "api_url" => self.api_url = None,
            "log_file" => self.log_file = None,
            _ => return false,
        }
        true
    }

    pub fn non_empty_fields(&self) -> Vec<(&str, &str)> {
        KNOWN_KEYS
            .iter()
            .filter_map(|&key| self.get_field(key).map(|v| (key, v)))
            .collect()
    }

    fn merge(&self, other: &Config) -> Config {
        let mut merged = self.clone();
        for &key in KNOWN_KEYS {
            if let Some(value) = other.get_field(key) {
                merged.set_field(key, value.to_string());
            }
        }
        merged.extra.extend(other.extra.clone());
        merged
    }
}

pub fn global_config_dir() -> anyhow::Result<PathBuf> {
    if let Some(explicit) = env::var_os("SAL_CONFIG") {
        let path = PathBuf::from(explicit);
        return Ok(path.parent().map(Path::to_path_buf).unwrap_or(path));
    }
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg).join("sal"));
    }
    dirs::home_dir()
        .map(|path| path.join(".config").join("sal"))
        .ok_or_else(|| anyhow!("$HOME not configured."))
}

pub fn global_path() -> anyhow::Result<PathBuf> {
    if let Some(explicit) = env::var_os("SAL_CONFIG") {
        return Ok(PathBuf::from(explicit));
    }
    Ok(global_config_dir()?.join("config.json"))
}

pub fn load_file(path: &Path) -> Config {
    let file_contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("Warning: could not read {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    let config: Config = match serde_json::from_str(&file_contents) {
        Ok(c) => c,
        Err(e) => {
            print_command_status(
                CommandStatus::Error,
                &format!("Warning: could not read {}: {e}", path.display()),
            );
            return Config::default();
        }
    };

    for key in config.extra.keys() {
        print_command_status(
            CommandStatus::Warning,
            &format!("Warning: unknown config key {} in {}", key, path.display()),
        );
    }

    config
}

pub fn load_global() -> anyhow::Result<Config> {
    Ok(load_file(&global_path()?))
}

/// Merged view: global config overridden by the local one, when present.
pub fn load() -> anyhow::Result<Config> {
    let global = load_global().unwrap_or_default();
    let local = match local_path() {
        Some(p) => load_file(&p),
        None => Config::default(),
    };
    Ok(global.merge(&local))
}

pub fn save_file(path: &Path, config: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.write_all(b"\n")?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}

pub fn find_local_config_dir() -> Option<PathBuf> {
    let home = dirs::home_dir();
    let mut current_dir = std::env::current_dir().ok()?;

    loop {
        if current_dir.join(".sal").is_dir() {
            return Some(current_dir.join(".sal"));
        }
        if current_dir.join(".git").exists() {
            return None;
        }
        if Some(&current_dir) == home.as_ref() {
            return None;
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

pub fn local_path() -> Option<PathBuf> {
    find_local_config_dir().map(|dir| dir.join("config.json"))
}

/// Resolve which config file to write based on --global/--local flags; with
/// neither, a local `.sal` wins over the global file.
pub fn resolve_write_path(global: bool, local: bool) -> anyhow::Result<PathBuf> {
    if global {
        global_path()
    } else if local {
        match local_path() {
            Some(p) => Ok(p),
            None => bail!("No local .sal directory found. Create .sal/ in the project root first."),
        }
    } else {
        match local_path() {
            Some(p) => Ok(p),
            None => global_path(),
        }
    }
}

// --- Typed run settings ---

/// Everything an extraction run needs, validated and typed.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub api_url: String,
    pub access_token: String,
    pub customer_id: CustomerId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub log_file: Option<PathBuf>,
}

/// A validated threshold rule plus the label it assigns.
#[derive(Debug, Clone)]
pub struct RuleSettings {
    pub condition: Condition,
    pub control_column: Metric,
    pub threshold1: f64,
    pub threshold2: f64,
    pub label: String,
}

/// Resolve run settings with CLI/env overrides taking precedence over the
/// merged config file view.
pub fn resolve_run(
    base: &BaseArgs,
    start_date: Option<&str>,
    end_date: Option<&str>,
    config: &Config,
) -> Result<RunSettings> {
    let customer_raw = base
        .customer_id
        .as_deref()
        .or(config.customer_id.as_deref())
        .ok_or_else(|| {
            Error::config(
                "customer id is not configured; pass --customer-id or run \
                 `sal config set customer_id <id>`",
            )
        })?;
    let customer_id: CustomerId = customer_raw.parse()?;

    let access_token = base.token.clone().ok_or_else(|| {
        Error::config("no access token; pass --token or set SAL_ACCESS_TOKEN")
    })?;

    let api_url = base
        .api_url
        .as_deref()
        .or(config.api_url.as_deref())
        .unwrap_or(DEFAULT_API_URL)
        .to_string();

    let start_date = parse_date("start_date", start_date.or(config.start_date.as_deref()))?;
    let end_date = parse_date("end_date", end_date.or(config.end_date.as_deref()))?;

    let log_file = match (&base.log_file, &config.log_file) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(path)) => Some(PathBuf::from(path)),
        (None, None) => global_config_dir().ok().map(|dir| dir.join("run.log")),
    };

    Ok(RunSettings {
        api_url,
        access_token,
        customer_id,
        start_date,
        end_date,
        log_file,
    })
}

/// Resolve the labeling rule, CLI overrides first. `threshold2` defaults to
/// zero; only the bounded operator reads it.
pub fn resolve_rule(
    condition: Option<&str>,
    control_column: Option<&str>,
    threshold1: Option<f64>,
    threshold2: Option<f64>,
    label: Option<&str>,
    config: &Config,
) -> Result<RuleSettings> {
    let condition: Condition = condition
        .or(config.condition.as_deref())
        .ok_or_else(|| Error::config("condition is not configured"))?
        .parse()?;

    let control_column: Metric = control_column
        .or(config.control_column.as_deref())
        .ok_or_else(|| Error::config("control_column is not configured"))?
        .parse()?;

    let threshold1 = match threshold1 {
        Some(value) => value,
        None => parse_threshold("threshold1", config.threshold1.as_deref())?
            .ok_or_else(|| Error::config("threshold1 is not configured"))?,
    };
    let threshold2 = match threshold2 {
        Some(value) => value,
        None => parse_threshold("threshold2", config.threshold2.as_deref())?.unwrap_or(0.0),
    };

    let label = label
        .or(config.label.as_deref())
        .map(str::to_owned)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| Error::config("label text is not configured"))?;

    Ok(RuleSettings {
        condition,
        control_column,
        threshold1,
        threshold2,
        label,
    })
}

fn parse_date(key: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(value) = value else { return Ok(None) };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| Error::config(format!("{key} {trimmed:?} is not a valid YYYY-MM-DD date")))
}

fn parse_threshold(key: &str, value: Option<&str>) -> Result<Option<f64>> {
    let Some(value) = value else { return Ok(None) };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .map(Some)
        .map_err(|_| Error::config(format!("{key} {trimmed:?} is not a number")))
}

// --- CLI commands ---

#[derive(Debug, Clone, Args)]
pub struct ScopeArgs {
    /// Apply to global config (~/.config/sal/config.json)
    #[arg(long, short = 'g', conflicts_with = "local")]
    global: bool,

    /// Apply to local config (.sal/config.json)
    #[arg(long, short = 'l')]
    local: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommands>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommands {
    /// List config values
    List {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Get a config value
    Get {
        /// Config key (customer_id, condition, threshold1, ...)
        key: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Set a config value
    Set {
        /// Config key (customer_id, condition, threshold1, ...)
        key: String,
        /// Value to set
        value: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Remove a config value
    Unset {
        /// Config key (customer_id, condition, threshold1, ...)
        key: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
}

fn validate_key(key: &str) -> anyhow::Result<()> {
    if !KNOWN_KEYS.contains(&key) {
        bail!(
            "Unknown config key: {key}\nValid keys: {}",
            KNOWN_KEYS.join(", ")
        );
    }
    Ok(())
}

fn scoped_config(scope: &ScopeArgs) -> anyhow::Result<Config> {
    if scope.global {
        load_global()
    } else if scope.local {
        match local_path() {
            Some(p) => Ok(load_file(&p)),
            None => bail!("No local .sal directory found."),
        }
    } else {
        load()
    }
}

pub fn run(base: BaseArgs, args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        None => run_list(&base, &ScopeArgs { global: false, local: false }),
        Some(ConfigCommands::List { scope }) => run_list(&base, &scope),
        Some(ConfigCommands::Get { key, scope }) => {
            validate_key(&key)?;
            let config = scoped_config(&scope)?;
            match config.get_field(&key) {
                Some(value) => println!("{value}"),
                None => bail!("{key} is not set"),
            }
            Ok(())
        }
        Some(ConfigCommands::Set { key, value, scope }) => {
            validate_key(&key)?;
            let path = resolve_write_path(scope.global, scope.local)?;
            let mut config = load_file(&path);
            config.set_field(&key, value);
            save_file(&path, &config)?;
            print_command_status(
                CommandStatus::Success,
                &format!("Set {key} in {}", path.display()),
            );
            Ok(())
        }
        Some(ConfigCommands::Unset { key, scope }) => {
            validate_key(&key)?;
            let path = resolve_write_path(scope.global, scope.local)?;
            let mut config = load_file(&path);
            config.unset_field(&key);
            save_file(&path, &config)?;
            print_command_status(
                CommandStatus::Success,
                &format!("Unset {key} in {}", path.display()),
            );
            Ok(())
        }
    }
}

fn run_list(base: &BaseArgs, scope: &ScopeArgs) -> anyhow::Result<()> {
    let config = scoped_config(scope)?;
    if base.json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        for (key, value) in config.non_empty_fields() {
            println!("{key} = {value}");
        }
    }
    Ok(())
}
