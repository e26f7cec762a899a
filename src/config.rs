use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_CASK_FILE: &str = "brew-cask.txt";
pub const DEFAULT_FORMULA_FILE: &str = "brew-formula.txt";
pub const DEFAULT_LOG_FILE: &str = "brew_reinstall.log";
pub const DEFAULT_BREW: &str = "brew";

/// Optional overrides read from `config.toml`. CLI flags win over these.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub brew: Option<String>,
    #[serde(default)]
    pub cask_file: Option<PathBuf>,
    #[serde(default)]
    pub formula_file: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME").map(PathBuf::from).unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        PathBuf::from(format!("{home}/.config"))
    }).join("brew-restore")
}

pub fn default_config_path() -> PathBuf { config_dir().join("config.toml") }

/// A missing file is an empty config; anything unreadable or malformed is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    match fs::read_to_string(path) {
        Ok(s) => toml::from_str(&s).with_context(|| format!("parsing {}", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}
