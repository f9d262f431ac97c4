//! Configuration for the survey inspector.
//!
//! Config root resolution order:
//! 1. Explicit path passed to Config::load_from()
//! 2. SINQ_HOME environment variable
//! 3. Platform config directory (via directories)
//! 4. Fallback: ~/.config/sinq

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding the config root.
pub const HOME_ENV: &str = "SINQ_HOME";

/// Workbook loaded when none is given.
pub const DEFAULT_DATA_FILE: &str = "so_2024_raw.xlsx";

/// Inspector configuration, stored as `config.toml` under the config root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory this config was loaded from. Not serialized.
    #[serde(skip)]
    pub root: PathBuf,

    /// Survey workbook or JSON dump to load.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Where cache files go. Unset = next to the data file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Gzip cache files.
    #[serde(default = "default_true")]
    pub compress_cache: bool,

    /// Read and write the cache at all.
    #[serde(default = "default_true")]
    pub use_cache: bool,

    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Keep shell history in `history.txt` under the config root.
    #[serde(default = "default_true")]
    pub history: bool,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Output formatting knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Choice lists longer than this are truncated in response dumps.
    #[serde(default = "default_max_choices")]
    pub max_choices: usize,

    /// Width of the option column in distribution tables.
    #[serde(default = "default_option_width")]
    pub option_width: usize,

    /// Width of the bar in distribution tables.
    #[serde(default = "default_bar_width")]
    pub bar_width: usize,
}

fn default_data_file() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_FILE)
}

fn default_true() -> bool {
    true
}

fn default_prompt() -> String {
    "(survey)> ".to_string()
}

fn default_max_choices() -> usize {
    10
}

fn default_option_width() -> usize {
    25
}

fn default_bar_width() -> usize {
    15
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_choices: default_max_choices(),
            option_width: default_option_width(),
            bar_width: default_bar_width(),
        }
    }
}

impl Config {
    /// Create a default config rooted at the given directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            data_file: default_data_file(),
            cache_dir: None,
            compress_cache: true,
            use_cache: true,
            prompt: default_prompt(),
            history: true,
            display: DisplayConfig::default(),
        }
    }

    /// Load config from the resolved root, or create default.
    pub fn load() -> Result<Self> {
        let root = resolve_root()?;
        Self::load_from(&root)
    }

    /// Load config from a specific root.
    pub fn load_from(root: &Path) -> Result<Self> {
        let config_path = root.join("config.toml");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
            config.root = root.to_path_buf();
            Ok(config)
        } else {
            Ok(Self::with_root(root))
        }
    }

    /// Save config to ROOT/config.toml.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(self.config_path(), contents)?;
        Ok(())
    }

    // Path helpers

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to the shell history file.
    pub fn history_path(&self) -> PathBuf {
        self.root.join("history.txt")
    }

    /// Directory holding cache files for `source`.
    pub fn cache_dir_for(&self, source: &Path) -> PathBuf {
        match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => source
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }
}

/// Resolve the config root using the standard resolution order.
pub fn resolve_root() -> Result<PathBuf> {
    // 1. Environment variable
    if let Ok(path) = std::env::var(HOME_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // 2. Platform config directory
    if let Some(proj_dirs) = ProjectDirs::from("", "", "sinq") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // 3. Fallback to ~/.config/sinq
    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".config/sinq"))
}
