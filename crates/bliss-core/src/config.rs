use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "bot-config.json";
pub const CONFIG_PATH_ENV: &str = "BLISS_BOT_CONFIG";
const CATALOG_URL_ENV: &str = "BLISS_CATALOG_URL";
const DOWNLOAD_URL_ENV: &str = "BLISS_DOWNLOAD_URL";
const USER_AGENT_ENV: &str = "BLISS_USER_AGENT";
const SNAPSHOT_FILE: &str = "devices.json";

pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/BlissRoms-Devices/official-devices/main/devices.json";
pub const DEFAULT_DOWNLOAD_URL_TEMPLATE: &str =
    "https://downloads.blissroms.org/api/v1/{codename}/{variant}/";
pub const DEFAULT_USER_AGENT: &str = concat!("bliss-bot/", env!("CARGO_PKG_VERSION"));
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 3 * 60 * 60;

/// How a refresh decides whether freshly fetched catalog bytes differ from the snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDetection {
    /// Byte length only. Same-size edits go unnoticed until the length changes.
    #[default]
    Size,
    Sha256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub catalog_url: String,
    pub download_url_template: String,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub refresh_interval_secs: u64,
    pub snapshot_path: String,
    pub change_detection: ChangeDetection,
    pub authorized_ids: Vec<i64>,
    pub allowed_chats: Vec<i64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.into(),
            download_url_template: DEFAULT_DOWNLOAD_URL_TEMPLATE.into(),
            user_agent: String::new(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            snapshot_path: String::new(),
            change_detection: ChangeDetection::Size,
            authorized_ids: Vec::new(),
            allowed_chats: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Reads the config file named by `BLISS_BOT_CONFIG`, or the default state-dir file,
    /// then layers environment overrides on top.
    ///
    /// A missing default file yields defaults; a missing explicit file is an error.
    pub fn load() -> Result<Self, ConfigError> {
        let (path, required) = match bliss_util::env_var(CONFIG_PATH_ENV) {
            Some(path) => (bliss_util::expand_user(&path), true),
            None => (default_config_path(), false),
        };
        let mut cfg = Self::from_file(&path, required)?;
        cfg.apply_overrides(bliss_util::env_var);
        Ok(cfg)
    }

    pub fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str::<BotConfig>(&data).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                }
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound && !required => {
                Ok(BotConfig::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(CATALOG_URL_ENV) {
            self.catalog_url = url;
        }
        if let Some(template) = lookup(DOWNLOAD_URL_ENV) {
            self.download_url_template = template;
        }
        if let Some(agent) = lookup(USER_AGENT_ENV) {
            self.user_agent = agent;
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        bliss_util::write_json_atomic(path, self)
    }

    pub fn user_agent(&self) -> &str {
        let agent = self.user_agent.trim();
        if agent.is_empty() {
            DEFAULT_USER_AGENT
        } else {
            agent
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(60))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        if self.snapshot_path.trim().is_empty() {
            bliss_util::state_file_path(SNAPSHOT_FILE)
        } else {
            bliss_util::expand_user(self.snapshot_path.trim())
        }
    }
}

pub fn default_config_path() -> PathBuf {
    bliss_util::state_file_path(CONFIG_FILE)
}
