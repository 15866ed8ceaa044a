use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::bot::sms::{DEFAULT_API_BASE, SmsConfig};
use crate::bot::{Phone, Settings};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Phone number with WALL/PROMOTE/DEMOTE rights.
    superuser: String,
    /// Our Twilio number, used as the sender of every SMS.
    from_number: String,
    #[serde(default)]
    twilio_account_sid: String,
    #[serde(default)]
    twilio_auth_token: String,
    twilio_api_base: Option<String>,
    /// Log outgoing messages instead of sending them.
    #[serde(default)]
    dry_run: bool,
    #[serde(default = "default_listen_addr")]
    listen_addr: String,
    /// Directory for the database and logs. Defaults to current directory.
    data_dir: Option<String>,
    /// Link appended to the command list.
    help_url: Option<String>,
    #[serde(default = "default_list_limit")]
    list_limit: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_list_limit() -> usize {
    15
}

pub struct Config {
    /// Path to the config file this was loaded from.
    pub config_path: PathBuf,
    pub superuser: Phone,
    pub sms: SmsConfig,
    pub listen_addr: String,
    /// Directory for state files (database, logs).
    pub data_dir: PathBuf,
    pub help_url: Option<String>,
    pub list_limit: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        let superuser = Phone::parse(&file.superuser).ok_or_else(|| {
            ConfigError::Validation(format!("superuser '{}' is not a valid phone number", file.superuser))
        })?;
        if file.from_number.trim().is_empty() {
            return Err(ConfigError::Validation("from_number is required".into()));
        }
        if !file.dry_run && (file.twilio_account_sid.is_empty() || file.twilio_auth_token.is_empty()) {
            return Err(ConfigError::Validation(
                "twilio_account_sid and twilio_auth_token are required unless dry_run is set".into(),
            ));
        }
        if file.list_limit == 0 {
            return Err(ConfigError::Validation("list_limit must be at least 1".into()));
        }

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            config_path,
            superuser,
            sms: SmsConfig {
                account_sid: file.twilio_account_sid,
                auth_token: file.twilio_auth_token,
                from_number: file.from_number.trim().to_string(),
                api_base: file.twilio_api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                dry_run: file.dry_run,
            },
            listen_addr: file.listen_addr,
            data_dir,
            help_url: file.help_url.filter(|u| !u.trim().is_empty()),
            list_limit: file.list_limit,
        })
    }

    pub fn settings(&self) -> Settings {
        Settings {
            superuser: self.superuser.clone(),
            help_url: self.help_url.clone(),
            list_limit: self.list_limit,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("busbot.db")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}
