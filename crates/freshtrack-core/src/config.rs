use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use freshtrack_mail::SmtpSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::expiry::NotificationWindow;

/// Main configuration structure
///
/// Loaded from an optional TOML file, then environment variables on top.
/// Priority: Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load config from file (if present) and the process environment
    pub fn load() -> crate::Result<Self> {
        let config_path = match std::env::var_os("FRESHTRACK_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            Self::from_toml_str(&contents)?
        } else {
            debug!("No config file at {}, using defaults", config_path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        toml::from_str(contents)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Overlay values from environment-style variables
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.server.port = parse_var("PORT", &port)?;
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(service) = lookup("EMAIL_SERVICE") {
            self.mail.service = service;
        }
        if let Some(user) = lookup("EMAIL_USER") {
            self.mail.user = Some(user);
        }
        if let Some(password) = lookup("EMAIL_PASSWORD") {
            self.mail.password = Some(password);
        }
        if let Some(from) = lookup("EMAIL_FROM") {
            self.mail.from = Some(from);
        }
        if let Some(recipient) = lookup("NOTIFICATION_EMAIL") {
            self.notifications.recipient = Some(recipient);
        }
        if let Some(days) = lookup("NOTIFICATION_WINDOW_DAYS") {
            self.notifications.window_days = parse_var("NOTIFICATION_WINDOW_DAYS", &days)?;
        }
        if let Some(at) = lookup("NOTIFY_AT") {
            self.notifications.notify_at = at;
        }
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.notifications.window()?;
        self.notifications.notify_time()?;
        Ok(())
    }

    /// Get the config file path
    fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::Config("Could not find config directory".into()))?
            .join("freshtrack");

        Ok(config_dir.join("config.toml"))
    }
}

fn parse_var<T>(key: &str, value: &str) -> crate::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {} value {:?}: {}", key, value, e)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding tracked products
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("freshtrack").join("products.db"))
        .unwrap_or_else(|| PathBuf::from("freshtrack.db"))
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Provider name (gmail, outlook, ...) or SMTP relay host
    #[serde(default = "default_mail_service")]
    pub service: String,

    pub user: Option<String>,

    /// Never has a default; supply it via file or `EMAIL_PASSWORD`
    pub password: Option<String>,

    /// Sender address, falls back to `user`
    pub from: Option<String>,

    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

fn default_mail_service() -> String {
    "gmail".to_string()
}

fn default_mail_timeout() -> u64 {
    30
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            service: default_mail_service(),
            user: None,
            password: None,
            from: None,
            timeout_secs: default_mail_timeout(),
        }
    }
}

impl MailConfig {
    pub fn smtp_settings(&self) -> crate::Result<SmtpSettings> {
        let user = self
            .user
            .clone()
            .ok_or_else(|| crate::Error::Config("EMAIL_USER is not set".into()))?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| crate::Error::Config("EMAIL_PASSWORD is not set".into()))?;

        Ok(SmtpSettings {
            service: self.service.clone(),
            user,
            password,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    /// Address used in the From header
    pub fn sender(&self) -> Option<&str> {
        self.from.as_deref().or(self.user.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Operator address for the daily digest
    pub recipient: Option<String>,

    /// Days before expiry at which a product becomes eligible
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Local time of the daily run, `HH:MM`
    #[serde(default = "default_notify_at")]
    pub notify_at: String,
}

fn default_window_days() -> u32 {
    7
}

fn default_notify_at() -> String {
    "09:00".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            window_days: default_window_days(),
            notify_at: default_notify_at(),
        }
    }
}

impl NotificationConfig {
    pub fn window(&self) -> crate::Result<NotificationWindow> {
        NotificationWindow::new(self.window_days)
            .map_err(|_| crate::Error::Config("notification window must be at least 1 day".into()))
    }

    pub fn notify_time(&self) -> crate::Result<NaiveTime> {
        let raw = self.notify_at.trim();
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|_| crate::Error::Config(format!("Invalid NOTIFY_AT time {:?}", raw)))
    }
}
