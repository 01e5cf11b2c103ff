//! Worker configuration
//!
//! Loaded from TOML, then overridden from the environment:
//! - `TICKET_BOT_ADMINS` / `TICKET_BOT_HELPERS`: comma-separated user ids
//! - `TICKET_PREMIUM_ONLY` / `TICKET_WHITELABEL`: booleans

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use ticket_access::{DenialLinks, StaffAllowlist};
use ticket_command::TAG_TIMEOUT;
use ticket_dispatch::DispatchSettings;
use ticket_model::UserId;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/ticket-worker.toml";

/// Configuration failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for [`WorkerConfig`]
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Environment override could not be parsed
    #[error("invalid value for {var}: {value}")]
    Env {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// Semantically invalid setting
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Bot identity and links
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot administrators
    pub admins: Vec<UserId>,
    /// Bot helpers
    pub helpers: Vec<UserId>,
    /// Support server invite
    pub support_server_invite: String,
    /// Documentation root
    pub docs_url: String,
    /// Dashboard root
    pub dashboard_url: String,
    /// Premium purchase page
    pub premium_url: String,
    /// Vote page
    pub vote_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        let settings = DispatchSettings::default();
        Self {
            admins: Vec::new(),
            helpers: Vec::new(),
            support_server_invite: settings.support_server_invite,
            docs_url: settings.docs_url,
            dashboard_url: settings.dashboard_url,
            premium_url: settings.links.premium_url,
            vote_url: settings.links.vote_url,
        }
    }
}

/// Dispatch deadlines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Shared deadline for the permission and premium lookups
    pub authorization_timeout_ms: u64,
    /// Deadline for the staff lookup behind error replies
    pub error_lookup_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            authorization_timeout_ms: 2_000,
            error_lookup_timeout_ms: 3_000,
        }
    }
}

/// Blacklist cache sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries per cache
    pub capacity: u64,
    /// Time to live
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: ticket_access::blacklist::DEFAULT_CACHE_CAPACITY,
            ttl_secs: 300,
        }
    }
}

/// Worker configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Bot identity and links
    pub bot: BotConfig,
    /// Dispatch deadlines
    pub dispatch: DispatchConfig,
    /// Serve premium guilds only
    pub premium_only: bool,
    /// Whitelabel deployment
    pub whitelabel: bool,
    /// Blacklist cache sizing
    pub blacklist_cache: CacheConfig,
}

impl WorkerConfig {
    /// Load `path` (defaults when absent), apply the environment and validate
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml(&raw)?
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Self::default()
        };

        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML without validating
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`].
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply environment overrides read through `lookup`
    ///
    /// # Errors
    ///
    /// [`ConfigError::Env`] for unparsable values.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("TICKET_BOT_ADMINS") {
            self.bot.admins = parse_ids("TICKET_BOT_ADMINS", &raw)?;
        }
        if let Some(raw) = lookup("TICKET_BOT_HELPERS") {
            self.bot.helpers = parse_ids("TICKET_BOT_HELPERS", &raw)?;
        }
        if let Some(raw) = lookup("TICKET_PREMIUM_ONLY") {
            self.premium_only = parse_bool("TICKET_PREMIUM_ONLY", &raw)?;
        }
        if let Some(raw) = lookup("TICKET_WHITELABEL") {
            self.whitelabel = parse_bool("TICKET_WHITELABEL", &raw)?;
        }
        Ok(())
    }

    /// Reject settings the worker cannot run with
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.authorization_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.authorization_timeout_ms must be positive".into(),
            ));
        }
        if self.dispatch.error_lookup_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.error_lookup_timeout_ms must be positive".into(),
            ));
        }
        if self.blacklist_cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "blacklist_cache.capacity must be positive".into(),
            ));
        }
        if self.blacklist_cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "blacklist_cache.ttl_secs must be positive".into(),
            ));
        }
        self.check_command_timeout("tag aliases", TAG_TIMEOUT)
    }

    /// Reject a command whose deadline leaves no room after authorization
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] when the authorization deadline is not
    /// shorter than `timeout`.
    pub fn check_command_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<(), ConfigError> {
        if self.authorization_timeout() >= timeout {
            return Err(ConfigError::Invalid(format!(
                "dispatch.authorization_timeout_ms ({}) must be shorter than the {}ms timeout of {command}",
                self.dispatch.authorization_timeout_ms,
                timeout.as_millis()
            )));
        }
        Ok(())
    }

    /// Authorization lookup deadline
    #[must_use]
    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch.authorization_timeout_ms)
    }

    /// Blacklist cache time to live
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.blacklist_cache.ttl_secs)
    }

    /// Bot admin and helper allowlist
    #[must_use]
    pub fn staff(&self) -> StaffAllowlist {
        StaffAllowlist::new(
            self.bot.admins.iter().copied(),
            self.bot.helpers.iter().copied(),
        )
    }

    /// Settings handed to the dispatcher
    #[must_use]
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            premium_only: self.premium_only,
            whitelabel: self.whitelabel,
            links: DenialLinks {
                premium_url: self.bot.premium_url.clone(),
                vote_url: self.bot.vote_url.clone(),
            },
            support_server_invite: self.bot.support_server_invite.clone(),
            docs_url: self.bot.docs_url.clone(),
            dashboard_url: self.bot.dashboard_url.clone(),
            error_lookup_timeout: Duration::from_millis(self.dispatch.error_lookup_timeout_ms),
        }
    }
}

fn parse_ids(var: &'static str, raw: &str) -> Result<Vec<UserId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse().map_err(|_| ConfigError::Env {
                var,
                value: raw.to_owned(),
            })
        })
        .collect()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Env {
            var,
            value: raw.to_owned(),
        }),
    }
}
