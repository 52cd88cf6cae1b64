//! Configuration management for crosspost
//!
//! Every platform reads its own prefixed group of environment variables:
//!
//! | Platform | Variables |
//! |----------|-----------|
//! | VK       | `VK_ACCESS_TOKEN`, `VK_GROUP_ID`, `VK_ALBUM_ID` |
//! | Telegram | `TELEGRAM_ACCESS_TOKEN`, `TELEGRAM_CHAT_ID`, `TELEGRAM_PROXIES` (optional) |
//! | Facebook | `FACEBOOK_ACCESS_TOKEN`, `FACEBOOK_GROUP_ID` |
//!
//! Variables are first deserialized as raw strings with `envy`, then validated
//! into typed configs, so that a malformed value names its variable.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

pub const VK_PREFIX: &str = "VK_";
pub const TELEGRAM_PREFIX: &str = "TELEGRAM_";
pub const FACEBOOK_PREFIX: &str = "FACEBOOK_";

#[derive(Debug, Clone)]
pub struct VkConfig {
    pub access_token: SecretString,
    /// Community id, positive; the wall owner is `-group_id`
    pub group_id: u64,
    pub album_id: u64,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub access_token: SecretString,
    /// Numeric id or `@channel` username
    pub chat_id: String,
    pub proxy: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FacebookConfig {
    pub access_token: SecretString,
    pub group_id: String,
}

#[derive(Deserialize)]
struct RawVk {
    access_token: String,
    group_id: String,
    album_id: String,
}

#[derive(Deserialize)]
struct RawTelegram {
    access_token: String,
    chat_id: String,
    proxies: Option<String>,
}

#[derive(Deserialize)]
struct RawFacebook {
    access_token: String,
    group_id: String,
}

impl VkConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect::<Vec<_>>())
    }

    pub fn from_vars(vars: &[(String, String)]) -> Result<Self, ConfigError> {
        let raw: RawVk = read_prefixed(VK_PREFIX, vars)?;

        Ok(Self {
            access_token: required_secret(VK_PREFIX, "access_token", raw.access_token)?,
            group_id: parse_id(VK_PREFIX, "group_id", &raw.group_id)?,
            album_id: parse_id(VK_PREFIX, "album_id", &raw.album_id)?,
        })
    }
}

impl TelegramConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect::<Vec<_>>())
    }

    pub fn from_vars(vars: &[(String, String)]) -> Result<Self, ConfigError> {
        let raw: RawTelegram = read_prefixed(TELEGRAM_PREFIX, vars)?;

        Ok(Self {
            access_token: required_secret(TELEGRAM_PREFIX, "access_token", raw.access_token)?,
            chat_id: required(TELEGRAM_PREFIX, "chat_id", raw.chat_id)?,
            // An empty proxy variable means "no proxy", as it does for curl
            proxy: raw.proxies.filter(|p| !p.trim().is_empty()),
        })
    }
}

impl FacebookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect::<Vec<_>>())
    }

    pub fn from_vars(vars: &[(String, String)]) -> Result<Self, ConfigError> {
        let raw: RawFacebook = read_prefixed(FACEBOOK_PREFIX, vars)?;

        Ok(Self {
            access_token: required_secret(FACEBOOK_PREFIX, "access_token", raw.access_token)?,
            group_id: required(FACEBOOK_PREFIX, "group_id", raw.group_id)?,
        })
    }
}

fn read_prefixed<T>(prefix: &str, vars: &[(String, String)]) -> Result<T, ConfigError>
where
    T: serde::de::DeserializeOwned,
{
    envy::prefixed(prefix)
        .from_iter(vars.iter().cloned())
        .map_err(|e| ConfigError::from_envy(prefix, e))
}

fn var_name(prefix: &str, field: &str) -> String {
    format!("{}{}", prefix, field.to_uppercase())
}

fn required(prefix: &str, field: &str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ConfigError::Invalid {
            var: var_name(prefix, field),
            reason: "value is empty".to_string(),
        });
    }
    Ok(value)
}

fn required_secret(prefix: &str, field: &str, value: String) -> Result<SecretString, ConfigError> {
    required(prefix, field, value).map(SecretString::from)
}

fn parse_id(prefix: &str, field: &str, value: &str) -> Result<u64, ConfigError> {
    let value = value.trim();
    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var: var_name(prefix, field),
            reason: "id must be positive".to_string(),
        }),
        Ok(id) => Ok(id),
        Err(e) => Err(ConfigError::Invalid {
            var: var_name(prefix, field),
            reason: format!("'{}' is not a valid id: {}", value, e),
        }),
    }
}

/// Load variables from a dotenv file without overriding the process
/// environment
///
/// With an explicit `path` the file must exist. Without one, `.env` is
/// looked up from the working directory upwards and silently skipped when
/// absent. Returns the file that was loaded, if any.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)?;
            Ok(Some(path.to_path_buf()))
        }
        None => match dotenvy::dotenv() {
            Ok(path) => Ok(Some(path)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(ConfigError::Dotenv(e)),
        },
    }
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}
