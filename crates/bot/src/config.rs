use std::{
    fs, io,
    path::Path,
    time::Duration,
};

use ops::{default_base_tools, DEFAULT_PACKAGE_MANAGER};
use serde::Deserialize;
use shared::{error::ConfigError, protocol::MenuStyle};
use telegram::DEFAULT_API_URL;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "bot.toml";

const DEFAULT_POLL_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_COMMAND_TIMEOUT_SECONDS: u64 = 600;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub bot_token: String,
    /// Only this sender may use the bot; 0 lets everyone in.
    pub admin_chat_id: i64,
    pub poll_timeout_seconds: u64,
    pub command_timeout_seconds: u64,
    pub menu_style: MenuStyle,
    pub base_tools: Vec<String>,
    pub package_manager: String,
    pub api_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_chat_id: 0,
            poll_timeout_seconds: DEFAULT_POLL_TIMEOUT_SECONDS,
            command_timeout_seconds: DEFAULT_COMMAND_TIMEOUT_SECONDS,
            menu_style: MenuStyle::Inline,
            base_tools: default_base_tools(),
            package_manager: DEFAULT_PACKAGE_MANAGER.into(),
            api_url: DEFAULT_API_URL.into(),
        }
    }
}

/// Shape of `bot.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileSettings {
    bot_token: Option<String>,
    admin_chat_id: Option<i64>,
    poll_timeout_seconds: Option<i64>,
    command_timeout_seconds: Option<i64>,
    menu_style: Option<String>,
    base_tools: Option<Vec<String>>,
    package_manager: Option<String>,
    api_url: Option<String>,
}

impl Settings {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }

        let url = Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl {
                url: self.api_url.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        if self.package_manager.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "package_manager".into(),
                value: self.package_manager.clone(),
            });
        }
        Ok(())
    }

    fn apply_file(&mut self, file: FileSettings) -> Result<(), ConfigError> {
        if let Some(v) = file.bot_token {
            self.bot_token = v;
        }
        if let Some(v) = file.admin_chat_id {
            self.admin_chat_id = v;
        }
        if let Some(v) = file.poll_timeout_seconds.and_then(positive) {
            self.poll_timeout_seconds = v;
        }
        if let Some(v) = file.command_timeout_seconds.and_then(positive) {
            self.command_timeout_seconds = v;
        }
        if let Some(v) = file.menu_style {
            self.menu_style = parse_menu_style(&v)?;
        }
        if let Some(v) = file.base_tools {
            self.base_tools = v
                .into_iter()
                .map(|tool| tool.trim().to_string())
                .filter(|tool| !tool.is_empty())
                .collect();
        }
        if let Some(v) = file.package_manager {
            self.package_manager = v;
        }
        if let Some(v) = file.api_url {
            self.api_url = v;
        }
        Ok(())
    }

    /// Applies environment overrides. `APP__*` names win over the plain ones.
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, alias: &str| lookup(alias).or_else(|| lookup(key));

        if let Some(v) = var("TELEGRAM_BOT_TOKEN", "APP__BOT_TOKEN") {
            self.bot_token = v;
        }
        if let Some(v) = var("ADMIN_CHAT_ID", "APP__ADMIN_CHAT_ID") {
            self.admin_chat_id = parse_admin_id(&v)?;
        }
        if let Some(v) = var("POLL_TIMEOUT_SECONDS", "APP__POLL_TIMEOUT_SECONDS") {
            if let Some(seconds) = parse_seconds(&v) {
                self.poll_timeout_seconds = seconds;
            }
        }
        if let Some(v) = var("COMMAND_TIMEOUT_SECONDS", "APP__COMMAND_TIMEOUT_SECONDS") {
            if let Some(seconds) = parse_seconds(&v) {
                self.command_timeout_seconds = seconds;
            }
        }
        if let Some(v) = var("MENU_STYLE", "APP__MENU_STYLE") {
            self.menu_style = parse_menu_style(&v)?;
        }
        if let Some(v) = var("BASE_TOOLS", "APP__BASE_TOOLS") {
            self.base_tools = parse_tool_list(&v);
        }
        if let Some(v) = var("PACKAGE_MANAGER", "APP__PACKAGE_MANAGER") {
            self.package_manager = v;
        }
        if let Some(v) = var("TELEGRAM_API_URL", "APP__API_URL") {
            self.api_url = v;
        }
        Ok(())
    }
}

/// Defaults, then the TOML file, then the environment.
///
/// Without an explicit `path`, `bot.toml` in the working directory is read
/// if it exists.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with<F>(path: Option<&Path>, lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_PATH), false),
    };
    if let Some(file) = read_file(path, required)? {
        settings.apply_file(file)?;
    }

    settings.apply_env(lookup)?;
    Ok(settings)
}

fn read_file(path: &Path, required: bool) -> Result<Option<FileSettings>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound && !required => return Ok(None),
        Err(e) => return Err(file_error(path, e)),
    };
    toml::from_str(&raw).map(Some).map_err(|e| file_error(path, e))
}

fn file_error(path: &Path, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::File {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn positive(value: i64) -> Option<u64> {
    u64::try_from(value).ok().filter(|v| *v > 0)
}

/// Non-numeric and non-positive values are ignored.
fn parse_seconds(raw: &str) -> Option<u64> {
    raw.trim().parse::<i64>().ok().and_then(positive)
}

/// An empty value means "everyone"; anything else must be a number.
fn parse_admin_id(raw: &str) -> Result<i64, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: "ADMIN_CHAT_ID".into(),
        value: raw.into(),
    })
}

fn parse_menu_style(raw: &str) -> Result<MenuStyle, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "inline" => Ok(MenuStyle::Inline),
        "reply" => Ok(MenuStyle::Reply),
        _ => Err(ConfigError::InvalidMenuStyle(raw.into())),
    }
}

fn parse_tool_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tool| !tool.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
