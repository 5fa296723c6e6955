//! Layered CLI configuration: flags over environment over
//! `~/.machinery/config.toml` over built-in defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "https://api.machinery.dev";
const CONFIG_DIR: &str = ".machinery";
const CONFIG_FILE: &str = "config.toml";

const ENV_API_URL: &str = "MACHINERY_API_URL";
const ENV_TOKEN: &str = "MACHINERY_TOKEN";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub token: Option<String>,
}

impl FileConfig {
    /// Reads the config file if one exists; a missing file is not an error,
    /// an unreadable or malformed one is.
    pub fn load() -> Result<Self> {
        let Some(path) = config_path() else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config at {}", path.display()))
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Effective settings for one invocation.
#[derive(Debug)]
pub struct Settings {
    pub api_url: String,
    pub token: Option<String>,
}

pub fn resolve(flag_api_url: Option<String>, flag_token: Option<String>) -> Result<Settings> {
    let file = FileConfig::load()?;
    Ok(layer(
        flag_api_url,
        flag_token,
        std::env::var(ENV_API_URL).ok(),
        std::env::var(ENV_TOKEN).ok(),
        file,
    ))
}

fn layer(
    flag_api_url: Option<String>,
    flag_token: Option<String>,
    env_api_url: Option<String>,
    env_token: Option<String>,
    file: FileConfig,
) -> Settings {
    Settings {
        api_url: flag_api_url
            .or(env_api_url)
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        token: flag_token.or(env_token).or(file.token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(api_url: Option<&str>, token: Option<&str>) -> FileConfig {
        FileConfig {
            api_url: api_url.map(String::from),
            token: token.map(String::from),
        }
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let settings = layer(None, None, None, None, FileConfig::default());
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert!(settings.token.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let settings = layer(
            None,
            None,
            None,
            None,
            file(Some("https://staging.machinery.dev"), Some("tok_file")),
        );
        assert_eq!(settings.api_url, "https://staging.machinery.dev");
        assert_eq!(settings.token.as_deref(), Some("tok_file"));
    }

    #[test]
    fn test_env_overrides_file() {
        let settings = layer(
            None,
            None,
            Some("https://env.machinery.dev".to_string()),
            Some("tok_env".to_string()),
            file(Some("https://file.machinery.dev"), Some("tok_file")),
        );
        assert_eq!(settings.api_url, "https://env.machinery.dev");
        assert_eq!(settings.token.as_deref(), Some("tok_env"));
    }

    #[test]
    fn test_flags_override_everything() {
        let settings = layer(
            Some("https://flag.machinery.dev".to_string()),
            Some("tok_flag".to_string()),
            Some("https://env.machinery.dev".to_string()),
            Some("tok_env".to_string()),
            file(Some("https://file.machinery.dev"), Some("tok_file")),
        );
        assert_eq!(settings.api_url, "https://flag.machinery.dev");
        assert_eq!(settings.token.as_deref(), Some("tok_flag"));
    }

    #[test]
    fn test_layers_are_independent_per_field() {
        let settings = layer(
            Some("https://flag.machinery.dev".to_string()),
            None,
            None,
            None,
            file(None, Some("tok_file")),
        );
        assert_eq!(settings.api_url, "https://flag.machinery.dev");
        assert_eq!(settings.token.as_deref(), Some("tok_file"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let err = toml::from_str::<FileConfig>("api_url = [1, 2]").unwrap_err();
        assert!(err.to_string().contains("api_url"));
    }
}
