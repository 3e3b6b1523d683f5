use std::fs;

use serde::Deserialize;
use tracing::warn;
use url::Url;

use crate::error::ClientError;

pub const SETTINGS_FILE: &str = "mvj.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// API root; always ends with `/` after normalization.
    pub api_url: String,
    /// Bearer token placed in the auth slice at start-up.
    pub api_token: Option<String>,
    /// Page size used by list commands.
    pub page_size: u32,
    /// `tracing-subscriber` filter directive.
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/v1/".into(),
            api_token: None,
            page_size: 25,
            log_filter: "info".into(),
        }
    }
}

impl ClientSettings {
    pub fn api_base(&self) -> Result<Url, ClientError> {
        let url = Url::parse(&self.api_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Settings(format!(
                "api_url must be http or https, got {}",
                url.scheme()
            )));
        }
        Ok(url)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    api_token: Option<String>,
    page_size: Option<u32>,
    log_filter: Option<String>,
}

/// Defaults, then `mvj.toml` in the working directory, then the environment.
pub fn load_settings() -> ClientSettings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    resolve_settings(file.as_deref(), |key| std::env::var(key).ok())
}

pub fn resolve_settings(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Some(raw) = file {
        match toml::from_str::<FileSettings>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.api_url {
                    settings.api_url = v;
                }
                if file_cfg.api_token.is_some() {
                    settings.api_token = file_cfg.api_token;
                }
                if let Some(v) = file_cfg.page_size {
                    settings.page_size = v;
                }
                if let Some(v) = file_cfg.log_filter {
                    settings.log_filter = v;
                }
            }
            Err(err) => warn!("ignoring unreadable {SETTINGS_FILE}: {err}"),
        }
    }

    if let Some(v) = env("MVJ_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("MVJ_API_TOKEN") {
        settings.api_token = Some(v);
    }
    if let Some(v) = env("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }

    if let Some(v) = env("APP__PAGE_SIZE") {
        match v.parse::<u32>() {
            Ok(parsed) if parsed > 0 => settings.page_size = parsed,
            _ => warn!("ignoring invalid APP__PAGE_SIZE={v}"),
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings.api_url = normalize_api_url(&settings.api_url);
    settings.api_token = settings.api_token.filter(|token| !token.trim().is_empty());
    settings
}

/// Trims, defaults the scheme to `http://` and guarantees a trailing slash so
/// relative resource paths join under the API prefix.
pub fn normalize_api_url(raw_api_url: &str) -> String {
    let raw_api_url = raw_api_url.trim();
    if raw_api_url.is_empty() {
        return ClientSettings::default().api_url;
    }

    let with_scheme = if raw_api_url.contains("://") {
        raw_api_url.to_string()
    } else {
        format!("http://{raw_api_url}")
    };

    if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
