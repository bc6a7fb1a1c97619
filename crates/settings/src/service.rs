use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary environment variable holding the execution service base URL.
/// （執行服務基底網址的主要環境變數。）
pub const API_URL_ENV: &str = "RUNPAD_API_URL";
/// Legacy variable name, read when the primary one is unset.
/// （舊版環境變數名稱，主要變數未設定時使用。）
pub const LEGACY_API_URL_ENV: &str = "REACT_APP_API_URL";
/// Base URL used when nothing is configured.
/// （未設定時使用的基底網址。）
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Errors raised while resolving the service configuration.
/// （解析服務設定時的錯誤。）
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("execution service URL `{0}` must start with http:// or https://")]
    InvalidUrl(String),
}

/// Where RunPad sends run requests. This is the only externally configurable value.
/// （RunPad 送出執行請求的位置；唯一可由外部設定的值。）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ServiceConfig {
    /// Builds a config from an explicit URL, validating and normalising it.
    /// （以指定網址建立設定，並進行正規化與驗證。）
    pub fn new(base_url: impl Into<String>) -> Result<Self, SettingsError> {
        let mut config = Self {
            base_url: base_url.into(),
        };
        config.sanitize();
        config.validate()?;
        Ok(config)
    }

    /// Resolves the base URL from the process environment.
    /// （從行程環境變數解析基底網址。）
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves using `lookup` in place of the process environment.
    /// （以 `lookup` 取代環境變數進行解析。）
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolved = [API_URL_ENV, LEGACY_API_URL_ENV]
            .into_iter()
            .filter_map(|key| lookup(key))
            .find(|value| !value.trim().is_empty());
        match resolved {
            Some(url) => Self::new(url),
            None => Ok(Self::default()),
        }
    }

    /// Replaces the base URL when `url` is present and non-blank.
    /// （`url` 有值且非空白時取代基底網址。）
    pub fn with_override(self, url: Option<&str>) -> Result<Self, SettingsError> {
        match url {
            Some(url) if !url.trim().is_empty() => Self::new(url),
            _ => Ok(self),
        }
    }

    /// Trims whitespace and trailing slashes; a blank URL falls back to the default.
    /// （移除空白與結尾斜線；空白網址改用預設值。）
    pub fn sanitize(&mut self) {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        self.base_url = if trimmed.is_empty() {
            default_base_url()
        } else {
            trimmed.to_string()
        };
    }

    /// Accepts only `http://` and `https://` URLs.
    /// （僅接受 `http://` 與 `https://` 網址。）
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.base_url.starts_with("http://") || self.base_url.starts_with("https://") {
            Ok(())
        } else {
            Err(SettingsError::InvalidUrl(self.base_url.clone()))
        }
    }

    /// Full URL of the run endpoint.
    /// （執行端點的完整網址。）
    pub fn run_endpoint(&self) -> String {
        format!("{}/run", self.base_url)
    }
}
