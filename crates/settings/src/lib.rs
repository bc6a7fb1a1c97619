pub mod service;

pub use service::{
    ServiceConfig, SettingsError, API_URL_ENV, DEFAULT_API_URL, LEGACY_API_URL_ENV,
};
