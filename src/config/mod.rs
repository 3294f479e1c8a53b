//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSettings, CodeSettings, KeyDeriverSettings, LogFormat, LoggingConfig,
    RateLimitSettings, StorageSettings,
};
