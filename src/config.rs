// config.rs
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{MpesaError, Result};

pub const SANDBOX_BASE_URL: &str = "https://apisandbox.safaricom.et";
pub const PRODUCTION_BASE_URL: &str = "https://apis.safaricom.et";

pub const DEFAULT_REQUEST_TIMEOUT: i64 = 30;
pub const DEFAULT_MAX_RETRIES: i64 = 3;
pub const DEFAULT_RETRY_DELAY_MS: i64 = 1000;
pub const DEFAULT_CACHE_TTL: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Sandbox => SANDBOX_BASE_URL,
            Environment::Production => PRODUCTION_BASE_URL,
        }
    }
}

impl FromStr for Environment {
    type Err = MpesaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Environment::Sandbox),
            "production" => Ok(Environment::Production),
            _ => Err(MpesaError::invalid_data(
                "Environment must be either 'sandbox' or 'production'",
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub log_to_file: bool,
    pub log_to_console: bool,
    pub min_log_level: String,
    pub log_format: Option<String>,
    pub max_file_size: Option<u64>,
    pub max_files: Option<usize>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_dir: "logs".to_string(),
            log_to_file: true,
            log_to_console: false,
            min_log_level: "debug".to_string(),
            log_format: None,
            max_file_size: None,
            max_files: None,
        }
    }
}

/// Partial logging settings; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct LoggingOverrides {
    pub log_dir: Option<String>,
    pub log_to_file: Option<bool>,
    pub log_to_console: Option<bool>,
    pub min_log_level: Option<String>,
    pub log_format: Option<String>,
    pub max_file_size: Option<u64>,
    pub max_files: Option<usize>,
}

impl LoggingConfig {
    pub fn merged(overrides: LoggingOverrides) -> Self {
        let defaults = LoggingConfig::default();
        LoggingConfig {
            log_dir: overrides.log_dir.unwrap_or(defaults.log_dir),
            log_to_file: overrides.log_to_file.unwrap_or(defaults.log_to_file),
            log_to_console: overrides.log_to_console.unwrap_or(defaults.log_to_console),
            min_log_level: overrides.min_log_level.unwrap_or(defaults.min_log_level),
            log_format: overrides.log_format.or(defaults.log_format),
            max_file_size: overrides.max_file_size.or(defaults.max_file_size),
            max_files: overrides.max_files.or(defaults.max_files),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub ttl: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: false,
            directory: std::env::temp_dir().join("mpesa-sdk-cache"),
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Bulk options applied by `Config::set_options`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub request_timeout: Option<i64>,
    pub max_retries: Option<i64>,
    pub retry_delay: Option<i64>,
    pub verify_ssl: Option<bool>,
    pub use_cache: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl: Option<i64>,
    pub logging: Option<LoggingOverrides>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    base_url: String,
    consumer_key: String,
    consumer_secret: String,
    passkey: String,
    shortcode: String,
    environment: Environment,
    verify_ssl: bool,
    request_timeout: i64,
    max_retries: i64,
    retry_delay: i64,
    cache: CacheConfig,
    logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: SANDBOX_BASE_URL.to_string(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            passkey: String::new(),
            shortcode: String::new(),
            environment: Environment::Sandbox,
            verify_ssl: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_MS,
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Config {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        passkey: impl Into<String>,
        shortcode: impl Into<String>,
    ) -> Self {
        Config {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            passkey: passkey.into(),
            shortcode: shortcode.into(),
            ..Config::default()
        }
    }

    /// Loads the recognized `MPESA_*` keys from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Same as `from_env`, over an explicit set of key/value pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let var = |key: &str| vars.get(key).cloned();

        let mut config = Config::default();
        if let Some(env) = var("MPESA_ENVIRONMENT") {
            config.set_environment(&env)?;
        }
        if let Some(base_url) = var("MPESA_BASE_URL") {
            config.base_url = base_url;
        }
        config.consumer_key = var("MPESA_CONSUMER_KEY").unwrap_or_default();
        config.consumer_secret = var("MPESA_CONSUMER_SECRET").unwrap_or_default();
        config.passkey = var("MPESA_PASSKEY").unwrap_or_default();
        config.shortcode = var("MPESA_SHORTCODE").unwrap_or_default();

        config.set_logging_config(LoggingOverrides {
            log_dir: var("MPESA_LOG_DIR"),
            log_to_file: var("MPESA_LOG_TO_FILE").map(|v| parse_bool(&v)),
            log_to_console: var("MPESA_LOG_TO_CONSOLE").map(|v| parse_bool(&v)),
            min_log_level: var("MPESA_MIN_LOG_LEVEL"),
            ..LoggingOverrides::default()
        });

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.consumer_key.is_empty() {
            return Err(MpesaError::invalid_data("Consumer Key is required"));
        }
        if self.consumer_secret.is_empty() {
            return Err(MpesaError::invalid_data("Consumer Secret is required"));
        }
        if self.request_timeout < 1 {
            return Err(MpesaError::invalid_data(
                "Request timeout must be at least 1 second",
            ));
        }
        if self.max_retries < 0 {
            return Err(MpesaError::invalid_data("Maximum retries cannot be negative"));
        }
        if self.retry_delay < 0 {
            return Err(MpesaError::invalid_data("Retry delay cannot be negative"));
        }

        if self.cache.enabled {
            if self.cache.ttl < 0 {
                return Err(MpesaError::invalid_data("Cache TTL cannot be negative"));
            }
            let writable = std::fs::metadata(&self.cache.directory)
                .map(|meta| meta.is_dir() && !meta.permissions().readonly())
                .unwrap_or(false);
            if !writable {
                return Err(MpesaError::invalid_data(format!(
                    "Cache directory is not writable: {}",
                    self.cache.directory.display()
                )));
            }
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        self.base_url = base_url.into();
        self
    }

    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    pub fn set_consumer_key(&mut self, key: impl Into<String>) -> &mut Self {
        self.consumer_key = key.into();
        self
    }

    pub fn consumer_secret(&self) -> &str {
        &self.consumer_secret
    }

    pub fn set_consumer_secret(&mut self, secret: impl Into<String>) -> &mut Self {
        self.consumer_secret = secret.into();
        self
    }

    pub fn passkey(&self) -> &str {
        &self.passkey
    }

    pub fn set_passkey(&mut self, passkey: impl Into<String>) -> &mut Self {
        self.passkey = passkey.into();
        self
    }

    pub fn shortcode(&self) -> &str {
        &self.shortcode
    }

    pub fn set_shortcode(&mut self, shortcode: impl Into<String>) -> &mut Self {
        self.shortcode = shortcode.into();
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Switches environment and points the base URL at that environment's endpoint.
    pub fn set_environment(&mut self, environment: &str) -> Result<&mut Self> {
        let environment: Environment = environment.parse()?;
        self.environment = environment;
        self.base_url = environment.base_url().to_string();
        Ok(self)
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn set_verify_ssl(&mut self, verify: bool) -> &mut Self {
        self.verify_ssl = verify;
        self
    }

    pub fn request_timeout(&self) -> i64 {
        self.request_timeout
    }

    pub fn set_request_timeout(&mut self, seconds: i64) -> &mut Self {
        self.request_timeout = seconds;
        self
    }

    pub fn max_retries(&self) -> i64 {
        self.max_retries
    }

    pub fn retry_delay(&self) -> i64 {
        self.retry_delay
    }

    pub fn set_retry_config(&mut self, max_retries: i64, retry_delay_ms: i64) -> &mut Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay_ms;
        self
    }

    pub fn caching(&self) -> &CacheConfig {
        &self.cache
    }

    pub fn set_caching(
        &mut self,
        enabled: bool,
        directory: Option<PathBuf>,
        ttl: Option<i64>,
    ) -> Result<&mut Self> {
        self.cache.enabled = enabled;
        if let Some(directory) = directory {
            self.cache.directory = directory;
        }
        if let Some(ttl) = ttl {
            self.cache.ttl = ttl;
        }
        if enabled && !self.cache.directory.is_dir() {
            std::fs::create_dir_all(&self.cache.directory).map_err(|e| {
                MpesaError::Config(format!(
                    "Failed to create cache directory {}: {}",
                    self.cache.directory.display(),
                    e
                ))
            })?;
        }
        Ok(self)
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn set_logging_config(&mut self, overrides: LoggingOverrides) -> &mut Self {
        self.logging = LoggingConfig::merged(overrides);
        self
    }

    pub fn set_options(&mut self, options: ConfigOptions) -> Result<&mut Self> {
        if let Some(timeout) = options.request_timeout {
            self.request_timeout = timeout;
        }
        if let Some(max_retries) = options.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(retry_delay) = options.retry_delay {
            self.retry_delay = retry_delay;
        }
        if let Some(verify) = options.verify_ssl {
            self.verify_ssl = verify;
        }
        if let Some(logging) = options.logging {
            self.set_logging_config(logging);
        }
        if options.use_cache.is_some()
            || options.cache_dir.is_some()
            || options.cache_ttl.is_some()
        {
            let enabled = options.use_cache.unwrap_or(self.cache.enabled);
            self.set_caching(enabled, options.cache_dir, options.cache_ttl)?;
        }
        Ok(self)
    }

    /// Reads a recognized configuration key, with or without the `MPESA_` prefix.
    pub fn get(&self, key: &str) -> Option<String> {
        let key = key.to_ascii_uppercase();
        let key = key.strip_prefix("MPESA_").unwrap_or(&key);
        let value = match key {
            "ENVIRONMENT" => self.environment.as_str().to_string(),
            "BASE_URL" => self.base_url.clone(),
            "CONSUMER_KEY" => self.consumer_key.clone(),
            "CONSUMER_SECRET" => self.consumer_secret.clone(),
            "PASSKEY" => self.passkey.clone(),
            "SHORTCODE" => self.shortcode.clone(),
            "LOG_DIR" => self.logging.log_dir.clone(),
            "LOG_TO_FILE" => self.logging.log_to_file.to_string(),
            "LOG_TO_CONSOLE" => self.logging.log_to_console.to_string(),
            "MIN_LOG_LEVEL" => self.logging.min_log_level.clone(),
            "REQUEST_TIMEOUT" => self.request_timeout.to_string(),
            "MAX_RETRIES" => self.max_retries.to_string(),
            "RETRY_DELAY" => self.retry_delay.to_string(),
            _ => return None,
        };
        Some(value)
    }
}
