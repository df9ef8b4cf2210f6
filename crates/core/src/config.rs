use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CRM_CONSOLE__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Bearer token sent on every request. Unset means anonymous.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_page_limit")]
    pub default_page_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Number of notifications fetched when the menu opens.
    #[serde(default = "default_menu_page_size")]
    pub menu_page_size: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_push_enabled")]
    pub push_enabled: bool,
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default = "default_log_json")]
    pub json: bool,
}

// Default functions
fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_page_limit() -> u32 {
    10
}
fn default_menu_page_size() -> u32 {
    5
}
fn default_poll_interval_secs() -> u64 {
    60
}
fn default_push_enabled() -> bool {
    true
}
fn default_stream_path() -> String {
    "/notifications/stream".to_string()
}
fn default_command_buffer() -> usize {
    64
}
fn default_cache_enabled() -> bool {
    true
}
fn default_log_filter() -> String {
    "crm_console=info,crm_client=info".to_string()
}
fn default_log_json() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_ms: default_request_timeout_ms(),
            default_page_limit: default_page_limit(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            menu_page_size: default_menu_page_size(),
            poll_interval_secs: default_poll_interval_secs(),
            push_enabled: default_push_enabled(),
            stream_path: default_stream_path(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: default_log_json(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            notifications: NotificationConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NotificationConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from the environment only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file, with environment
    /// variables layered on top.
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix("CRM_CONSOLE")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
