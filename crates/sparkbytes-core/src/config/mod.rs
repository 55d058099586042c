use crate::error::{Result, SparkError};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparkConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Connection to the Spark Bytes REST backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Prefix for every endpoint path, e.g. `http://localhost:5002/api`.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// Fixed deadline for a whole backend call (send + body).
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Name of the cookie carrying the visitor's credential.
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            timeout_secs: default_api_timeout_secs(),
            connect_timeout_secs: default_api_connect_timeout_secs(),
            session_cookie: default_session_cookie(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_web_host")]
    pub host: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
        }
    }
}

/// Server-verified session cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How long a verified session is reused. `0` disables caching.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Lifetime of a success/error flash before it hides itself.
    #[serde(default = "default_flash_ms")]
    pub flash_ms: u64,
    /// Delay between a successful RSVP and navigating back to `/events`.
    #[serde(default = "default_rsvp_redirect_ms")]
    pub rsvp_redirect_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            flash_ms: default_flash_ms(),
            rsvp_redirect_ms: default_rsvp_redirect_ms(),
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:5002/api".to_string()
}
fn default_api_timeout_secs() -> u64 {
    10
}
fn default_api_connect_timeout_secs() -> u64 {
    5
}
fn default_session_cookie() -> String {
    "token".to_string()
}
fn default_web_host() -> String {
    "127.0.0.1".to_string()
}
fn default_web_port() -> u16 {
    3000
}
fn default_cache_ttl_secs() -> u64 {
    30
}
fn default_max_entries() -> usize {
    10_000
}
fn default_flash_ms() -> u64 {
    3000
}
fn default_rsvp_redirect_ms() -> u64 {
    2000
}

impl SparkConfig {
    /// Load configuration with a layered merge:
    /// 1. ~/.config/sparkbytes/config.toml (global)
    /// 2. .sparkbytes/config.toml (project)
    /// 3. .sparkbytes/config.local.toml (local, gitignored)
    /// 4. `SPARKBYTES__SECTION__KEY` environment variables
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        // Layer 1: Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                builder = builder.add_source(File::from(global_path).required(false));
            }
        }

        // Layer 2: Project config
        if let Some(dir) = project_dir {
            let project_config = dir.join(".sparkbytes").join("config.toml");
            if project_config.exists() {
                builder = builder.add_source(File::from(project_config).required(false));
            }

            // Layer 3: Local config (gitignored)
            let local_config = dir.join(".sparkbytes").join("config.local.toml");
            if local_config.exists() {
                builder = builder.add_source(File::from(local_config).required(false));
            }
        }

        // Layer 4: Environment
        builder = builder.add_source(
            Environment::with_prefix("SPARKBYTES")
                .prefix_separator("__")
                .separator("__"),
        );

        let config = builder
            .build()
            .map_err(|e| SparkError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| SparkError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Load with defaults only (no files).
    pub fn default_config() -> Self {
        Self {
            api: ApiConfig::default(),
            web: WebConfig::default(),
            session: SessionConfig::default(),
            ui: UiConfig::default(),
        }
    }

    /// Validate config values, clamping out-of-range values to sane defaults.
    /// Returns a list of warnings for any values that were adjusted.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        // API
        let trimmed = self.api.base_url.trim_end_matches('/');
        if trimmed.len() != self.api.base_url.len() {
            self.api.base_url = trimmed.to_string();
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            warnings.push(format!(
                "api.base_url '{}' has no http(s) scheme, using default '{}'",
                self.api.base_url,
                default_api_base_url()
            ));
            self.api.base_url = default_api_base_url();
        }
        if self.api.timeout_secs == 0 {
            warnings.push(format!(
                "api.timeout_secs 0 is not allowed, using default {}",
                default_api_timeout_secs()
            ));
            self.api.timeout_secs = default_api_timeout_secs();
        }
        if self.api.connect_timeout_secs == 0 {
            warnings.push(format!(
                "api.connect_timeout_secs 0 is not allowed, using default {}",
                default_api_connect_timeout_secs()
            ));
            self.api.connect_timeout_secs = default_api_connect_timeout_secs();
        }
        if self.api.connect_timeout_secs > self.api.timeout_secs {
            warnings.push(format!(
                "api.connect_timeout_secs {} exceeds api.timeout_secs {}, clamping",
                self.api.connect_timeout_secs, self.api.timeout_secs
            ));
            self.api.connect_timeout_secs = self.api.timeout_secs;
        }
        if self.api.session_cookie.trim().is_empty() {
            warnings.push(format!(
                "api.session_cookie is empty, using default '{}'",
                default_session_cookie()
            ));
            self.api.session_cookie = default_session_cookie();
        }

        // Session cache
        if self.session.max_entries == 0 {
            warnings.push(format!(
                "session.max_entries 0 is not allowed, using default {}",
                default_max_entries()
            ));
            self.session.max_entries = default_max_entries();
        }

        // UI timing
        if self.ui.flash_ms == 0 {
            warnings.push(format!(
                "ui.flash_ms 0 is not allowed, using default {}",
                default_flash_ms()
            ));
            self.ui.flash_ms = default_flash_ms();
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sparkbytes").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// `load` reads process-wide environment variables; tests that call it
    /// hold this lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn project_dir(name: &str, config_toml: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sparkbytes-{name}-{}", std::process::id()));
        let cfg_dir = dir.join(".sparkbytes");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), config_toml).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = SparkConfig::default_config();
        assert_eq!(config.api.base_url, "http://localhost:5002/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.session_cookie, "token");
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.session.cache_ttl_secs, 30);
        assert_eq!(config.ui.flash_ms, 3000);
        assert_eq!(config.ui.rsvp_redirect_ms, 2000);
    }

    #[test]
    fn test_load_config_no_files() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let config = SparkConfig::load(Some(Path::new("/nonexistent/path"))).unwrap();
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.ui.rsvp_redirect_ms, 2000);
    }

    #[test]
    fn test_load_project_layers() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let dir = project_dir(
            "layers",
            "[api]\nbase_url = \"http://backend:9000/api/\"\ntimeout_secs = 4\n",
        );
        std::fs::write(dir.join(".sparkbytes").join("config.local.toml"), "[web]\nport = 8088\n")
            .unwrap();

        let config = SparkConfig::load(Some(&dir)).unwrap();
        assert_eq!(config.api.base_url, "http://backend:9000/api");
        assert_eq!(config.api.timeout_secs, 4);
        assert_eq!(config.web.port, 8088);
        assert_eq!(config.session.max_entries, 10_000);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_env_overrides_project_file() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        let dir = project_dir(
            "env",
            "[api]\ntimeout_secs = 9\n\n[web]\nport = 9000\n\n[ui]\nflash_ms = 1500\n",
        );
        std::env::set_var("SPARKBYTES__API__TIMEOUT_SECS", "4");
        std::env::set_var("SPARKBYTES__WEB__PORT", "8088");

        let loaded = SparkConfig::load(Some(&dir));

        std::env::remove_var("SPARKBYTES__API__TIMEOUT_SECS");
        std::env::remove_var("SPARKBYTES__WEB__PORT");
        std::fs::remove_dir_all(&dir).unwrap();

        let config = loaded.unwrap();
        assert_eq!(config.api.timeout_secs, 4u64);
        assert_eq!(config.web.port, 8088u16);
        // Connect timeout is clamped to the lowered total.
        assert_eq!(config.api.connect_timeout_secs, 4);
        // Keys without an override still come from the file.
        assert_eq!(config.ui.flash_ms, 1500);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = SparkConfig::default_config();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: SparkConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
        assert_eq!(parsed.web.port, config.web.port);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let parsed: SparkConfig = toml::from_str("[ui]\nflash_ms = 5000\n").unwrap();
        assert_eq!(parsed.ui.flash_ms, 5000);
        assert_eq!(parsed.ui.rsvp_redirect_ms, 2000);
        assert_eq!(parsed.api.connect_timeout_secs, 5);
    }

    #[test]
    fn test_validate_defaults_no_warnings() {
        let mut config = SparkConfig::default_config();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_clamps_zero_timeouts() {
        let mut config = SparkConfig::default_config();
        config.api.timeout_secs = 0;
        config.api.connect_timeout_secs = 0;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.connect_timeout_secs, 5);
    }

    #[test]
    fn test_validate_connect_timeout_not_above_total() {
        let mut config = SparkConfig::default_config();
        config.api.timeout_secs = 2;
        config.api.connect_timeout_secs = 5;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.api.connect_timeout_secs, 2);
    }

    #[test]
    fn test_validate_base_url() {
        let mut config = SparkConfig::default_config();
        config.api.base_url = "http://localhost:5002/api///".into();
        assert!(config.validate().is_empty());
        assert_eq!(config.api.base_url, "http://localhost:5002/api");

        config.api.base_url = "localhost:5002".into();
        assert_eq!(config.validate().len(), 1);
        assert_eq!(config.api.base_url, "http://localhost:5002/api");
    }

    #[test]
    fn test_validate_session_and_ui() {
        let mut config = SparkConfig::default_config();
        config.session.max_entries = 0;
        config.ui.flash_ms = 0;
        config.api.session_cookie = "  ".into();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 3);
        assert_eq!(config.session.max_entries, 10_000);
        assert_eq!(config.ui.flash_ms, 3000);
        assert_eq!(config.api.session_cookie, "token");
    }
}
