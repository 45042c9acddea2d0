use std::path::Path;

use ::config::{builder::DefaultState, ConfigBuilder};
use serde::Deserialize;

const DEFAULTS: &str = include_str!("../config/default.toml");

/// Deployment profile. Production hides internal error messages from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(self) -> &'static str {
        match self {
            Environment::Development => "debug,tower_http=debug,sqlx=warn",
            Environment::Test => "warn",
            Environment::Production => "info,tower_http=info,sqlx=warn",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub trust_proxy: bool,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RouteLimitConfig {
    pub max_requests: u32,
    pub window_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_ms: u64,
    pub cleanup_interval_secs: u64,
    pub message: String,
    pub user_create: RouteLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    pub helmet_enabled: bool,
    pub hsts_max_age: Option<u64>,
    pub csp: Option<String>,
    pub cors_permissive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub rate_limit: RateLimitConfig,
    pub security: SecurityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Mirror defaults from config/default.toml
        Self {
            app: AppSection { name: "Hello World API".to_string(), environment: Environment::Development },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                trust_proxy: false,
                max_body_bytes: 10 * 1024 * 1024,
            },
            database: DatabaseConfig { url: "sqlite://data/hello-api.db".to_string(), max_connections: 16 },
            rate_limit: RateLimitConfig {
                enabled: true,
                max_requests: 100,
                window_ms: 15 * 60 * 1000,
                cleanup_interval_secs: 3600,
                message: "Too many requests from this IP".to_string(),
                user_create: RouteLimitConfig { max_requests: 20, window_ms: 60_000 },
            },
            security: SecurityConfig {
                helmet_enabled: true,
                hsts_max_age: Some(15_552_000),
                csp: None,
                cors_permissive: false,
            },
        }
    }
}

fn base_builder() -> ConfigBuilder<DefaultState> {
    ::config::Config::builder().add_source(::config::File::from_str(DEFAULTS, ::config::FileFormat::Toml))
}

/// Loads the configuration: embedded defaults -> hello-api.toml -> HELLO_API_CONFIG -> env/.env.
pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let mut builder = base_builder()
        // Optional local file: hello-api.toml (in CWD)
        .add_source(::config::File::with_name("hello-api").required(false));

    if let Ok(custom_path) = std::env::var("HELLO_API_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("HELLO_API").separator("__"));

    let app_cfg: AppConfig = builder.build()?.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

/// Loads embedded defaults overlaid with a single TOML file, ignoring the environment.
pub fn load_file(path: &Path) -> anyhow::Result<AppConfig> {
    let app_cfg: AppConfig = base_builder()
        .add_source(::config::File::from(path).format(::config::FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

pub fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }
    if cfg.server.max_body_bytes == 0 {
        return Err(anyhow::anyhow!("server.max_body_bytes must be > 0"));
    }

    if cfg.database.max_connections == 0 {
        return Err(anyhow::anyhow!("database.max_connections must be > 0"));
    }

    // Rate limiting
    let rl = &cfg.rate_limit;
    if rl.max_requests == 0 {
        return Err(anyhow::anyhow!("rate_limit.max_requests must be > 0"));
    }
    if rl.window_ms == 0 {
        return Err(anyhow::anyhow!("rate_limit.window_ms must be > 0"));
    }
    if rl.cleanup_interval_secs == 0 {
        return Err(anyhow::anyhow!("rate_limit.cleanup_interval_secs must be > 0"));
    }
    if rl.user_create.max_requests == 0 || rl.user_create.window_ms == 0 {
        return Err(anyhow::anyhow!("rate_limit.user_create limits must be > 0"));
    }

    Ok(())
}

/// Creates the parent directory of a file-backed SQLite URL.
pub fn ensure_sqlite_parent_dir(url: &str) -> anyhow::Result<()> {
    if url.contains(":memory:") {
        return Ok(());
    }
    if let Some(path) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}
