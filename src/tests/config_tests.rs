#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig, Environment};
    use std::fs;
    use tempfile::{NamedTempFile, TempDir};

    fn write_temp_config(content: &str) -> NamedTempFile {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), content).unwrap();
        temp_file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.app.name, "Hello World API");
        assert_eq!(config.app.environment, Environment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite://data/hello-api.db");
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_ms, 900_000);
        assert_eq!(config.rate_limit.user_create.max_requests, 20);
        assert!(config.security.helmet_enabled);
    }

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let file = write_temp_config("");
        let loaded = config::load_file(file.path()).unwrap();
        let default = AppConfig::default();

        assert_eq!(loaded.app.name, default.app.name);
        assert_eq!(loaded.server.port, default.server.port);
        assert_eq!(loaded.server.max_body_bytes, default.server.max_body_bytes);
        assert_eq!(loaded.database.url, default.database.url);
        assert_eq!(loaded.rate_limit.message, default.rate_limit.message);
        assert_eq!(loaded.rate_limit.cleanup_interval_secs, default.rate_limit.cleanup_interval_secs);
        assert_eq!(loaded.security.hsts_max_age, default.security.hsts_max_age);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_temp_config(
            r#"
[app]
environment = "production"

[server]
port = 3000
trust_proxy = true

[rate_limit]
max_requests = 5

[rate_limit.user_create]
max_requests = 1
window_ms = 1000

[security]
csp = "default-src 'none'"
"#,
        );
        let cfg = config::load_file(file.path()).unwrap();

        assert_eq!(cfg.app.environment, Environment::Production);
        assert!(cfg.app.environment.is_production());
        assert_eq!(cfg.server.port, 3000);
        assert!(cfg.server.trust_proxy);
        // Untouched keys keep their defaults
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.rate_limit.max_requests, 5);
        assert_eq!(cfg.rate_limit.window_ms, 900_000);
        assert_eq!(cfg.rate_limit.user_create.max_requests, 1);
        assert_eq!(cfg.security.csp.as_deref(), Some("default-src 'none'"));
    }

    #[test]
    fn test_invalid_server_port() {
        let file = write_temp_config("[server]\nport = 0\n");
        let err = config::load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("invalid server.port"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        for content in [
            "[rate_limit]\nmax_requests = 0\n",
            "[rate_limit]\nwindow_ms = 0\n",
            "[rate_limit]\ncleanup_interval_secs = 0\n",
            "[rate_limit.user_create]\nmax_requests = 0\nwindow_ms = 1000\n",
            "[database]\nmax_connections = 0\n",
        ] {
            let file = write_temp_config(content);
            assert!(config::load_file(file.path()).is_err(), "accepted: {content}");
        }
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let file = write_temp_config("[app]\nenvironment = \"staging\"\n");
        assert!(config::load_file(file.path()).is_err());
    }

    #[test]
    fn test_log_filter_follows_environment() {
        assert!(Environment::Development.default_log_filter().starts_with("debug"));
        assert!(Environment::Production.default_log_filter().starts_with("info"));
    }

    #[test]
    fn test_ensure_sqlite_parent_dir() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("app.db");
        config::ensure_sqlite_parent_dir(&format!("sqlite://{}?mode=rwc", db_path.display())).unwrap();
        assert!(dir.path().join("nested").is_dir());

        config::ensure_sqlite_parent_dir("sqlite::memory:").unwrap();
    }
}
