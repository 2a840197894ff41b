#[cfg(test)]
mod config_tests {
    use crate::config::{
        default_database_url, default_host, default_log_level, default_max_connections,
        default_max_request_size, default_port, default_service_name, default_timeout,
        AuthConfig, Config, ConfigError, DatabaseConfig, ObservabilityConfig, ServerConfig,
        ENV_PREFIX,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    fn environment(vars: &[(&str, &str)]) -> config::Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (format!("{}_{}", ENV_PREFIX, key), value.to_string()))
            .collect();

        config::Environment::with_prefix(ENV_PREFIX).source(Some(source))
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::from_source(environment(&[])).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.max_request_size, 1024 * 1024);
    }

    #[test]
    fn test_server_config_from_env() {
        let config = ServerConfig::from_source(environment(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("REQUEST_TIMEOUT_SECONDS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_database_config_from_env() {
        let config = DatabaseConfig::from_source(environment(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("MAX_CONNECTIONS", "1"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 1);
    }

    #[test]
    fn test_observability_config_from_env() {
        let config = ObservabilityConfig::from_source(environment(&[
            ("SERVICE_NAME", "test-service"),
            ("SERVICE_VERSION", "1.0.0"),
            ("OTLP_ENDPOINT", "http://test:4317"),
            ("LOG_LEVEL", "debug"),
            ("ENABLE_JSON_LOGGING", "true"),
        ]))
        .unwrap();

        assert_eq!(config.service_name, "test-service");
        assert_eq!(config.service_version, "1.0.0");
        assert_eq!(config.otlp_endpoint, Some("http://test:4317".to_string()));
        assert_eq!(config.log_level, "debug");
        assert!(config.enable_json_logging);
    }

    #[test]
    fn test_auth_config_credentials() {
        let config = AuthConfig::from_source(environment(&[
            ("ADMIN_USERNAME", "admin"),
            ("ADMIN_PASSWORD", "lemon"),
        ]))
        .unwrap();

        assert_eq!(config.admin_credentials(), Some(("admin", "lemon")));
        assert!(!format!("{:?}", config).contains("lemon"));

        let empty = AuthConfig::from_source(environment(&[])).unwrap();
        assert_eq!(empty.admin_credentials(), None);
    }

    #[test]
    fn test_full_config_validation() {
        let config = Config::from_source(environment(&[])).unwrap();
        assert_eq!(config.server.port, 8000);

        let result = Config::from_source(environment(&[("PORT", "0")]));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));

        let result = Config::from_source(environment(&[("MAX_CONNECTIONS", "0")]));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));

        let result = Config::from_source(environment(&[("ADMIN_USERNAME", "admin")]));
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::ValidationError {
            message: "Invalid configuration".to_string(),
        };
        assert_eq!(error.to_string(), "Validation error: Invalid configuration");

        let error = ConfigError::LoadError {
            message: "bad value".to_string(),
        };
        assert_eq!(error.to_string(), "Configuration loading error: bad value");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_host(), "0.0.0.0");
        assert_eq!(default_port(), 8000);
        assert_eq!(default_timeout(), 30);
        assert_eq!(default_max_request_size(), 1024 * 1024);
        assert_eq!(default_database_url(), "sqlite://restaurant.db");
        assert_eq!(default_max_connections(), 5);
        assert_eq!(default_service_name(), "restaurant-rs");
        assert_eq!(default_log_level(), "info");
    }
}
