use std::env;

use pipeline::PipelineConfig;

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok()?.parse().ok()
}

/// Cache backend settings. The bundled cache is in-process; a redis driver
/// would read the same options.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub ttl_seconds: u64,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: env_parse("REDIS_ENABLED").unwrap_or(false),
            host: env::var("REDIS_HOST")
                .unwrap_or_else(|_| "localhost".to_owned()),
            port: env_parse("REDIS_PORT").unwrap_or(6379),
            password: env::var("REDIS_PASSWORD").ok(),
            ttl_seconds: env_parse("CACHE_TTL").unwrap_or(3600),
        }
    }
}

/// Relational pool settings. Parsed and surfaced at startup even though the
/// bundled store is in-memory, so a driver swap needs no config changes.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub pool_max: u32,
    pub pool_min: u32,
    pub idle_timeout_ms: u64,
    pub connection_timeout_ms: u64,
    pub statement_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        Self {
            pool_max: env_parse("DB_POOL_MAX").unwrap_or(10),
            pool_min: env_parse("DB_POOL_MIN").unwrap_or(1),
            idle_timeout_ms: env_parse("DB_IDLE_TIMEOUT").unwrap_or(10_000),
            connection_timeout_ms: env_parse("DB_CONNECTION_TIMEOUT")
                .unwrap_or(5_000),
            statement_timeout_ms: env_parse("DB_STATEMENT_TIMEOUT")
                .unwrap_or(30_000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub http_port: u16,
    pub log_level: String,
    pub use_adaptive_data_loading: bool,
    pub cache: CacheConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_owned()),
            http_port: env_parse("HTTP_PORT").unwrap_or(8080),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_owned()),
            use_adaptive_data_loading: env_parse("USE_ADAPTIVE_DATA_LOADING")
                .unwrap_or(true),
            cache: CacheConfig::from_env(),
            database: DatabaseConfig::from_env(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            use_adaptive_data_loading: self.use_adaptive_data_loading,
            ..PipelineConfig::default()
        }
    }
}
