use serde::Deserialize;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub identity: IdentityConfig,
    pub images: ImageConfig,
    pub listing: ListingConfig,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    /// Отдавать ли клиенту текст внутренних ошибок (только для разработки).
    pub debug_errors: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

// Настройки базы данных
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: Option<String>,
    pub pool_size: u32,
}

// Настройки Redis. Без URL кеш поиска выключен.
#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub search_ttl_seconds: u64,
}

// Внешний провайдер идентификации (сессии + вебхуки)
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
}

// Объектное хранилище для картинок событий
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub upload_url: String,
    pub private_key: String,
    pub max_per_event: usize,
}

// Пагинация публичных списков
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

// Плоское представление переменных окружения, как их отдает `config::Environment`.
#[derive(Debug, Deserialize)]
struct RawEnv {
    host: String,
    port: u16,
    environment: String,
    rust_log: String,
    log_format: String,
    debug_errors: Option<bool>,
    storage_backend: String,
    database_url: Option<String>,
    db_pool_size: u32,
    redis_url: Option<String>,
    search_cache_ttl_seconds: u64,
    identity_base_url: String,
    image_upload_url: String,
    image_private_key: String,
    max_images_per_event: usize,
    default_page_size: u32,
    max_page_size: u32,
}

impl Config {
    /// Читает конфигурацию из окружения (`.env` подгружается заранее в `main`).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let source = with_defaults(config::Config::builder())?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;
        Self::from_source(source)
    }

    fn from_source(source: config::Config) -> Result<Self, config::ConfigError> {
        let raw: RawEnv = source.try_deserialize()?;

        let backend = match raw.storage_backend.to_ascii_lowercase().as_str() {
            "postgres" => StorageBackend::Postgres,
            "memory" => StorageBackend::Memory,
            other => {
                return Err(config::ConfigError::Message(format!(
                    "STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"
                )))
            }
        };
        let database_url = raw.database_url.filter(|url| !url.trim().is_empty());
        if backend == StorageBackend::Postgres && database_url.is_none() {
            return Err(config::ConfigError::Message(
                "DATABASE_URL must be set when STORAGE_BACKEND=postgres".to_string(),
            ));
        }
        if raw.default_page_size == 0 || raw.max_page_size < raw.default_page_size {
            return Err(config::ConfigError::Message(
                "DEFAULT_PAGE_SIZE must be >= 1 and <= MAX_PAGE_SIZE".to_string(),
            ));
        }

        let is_development = raw.environment.eq_ignore_ascii_case("development");
        let log_format = if raw.log_format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        Ok(Config {
            app: AppConfig {
                host: raw.host,
                port: raw.port,
                environment: raw.environment,
                rust_log: raw.rust_log,
                log_format,
                debug_errors: raw.debug_errors.unwrap_or(is_development),
            },
            database: DatabaseConfig {
                backend,
                url: database_url,
                pool_size: raw.db_pool_size,
            },
            redis: RedisConfig {
                url: raw.redis_url.filter(|url| !url.trim().is_empty()),
                search_ttl_seconds: raw.search_cache_ttl_seconds,
            },
            identity: IdentityConfig {
                base_url: raw.identity_base_url,
            },
            images: ImageConfig {
                upload_url: raw.image_upload_url,
                private_key: raw.image_private_key,
                max_per_event: raw.max_images_per_event,
            },
            listing: ListingConfig {
                default_page_size: raw.default_page_size,
                max_page_size: raw.max_page_size,
            },
        })
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    builder
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8000)?
        .set_default("environment", "development")?
        .set_default("rust_log", "event_board=debug,tower_http=debug")?
        .set_default("log_format", "pretty")?
        .set_default("storage_backend", "postgres")?
        .set_default("db_pool_size", 20)?
        .set_default("search_cache_ttl_seconds", 300)?
        .set_default("identity_base_url", "http://localhost:4000")?
        .set_default("image_upload_url", "https://upload.imagekit.io/api/v1/files/upload")?
        .set_default("image_private_key", "")?
        .set_default("max_images_per_event", 3)?
        .set_default("default_page_size", 20)?
        .set_default("max_page_size", 100)
}

impl Default for Config {
    // Конфигурация для локального запуска и тестов: память вместо Postgres, без Redis.
    fn default() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                environment: "test".to_string(),
                rust_log: "event_board=debug".to_string(),
                log_format: LogFormat::Pretty,
                debug_errors: false,
            },
            database: DatabaseConfig {
                backend: StorageBackend::Memory,
                url: None,
                pool_size: 5,
            },
            redis: RedisConfig {
                url: None,
                search_ttl_seconds: 300,
            },
            identity: IdentityConfig {
                base_url: "http://localhost:4000".to_string(),
            },
            images: ImageConfig {
                upload_url: "http://localhost:4001/upload".to_string(),
                private_key: String::new(),
                max_per_event: 3,
            },
            listing: ListingConfig {
                default_page_size: 20,
                max_page_size: 100,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, config::ConfigError> {
        let mut builder = with_defaults(config::Config::builder()).unwrap();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        Config::from_source(builder.build().unwrap())
    }

    #[test]
    fn defaults_require_database_url_for_postgres() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = load(&[("storage_backend", "memory")]).unwrap();
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.listing.default_page_size, 20);
        assert_eq!(config.listing.max_page_size, 100);
        assert_eq!(config.images.max_per_event, 3);
        assert!(config.redis.url.is_none());
    }

    #[test]
    fn debug_errors_follow_environment_unless_overridden() {
        let dev = load(&[("storage_backend", "memory")]).unwrap();
        assert!(dev.app.debug_errors);

        let prod = load(&[("storage_backend", "memory"), ("environment", "production")]).unwrap();
        assert!(!prod.app.debug_errors);

        let forced = load(&[
            ("storage_backend", "memory"),
            ("environment", "production"),
            ("debug_errors", "true"),
        ])
        .unwrap();
        assert!(forced.app.debug_errors);
    }

    #[test]
    fn rejects_unknown_backend_and_bad_page_sizes() {
        assert!(load(&[("storage_backend", "mysql")]).is_err());
        assert!(load(&[("storage_backend", "memory"), ("default_page_size", "0")]).is_err());
        assert!(load(&[
            ("storage_backend", "memory"),
            ("default_page_size", "50"),
            ("max_page_size", "10"),
        ])
        .is_err());
    }
}
