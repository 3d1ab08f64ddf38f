use std::{env, net::SocketAddr, str::FromStr, time::Duration};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// 永続化バックエンド。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StorageBackend::Postgres),
            "memory" | "in-memory" | "mem" => Ok(StorageBackend::Memory),
            other => Err(anyhow::anyhow!(
                "unknown storage backend '{other}' (expected postgres or memory)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    storage_backend: StorageBackend,
    db_dsn: Option<String>,
    db_max_connections: u32,
    db_min_connections: u32,
    db_acquire_timeout: Duration,
    writer_base_url: String,
    writer_service_token: Option<String>,
    writer_connect_timeout: Duration,
    generation_timeout: Duration,
    scheduler_interval: Duration,
    scheduler_autostart: bool,
    scheduler_shutdown_grace: Duration,
    run_stale_after: Duration,
    tag_min_count: usize,
    tag_max_count: usize,
    theme_rng_seed: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数から autoblog-worker の設定値を読み込み、検証する。
    ///
    /// # Errors
    /// `WRITER_BASE_URL` が未設定、Postgres 利用時に `AUTOBLOG_DB_DSN` が未設定、
    /// もしくは各種値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("AUTOBLOG_HTTP_BIND", "0.0.0.0:8000")?;
        let storage_backend = parse_from_str("AUTOBLOG_STORAGE", StorageBackend::Postgres)?;
        let db_dsn = match storage_backend {
            StorageBackend::Postgres => Some(env_var("AUTOBLOG_DB_DSN")?),
            StorageBackend::Memory => env::var("AUTOBLOG_DB_DSN").ok(),
        };

        // Database connection pool settings
        let db_max_connections = parse_u32("AUTOBLOG_DB_MAX_CONNECTIONS", 10)?;
        let db_min_connections = parse_u32("AUTOBLOG_DB_MIN_CONNECTIONS", 1)?;
        let db_acquire_timeout = parse_duration_secs("AUTOBLOG_DB_ACQUIRE_TIMEOUT_SECS", 30)?;

        // Writer service
        let writer_base_url = env_var("WRITER_BASE_URL")?;
        let writer_service_token = env::var("WRITER_SERVICE_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let writer_connect_timeout = parse_duration_ms("WRITER_CONNECT_TIMEOUT_MS", 3000)?;
        let generation_timeout = parse_positive_duration_secs("GENERATION_TIMEOUT_SECS", 600)?;

        // Scheduler
        let scheduler_interval =
            parse_positive_duration_secs_from_minutes("SCHEDULER_INTERVAL_MINUTES", 1440)?;
        let scheduler_autostart = parse_bool("SCHEDULER_AUTOSTART", true)?;
        let scheduler_shutdown_grace = parse_duration_secs("SCHEDULER_SHUTDOWN_GRACE_SECS", 30)?;
        let run_stale_after = parse_positive_duration_secs("RUN_STALE_AFTER_SECS", 7200)?;

        // Tagging
        let tag_min_count = parse_usize("TAG_MIN_COUNT", 4)?;
        let tag_max_count = parse_usize("TAG_MAX_COUNT", 6)?;
        if tag_max_count < tag_min_count {
            return Err(ConfigError::Invalid {
                name: "TAG_MAX_COUNT",
                source: anyhow::anyhow!(
                    "must be at least TAG_MIN_COUNT ({tag_min_count}), got {tag_max_count}"
                ),
            });
        }

        let theme_rng_seed = parse_optional_u64("THEME_RNG_SEED")?;

        Ok(Self {
            http_bind,
            storage_backend,
            db_dsn,
            db_max_connections,
            db_min_connections,
            db_acquire_timeout,
            writer_base_url,
            writer_service_token,
            writer_connect_timeout,
            generation_timeout,
            scheduler_interval,
            scheduler_autostart,
            scheduler_shutdown_grace,
            run_stale_after,
            tag_min_count,
            tag_max_count,
            theme_rng_seed,
        })
    }

    /// 既定値とインメモリ永続化で構成する。組み込み利用やテスト向け。
    #[must_use]
    pub fn in_memory(writer_base_url: impl Into<String>) -> Self {
        Self {
            http_bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            storage_backend: StorageBackend::Memory,
            db_dsn: None,
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout: Duration::from_secs(30),
            writer_base_url: writer_base_url.into(),
            writer_service_token: None,
            writer_connect_timeout: Duration::from_millis(3000),
            generation_timeout: Duration::from_secs(600),
            scheduler_interval: Duration::from_secs(1440 * 60),
            scheduler_autostart: false,
            scheduler_shutdown_grace: Duration::from_secs(30),
            run_stale_after: Duration::from_secs(7200),
            tag_min_count: 4,
            tag_max_count: 6,
            theme_rng_seed: None,
        }
    }

    #[must_use]
    pub fn with_theme_rng_seed(mut self, seed: u64) -> Self {
        self.theme_rng_seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn storage_backend(&self) -> StorageBackend {
        self.storage_backend
    }

    #[must_use]
    pub fn db_dsn(&self) -> Option<&str> {
        self.db_dsn.as_deref()
    }

    #[must_use]
    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    #[must_use]
    pub fn db_min_connections(&self) -> u32 {
        self.db_min_connections
    }

    #[must_use]
    pub fn db_acquire_timeout(&self) -> Duration {
        self.db_acquire_timeout
    }

    #[must_use]
    pub fn writer_base_url(&self) -> &str {
        &self.writer_base_url
    }

    #[must_use]
    pub fn writer_service_token(&self) -> Option<&str> {
        self.writer_service_token.as_deref()
    }

    #[must_use]
    pub fn writer_connect_timeout(&self) -> Duration {
        self.writer_connect_timeout
    }

    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        self.generation_timeout
    }

    #[must_use]
    pub fn scheduler_interval(&self) -> Duration {
        self.scheduler_interval
    }

    #[must_use]
    pub fn scheduler_autostart(&self) -> bool {
        self.scheduler_autostart
    }

    #[must_use]
    pub fn scheduler_shutdown_grace(&self) -> Duration {
        self.scheduler_shutdown_grace
    }

    #[must_use]
    pub fn run_stale_after(&self) -> Duration {
        self.run_stale_after
    }

    #[must_use]
    pub fn tag_min_count(&self) -> usize {
        self.tag_min_count
    }

    #[must_use]
    pub fn tag_max_count(&self) -> usize {
        self.tag_max_count
    }

    #[must_use]
    pub fn theme_rng_seed(&self) -> Option<u64> {
        self.theme_rng_seed
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_from_str<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr<Err = anyhow::Error>,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|source| ConfigError::Invalid { name, source }),
        Err(_) => Ok(default),
    }
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_positive_duration_secs(
    name: &'static str,
    default_secs: u64,
) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        });
    }
    Ok(Duration::from_secs(value))
}

fn parse_positive_duration_secs_from_minutes(
    name: &'static str,
    default_minutes: u64,
) -> Result<Duration, ConfigError> {
    let minutes = parse_u64(name, default_minutes)?;
    if minutes == 0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("must be greater than zero"),
        });
    }
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("interval is too large"),
        })
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_u64(name, default_ms)?;
    Ok(Duration::from_millis(ms))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u32(name: &'static str, default: u32) -> Result<u32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_optional_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|error| ConfigError::Invalid {
                name,
                source: anyhow::Error::new(error),
            }),
        _ => Ok(None),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}
