use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Which store client the access layer talks to.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Redis,
    /// Process-local stand-in with Redis semantics; nothing survives a restart.
    Memory,
}

/// How `read`/`swap` resolve the caller's key.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyLookup {
    /// Fetch the literal key.
    #[default]
    Direct,
    /// Treat the key as a glob, list matches and use the first one.
    Pattern,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub key_lookup: KeyLookup,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: default_redis_url(),
            key_lookup: KeyLookup::Direct,
        }
    }
}

fn default_redis_url() -> String { "redis://127.0.0.1:6379".to_string() }

pub fn config_path() -> String {
    std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string())
}

pub fn load_default() -> Result<AppConfig> {
    load_from_file(&config_path())
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Configuration assembled from environment variables only; used when no
    /// config file is present.
    pub fn from_env() -> Result<Self> {
        let mut cfg = AppConfig::default();
        if let Ok(host) = std::env::var("SERVER_HOST") {
            cfg.server.host = host;
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            cfg.server.port = port;
        }
        cfg.server.worker_threads = std::env::var("TOKIO_WORKER_THREADS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok());
        cfg.store.url = String::new();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.store.normalize_from_env()?;
        self.store.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be within 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StoreConfig {
    /// `STORE_BACKEND` overrides the backend; `REDIS_URL` only fills a blank url.
    pub fn normalize_from_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("STORE_BACKEND") {
            self.backend = match backend.trim().to_lowercase().as_str() {
                "redis" => StoreBackend::Redis,
                "memory" => StoreBackend::Memory,
                other => return Err(anyhow!("STORE_BACKEND must be redis or memory, got {other}")),
            };
        }
        if self.url.trim().is_empty() {
            self.url = std::env::var("REDIS_URL").unwrap_or_else(|_| default_redis_url());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == StoreBackend::Memory {
            return Ok(());
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("redis://")
            || lower.starts_with("rediss://")
            || lower.starts_with("unix://")
            || lower.starts_with("redis+unix://"))
        {
            return Err(anyhow!("store.url must start with redis://, rediss:// or unix://"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() -> Result<()> {
        let cfg = parse(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000
            worker_threads = 2

            [store]
            backend = "memory"
            key_lookup = "pattern"
            "#,
        )?;
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.worker_threads, Some(2));
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert_eq!(cfg.store.key_lookup, KeyLookup::Pattern);
        Ok(())
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() -> Result<()> {
        let cfg = parse("")?;
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.store.backend, StoreBackend::Redis);
        assert_eq!(cfg.store.key_lookup, KeyLookup::Direct);
        assert_eq!(cfg.store.url, "redis://127.0.0.1:6379");
        Ok(())
    }

    #[test]
    fn zero_worker_threads_normalized() {
        let mut server = ServerConfig { host: " ".into(), port: 1, worker_threads: Some(0) };
        server.normalize().unwrap();
        assert_eq!(server.host, "127.0.0.1");
        assert_eq!(server.worker_threads, Some(4));
    }

    #[test]
    fn zero_port_rejected() {
        let mut server = ServerConfig { host: "localhost".into(), port: 0, worker_threads: None };
        assert!(server.normalize().is_err());
    }

    #[test]
    fn store_url_scheme_checked() {
        let bad = StoreConfig { backend: StoreBackend::Redis, url: "http://x".into(), key_lookup: KeyLookup::Direct };
        assert!(bad.validate().is_err());

        let good = StoreConfig { url: "rediss://cache:6380/1".into(), ..bad.clone() };
        assert!(good.validate().is_ok());

        let memory = StoreConfig { backend: StoreBackend::Memory, ..bad };
        assert!(memory.validate().is_ok());
    }
}
