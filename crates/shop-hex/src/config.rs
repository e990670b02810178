use anyhow::Context;
use serde::Deserialize;
use shop_types::domain::paging::{DEFAULT_LIMIT, MAX_LIMIT};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: String,
    pub database_url: Option<String>,
    pub request_timeout_secs: u64,
    pub default_page_limit: u32,
    pub max_page_limit: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let server_port = get("SERVER_PORT").unwrap_or_else(|| "3000".into());
        let database_url = get("DATABASE_URL").filter(|s| !s.is_empty());
        let request_timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?;
        let max_page_limit = parse_or(&get, "MAX_PAGE_LIMIT", MAX_LIMIT)?;
        let default_page_limit = parse_or(&get, "DEFAULT_PAGE_LIMIT", DEFAULT_LIMIT)?;

        if max_page_limit == 0 {
            anyhow::bail!("MAX_PAGE_LIMIT must be at least 1");
        }
        if default_page_limit == 0 {
            anyhow::bail!("DEFAULT_PAGE_LIMIT must be at least 1");
        }

        Ok(Self {
            server_port,
            database_url,
            request_timeout_secs,
            default_page_limit: default_page_limit.min(max_page_limit),
            max_page_limit,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.server_port, "3000");
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.default_page_limit, 10);
        assert_eq!(cfg.max_page_limit, 100);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "8080"),
            ("DATABASE_URL", "sqlite://data/shop.db"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("DEFAULT_PAGE_LIMIT", "500"),
            ("MAX_PAGE_LIMIT", "50"),
        ]))
        .unwrap();
        assert_eq!(cfg.server_port, "8080");
        assert_eq!(cfg.database_url.as_deref(), Some("sqlite://data/shop.db"));
        assert_eq!(cfg.request_timeout_secs, 5);
        assert_eq!(cfg.default_page_limit, 50);
        assert_eq!(cfg.max_page_limit, 50);
    }

    #[test]
    fn bad_numbers_are_errors() {
        assert!(Config::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("MAX_PAGE_LIMIT", "0")])).is_err());
    }
}
