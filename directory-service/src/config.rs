//! Service configuration resolved once at startup from the environment.

use std::time::Duration;
use url::Url;

use crate::error::{BrowseError, BrowseResult};
use crate::paginate::DEFAULT_LIMIT;

pub const DEFAULT_GRPC_PORT: u16 = 50051;
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost/v3/directories";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub grpc_port: u16,
    pub default_page_limit: u64,
    /// Zero disables the aggregate cache.
    pub aggregate_cache_ttl: Duration,
    pub public_base_url: Url,
}

impl ServiceConfig {
    pub fn from_env() -> BrowseResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> BrowseResult<Self> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| BrowseError::Config {
            message: "DATABASE_URL environment variable is required".to_string(),
        })?;

        let grpc_port = parse_or(&lookup, "GRPC_PORT", DEFAULT_GRPC_PORT)?;
        let default_page_limit = parse_or(&lookup, "DEFAULT_PAGE_LIMIT", DEFAULT_LIMIT)?;
        let ttl_secs: u64 = parse_or(&lookup, "AGGREGATE_CACHE_TTL_SECS", 0)?;

        let base_url = lookup("PUBLIC_BASE_URL").unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
        let public_base_url = Url::parse(&base_url).map_err(|e| BrowseError::Config {
            message: format!("Invalid PUBLIC_BASE_URL '{}': {}", base_url, e),
        })?;

        Ok(Self {
            database_url,
            grpc_port,
            default_page_limit,
            aggregate_cache_ttl: Duration::from_secs(ttl_secs),
            public_base_url,
        })
    }

    pub fn cache_enabled(&self) -> bool {
        !self.aggregate_cache_ttl.is_zero()
    }

    /// Database URL with credentials masked, for logging.
    pub fn masked_database_url(&self) -> String {
        mask_credentials(&self.database_url)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> BrowseResult<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e| BrowseError::Config {
            message: format!("Invalid {} '{}': {}", key, raw, e),
        }),
        None => Ok(default),
    }
}

fn mask_credentials(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end + 3 => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}
