use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct Config {
    /// Backend origin, without a trailing slash
    pub api_base: String,
    pub token: Option<String>,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `IPTRENDS_TOKEN` wins over
    /// `IPTRENDS_TOKEN_FILE`; a token file that cannot be read is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base = lookup("IPTRENDS_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let api_base = normalize_base(&api_base)?;

        let token = match lookup("IPTRENDS_TOKEN") {
            Some(t) => Some(t),
            None => match lookup("IPTRENDS_TOKEN_FILE") {
                Some(path) => Some(
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("reading token file {}", path))?,
                ),
                None => None,
            },
        }
        .and_then(clean_token);

        Ok(Self {
            api_base,
            token,
            cache_ttl_secs: lookup("IPTRENDS_CACHE_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            timeout_secs: lookup("IPTRENDS_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_base(mut self, api_base: &str) -> Result<Self> {
        self.api_base = normalize_base(api_base)?;
        Ok(self)
    }

    /// Surrounding whitespace is dropped; a blank token means anonymous.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = clean_token(token.into());
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn normalize_base(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim()).with_context(|| format!("invalid api base {:?}", raw))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("api base must be http(s), got {}", parsed.scheme()));
    }
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

fn clean_token(raw: String) -> Option<String> {
    let token = raw.trim();
    (!token.is_empty()).then(|| token.to_string())
}
