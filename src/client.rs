use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{cache_key, TtlCache};
use crate::config::Config;
use crate::error::ApiError;
use crate::logging::{log, log_request, log_request_failed, obj, v_str, Domain, Level};
use crate::model::{
    AssigneeTrend, CompetitorSummary, CountryTrend, FilingTrendPoint, TechnologyTrend,
    TrademarkClassCount, TrademarkSummary, TrendFilter,
};
use crate::normalize::{
    normalize_assignee_trends, normalize_competitors, normalize_country_trends,
    normalize_filing_trends, normalize_technology_trends, normalize_trademark_classes,
    normalize_trademark_summary,
};
use crate::report::{Section, TrendSource};

pub const COMPETITORS_PATH: &str = "/api/competitors";
pub const COMPETITORS_COMPARE_PATH: &str = "/api/competitors/compare";

/// Authenticated JSON client for the analytics backend. GET responses are
/// cached by endpoint and query parameters.
pub struct ApiClient {
    client: Client,
    base: String,
    token: Option<String>,
    cache: Arc<TtlCache<Value>>,
}

impl ApiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        log(
            Level::Info,
            Domain::System,
            "client_ready",
            obj(&[
                ("api_base", v_str(&cfg.api_base)),
                ("authenticated", json!(cfg.token.is_some())),
                ("cache_ttl_secs", json!(cfg.cache_ttl_secs)),
            ]),
        );
        Ok(Self {
            client,
            base: cfg.api_base.clone(),
            token: cfg.token.clone(),
            cache: Arc::new(TtlCache::new(cfg.cache_ttl())),
        })
    }

    /// Share one cache between several clients.
    pub fn with_cache(mut self, cache: Arc<TtlCache<Value>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TtlCache<Value> {
        &self.cache
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// GET through the cache. Keys carry the full URL so clients on
    /// different backends can share one cache.
    pub async fn get_json(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let key = cache_key(&self.url(path), params);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let value = self.get_json_uncached(path, params).await?;
        self.cache.set_default(&key, value.clone());
        Ok(value)
    }

    pub async fn get_json_uncached(&self, path: &str, params: &[(String, String)]) -> Result<Value> {
        let req = self.client.get(self.url(path)).query(params);
        self.send(Method::GET, path, req).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let req = self.client.post(self.url(path)).json(body);
        self.send(Method::POST, path, req).await
    }

    async fn send(&self, method: Method, path: &str, req: RequestBuilder) -> Result<Value> {
        let started = Instant::now();
        let resp = match self.authorize(req).send().await {
            Ok(resp) => resp,
            Err(e) => {
                log_request_failed(method.as_str(), path, &e.to_string());
                return Err(ApiError::Network {
                    path: path.to_string(),
                    message: network_message(&e),
                }
                .into());
            }
        };

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ApiError::Network {
            path: path.to_string(),
            message: network_message(&e),
        })?;
        log_request(
            method.as_str(),
            path,
            status.as_u16(),
            started.elapsed().as_secs_f64() * 1000.0,
        );

        if !status.is_success() {
            let err = ApiError::from_status(path, status.as_u16(), &body);
            log_request_failed(method.as_str(), path, &err.to_string());
            return Err(err.into());
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Ok(value)
    }

    async fn section(&self, section: Section, filter: &TrendFilter) -> Result<Value> {
        self.get_json(section.path(), &filter.to_params()).await
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    pub async fn filing_trends(&self, filter: &TrendFilter) -> Result<Vec<FilingTrendPoint>> {
        let raw = self.section(Section::FilingTrends, filter).await?;
        Ok(normalize_filing_trends(&raw))
    }

    pub async fn technology_trends(&self, filter: &TrendFilter) -> Result<Vec<TechnologyTrend>> {
        let raw = self.section(Section::TechnologyTrends, filter).await?;
        Ok(normalize_technology_trends(&raw))
    }

    pub async fn assignee_trends(&self, filter: &TrendFilter) -> Result<Vec<AssigneeTrend>> {
        let raw = self.section(Section::AssigneeTrends, filter).await?;
        Ok(normalize_assignee_trends(&raw))
    }

    pub async fn country_trends(&self, filter: &TrendFilter) -> Result<Vec<CountryTrend>> {
        let raw = self.section(Section::CountryTrends, filter).await?;
        Ok(normalize_country_trends(&raw))
    }

    pub async fn trademark_summary(&self, filter: &TrendFilter) -> Result<TrademarkSummary> {
        let raw = self.section(Section::TrademarkSummary, filter).await?;
        Ok(normalize_trademark_summary(&raw))
    }

    pub async fn trademark_classes(&self, filter: &TrendFilter) -> Result<Vec<TrademarkClassCount>> {
        let raw = self.section(Section::TrademarkClasses, filter).await?;
        Ok(normalize_trademark_classes(&raw))
    }

    pub async fn competitors(&self, limit: Option<u32>) -> Result<Vec<CompetitorSummary>> {
        let params: Vec<(String, String)> = limit
            .map(|l| vec![("limit".to_string(), l.to_string())])
            .unwrap_or_default();
        let raw = self.get_json(COMPETITORS_PATH, &params).await?;
        Ok(normalize_competitors(&raw))
    }

    /// Side-by-side comparison of the named competitors. Not cached.
    pub async fn compare_competitors(&self, names: &[String]) -> Result<Vec<CompetitorSummary>> {
        let raw = self
            .post_json(COMPETITORS_COMPARE_PATH, &json!({ "names": names }))
            .await?;
        Ok(normalize_competitors(&raw))
    }
}

fn network_message(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "could not connect to the analytics service".to_string()
    } else {
        format!("request failed: {}", e)
    }
}

#[async_trait]
impl TrendSource for ApiClient {
    async fn fetch_section(&self, section: Section, filter: &TrendFilter) -> Result<Value> {
        self.section(section, filter).await
    }
}
