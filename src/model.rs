//! Canonical chart-ready records.
//!
//! Everything serializes in camelCase, the same names the normalizers read
//! first, so a normalized record fed back through its normalizer is unchanged.

use serde::{Deserialize, Serialize};

pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingTrendPoint {
    pub year: i32,
    pub filing_count: f64,
    pub grant_count: f64,
    /// Percent of filings granted
    pub grant_rate: f64,
}

/// Direction label the backend attaches to a ranked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendClass {
    Rising,
    Stable,
    Declining,
    Unknown,
}

impl TrendClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendClass::Rising => "rising",
            TrendClass::Stable => "stable",
            TrendClass::Declining => "declining",
            TrendClass::Unknown => "unknown",
        }
    }

    /// Accepts the spellings seen across endpoints.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "rising" | "up" | "increasing" | "growing" | "emerging" => TrendClass::Rising,
            "stable" | "flat" | "steady" => TrendClass::Stable,
            "declining" | "down" | "decreasing" | "falling" => TrendClass::Declining,
            _ => TrendClass::Unknown,
        }
    }

    /// Classify a growth percentage: beyond ±5% counts as a direction.
    pub fn from_growth(pct: f64) -> Self {
        if pct > 5.0 {
            TrendClass::Rising
        } else if pct < -5.0 {
            TrendClass::Declining
        } else {
            TrendClass::Stable
        }
    }
}

impl Default for TrendClass {
    fn default() -> Self {
        TrendClass::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyTrend {
    pub code: String,
    pub name: String,
    pub count: f64,
    pub trend: TrendClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeTrend {
    pub name: String,
    pub count: f64,
    pub trend: TrendClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryTrend {
    pub code: String,
    pub name: String,
    pub count: f64,
    pub trend: TrendClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCount {
    pub year: i32,
    pub count: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrademarkSummary {
    pub total_applications: f64,
    pub filings_by_year: Vec<YearCount>,
    /// Applications inside the backend's recent window
    pub recent_activity: f64,
    pub active_count: f64,
    pub inactive_count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrademarkClassCount {
    pub class_code: String,
    pub description: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSummary {
    pub name: String,
    pub patent_count: f64,
    pub trademark_count: f64,
    /// Percent of total patents across the returned competitors
    pub share: f64,
}

/// Query filters shared by the analyst endpoints
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendFilter {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub country: Option<String>,
    pub technology: Option<String>,
    pub limit: Option<u32>,
}

impl TrendFilter {
    pub fn years(start: i32, end: i32) -> Self {
        Self {
            start_year: Some(start),
            end_year: Some(end),
            ..Default::default()
        }
    }

    /// Query parameters in the backend's camelCase naming.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(y) = self.start_year {
            params.push(("startYear".to_string(), y.to_string()));
        }
        if let Some(y) = self.end_year {
            params.push(("endYear".to_string(), y.to_string()));
        }
        if let Some(c) = self.country.as_deref().filter(|c| !c.is_empty()) {
            params.push(("country".to_string(), c.to_string()));
        }
        if let Some(t) = self.technology.as_deref().filter(|t| !t.is_empty()) {
            params.push(("technology".to_string(), t.to_string()));
        }
        if let Some(l) = self.limit {
            params.push(("limit".to_string(), l.to_string()));
        }
        params
    }
}
