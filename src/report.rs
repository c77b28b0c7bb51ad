//! Multi-endpoint reports.
//!
//! Sections are fetched concurrently and settled independently: a failed
//! endpoint is logged, listed in `failed_sections`, and left at its empty
//! shape. Building a report never fails.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::insight::{patent_insights, trademark_insights, Insight};
use crate::logging::{log, log_section_defaulted, obj, ts_now, Domain, Level};
use crate::model::{
    AssigneeTrend, CountryTrend, FilingTrendPoint, TechnologyTrend, TrademarkClassCount,
    TrademarkSummary, TrendFilter,
};
use crate::normalize::{
    normalize_assignee_trends, normalize_country_trends, normalize_filing_trends,
    normalize_technology_trends, normalize_trademark_classes, normalize_trademark_summary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    FilingTrends,
    TechnologyTrends,
    AssigneeTrends,
    CountryTrends,
    TrademarkSummary,
    TrademarkClasses,
}

impl Section {
    pub fn path(&self) -> &'static str {
        match self {
            Section::FilingTrends => "/api/analyst/filing-trends",
            Section::TechnologyTrends => "/api/analyst/technology-trends",
            Section::AssigneeTrends => "/api/analyst/assignee-trends",
            Section::CountryTrends => "/api/analyst/country-trends",
            Section::TrademarkSummary => "/api/trends/trademarks/summary",
            Section::TrademarkClasses => "/api/trends/trademarks/classes",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::FilingTrends => "filingTrends",
            Section::TechnologyTrends => "technologyTrends",
            Section::AssigneeTrends => "assigneeTrends",
            Section::CountryTrends => "countryTrends",
            Section::TrademarkSummary => "trademarkSummary",
            Section::TrademarkClasses => "trademarkClasses",
        }
    }
}

/// Anything that can hand back the raw payload of a report section.
#[async_trait]
pub trait TrendSource: Send + Sync {
    async fn fetch_section(&self, section: Section, filter: &TrendFilter) -> Result<Value>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub generated_at: String,
    pub filing_trends: Vec<FilingTrendPoint>,
    pub technology_trends: Vec<TechnologyTrend>,
    pub assignee_trends: Vec<AssigneeTrend>,
    pub country_trends: Vec<CountryTrend>,
    pub insights: Vec<Insight>,
    /// Sections whose endpoint failed and were left empty
    pub failed_sections: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrademarkReport {
    pub generated_at: String,
    pub summary: TrademarkSummary,
    pub classes: Vec<TrademarkClassCount>,
    pub insights: Vec<Insight>,
    pub failed_sections: Vec<String>,
}

/// Raw payload on success; `None` (and a recorded failure) otherwise.
fn settle(section: Section, result: Result<Value>, failed: &mut Vec<String>) -> Option<Value> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            log_section_defaulted(section.as_str(), &format!("{:#}", e));
            failed.push(section.as_str().to_string());
            None
        }
    }
}

/// Patent analyst report from the four trend endpoints.
pub async fn build_report(source: &dyn TrendSource, filter: &TrendFilter) -> AnalysisReport {
    let (filings, technologies, assignees, countries) = tokio::join!(
        source.fetch_section(Section::FilingTrends, filter),
        source.fetch_section(Section::TechnologyTrends, filter),
        source.fetch_section(Section::AssigneeTrends, filter),
        source.fetch_section(Section::CountryTrends, filter),
    );

    let mut failed = Vec::new();
    let filing_trends = settle(Section::FilingTrends, filings, &mut failed)
        .map(|v| normalize_filing_trends(&v))
        .unwrap_or_default();
    let technology_trends = settle(Section::TechnologyTrends, technologies, &mut failed)
        .map(|v| normalize_technology_trends(&v))
        .unwrap_or_default();
    let assignee_trends = settle(Section::AssigneeTrends, assignees, &mut failed)
        .map(|v| normalize_assignee_trends(&v))
        .unwrap_or_default();
    let country_trends = settle(Section::CountryTrends, countries, &mut failed)
        .map(|v| normalize_country_trends(&v))
        .unwrap_or_default();

    let mut report = AnalysisReport {
        generated_at: ts_now(),
        filing_trends,
        technology_trends,
        assignee_trends,
        country_trends,
        insights: Vec::new(),
        failed_sections: failed,
    };
    report.insights = patent_insights(&report);

    log(
        Level::Info,
        Domain::Report,
        "analysis_report",
        obj(&[
            ("years", json!(report.filing_trends.len())),
            ("insights", json!(report.insights.len())),
            ("failed_sections", json!(report.failed_sections)),
        ]),
    );
    report
}

pub async fn build_trademark_report(source: &dyn TrendSource, filter: &TrendFilter) -> TrademarkReport {
    let (summary, classes) = tokio::join!(
        source.fetch_section(Section::TrademarkSummary, filter),
        source.fetch_section(Section::TrademarkClasses, filter),
    );

    let mut failed = Vec::new();
    let summary = settle(Section::TrademarkSummary, summary, &mut failed)
        .map(|v| normalize_trademark_summary(&v))
        .unwrap_or_default();
    let classes = settle(Section::TrademarkClasses, classes, &mut failed)
        .map(|v| normalize_trademark_classes(&v))
        .unwrap_or_default();
    let insights = trademark_insights(&summary);

    log(
        Level::Info,
        Domain::Report,
        "trademark_report",
        obj(&[
            ("total_applications", json!(summary.total_applications)),
            ("insights", json!(insights.len())),
            ("failed_sections", json!(failed)),
        ]),
    );
    TrademarkReport {
        generated_at: ts_now(),
        summary,
        classes,
        insights,
        failed_sections: failed,
    }
}
