//! Rule-based commentary over aggregate statistics.
//!
//! Every insight is a ratio, a severity tier picked by fixed thresholds, and a
//! fixed template. Same input, same text.

use serde::{Deserialize, Serialize};

use crate::logging::log_insight;
use crate::model::{CompetitorSummary, TrademarkSummary, YearCount};
use crate::report::AnalysisReport;

/// Largest-entity share above this is a high concentration (percent)
pub const CONCENTRATION_HIGH: f64 = 25.0;
pub const CONCENTRATION_MEDIUM: f64 = 15.0;
/// Absolute growth above this is high (percent)
pub const GROWTH_HIGH: f64 = 10.0;
pub const GROWTH_MEDIUM: f64 = 3.0;
/// Active share below this is a high-severity stability finding (percent)
pub const STABILITY_HIGH_BELOW: f64 = 40.0;
pub const STABILITY_MEDIUM_BELOW: f64 = 70.0;
pub const GRANT_RATE_HIGH_BELOW: f64 = 40.0;
pub const GRANT_RATE_MEDIUM_BELOW: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Growth,
    Concentration,
    Stability,
    GrantRate,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Growth => "growth",
            InsightKind::Concentration => "concentration",
            InsightKind::Stability => "stability",
            InsightKind::GrantRate => "grant_rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// The computed ratio, percent, rounded to one decimal
    pub value: f64,
}

impl Insight {
    fn new(kind: InsightKind, severity: Severity, title: String, message: String, value: f64) -> Self {
        log_insight(kind.as_str(), severity.as_str(), value);
        Self {
            kind,
            severity,
            title,
            message,
            value,
        }
    }
}

// =============================================================================
// Ratios
// =============================================================================

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Percent change from `first` to `last`. A zero or negative base yields 0.
pub fn growth_rate(first: f64, last: f64) -> f64 {
    if first > 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    }
}

/// Growth between the earliest and latest year of a series. Needs two
/// points; year 0 marks an unparsable year and is skipped.
pub fn series_growth(series: &[YearCount]) -> Option<(i32, i32, f64)> {
    let dated = || series.iter().filter(|y| y.year > 0);
    let first = dated().min_by_key(|y| y.year)?;
    let last = dated().max_by_key(|y| y.year)?;
    if first.year == last.year {
        return None;
    }
    Some((first.year, last.year, growth_rate(first.count, last.count)))
}

/// Share of the largest value in the total, percent.
pub fn concentration_share(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().filter(|c| **c > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let top = counts.iter().copied().fold(0.0_f64, f64::max);
    top / total * 100.0
}

/// Active share of the portfolio, percent. `None` when both counts are zero.
pub fn active_ratio(active: f64, inactive: f64) -> Option<f64> {
    let total = active.max(0.0) + inactive.max(0.0);
    (total > 0.0).then(|| active.max(0.0) / total * 100.0)
}

// =============================================================================
// Severity tiers
// =============================================================================

pub fn classify_concentration(share_pct: f64) -> Severity {
    if share_pct > CONCENTRATION_HIGH {
        Severity::High
    } else if share_pct > CONCENTRATION_MEDIUM {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Declines are as notable as gains, so the tier follows magnitude.
pub fn classify_growth(growth_pct: f64) -> Severity {
    let magnitude = growth_pct.abs();
    if magnitude > GROWTH_HIGH {
        Severity::High
    } else if magnitude > GROWTH_MEDIUM {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn classify_stability(active_pct: f64) -> Severity {
    if active_pct < STABILITY_HIGH_BELOW {
        Severity::High
    } else if active_pct < STABILITY_MEDIUM_BELOW {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn classify_grant_rate(rate_pct: f64) -> Severity {
    if rate_pct < GRANT_RATE_HIGH_BELOW {
        Severity::High
    } else if rate_pct < GRANT_RATE_MEDIUM_BELOW {
        Severity::Medium
    } else {
        Severity::Low
    }
}

// =============================================================================
// Templates
// =============================================================================

pub fn growth_insight(subject: &str, from_year: i32, to_year: i32, growth_pct: f64) -> Insight {
    let severity = classify_growth(growth_pct);
    let value = round1(growth_pct);
    let title = match (severity, value >= 0.0) {
        (Severity::High, true) => format!("Strong growth in {}", subject),
        (Severity::Medium, true) => format!("Moderate growth in {}", subject),
        (Severity::High, false) => format!("Sharp decline in {}", subject),
        (Severity::Medium, false) => format!("Moderate decline in {}", subject),
        (Severity::Low, _) => format!("Stable {}", subject),
    };
    let verb = if value >= 0.0 { "grew" } else { "declined" };
    let message = format!(
        "{} {} {:.1}% from {} to {}.",
        capitalize(subject),
        verb,
        value.abs(),
        from_year,
        to_year
    );
    Insight::new(InsightKind::Growth, severity, title, message, value)
}

pub fn concentration_insight(subject: &str, leader: &str, share_pct: f64) -> Insight {
    let severity = classify_concentration(share_pct);
    let value = round1(share_pct);
    let title = match severity {
        Severity::High => format!("Highly concentrated {}", subject),
        Severity::Medium => format!("Moderately concentrated {}", subject),
        Severity::Low => format!("Diversified {}", subject),
    };
    let message = format!("{} accounts for {:.1}% of {}.", leader, value, subject);
    Insight::new(InsightKind::Concentration, severity, title, message, value)
}

pub fn stability_insight(active: f64, inactive: f64, active_pct: f64) -> Insight {
    let severity = classify_stability(active_pct);
    let value = round1(active_pct);
    let title = match severity {
        Severity::High => "Large inactive portfolio",
        Severity::Medium => "Mixed portfolio health",
        Severity::Low => "Healthy active portfolio",
    }
    .to_string();
    let message = format!(
        "{:.1}% of trademarks are active ({} active, {} inactive).",
        value, active, inactive
    );
    Insight::new(InsightKind::Stability, severity, title, message, value)
}

pub fn grant_rate_insight(rate_pct: f64, years: usize) -> Insight {
    let severity = classify_grant_rate(rate_pct);
    let value = round1(rate_pct);
    let title = match severity {
        Severity::High => "Low grant rate",
        Severity::Medium => "Average grant rate",
        Severity::Low => "High grant rate",
    }
    .to_string();
    let message = format!("Average grant rate is {:.1}% across {} years.", value, years);
    Insight::new(InsightKind::GrantRate, severity, title, message, value)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Generators
// =============================================================================

pub fn trademark_insights(summary: &TrademarkSummary) -> Vec<Insight> {
    let mut out = Vec::new();
    if let Some((from, to, growth)) = series_growth(&summary.filings_by_year) {
        out.push(growth_insight("trademark filings", from, to, growth));
    }
    if let Some(pct) = active_ratio(summary.active_count, summary.inactive_count) {
        out.push(stability_insight(summary.active_count, summary.inactive_count, pct));
    }
    out
}

pub fn patent_insights(report: &AnalysisReport) -> Vec<Insight> {
    let mut out = Vec::new();

    let yearly: Vec<YearCount> = report
        .filing_trends
        .iter()
        .map(|p| YearCount {
            year: p.year,
            count: p.filing_count,
        })
        .collect();
    if let Some((from, to, growth)) = series_growth(&yearly) {
        out.push(growth_insight("patent filings", from, to, growth));
    }

    let rated: Vec<f64> = report
        .filing_trends
        .iter()
        .filter(|p| p.filing_count > 0.0)
        .map(|p| p.grant_rate)
        .collect();
    if !rated.is_empty() {
        let avg = rated.iter().sum::<f64>() / rated.len() as f64;
        out.push(grant_rate_insight(avg, rated.len()));
    }

    let leaders = [
        (
            "assignee filings",
            leader(report.assignee_trends.iter().map(|a| (a.name.as_str(), a.count))),
        ),
        (
            "technology filings",
            leader(report.technology_trends.iter().map(|t| (t.name.as_str(), t.count))),
        ),
        (
            "country filings",
            leader(report.country_trends.iter().map(|c| (c.name.as_str(), c.count))),
        ),
    ];
    for (subject, found) in leaders {
        if let Some((name, share)) = found {
            out.push(concentration_insight(subject, &name, share));
        }
    }
    out
}

pub fn competitor_insights(competitors: &[CompetitorSummary]) -> Vec<Insight> {
    leader(competitors.iter().map(|c| (c.name.as_str(), c.patent_count)))
        .map(|(name, share)| vec![concentration_insight("competitor patents", &name, share)])
        .unwrap_or_default()
}

/// Name of the largest entity and its share, if there is any positive count.
fn leader<'a, I>(entries: I) -> Option<(String, f64)>
where
    I: Iterator<Item = (&'a str, f64)>,
{
    let entries: Vec<(&str, f64)> = entries.collect();
    let counts: Vec<f64> = entries.iter().map(|(_, c)| *c).collect();
    let share = concentration_share(&counts);
    if share <= 0.0 {
        return None;
    }
    entries
        .iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(name, _)| (name.to_string(), share))
}
