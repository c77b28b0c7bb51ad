//! Payload normalization.
//!
//! The backend is inconsistent: some endpoints return a bare array, some wrap
//! it in `{data: [...]}` (or `results`/`items`/`trends`), and field names
//! drift between camelCase, snake_case and short forms. Each normalizer takes
//! whatever arrived and returns canonical records. Nothing here fails: a
//! missing or malformed number is 0, a missing label is "Unknown".

use serde_json::{Map, Value};

use crate::logging::{log, obj, v_str, Domain, Level};
use crate::model::{
    AssigneeTrend, CompetitorSummary, CountryTrend, FilingTrendPoint, TechnologyTrend,
    TrademarkClassCount, TrademarkSummary, TrendClass, YearCount, UNKNOWN_LABEL,
};

const ENVELOPE_KEYS: [&str; 4] = ["data", "results", "items", "trends"];
const MAX_ENVELOPE_DEPTH: usize = 2;

// Field aliases. The canonical (serialized) name is always first.
const YEAR: &[&str] = &["year", "filingYear", "filing_year", "period"];
const FILING_COUNT: &[&str] = &["filingCount", "filing_count", "filings", "applications", "count"];
const GRANT_COUNT: &[&str] = &["grantCount", "grant_count", "grants", "granted"];
const GRANT_RATE: &[&str] = &["grantRate", "grant_rate"];
const COUNT: &[&str] = &["count", "patentCount", "patent_count", "filings", "total", "value"];
const TREND: &[&str] = &["trend", "trendClass", "direction", "trendDirection"];
const GROWTH: &[&str] = &["growthRate", "growth_rate", "growth", "changePercent"];
const TECH_CODE: &[&str] = &["code", "cpcCode", "cpc_code", "ipcCode", "technologyCode", "id"];
const TECH_NAME: &[&str] = &["name", "title", "description", "technology", "label"];
const ASSIGNEE_NAME: &[&str] = &["name", "assignee", "assigneeName", "assignee_name", "organization", "company"];
const COUNTRY_CODE: &[&str] = &["code", "countryCode", "country_code", "iso", "country"];
const COUNTRY_NAME: &[&str] = &["name", "countryName", "country_name", "country"];
const TOTAL_APPLICATIONS: &[&str] = &["totalApplications", "total_applications", "total", "totalFilings"];
const FILINGS_BY_YEAR: &[&str] = &["filingsByYear", "filings_by_year", "byYear", "yearly"];
const YEAR_COUNT: &[&str] = &["count", "filings", "applications", "total", "value"];
const RECENT_ACTIVITY: &[&str] = &["recentActivity", "recent_activity", "recentFilings", "last12Months"];
const ACTIVE: &[&str] = &["activeCount", "active_count", "active", "registered"];
const INACTIVE: &[&str] = &["inactiveCount", "inactive_count", "inactive", "abandoned"];
const CLASS_CODE: &[&str] = &["classCode", "class_code", "niceClass", "nice_class", "class", "code"];
const CLASS_DESCRIPTION: &[&str] = &["description", "name", "label", "title"];
const COMPETITOR_NAME: &[&str] = &["name", "competitor", "company", "assignee", "organization"];
const PATENT_COUNT: &[&str] = &["patentCount", "patent_count", "patents", "patentTotal"];
const TRADEMARK_COUNT: &[&str] = &["trademarkCount", "trademark_count", "trademarks"];
const SHARE: &[&str] = &["share", "marketShare", "market_share"];

// =============================================================================
// Shape helpers
// =============================================================================

/// Unwrap an array payload. Objects are searched through the envelope keys,
/// one nested envelope deep. Non-object entries are dropped.
pub fn records(raw: &Value) -> Vec<&Map<String, Value>> {
    match envelope_array(raw, 0) {
        Some(items) => items.iter().filter_map(Value::as_object).collect(),
        None => {
            if !raw.is_null() {
                log(
                    Level::Debug,
                    Domain::Normalize,
                    "unrecognized_shape",
                    obj(&[("kind", v_str(shape_name(raw)))]),
                );
            }
            Vec::new()
        }
    }
}

fn envelope_array(raw: &Value, depth: usize) -> Option<&Vec<Value>> {
    match raw {
        Value::Array(items) => Some(items),
        Value::Object(map) if depth < MAX_ENVELOPE_DEPTH => ENVELOPE_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find_map(|inner| envelope_array(inner, depth + 1)),
        _ => None,
    }
}

/// Unwrap a single-object payload: `{data: {...}}` or the object itself.
pub fn record(raw: &Value) -> Option<&Map<String, Value>> {
    let map = raw.as_object()?;
    match map.get("data") {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(map),
    }
}

fn shape_name(raw: &Value) -> &'static str {
    match raw {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// A finite number from a JSON number or numeric string.
pub fn coerce_num(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn lookup_num(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| map.get(*k)).find_map(coerce_num)
}

/// First alias holding a usable number, else 0.
pub fn num_field(map: &Map<String, Value>, keys: &[&str]) -> f64 {
    lookup_num(map, keys).unwrap_or(0.0)
}

/// First alias holding a non-empty string (or a number), else "Unknown".
pub fn text_field(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

/// Display name, falling back to the entity's code when no name was sent.
fn label_or_code(map: &Map<String, Value>, keys: &[&str], code: &str) -> String {
    let name = text_field(map, keys);
    if name == UNKNOWN_LABEL {
        code.to_string()
    } else {
        name
    }
}

fn year_field(map: &Map<String, Value>) -> i32 {
    lookup_num(map, YEAR).map(to_year).unwrap_or(0)
}

fn to_year(n: f64) -> i32 {
    if n.is_finite() && n.abs() < i32::MAX as f64 {
        n.trunc() as i32
    } else {
        0
    }
}

fn trend_field(map: &Map<String, Value>) -> TrendClass {
    let labelled = TREND
        .iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(TrendClass::from_label)
        .find(|t| *t != TrendClass::Unknown);
    match labelled {
        Some(t) => t,
        None => lookup_num(map, GROWTH)
            .map(TrendClass::from_growth)
            .unwrap_or(TrendClass::Unknown),
    }
}

// =============================================================================
// Per-endpoint normalizers
// =============================================================================

/// Yearly filing/grant counts, sorted by year. A missing grant rate is
/// derived from the counts.
pub fn normalize_filing_trends(raw: &Value) -> Vec<FilingTrendPoint> {
    let mut points: Vec<FilingTrendPoint> = records(raw)
        .into_iter()
        .map(|r| {
            let filing_count = num_field(r, FILING_COUNT);
            let grant_count = num_field(r, GRANT_COUNT);
            let grant_rate = lookup_num(r, GRANT_RATE).unwrap_or_else(|| {
                if filing_count > 0.0 {
                    grant_count / filing_count * 100.0
                } else {
                    0.0
                }
            });
            FilingTrendPoint {
                year: year_field(r),
                filing_count,
                grant_count,
                grant_rate,
            }
        })
        .collect();
    points.sort_by_key(|p| p.year);
    points
}

pub fn normalize_technology_trends(raw: &Value) -> Vec<TechnologyTrend> {
    records(raw)
        .into_iter()
        .map(|r| {
            let code = text_field(r, TECH_CODE);
            TechnologyTrend {
                name: label_or_code(r, TECH_NAME, &code),
                code,
                count: num_field(r, COUNT),
                trend: trend_field(r),
            }
        })
        .collect()
}

pub fn normalize_assignee_trends(raw: &Value) -> Vec<AssigneeTrend> {
    records(raw)
        .into_iter()
        .map(|r| AssigneeTrend {
            name: text_field(r, ASSIGNEE_NAME),
            count: num_field(r, COUNT),
            trend: trend_field(r),
        })
        .collect()
}

pub fn normalize_country_trends(raw: &Value) -> Vec<CountryTrend> {
    records(raw)
        .into_iter()
        .map(|r| {
            let code = text_field(r, COUNTRY_CODE);
            CountryTrend {
                name: label_or_code(r, COUNTRY_NAME, &code),
                code,
                count: num_field(r, COUNT),
                trend: trend_field(r),
            }
        })
        .collect()
}

/// Trademark summary. `filingsByYear` may be an array of records or a
/// `{"2023": 100}` map; `recentActivity` may be a count, a list of recent
/// filings, or an object carrying a `count`.
pub fn normalize_trademark_summary(raw: &Value) -> TrademarkSummary {
    let Some(map) = record(raw) else {
        return TrademarkSummary::default();
    };

    let filings_by_year = year_counts(FILINGS_BY_YEAR.iter().find_map(|k| map.get(*k)));
    let mut total_applications = num_field(map, TOTAL_APPLICATIONS);
    if total_applications == 0.0 {
        total_applications = filings_by_year.iter().map(|y| y.count).sum();
    }

    TrademarkSummary {
        total_applications,
        filings_by_year,
        recent_activity: recent_activity(map),
        active_count: num_field(map, ACTIVE),
        inactive_count: num_field(map, INACTIVE),
    }
}

fn year_counts(raw: Option<&Value>) -> Vec<YearCount> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    let mut out: Vec<YearCount> = if envelope_array(raw, 0).is_some() {
        records(raw)
            .into_iter()
            .map(|r| YearCount {
                year: year_field(r),
                count: num_field(r, YEAR_COUNT),
            })
            .collect()
    } else if let Value::Object(map) = raw {
        map.iter()
            .filter_map(|(k, v)| {
                let year = k.trim().parse::<i32>().ok()?;
                Some(YearCount {
                    year,
                    count: coerce_num(v).unwrap_or(0.0),
                })
            })
            .collect()
    } else {
        Vec::new()
    };
    out.sort_by_key(|y| y.year);
    out
}

fn recent_activity(map: &Map<String, Value>) -> f64 {
    RECENT_ACTIVITY
        .iter()
        .filter_map(|k| map.get(*k))
        .find_map(|v| match v {
            Value::Array(items) => Some(items.len() as f64),
            Value::Object(inner) => lookup_num(inner, &["count", "total"]),
            other => coerce_num(other),
        })
        .unwrap_or(0.0)
}

pub fn normalize_trademark_classes(raw: &Value) -> Vec<TrademarkClassCount> {
    let mut classes: Vec<TrademarkClassCount> = records(raw)
        .into_iter()
        .map(|r| TrademarkClassCount {
            class_code: text_field(r, CLASS_CODE),
            description: text_field(r, CLASS_DESCRIPTION),
            count: num_field(r, COUNT),
        })
        .collect();
    classes.sort_by(|a, b| b.count.total_cmp(&a.count));
    classes
}

/// Competitors. A missing share is the competitor's percent of the listed
/// patent total.
pub fn normalize_competitors(raw: &Value) -> Vec<CompetitorSummary> {
    let rows = records(raw);
    let patent_total: f64 = rows.iter().map(|r| num_field(r, PATENT_COUNT)).sum();
    rows.into_iter()
        .map(|r| {
            let patent_count = num_field(r, PATENT_COUNT);
            let share = lookup_num(r, SHARE).unwrap_or_else(|| {
                if patent_total > 0.0 {
                    patent_count / patent_total * 100.0
                } else {
                    0.0
                }
            });
            CompetitorSummary {
                name: text_field(r, COMPETITOR_NAME),
                patent_count,
                trademark_count: num_field(r, TRADEMARK_COUNT),
                share,
            }
        })
        .collect()
}
