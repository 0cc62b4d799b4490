/// Saved report selection
///
/// RTM returns every saved report of a project; we pick one by counting
/// case-insensitive keyword hits in its name and filters, breaking ties by
/// recency and then by list order. A hit on the requested report name
/// outweighs every other keyword combined.
use crate::error::{ReportError, Result};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

/// A saved report definition as listed by RTM
#[derive(Debug, Clone, PartialEq)]
pub struct SavedReportDescriptor {
    /// Normalised identifier; `None` marks a structurally broken entry
    pub id: Option<String>,
    pub name: String,
    pub filters: Value,
    pub updated: Option<String>,
    pub created: Option<String>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    id: Option<Value>,
    key: Option<Value>,
    uuid: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    filters: Value,
    updated: Option<String>,
    created: Option<String>,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<RawDescriptor> for SavedReportDescriptor {
    fn from(raw: RawDescriptor) -> Self {
        let id = [raw.id, raw.key, raw.uuid].iter().flatten().find_map(id_string);
        Self { id, name: raw.name.unwrap_or_default(), filters: raw.filters, updated: raw.updated, created: raw.created }
    }
}

impl SavedReportDescriptor {
    /// Timestamp used for tie-breaking: `updated`, else `created`, else empty
    pub fn timestamp(&self) -> &str {
        self.updated.as_deref().or(self.created.as_deref()).unwrap_or("")
    }
}

/// Parse a saved-report listing: either a bare array or an object wrapping
/// the array in `values` or `results`
pub fn parse_report_list(body: &Value) -> Result<Vec<SavedReportDescriptor>> {
    let items = match body {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("values").or_else(|| map.get("results")) {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut reports = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RawDescriptor>(item) {
            Ok(raw) => reports.push(raw.into()),
            Err(e) => {
                warn!("Skipping unreadable saved report entry: {}", e);
                reports.push(SavedReportDescriptor {
                    id: None,
                    name: String::new(),
                    filters: Value::Null,
                    updated: None,
                    created: None,
                });
            }
        }
    }

    debug!("Parsed {} saved report descriptors", reports.len());
    Ok(reports)
}

/// What to do when the best descriptor matched no keyword at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Return the most recent report anyway
    #[default]
    Newest,
    /// Fail with `ReportNotFound`
    Strict,
}

/// Keywords a saved report is scored against
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchQuery {
    terms: Vec<String>,
    name: Option<String>,
    pub policy: FallbackPolicy,
}

impl MatchQuery {
    /// Query on the issue (or project) key and environment name
    pub fn new(issue_key: &str, environment: &str) -> Self {
        Self::default().with_term(issue_key).with_term(environment)
    }

    /// Add another keyword; blank terms are ignored
    pub fn with_term(mut self, term: &str) -> Self {
        let term = term.trim().to_lowercase();
        if !term.is_empty() {
            self.terms.push(term);
        }
        self
    }

    /// Set the report name being asked for; blank names are ignored
    pub fn with_name(mut self, name: &str) -> Self {
        let name = name.trim().to_lowercase();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Weight of one report-name hit: more than all keyword hits together
    fn name_weight(&self) -> u32 {
        2 * self.terms.len() as u32 + 1
    }

    fn describe(&self) -> String {
        self.name.iter().chain(self.terms.iter()).cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Relevance and recency of one descriptor against a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchScore {
    pub relevance: u32,
    pub timestamp: String,
}

impl MatchScore {
    pub fn compute(report: &SavedReportDescriptor, query: &MatchQuery) -> Self {
        let name = report.name.to_lowercase();
        let filters = if report.filters.is_null() { String::new() } else { report.filters.to_string().to_lowercase() };

        let hits = |term: &str| u32::from(name.contains(term)) + u32::from(filters.contains(term));

        let keyword_hits: u32 = query.terms().iter().map(|term| hits(term)).sum();
        let name_hits = query.name().map_or(0, |wanted| hits(wanted) * query.name_weight());

        Self { relevance: keyword_hits + name_hits, timestamp: report.timestamp().to_string() }
    }
}

impl Ord for MatchScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.relevance.cmp(&other.relevance).then_with(|| self.timestamp.cmp(&other.timestamp))
    }
}

impl PartialOrd for MatchScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The chosen descriptor and how well it matched
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedReport {
    pub descriptor: SavedReportDescriptor,
    pub id: String,
    pub relevance: u32,
}

impl LocatedReport {
    /// True when nothing in the query matched and the newest report was used
    pub fn is_fallback(&self) -> bool {
        self.relevance == 0
    }
}

/// Select the best saved report for `query`
///
/// Ordering is relevance desc, timestamp desc, original position asc.
/// With `FallbackPolicy::Newest` a non-empty list with at least one valid
/// descriptor always yields a result.
pub fn locate(reports: &[SavedReportDescriptor], query: &MatchQuery) -> Result<LocatedReport> {
    if reports.is_empty() {
        return Err(ReportError::NoReportsAvailable);
    }

    let mut scored: Vec<(usize, MatchScore)> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.id.is_some())
        .map(|(idx, r)| (idx, MatchScore::compute(r, query)))
        .collect();

    if scored.is_empty() {
        return Err(ReportError::ReportNotFound(format!(
            "none of the {} saved reports carries an identifier",
            reports.len()
        )));
    }

    // Stable sort keeps list order among equal scores
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    let (idx, score) = scored.swap_remove(0);
    let descriptor = reports[idx].clone();

    if score.relevance == 0 {
        if query.policy == FallbackPolicy::Strict {
            return Err(ReportError::ReportNotFound(format!("no saved report matches [{}]", query.describe())));
        }
        warn!(
            "No saved report matches [{}]; falling back to most recent '{}'",
            query.describe(),
            descriptor.name
        );
    }

    let id = descriptor.id.clone().unwrap_or_default();
    info!("Selected saved report '{}' (id {}, relevance {})", descriptor.name, id, score.relevance);
    Ok(LocatedReport { descriptor, id, relevance: score.relevance })
}

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;
