//! List queries and client-side filtering.
//!
//! Filters are applied after the fetch so the document backend never needs a
//! composite index. When a filter is present the store over-fetches
//! `limit * overfetch_factor` of the newest records and keeps the first `limit`
//! matches. Matches older than that window are not returned; the factor is a
//! tunable heuristic, not a completeness guarantee.

use crate::model::AnalysisRecord;

/// Default page size for list requests.
pub const DEFAULT_LIST_LIMIT: usize = 50;
/// Default over-fetch multiplier for filtered list requests.
pub const DEFAULT_OVERFETCH_FACTOR: usize = 10;

/// Filters for listing stored analyses, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisQuery {
    /// Maximum number of records to return.
    pub limit: usize,
    /// Only records produced by this agent.
    pub agent: Option<String>,
    /// Only records of this analysis type.
    pub analysis_type: Option<String>,
    /// Only records owned by this user.
    pub user_id: Option<String>,
}

impl Default for AnalysisQuery {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_LIMIT)
    }
}

impl AnalysisQuery {
    /// Unfiltered query returning at most `limit` records.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            agent: None,
            analysis_type: None,
            user_id: None,
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = non_empty(agent.into());
        self
    }

    pub fn with_analysis_type(mut self, analysis_type: impl Into<String>) -> Self {
        self.analysis_type = non_empty(analysis_type.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = non_empty(user_id.into());
        self
    }

    /// Whether any filter is active. Empty strings do not count.
    pub fn has_filters(&self) -> bool {
        [&self.agent, &self.analysis_type, &self.user_id]
            .iter()
            .any(|filter| active(filter).is_some())
    }

    /// Number of raw candidates to request from the backend.
    pub fn fetch_limit(&self, overfetch_factor: usize) -> usize {
        if self.has_filters() {
            self.limit.saturating_mul(overfetch_factor.max(1))
        } else {
            self.limit
        }
    }

    /// Check a single record against every active filter.
    pub fn matches(&self, record: &AnalysisRecord) -> bool {
        let document = &record.document;
        if let Some(agent) = active(&self.agent) {
            if document.agent != agent {
                return false;
            }
        }
        if let Some(analysis_type) = active(&self.analysis_type) {
            if document.analysis_type != analysis_type {
                return false;
            }
        }
        if let Some(user_id) = active(&self.user_id) {
            if document.user_id.as_deref() != Some(user_id) {
                return false;
            }
        }
        true
    }

    /// Keep matching candidates in their original order, stopping at `limit`.
    pub fn select(&self, candidates: Vec<AnalysisRecord>) -> Vec<AnalysisRecord> {
        candidates
            .into_iter()
            .filter(|record| self.matches(record))
            .take(self.limit)
            .collect()
    }
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|value| !value.is_empty())
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
