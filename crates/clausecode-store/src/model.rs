//! Analysis record model used by backends.

use crate::timestamp::resolve_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Analysis fields supplied by the caller before anything is persisted.
///
/// There is deliberately no id here: ids are assigned by the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewAnalysis {
    /// Caller-supplied timestamp, parsed leniently on save.
    pub timestamp: String,
    /// Analysis persona that produced the result.
    pub agent: String,
    /// Category of analysis performed.
    pub analysis_type: String,
    /// Title of the analysed page or document.
    pub page_title: String,
    /// URL of the analysed page.
    pub page_url: String,
    /// Analysis output.
    pub result_text: String,
    /// Full page text, if the caller sent it.
    pub page_content: Option<String>,
    /// Authenticated caller, absent for anonymous use.
    pub user_id: Option<String>,
    /// Open-ended extension fields.
    pub metadata: Option<Map<String, Value>>,
}

impl NewAnalysis {
    /// Assemble the persisted document, stamping `created_at` with `now`.
    ///
    /// An unparseable timestamp falls back to `now`. Empty optional values are
    /// dropped so the stored document only carries what was supplied.
    pub fn into_document(self, now: DateTime<Utc>) -> AnalysisDocument {
        AnalysisDocument {
            timestamp: resolve_timestamp(&self.timestamp, now),
            agent: self.agent,
            analysis_type: self.analysis_type,
            page_title: self.page_title,
            page_url: self.page_url,
            result_text: self.result_text,
            page_content: self.page_content.filter(|value| !value.is_empty()),
            user_id: self.user_id.filter(|value| !value.trim().is_empty()),
            metadata: self.metadata.filter(|map| !map.is_empty()),
            created_at: now,
        }
    }
}

/// Persisted analysis document (everything but the backend id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisDocument {
    /// When the analysis was produced.
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub analysis_type: String,
    pub page_title: String,
    pub page_url: String,
    pub result_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    /// When the store wrote the document.
    pub created_at: DateTime<Utc>,
}

/// Stored analysis as returned by `get` and `list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRecord {
    /// Backend-assigned identifier.
    pub id: String,
    #[serde(flatten)]
    pub document: AnalysisDocument,
}

impl AnalysisRecord {
    pub fn new(id: impl Into<String>, document: AnalysisDocument) -> Self {
        Self {
            id: id.into(),
            document,
        }
    }
}
