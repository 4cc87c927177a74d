//! Request and response bodies for the HTTP API.

use clausecode_store::{AnalysisRecord, BackendKind, NewAnalysis};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

/// Body of `POST /save`. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveRequest {
    pub timestamp: String,
    pub agent: String,
    pub analysis_type: String,
    pub page_title: String,
    pub page_url: String,
    pub result_text: String,
    pub page_content: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl SaveRequest {
    /// Attach the caller identity and convert into a store input.
    pub fn into_analysis(self, user_id: Option<String>) -> NewAnalysis {
        NewAnalysis {
            timestamp: self.timestamp,
            agent: self.agent,
            analysis_type: self.analysis_type,
            page_title: self.page_title,
            page_url: self.page_url,
            result_text: self.result_text,
            page_content: self.page_content,
            user_id,
            metadata: self.metadata,
        }
    }
}

/// Query string of `GET /analyses`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub agent: Option<String>,
    pub analysis_type: Option<String>,
    pub user_id: Option<String>,
}

/// `{"status", "message"}` body used by health checks, deletes and errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

impl StatusResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            message: message.into(),
        }
    }
}

/// Response of `POST /save`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    pub status: String,
    pub message: String,
    /// Backends that accepted the write; empty when nothing was persisted.
    pub saved_to: Vec<BackendKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

/// Response of `GET /analyses`.
#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub status: String,
    pub count: usize,
    pub analyses: Vec<AnalysisRecord>,
}

impl ListResponse {
    pub fn new(analyses: Vec<AnalysisRecord>) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            count: analyses.len(),
            analyses,
        }
    }
}

/// Response of `GET /analyses/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub analysis: AnalysisRecord,
}

impl AnalysisResponse {
    pub fn new(analysis: AnalysisRecord) -> Self {
        Self {
            status: STATUS_OK.to_string(),
            analysis,
        }
    }
}
