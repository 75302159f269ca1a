//! Save/commit protocol: validation and the persistence wire format.
//!
//! A save request is only built from a validated extraction:
//! - header non-empty
//! - at least one row
//! - every row exactly as wide as the header (no truncation, no padding)
//!
//! The request goes to a `Persistence` collaborator. A response without a
//! `success` field counts as success.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::extract::{Extraction, Strategy};

/// Diagnostics sent alongside the data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    pub total_rows: usize,
    pub header_count: usize,
    pub extraction_method: String,
    pub note: String,
}

/// Body of the save call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
    pub debug_info: DebugInfo,
}

impl SaveRequest {
    /// Validate an extraction and wrap it for submission.
    pub fn from_extraction(extraction: Extraction) -> Result<Self, EngineError> {
        validate(&extraction.header, &extraction.rows)?;
        let Extraction { header, rows, method } = extraction;
        Ok(Self::build(header, rows, method))
    }

    fn build(headers: Vec<String>, data: Vec<Vec<String>>, method: Strategy) -> Self {
        let debug_info = DebugInfo {
            total_rows: data.len(),
            header_count: headers.len(),
            extraction_method: method.label().to_string(),
            note: format!("All {} rows included - extracted using {}", data.len(), method.label()),
        };
        Self { headers, data, debug_info }
    }
}

/// Server reply to a save.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: String,
}

impl SaveResponse {
    /// Only an explicit `"success": false` is a failure.
    pub fn is_success(&self) -> bool {
        self.success != Some(false)
    }
}

/// External collaborator that persists a dataset.
pub trait Persistence {
    type Error: std::fmt::Display;

    /// Submit the dataset. Transport failures and non-2xx statuses are `Err`.
    fn save_table(&self, request: &SaveRequest) -> Result<SaveResponse, Self::Error>;
}

/// What the caller gets back from a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub rows: usize,
    /// Label of the extraction strategy used
    pub method: String,
    pub message: String,
}

/// Check header and row widths before anything is sent.
pub fn validate(headers: &[String], rows: &[Vec<String>]) -> Result<(), EngineError> {
    if headers.is_empty() {
        return Err(EngineError::EmptyHeader);
    }
    if rows.is_empty() {
        return Err(EngineError::NoDataExtracted { attempts: Vec::new() });
    }
    if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != headers.len()) {
        return Err(EngineError::SchemaMismatch {
            row,
            header_count: headers.len(),
            row_width: cells.len(),
        });
    }
    Ok(())
}
