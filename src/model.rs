use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub file_name: String,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub date: Option<String>,
    pub user: Option<String>,
    pub full_name: Option<String>,
    pub client: Option<String>,
    pub category: Option<String>,
    pub action: Option<String>,
    pub details: Option<String>,
    pub archive: Option<String>,
}

impl AuditRecord {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Self::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        [&self.record_type, &self.date, &self.user]
            .iter()
            .any(|value| value.as_deref().is_some_and(|text| !text.is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailEntry {
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub filename: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfInventoryManifest {
    pub manifest_version: u32,
    pub generated_at: String,
    pub source_directory: String,
    pub pdf_count: usize,
    pub pdfs: Vec<PdfEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Saved,
    DryRun,
    DecodeFailed,
    HeaderNotFound,
    NoValidRecords,
    PersistFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub file_name: String,
    pub sha256: Option<String>,
    pub status: DocumentStatus,
    pub page_count: usize,
    pub record_count: usize,
    pub detail_count: usize,
    pub count_difference: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractCounts {
    pub pdf_count: usize,
    pub processed_pdf_count: usize,
    pub skipped_pdf_count: usize,
    pub mismatched_pdf_count: usize,
    pub records_saved: usize,
    pub detail_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractPaths {
    pub source_dir: String,
    pub db_path: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub command: String,
    pub dialect: String,
    pub decoder_version: Option<String>,
    pub paths: ExtractPaths,
    pub counts: ExtractCounts,
    pub documents: Vec<DocumentOutcome>,
    pub warnings: Vec<String>,
}
