use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use super::columns::TableScan;
use super::decode::PageDecoder;
use super::details::segment_details;
use super::dialect::DocumentDialect;
use super::merge::{MergeReport, merge_details};
use super::projector::project_row;
use super::rows::group_rows;
use super::store::AuditStore;
use super::types::DecodedPage;
use crate::model::{AuditRecord, DocumentOutcome, DocumentStatus};
use crate::util::{file_name_of, sha256_file};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to decode {file_name}: {message}")]
    Decode { file_name: String, message: String },
    #[error("header row not found in {file_name}")]
    HeaderNotFound { file_name: String },
    #[error("no valid audit rows found in {file_name}")]
    NoValidRecords { file_name: String },
    #[error("failed to save records from {file_name}: {message}")]
    Persist { file_name: String, message: String },
}

impl DocumentError {
    pub fn status(&self) -> DocumentStatus {
        match self {
            Self::Decode { .. } => DocumentStatus::DecodeFailed,
            Self::HeaderNotFound { .. } => DocumentStatus::HeaderNotFound,
            Self::NoValidRecords { .. } => DocumentStatus::NoValidRecords,
            Self::Persist { .. } => DocumentStatus::PersistFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentExtraction {
    pub records: Vec<AuditRecord>,
    pub merge: MergeReport,
}

pub fn extract_document(
    pages: &[DecodedPage],
    file_name: &str,
    dialect: &DocumentDialect,
    y_tolerance: f64,
) -> Result<DocumentExtraction, DocumentError> {
    let scan = pages.iter().fold(TableScan::default(), |scan, page| {
        scan.scan_page(group_rows(&page.runs, y_tolerance), dialect)
    });

    let Some(columns) = scan.columns else {
        return Err(DocumentError::HeaderNotFound {
            file_name: file_name.to_string(),
        });
    };

    let mut records = scan
        .rows
        .iter()
        .filter_map(|row| project_row(row, &columns, file_name))
        .collect::<Vec<AuditRecord>>();

    if records.is_empty() {
        return Err(DocumentError::NoValidRecords {
            file_name: file_name.to_string(),
        });
    }

    let entries = segment_details(pages, dialect, y_tolerance);
    info!(
        file_name = %file_name,
        audit_entries = records.len(),
        detail_entries = entries.len(),
        "reconstructed document"
    );

    let merge = merge_details(&mut records, &entries, file_name);
    Ok(DocumentExtraction { records, merge })
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<DocumentOutcome>,
    pub records_saved: usize,
}

impl BatchSummary {
    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| {
                !matches!(outcome.status, DocumentStatus::Saved | DocumentStatus::DryRun)
            })
            .count()
    }

    pub fn mismatched_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.count_difference != 0)
            .count()
    }

    pub fn detail_entries(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.detail_count).sum()
    }
}

pub struct BatchExtractor<'a, D: PageDecoder> {
    pub decoder: &'a D,
    pub dialect: &'a DocumentDialect,
    pub y_tolerance: f64,
}

impl<D: PageDecoder> BatchExtractor<'_, D> {
    pub fn run<S: AuditStore>(
        &self,
        pdf_paths: &[PathBuf],
        mut store: Option<&mut S>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for pdf_path in pdf_paths {
            let outcome = self.process_document(pdf_path, store.as_deref_mut());
            if outcome.status == DocumentStatus::Saved {
                summary.records_saved += outcome.record_count;
            }
            summary.outcomes.push(outcome);
        }

        info!(
            records_saved = summary.records_saved,
            documents = summary.outcomes.len(),
            skipped = summary.skipped_count(),
            "batch extraction finished"
        );
        summary
    }

    fn process_document<S: AuditStore>(
        &self,
        pdf_path: &Path,
        store: Option<&mut S>,
    ) -> DocumentOutcome {
        let file_name = file_name_of(pdf_path);
        let sha256 = match sha256_file(pdf_path) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!(
                    file_name = %file_name,
                    error = %format!("{err:#}"),
                    "failed to hash document"
                );
                None
            }
        };
        let mut outcome = DocumentOutcome {
            file_name: file_name.clone(),
            sha256,
            status: DocumentStatus::DryRun,
            page_count: 0,
            record_count: 0,
            detail_count: 0,
            count_difference: 0,
            error: None,
        };

        let result = self
            .decoder
            .decode(pdf_path)
            .map_err(|err| DocumentError::Decode {
                file_name: file_name.clone(),
                message: format!("{err:#}"),
            })
            .and_then(|pages| {
                outcome.page_count = pages.len();
                extract_document(&pages, &file_name, self.dialect, self.y_tolerance)
            })
            .and_then(|extraction| {
                outcome.record_count = extraction.records.len();
                outcome.detail_count = extraction.merge.entries;
                outcome.count_difference = extraction.merge.difference;
                persist(&extraction.records, &file_name, store)
            });

        match result {
            Ok(status) => outcome.status = status,
            Err(err) => {
                match &err {
                    DocumentError::NoValidRecords { .. } => {
                        info!(file_name = %file_name, "{err}; skipping")
                    }
                    DocumentError::HeaderNotFound { .. } => {
                        warn!(file_name = %file_name, "{err}; skipping")
                    }
                    _ => error!(file_name = %file_name, error = %err, "error processing document"),
                }
                outcome.status = err.status();
                outcome.error = Some(err.to_string());
            }
        }

        outcome
    }
}

fn persist<S: AuditStore>(
    records: &[AuditRecord],
    file_name: &str,
    store: Option<&mut S>,
) -> Result<DocumentStatus, DocumentError> {
    let Some(store) = store else {
        info!(file_name = %file_name, records = records.len(), "dry run; records not saved");
        return Ok(DocumentStatus::DryRun);
    };

    let saved = store
        .insert_batch(records)
        .map_err(|err| DocumentError::Persist {
            file_name: file_name.to_string(),
            message: format!("{err:#}"),
        })?;
    info!(file_name = %file_name, saved, "saved merged audit records");
    Ok(DocumentStatus::Saved)
}
