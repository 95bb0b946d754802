use serde::Serialize;
use tracing::warn;

use crate::model::{AuditRecord, DetailEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub records: usize,
    pub entries: usize,
    pub difference: i64,
}

impl MergeReport {
    pub fn is_mismatch(&self) -> bool {
        self.difference != 0
    }
}

/// Pairs record `i` with detail entry `i`. There is no key shared by the two
/// sequences, so a page break handled differently by the table and detail
/// passes shifts every later detail onto the wrong record; a length mismatch
/// is the only visible symptom and is reported, not repaired.
pub fn merge_details(
    records: &mut [AuditRecord],
    entries: &[DetailEntry],
    file_name: &str,
) -> MergeReport {
    let report = MergeReport {
        records: records.len(),
        entries: entries.len(),
        difference: records.len() as i64 - entries.len() as i64,
    };

    if report.is_mismatch() {
        warn!(
            file_name = %file_name,
            records = report.records,
            entries = report.entries,
            difference = report.difference,
            "record/detail count mismatch; details may be misaligned"
        );
    }

    for (index, record) in records.iter_mut().enumerate() {
        record.details = entries
            .get(index)
            .map(|entry| entry.details.clone())
            .filter(|details| !details.is_empty());
    }

    report
}
