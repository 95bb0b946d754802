use super::types::{ColumnModel, TextRun};
use crate::model::AuditRecord;
use crate::util::collapse_whitespace;

pub fn map_row_to_columns(row: &[TextRun], columns: &ColumnModel) -> Vec<String> {
    let mut values = vec![String::new(); columns.boundaries.len()];

    for run in row {
        let Some(index) = columns.column_for(run.x) else {
            continue;
        };

        let value = &mut values[index];
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(run.text.trim());
    }

    values
        .into_iter()
        .map(|value| collapse_whitespace(&value))
        .collect()
}

pub fn project_row(
    row: &[TextRun],
    columns: &ColumnModel,
    file_name: &str,
) -> Option<AuditRecord> {
    let mut record = AuditRecord::new(file_name);

    for (value, field) in map_row_to_columns(row, columns)
        .into_iter()
        .zip(columns.fields.iter())
    {
        let Some(field) = field else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        *field.slot(&mut record) = Some(value);
    }

    record.is_valid().then_some(record)
}
