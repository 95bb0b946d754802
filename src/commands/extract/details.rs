use tracing::debug;

use super::columns::is_header_row;
use super::dialect::DocumentDialect;
use super::noise::should_ignore_detail_line;
use super::rows::{group_rows, row_text};
use super::types::DecodedPage;
use crate::model::DetailEntry;

pub fn segment_details(
    pages: &[DecodedPage],
    dialect: &DocumentDialect,
    y_tolerance: f64,
) -> Vec<DetailEntry> {
    let mut entries = Vec::<DetailEntry>::new();
    let mut current = String::new();

    for page in pages {
        let rows = group_rows(&page.runs, y_tolerance);
        if rows.iter().any(|row| is_header_row(row, dialect)) {
            debug!(page = page.number, "skipping table page in detail pass");
            continue;
        }

        for row in &rows {
            let line = row_text(row);
            if should_ignore_detail_line(&line, dialect) {
                continue;
            }

            if dialect.starts_detail_entry(&line) {
                flush_entry(&mut entries, &mut current);
                current = line;
            } else if current.is_empty() {
                current = line;
            } else {
                current.push(' ');
                current.push_str(&line);
            }
        }
    }

    flush_entry(&mut entries, &mut current);
    entries
}

fn flush_entry(entries: &mut Vec<DetailEntry>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    entries.push(DetailEntry {
        details: std::mem::take(current),
    });
}
