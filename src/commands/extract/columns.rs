use super::dialect::DocumentDialect;
use super::noise::should_ignore_table_row;
use super::types::{ColumnBoundary, ColumnModel, Row, TextRun};

pub fn is_header_row(row: &[TextRun], dialect: &DocumentDialect) -> bool {
    dialect.header_keywords().iter().all(|keyword| {
        row.iter()
            .any(|run| run.text.to_lowercase().contains(*keyword))
    })
}

pub fn build_column_model(header: &[TextRun], dialect: &DocumentDialect) -> ColumnModel {
    let mut sorted = header.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x));

    let boundaries = sorted
        .iter()
        .enumerate()
        .map(|(index, run)| ColumnBoundary {
            name: run.text.trim().to_string(),
            x_start: run.x,
            x_end: sorted
                .get(index + 1)
                .map(|next| next.x)
                .unwrap_or(f64::INFINITY),
        })
        .collect::<Vec<ColumnBoundary>>();

    let fields = boundaries
        .iter()
        .map(|boundary| dialect.field_for_column(&boundary.name))
        .collect();

    ColumnModel { boundaries, fields }
}

#[derive(Debug, Clone, Default)]
pub struct TableScan {
    pub columns: Option<ColumnModel>,
    pub rows: Vec<Row>,
}

impl TableScan {
    pub fn header_located(&self) -> bool {
        self.columns.is_some()
    }

    pub fn scan_page(mut self, rows: Vec<Row>, dialect: &DocumentDialect) -> Self {
        let header_located = self.header_located();
        let filtered = rows
            .into_iter()
            .filter(|row| !should_ignore_table_row(row, header_located, dialect))
            .collect::<Vec<Row>>();

        if header_located {
            self.rows.extend(filtered);
            return self;
        }

        if let Some(header_index) = filtered.iter().position(|row| is_header_row(row, dialect)) {
            self.columns = Some(build_column_model(&filtered[header_index], dialect));
            self.rows.extend(filtered.into_iter().skip(header_index + 1));
        }

        self
    }
}
