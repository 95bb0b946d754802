use super::dialect::DocumentDialect;
use super::rows::row_text;
use super::types::TextRun;

pub fn should_ignore_table_row(
    row: &[TextRun],
    header_located: bool,
    dialect: &DocumentDialect,
) -> bool {
    let text = row_text(row);
    if text.is_empty() {
        return true;
    }

    let normalized = text.to_lowercase();

    if dialect.is_page_banner(&normalized) || dialect.is_page_footer(&normalized) {
        return true;
    }

    if row.len() == 1 && dialect.is_table_title(&normalized) {
        return true;
    }

    header_located
        && dialect
            .repeated_header_keywords()
            .iter()
            .all(|keyword| normalized.contains(*keyword))
}

pub fn should_ignore_detail_line(text: &str, dialect: &DocumentDialect) -> bool {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return true;
    }

    dialect.is_page_banner(&normalized)
        || dialect.is_page_footer(&normalized)
        || dialect.is_detail_title(&normalized)
}
