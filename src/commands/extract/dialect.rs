use anyhow::{Context, Result};
use regex::Regex;

use super::types::CanonicalField;
use crate::cli::DialectKind;

#[derive(Debug)]
pub struct DocumentDialect {
    pub name: &'static str,
    product_banner: Regex,
    metadata_lines: Vec<Regex>,
    page_footer: Regex,
    table_title: &'static str,
    detail_titles: Vec<&'static str>,
    header_keywords: Vec<&'static str>,
    repeated_header_keywords: Vec<&'static str>,
    entry_starts: Vec<Regex>,
    field_patterns: Vec<(CanonicalField, Regex)>,
}

impl DocumentDialect {
    pub fn for_kind(kind: DialectKind) -> Result<Self> {
        match kind {
            DialectKind::Tiamo => Self::build("tiamo", "Tiamo"),
        }
    }

    fn build(name: &'static str, product: &str) -> Result<Self> {
        let product = regex::escape(product);

        Ok(Self {
            name,
            product_banner: Regex::new(&format!(r"(?i){product}\s*\d+\.\d+\s*build\s*\d+"))
                .context("failed to compile product banner regex")?,
            metadata_lines: vec![
                Regex::new(r"(?i)computer name:")
                    .context("failed to compile computer name regex")?,
                Regex::new(r"(?i)user \(short name\):")
                    .context("failed to compile short user name regex")?,
                Regex::new(r"(?i)license id:\s*-+\s*\d+")
                    .context("failed to compile license id regex")?,
                Regex::new(
                    r"(?i)printed:\s*\d{4}-\d{2}-\d{2}\s*\d{2}:\d{2}:\d{2}\s*utc[+-]\d{1,2}:\d{2}",
                )
                .context("failed to compile printed timestamp regex")?,
            ],
            page_footer: Regex::new(r"(?i)^page\s+\d+\s+of\s+\d+$")
                .context("failed to compile page footer regex")?,
            table_title: "audit trail",
            detail_titles: vec!["audit trail", "details"],
            header_keywords: vec!["type", "date", "user"],
            repeated_header_keywords: vec!["type", "date", "user", "action"],
            entry_starts: vec![
                Regex::new(r"^\d+\s+(Name|Program|User):")
                    .context("failed to compile numbered entry regex")?,
                Regex::new(r"^\d+\s+Determination\s+ID:")
                    .context("failed to compile determination entry regex")?,
                Regex::new(&format!(r"^Program\s+'{product}.*'"))
                    .context("failed to compile program entry regex")?,
                Regex::new(r"^User:\s+'[^']+'").context("failed to compile user entry regex")?,
            ],
            field_patterns: vec![
                (CanonicalField::Type, field_regex("type")?),
                (CanonicalField::Date, field_regex("date")?),
                (CanonicalField::User, field_regex("user")?),
                (CanonicalField::FullName, field_regex(r"full\s*name")?),
                (CanonicalField::Client, field_regex("client")?),
                (CanonicalField::Category, field_regex("category")?),
                (CanonicalField::Action, field_regex("action")?),
                (CanonicalField::Details, field_regex("details?")?),
                (CanonicalField::Archive, field_regex("archive")?),
            ],
        })
    }

    pub fn is_page_banner(&self, text: &str) -> bool {
        self.product_banner.is_match(text)
            || self.metadata_lines.iter().any(|pattern| pattern.is_match(text))
    }

    pub fn is_page_footer(&self, text: &str) -> bool {
        self.page_footer.is_match(text)
    }

    pub fn is_table_title(&self, normalized: &str) -> bool {
        normalized == self.table_title
    }

    pub fn is_detail_title(&self, normalized: &str) -> bool {
        self.detail_titles.iter().any(|title| *title == normalized)
    }

    pub fn header_keywords(&self) -> &[&'static str] {
        &self.header_keywords
    }

    pub fn repeated_header_keywords(&self) -> &[&'static str] {
        &self.repeated_header_keywords
    }

    pub fn starts_detail_entry(&self, line: &str) -> bool {
        let line = line.trim();
        self.entry_starts.iter().any(|pattern| pattern.is_match(line))
    }

    pub fn field_for_column(&self, column_name: &str) -> Option<CanonicalField> {
        let normalized = column_name.trim().to_lowercase();
        self.field_patterns
            .iter()
            .filter(|(_, pattern)| pattern.is_match(&normalized))
            .map(|(field, _)| *field)
            .last()
    }
}

fn field_regex(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){pattern}"))
        .with_context(|| format!("failed to compile column pattern {pattern}"))
}
