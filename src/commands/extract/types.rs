use crate::model::AuditRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

impl TextRun {
    pub fn new(text: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            text: text.into(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPage {
    pub number: usize,
    pub runs: Vec<TextRun>,
}

pub type Row = Vec<TextRun>;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBoundary {
    pub name: String,
    pub x_start: f64,
    pub x_end: f64,
}

impl ColumnBoundary {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x_start && x < self.x_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Type,
    Date,
    User,
    FullName,
    Client,
    Category,
    Action,
    Details,
    Archive,
}

impl CanonicalField {
    pub fn slot(self, record: &mut AuditRecord) -> &mut Option<String> {
        match self {
            Self::Type => &mut record.record_type,
            Self::Date => &mut record.date,
            Self::User => &mut record.user,
            Self::FullName => &mut record.full_name,
            Self::Client => &mut record.client,
            Self::Category => &mut record.category,
            Self::Action => &mut record.action,
            Self::Details => &mut record.details,
            Self::Archive => &mut record.archive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnModel {
    pub boundaries: Vec<ColumnBoundary>,
    pub fields: Vec<Option<CanonicalField>>,
}

impl ColumnModel {
    pub fn column_for(&self, x: f64) -> Option<usize> {
        self.boundaries
            .iter()
            .position(|boundary| boundary.contains(x))
    }
}
