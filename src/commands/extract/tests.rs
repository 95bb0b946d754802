use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use rusqlite::Connection;

use super::columns::{TableScan, build_column_model, is_header_row};
use super::decode::{PageDecoder, PdfToHtmlDecoder};
use super::details::segment_details;
use super::dialect::DocumentDialect;
use super::merge::merge_details;
use super::noise::{should_ignore_detail_line, should_ignore_table_row};
use super::pipeline::{BatchExtractor, DocumentError, extract_document};
use super::projector::{map_row_to_columns, project_row};
use super::rows::{DEFAULT_Y_TOLERANCE, group_rows, row_text};
use super::store::{AuditStore, SqliteAuditStore};
use super::types::{CanonicalField, DecodedPage, TextRun};
use crate::cli::DialectKind;
use crate::model::{AuditRecord, DetailEntry, DocumentStatus};

fn dialect() -> DocumentDialect {
    DocumentDialect::for_kind(DialectKind::Tiamo).expect("tiamo dialect compiles")
}

fn line(y: f64, cells: &[(&str, f64)]) -> Vec<TextRun> {
    cells
        .iter()
        .map(|(text, x)| TextRun::new(*text, *x, y))
        .collect()
}

fn page(number: usize, lines: Vec<Vec<TextRun>>) -> DecodedPage {
    DecodedPage {
        number,
        runs: lines.into_iter().flatten().collect(),
    }
}

fn header_line(y: f64) -> Vec<TextRun> {
    line(
        y,
        &[("Type", 0.0), ("Date", 100.0), ("User", 200.0), ("Action", 300.0)],
    )
}

fn data_line(y: f64, values: [&str; 4]) -> Vec<TextRun> {
    line(
        y,
        &[
            (values[0], 2.0),
            (values[1], 101.0),
            (values[2], 203.0),
            (values[3], 305.0),
        ],
    )
}

fn narrative_page(number: usize, lines: &[&str]) -> DecodedPage {
    page(
        number,
        lines
            .iter()
            .enumerate()
            .map(|(index, text)| line(20.0 + index as f64 * 12.0, &[(*text, 40.0)]))
            .collect(),
    )
}

#[test]
fn group_rows_compares_against_first_seen_representative() {
    let runs = vec![
        TextRun::new("a", 10.0, 100.0),
        TextRun::new("b", 20.0, 102.0),
        TextRun::new("c", 30.0, 106.0),
    ];

    let rows = group_rows(&runs, DEFAULT_Y_TOLERANCE);
    assert_eq!(rows.len(), 2);
    assert_eq!(row_text(&rows[0]), "a b");
    assert_eq!(row_text(&rows[1]), "c");
}

#[test]
fn group_rows_orders_rows_by_y_and_fragments_by_x() {
    let runs = vec![
        TextRun::new("second", 50.0, 200.0),
        TextRun::new("world", 80.0, 100.0),
        TextRun::new("first", 5.0, 199.0),
        TextRun::new("hello", 10.0, 101.0),
    ];

    let rows = group_rows(&runs, DEFAULT_Y_TOLERANCE);
    assert_eq!(rows.len(), 2);
    assert_eq!(row_text(&rows[0]), "hello world");
    assert_eq!(row_text(&rows[1]), "first second");
}

#[test]
fn table_noise_rules_drop_banners_metadata_and_footers() {
    let dialect = dialect();
    let noisy = [
        "Tiamo 2.5 Build 116",
        "Computer name: OSD-QC-Tiamo",
        "User (short name): jdoe",
        "License ID: ---12345",
        "Printed: 2025-08-14 16:37:15 UTC+5:30",
        "Page 889 of 3448",
        "Audit Trail",
        "   ",
    ];

    for text in noisy {
        let row = line(10.0, &[(text, 0.0)]);
        assert!(
            should_ignore_table_row(&row, false, &dialect),
            "expected noise: {text}"
        );
    }

    let kept = line(10.0, &[("Page 3 of 10 appendix", 0.0)]);
    assert!(!should_ignore_table_row(&kept, false, &dialect));
}

#[test]
fn audit_trail_title_is_noise_only_as_a_single_fragment() {
    let dialect = dialect();
    let split_title = line(10.0, &[("Audit", 0.0), ("Trail", 40.0)]);
    assert!(!should_ignore_table_row(&split_title, false, &dialect));
}

#[test]
fn repeated_header_is_noise_only_after_header_located() {
    let dialect = dialect();
    let header = header_line(50.0);

    assert!(!should_ignore_table_row(&header, false, &dialect));
    assert!(should_ignore_table_row(&header, true, &dialect));
}

#[test]
fn noise_verdict_is_stable_across_evaluations() {
    let dialect = dialect();
    let rows = [
        header_line(50.0),
        data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
        line(90.0, &[("Page 1 of 2", 250.0)]),
    ];

    for row in &rows {
        for header_located in [false, true] {
            let first = should_ignore_table_row(row, header_located, &dialect);
            let second = should_ignore_table_row(row, header_located, &dialect);
            assert_eq!(first, second);
        }
    }
}

#[test]
fn column_model_spans_header_fragments_and_maps_fields() {
    let dialect = dialect();
    let header = line(
        50.0,
        &[
            ("Details", 400.0),
            ("Type", 0.0),
            (" Date ", 50.0),
            ("User full name", 100.0),
            ("Remarks", 200.0),
        ],
    );

    assert!(is_header_row(&header, &dialect));

    let model = build_column_model(&header, &dialect);
    let names = model
        .boundaries
        .iter()
        .map(|boundary| boundary.name.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(names, vec!["Type", "Date", "User full name", "Remarks", "Details"]);
    assert_eq!(model.boundaries[0].x_end, 50.0);
    assert_eq!(model.boundaries[3].x_end, 400.0);
    assert!(model.boundaries[4].x_end.is_infinite());

    assert_eq!(
        model.fields,
        vec![
            Some(CanonicalField::Type),
            Some(CanonicalField::Date),
            Some(CanonicalField::FullName),
            None,
            Some(CanonicalField::Details),
        ]
    );
}

#[test]
fn project_row_assigns_fragment_to_containing_column() {
    let dialect = dialect();
    let model = build_column_model(
        &line(50.0, &[("Type", 0.0), ("Date", 50.0), ("User", 100.0)]),
        &dialect,
    );

    let record = project_row(&line(70.0, &[("alice", 120.0)]), &model, "report.pdf")
        .expect("user alone makes a valid record");
    assert_eq!(record.user.as_deref(), Some("alice"));
    assert_eq!(record.record_type, None);
    assert_eq!(record.file_name, "report.pdf");
}

#[test]
fn project_row_joins_split_values_with_single_space() {
    let dialect = dialect();
    let model = build_column_model(
        &line(50.0, &[("Type", 0.0), ("Date", 50.0), ("User", 100.0)]),
        &dialect,
    );

    let values = map_row_to_columns(
        &line(70.0, &[("2024-01- ", 52.0), ("  15", 70.0)]),
        &model,
    );
    assert_eq!(values, vec!["", "2024-01- 15", ""]);
}

#[test]
fn project_row_discards_rows_without_identifying_fields() {
    let dialect = dialect();
    let model = build_column_model(&header_line(50.0), &dialect);

    let row = line(70.0, &[("Signed in", 305.0), ("stray", -20.0)]);
    assert_eq!(project_row(&row, &model, "report.pdf"), None);
}

#[test]
fn header_is_located_once_and_later_headers_are_dropped() {
    let dialect = dialect();

    let scan = TableScan::default().scan_page(
        vec![
            header_line(50.0),
            data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
        ],
        &dialect,
    );
    let first_columns = scan.columns.clone().expect("header located");

    let shifted_header = line(
        50.0,
        &[("Type", 10.0), ("Date", 110.0), ("User", 210.0), ("Action", 310.0)],
    );
    let scan = scan.scan_page(
        vec![
            shifted_header,
            data_line(70.0, ["Logout", "2024-01-02", "bob", "Signed out"]),
        ],
        &dialect,
    );

    assert_eq!(scan.columns, Some(first_columns));
    assert_eq!(scan.rows.len(), 2);
    assert!(scan.rows.iter().all(|row| !is_header_row(row, &dialect)));
}

#[test]
fn rows_before_the_header_page_are_not_collected() {
    let dialect = dialect();
    let scan = TableScan::default()
        .scan_page(vec![line(10.0, &[("Cover page", 0.0)])], &dialect)
        .scan_page(
            vec![
                line(30.0, &[("Report title", 0.0)]),
                header_line(50.0),
                data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
            ],
            &dialect,
        );

    assert!(scan.header_located());
    assert_eq!(scan.rows.len(), 1);
    assert_eq!(row_text(&scan.rows[0]), "Login 2024-01-01 alice Signed in");
}

#[test]
fn two_page_table_yields_one_record_per_data_row() {
    let dialect = dialect();
    let pages = vec![
        page(
            1,
            vec![
                line(10.0, &[("Tiamo 2.5 Build 116", 0.0)]),
                header_line(50.0),
                data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
            ],
        ),
        page(
            2,
            vec![
                header_line(50.0),
                data_line(70.0, ["Logout", "2024-01-02", "bob", "Signed out"]),
            ],
        ),
    ];

    let extraction =
        extract_document(&pages, "report.pdf", &dialect, DEFAULT_Y_TOLERANCE).expect("records");
    assert_eq!(extraction.records.len(), 2);

    let first = &extraction.records[0];
    assert_eq!(first.record_type.as_deref(), Some("Login"));
    assert_eq!(first.date.as_deref(), Some("2024-01-01"));
    assert_eq!(first.user.as_deref(), Some("alice"));
    assert_eq!(first.action.as_deref(), Some("Signed in"));

    let second = &extraction.records[1];
    assert_eq!(second.record_type.as_deref(), Some("Logout"));
    assert_eq!(second.user.as_deref(), Some("bob"));

    assert_eq!(extraction.merge.entries, 0);
    assert_eq!(extraction.merge.difference, 2);
    assert!(extraction.records.iter().all(|record| record.details.is_none()));
}

#[test]
fn document_without_header_is_reported_not_fatal() {
    let dialect = dialect();
    let pages = vec![narrative_page(1, &["1 Name: Method A"])];

    let error = extract_document(&pages, "plain.pdf", &dialect, DEFAULT_Y_TOLERANCE)
        .expect_err("no header");
    assert!(matches!(error, DocumentError::HeaderNotFound { .. }));
    assert_eq!(error.status(), DocumentStatus::HeaderNotFound);
}

#[test]
fn document_with_only_empty_rows_has_no_valid_records() {
    let dialect = dialect();
    let pages = vec![page(
        1,
        vec![header_line(50.0), line(70.0, &[("Signed in", 305.0)])],
    )];

    let error = extract_document(&pages, "empty.pdf", &dialect, DEFAULT_Y_TOLERANCE)
        .expect_err("no valid rows");
    assert!(matches!(error, DocumentError::NoValidRecords { .. }));
}

#[test]
fn narrative_rows_after_the_table_become_records_and_shift_the_merge() {
    let dialect = dialect();
    let pages = vec![
        page(
            1,
            vec![
                header_line(50.0),
                data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
            ],
        ),
        narrative_page(2, &["1 Name: Method A"]),
    ];

    let extraction =
        extract_document(&pages, "report.pdf", &dialect, DEFAULT_Y_TOLERANCE).expect("records");

    assert_eq!(extraction.records.len(), 2);
    assert_eq!(
        extraction.records[1].record_type.as_deref(),
        Some("1 Name: Method A")
    );
    assert_eq!(extraction.merge.entries, 1);
    assert_eq!(extraction.merge.difference, 1);
    assert!(extraction.merge.is_mismatch());
    assert_eq!(
        extraction.records[0].details.as_deref(),
        Some("1 Name: Method A")
    );
    assert_eq!(extraction.records[1].details, None);
}

#[test]
fn detail_lines_split_on_entry_starts_and_join_continuations() {
    let dialect = dialect();
    let pages = vec![narrative_page(
        3,
        &["1 Name: Method A", "continued text", "2 Name: Method B"],
    )];

    let entries = segment_details(&pages, &dialect, DEFAULT_Y_TOLERANCE);
    assert_eq!(
        entries,
        vec![
            DetailEntry {
                details: "1 Name: Method A continued text".to_string()
            },
            DetailEntry {
                details: "2 Name: Method B".to_string()
            },
        ]
    );
}

#[test]
fn detail_pass_skips_table_pages_and_noise_lines() {
    let dialect = dialect();
    let pages = vec![
        page(
            1,
            vec![
                header_line(50.0),
                data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
            ],
        ),
        narrative_page(
            2,
            &[
                "Details",
                "Computer name: OSD-QC-Tiamo",
                "orphan first line",
                "User: 'alice' logged in",
                "5 Determination ID: 77",
                "Program 'Tiamo' started",
                "Page 2 of 9",
            ],
        ),
        narrative_page(3, &["tail after page break"]),
    ];

    let entries = segment_details(&pages, &dialect, DEFAULT_Y_TOLERANCE)
        .into_iter()
        .map(|entry| entry.details)
        .collect::<Vec<String>>();
    assert_eq!(
        entries,
        vec![
            "orphan first line",
            "User: 'alice' logged in",
            "5 Determination ID: 77",
            "Program 'Tiamo' started tail after page break",
        ]
    );
}

#[test]
fn detail_noise_covers_titles() {
    let dialect = dialect();
    assert!(should_ignore_detail_line("  DETAILS ", &dialect));
    assert!(should_ignore_detail_line("Audit Trail", &dialect));
    assert!(!should_ignore_detail_line("Details of method A", &dialect));
}

#[test]
fn merge_pairs_by_position_and_reports_shortfall() {
    let mut records = (0..3)
        .map(|index| AuditRecord {
            user: Some(format!("user{index}")),
            details: Some("table column text".to_string()),
            ..AuditRecord::new("report.pdf")
        })
        .collect::<Vec<AuditRecord>>();
    let entries = vec![
        DetailEntry {
            details: "first".to_string(),
        },
        DetailEntry {
            details: "second".to_string(),
        },
    ];

    let report = merge_details(&mut records, &entries, "report.pdf");

    assert_eq!(records[0].details.as_deref(), Some("first"));
    assert_eq!(records[1].details.as_deref(), Some("second"));
    assert_eq!(records[2].details, None);
    assert!(report.is_mismatch());
    assert_eq!(report.difference, 1);
}

#[test]
fn merge_with_surplus_entries_reports_negative_difference() {
    let mut records = vec![AuditRecord {
        date: Some("2024-01-01".to_string()),
        ..AuditRecord::new("report.pdf")
    }];
    let entries = vec![
        DetailEntry {
            details: "first".to_string(),
        },
        DetailEntry {
            details: "second".to_string(),
        },
    ];

    let report = merge_details(&mut records, &entries, "report.pdf");
    assert_eq!(records[0].details.as_deref(), Some("first"));
    assert_eq!(report.difference, -1);
}

#[test]
fn pdftohtml_xml_parses_pages_and_positioned_runs() {
    let decoder = PdfToHtmlDecoder::new(None).expect("decoder");
    let xml = r##"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE pdf2xml SYSTEM "pdf2xml.dtd">
<pdf2xml producer="poppler" version="23.02.0">
<page number="1" position="absolute" top="0" left="0" height="842" width="595">
	<fontspec id="0" size="8" family="Arial" color="#000000"/>
<text top="40" left="36" width="60" height="9" font="0"><b>Audit Trail</b></text>
<text top="60.5" left="36.25" width="20" height="9" font="0">R&amp;D &lt;lab&gt;</text>
</page>
<page number="2" position="absolute" top="0" left="0" height="842" width="595">
<text top="12" left="8" width="20" height="9" font="0">User: &#39;alice&#39;</text>
</page>
</pdf2xml>
"##;

    let pages = decoder.parse_xml(xml);
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].number, 1);
    assert_eq!(
        pages[0].runs,
        vec![
            TextRun::new("Audit Trail", 36.0, 40.0),
            TextRun::new("R&D <lab>", 36.25, 60.5),
        ]
    );
    assert_eq!(pages[1].runs, vec![TextRun::new("User: 'alice'", 8.0, 12.0)]);
}

#[test]
fn pdftohtml_numeric_character_references_are_decoded() {
    let decoder = PdfToHtmlDecoder::new(None).expect("decoder");
    let xml = r#"<page number="1">
<text top="10" left="5">Method &#34;A&#34; &#38; B</text>
<text top="30" left="5">&#x41;&#X42;&#160;C &amp;lt; &#38;amp;</text>
<text top="50" left="5">keep &unknown; &#xZZ;</text>
</page>"#;

    let pages = decoder.parse_xml(xml);
    let texts = pages[0]
        .runs
        .iter()
        .map(|run| run.text.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(
        texts,
        vec!["Method \"A\" & B", "AB C &lt; &amp;", "keep &unknown; &#xZZ;"]
    );
}

#[test]
fn sqlite_store_appends_each_batch() {
    let connection = Connection::open_in_memory().expect("in-memory db");
    let mut store = SqliteAuditStore::from_connection(connection, "run-test").expect("schema");

    let records = vec![
        AuditRecord {
            record_type: Some("Login".to_string()),
            user: Some("alice".to_string()),
            details: Some("1 Name: Method A".to_string()),
            ..AuditRecord::new("report.pdf")
        },
        AuditRecord {
            record_type: Some("Logout".to_string()),
            ..AuditRecord::new("report.pdf")
        },
    ];

    assert_eq!(store.insert_batch(&records).expect("first insert"), 2);
    assert_eq!(store.insert_batch(&records[..1]).expect("second insert"), 1);

    let conn = store.connection();
    let total: i64 = conn
        .query_row("SELECT COUNT(*) FROM audits", [], |row| row.get(0))
        .expect("count");
    assert_eq!(total, 3);

    let (record_type, user, run_id): (String, String, String) = conn
        .query_row(
            r#"SELECT "type", "user", run_id FROM audits ORDER BY id LIMIT 1"#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .expect("first row");
    assert_eq!(record_type, "Login");
    assert_eq!(user, "alice");
    assert_eq!(run_id, "run-test");
}

struct FakeDecoder {
    documents: HashMap<String, Vec<DecodedPage>>,
}

impl PageDecoder for FakeDecoder {
    fn decode(&self, pdf_path: &Path) -> Result<Vec<DecodedPage>> {
        let key = pdf_path.display().to_string();
        match self.documents.get(&key) {
            Some(pages) => Ok(pages.clone()),
            None => bail!("corrupt xref table in {key}"),
        }
    }
}

fn batch_fixture() -> (FakeDecoder, Vec<PathBuf>) {
    let mut documents = HashMap::new();
    documents.insert(
        "good.pdf".to_string(),
        vec![
            narrative_page(1, &["1 Name: Method A"]),
            page(
                2,
                vec![
                    header_line(50.0),
                    data_line(70.0, ["Login", "2024-01-01", "alice", "Signed in"]),
                ],
            ),
        ],
    );
    documents.insert(
        "plain.pdf".to_string(),
        vec![narrative_page(1, &["no table here"])],
    );

    let paths = ["broken.pdf", "good.pdf", "plain.pdf"]
        .into_iter()
        .map(PathBuf::from)
        .collect();

    (FakeDecoder { documents }, paths)
}

#[test]
fn batch_continues_past_failed_documents_and_saves_the_rest() {
    let dialect = dialect();
    let (decoder, paths) = batch_fixture();
    let extractor = BatchExtractor {
        decoder: &decoder,
        dialect: &dialect,
        y_tolerance: DEFAULT_Y_TOLERANCE,
    };

    let connection = Connection::open_in_memory().expect("in-memory db");
    let mut store = SqliteAuditStore::from_connection(connection, "run-batch").expect("schema");
    let summary = extractor.run(&paths, Some(&mut store));

    let statuses = summary
        .outcomes
        .iter()
        .map(|outcome| outcome.status)
        .collect::<Vec<DocumentStatus>>();
    assert_eq!(
        statuses,
        vec![
            DocumentStatus::DecodeFailed,
            DocumentStatus::Saved,
            DocumentStatus::HeaderNotFound,
        ]
    );
    assert_eq!(summary.records_saved, 1);
    assert_eq!(summary.skipped_count(), 2);
    assert_eq!(summary.mismatched_count(), 0);
    assert!(
        summary.outcomes[0]
            .error
            .as_deref()
            .is_some_and(|error| error.contains("corrupt xref table"))
    );

    let details: String = store
        .connection()
        .query_row("SELECT details FROM audits", [], |row| row.get(0))
        .expect("stored detail");
    assert_eq!(details, "1 Name: Method A");
}

#[test]
fn dry_run_reconstructs_without_saving() {
    let dialect = dialect();
    let (decoder, paths) = batch_fixture();
    let extractor = BatchExtractor {
        decoder: &decoder,
        dialect: &dialect,
        y_tolerance: DEFAULT_Y_TOLERANCE,
    };

    let summary = extractor.run::<SqliteAuditStore>(&paths, None);
    assert_eq!(summary.records_saved, 0);
    assert_eq!(summary.outcomes[1].status, DocumentStatus::DryRun);
    assert_eq!(summary.outcomes[1].record_count, 1);
    assert_eq!(summary.outcomes[1].detail_count, 1);
}
