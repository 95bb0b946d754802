use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use super::decode::{PdfToHtmlDecoder, decoder_version};
use super::dialect::DocumentDialect;
use super::pipeline::{BatchExtractor, BatchSummary};
use super::store::SqliteAuditStore;
use crate::cli::ExtractArgs;
use crate::commands::inventory::discover_pdfs;
use crate::model::{
    DocumentStatus, ExtractCounts, ExtractPaths, ExtractRunManifest, TriggerResponse,
};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: ExtractArgs) -> Result<()> {
    info!("starting extraction from all PDFs");

    let response = match run_batch(&args) {
        Ok(summary) => TriggerResponse::succeeded(completion_message(&summary, args.dry_run)),
        Err(err) => TriggerResponse::failed(
            "Error during PDF extraction and saving.",
            format!("{err:#}"),
        ),
    };

    let rendered =
        serde_json::to_string_pretty(&response).context("failed to serialize trigger response")?;
    println!("{rendered}");

    if !response.success {
        bail!("extraction failed: {}", response.error.unwrap_or_default());
    }

    Ok(())
}

fn run_batch(args: &ExtractArgs) -> Result<BatchSummary> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let pdf_paths = discover_pdfs(&args.source_dir)?;
    if pdf_paths.is_empty() {
        warn!(source_dir = %args.source_dir.display(), "no PDF files found");
    }

    let dialect = DocumentDialect::for_kind(args.dialect)?;
    let decoder = PdfToHtmlDecoder::new(args.max_pages_per_doc)?;
    info!(
        run_id = %run_id,
        dialect = dialect.name,
        pdf_count = pdf_paths.len(),
        "starting batch"
    );
    let extractor = BatchExtractor {
        decoder: &decoder,
        dialect: &dialect,
        y_tolerance: args.y_tolerance,
    };

    let db_path = args.resolved_db_path();
    let summary = if args.dry_run {
        extractor.run::<SqliteAuditStore>(&pdf_paths, None)
    } else {
        if let Some(parent) = db_path.parent() {
            ensure_directory(parent)?;
        }
        let mut store = SqliteAuditStore::open(&db_path, &run_id)?;
        extractor.run(&pdf_paths, Some(&mut store))
    };

    info!(total = summary.records_saved, "successfully saved merged audit records");

    let manifest_path = args
        .resolved_manifest_dir()
        .join(format!("extract_run_{}.json", utc_compact_string(started_ts)));
    let manifest = build_manifest(
        args,
        &run_id,
        started_at,
        &pdf_paths,
        &db_path,
        &manifest_path,
        &summary,
    );
    write_run_manifest(&manifest_path, &manifest);

    Ok(summary)
}

fn completion_message(summary: &BatchSummary, dry_run: bool) -> String {
    if dry_run {
        let reconstructed = summary
            .outcomes
            .iter()
            .filter(|outcome| outcome.status == DocumentStatus::DryRun)
            .map(|outcome| outcome.record_count)
            .sum::<usize>();
        return format!(
            "Dry run: reconstructed {} merged audit records from {} PDF reports; nothing was stored.",
            reconstructed,
            summary.outcomes.len()
        );
    }

    format!(
        "Extracted and stored {} merged audit records from {} PDF reports.",
        summary.records_saved,
        summary.outcomes.len()
    )
}

// Records are already committed by the time the manifest is written.
fn write_run_manifest(manifest_path: &Path, manifest: &ExtractRunManifest) -> bool {
    match write_json_pretty(manifest_path, manifest) {
        Ok(()) => {
            info!(path = %manifest_path.display(), "wrote extraction run manifest");
            true
        }
        Err(err) => {
            warn!(
                path = %manifest_path.display(),
                error = %format!("{err:#}"),
                "failed to write extraction run manifest"
            );
            false
        }
    }
}

fn build_manifest(
    args: &ExtractArgs,
    run_id: &str,
    started_at: String,
    pdf_paths: &[PathBuf],
    db_path: &Path,
    manifest_path: &Path,
    summary: &BatchSummary,
) -> ExtractRunManifest {
    let warnings = summary
        .outcomes
        .iter()
        .filter(|outcome| outcome.count_difference != 0)
        .map(|outcome| {
            format!(
                "{}: {} audit records vs {} detail entries (difference {}); details may be misaligned",
                outcome.file_name,
                outcome.record_count,
                outcome.detail_count,
                outcome.count_difference
            )
        })
        .collect();

    ExtractRunManifest {
        manifest_version: 1,
        run_id: run_id.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_extract_command(args),
        dialect: args.dialect.as_str().to_string(),
        decoder_version: decoder_version(),
        paths: ExtractPaths {
            source_dir: args.source_dir.display().to_string(),
            db_path: db_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts: ExtractCounts {
            pdf_count: pdf_paths.len(),
            processed_pdf_count: summary.outcomes.len() - summary.skipped_count(),
            skipped_pdf_count: summary.skipped_count(),
            mismatched_pdf_count: summary.mismatched_count(),
            records_saved: summary.records_saved,
            detail_entries: summary.detail_entries(),
        },
        documents: summary.outcomes.clone(),
        warnings,
    }
}

fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "audittrail".to_string(),
        "extract".to_string(),
        "--source-dir".to_string(),
        args.source_dir.display().to_string(),
    ];

    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.manifest_dir {
        command.push("--manifest-dir".to_string());
        command.push(path.display().to_string());
    }
    command.push("--dialect".to_string());
    command.push(args.dialect.as_str().to_string());
    command.push("--y-tolerance".to_string());
    command.push(args.y_tolerance.to_string());
    if let Some(max_pages) = args.max_pages_per_doc {
        command.push("--max-pages-per-doc".to_string());
        command.push(max_pages.to_string());
    }
    if args.dry_run {
        command.push("--dry-run".to_string());
    }

    command.join(" ")
}
