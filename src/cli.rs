use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::extract::DEFAULT_Y_TOLERANCE;

#[derive(Parser, Debug)]
#[command(
    name = "audittrail",
    version,
    about = "Rebuild audit-trail tables and detail blocks from PDF reports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = "public")]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = "public")]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub manifest_dir: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = DialectKind::Tiamo)]
    pub dialect: DialectKind,

    #[arg(long, default_value_t = DEFAULT_Y_TOLERANCE)]
    pub y_tolerance: f64,

    #[arg(long)]
    pub max_pages_per_doc: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DialectKind {
    Tiamo,
}

impl DialectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tiamo => "tiamo",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = "public")]
    pub source_dir: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

impl ExtractArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.source_dir.join("audit_trail.sqlite"))
    }

    pub fn resolved_manifest_dir(&self) -> PathBuf {
        self.manifest_dir
            .clone()
            .unwrap_or_else(|| self.source_dir.join("manifests"))
    }
}

impl StatusArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.source_dir.join("audit_trail.sqlite"))
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn extract_defaults_use_the_row_grouping_tolerance() {
        let cli = Cli::parse_from(["audittrail", "extract"]);
        let Commands::Extract(args) = cli.command else {
            panic!("expected extract subcommand");
        };

        assert_eq!(args.y_tolerance, DEFAULT_Y_TOLERANCE);
        assert_eq!(args.dialect, DialectKind::Tiamo);
        assert_eq!(
            args.resolved_db_path(),
            PathBuf::from("public").join("audit_trail.sqlite")
        );
    }
}
