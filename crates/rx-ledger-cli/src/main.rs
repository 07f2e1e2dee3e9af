mod cli;
mod logging;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, HistoryArgs, ImportArgs};
use rx_ledger_core::report::RowOutcome;
use rx_ledger_core::{Database, ImportConfig, ImportReport, ImportSource, Importer};
use tracing::{debug, error};

fn main() {
    logging::init_logger();

    let args = Cli::parse();

    let result = match args.command {
        Commands::Import(args) => run_import(args),
        Commands::History(args) => run_history(args),
    };

    if let Err(err) = result {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    let Some(path) = path else {
        return Ok(ImportConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn run_import(args: ImportArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(lookahead) = args.lookahead {
        config.header_lookahead = lookahead;
    }
    debug!(?config, "Import configuration");

    let bytes = fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let filename = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());

    let db = Database::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;
    let importer = Importer::new(&db, config);
    let report = importer
        .import(&ImportSource::new(bytes, filename))
        .with_context(|| format!("importing {}", args.file.display()))?;

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ImportReport) {
    let summary = &report.summary;
    println!(
        "{} ({}) for {}{}",
        report.filename,
        report.format.kind.description(),
        report.patient.name,
        if report.family_member.created { " [new]" } else { "" }
    );

    for row in &report.rows {
        let status = match &row.outcome {
            RowOutcome::Created { .. } => "created".to_string(),
            RowOutcome::DuplicateSkipped { .. } => "duplicate".to_string(),
            RowOutcome::Warning { reason } => format!("skipped: {}", reason),
            RowOutcome::Error { reason } => format!("error: {}", reason),
        };
        println!("  line {:>4}  {:<12} {:<40} {}", row.line, row.rx_number, row.drug_name, status);
        for warning in &row.warnings {
            println!("             warning: {}", warning);
        }
    }

    for possible in &report.family_member.possible_matches {
        println!(
            "  possible duplicate member: {} ({:.2})",
            possible.name, possible.similarity
        );
    }
    for note in &report.notes {
        println!("  note: {}", note);
    }

    println!(
        "{} rows: {} created, {} duplicates, {} skipped, {} errors, {} new medicines",
        summary.total_rows,
        summary.created,
        summary.duplicates,
        summary.warnings,
        summary.errors,
        summary.medicines_created
    );
}

fn run_history(args: HistoryArgs) -> Result<()> {
    let db = Database::open(&args.db)
        .with_context(|| format!("opening database {}", args.db.display()))?;

    for session in db.list_import_sessions(args.limit)? {
        println!(
            "{}  {:<30} {:<22} {} rows, {} created, {} duplicates, {} skipped, {} errors",
            session.completed_at,
            session.filename,
            session.format,
            session.total_rows,
            session.created,
            session.duplicates,
            session.warnings,
            session.errors
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), ImportConfig::default());
    }

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "header_lookahead = 40").unwrap();
        writeln!(file, "date_formats = [\"%d.%m.%Y\"]").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.header_lookahead, 40);
        assert_eq!(config.date_formats, vec!["%d.%m.%Y".to_string()]);
        assert_eq!(
            config.similar_member_threshold,
            ImportConfig::default().similar_member_threshold
        );
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "header_lookahead = \"many\"").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }
}
