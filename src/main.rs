//! Command-line front end: overlay a residue CSV and print a JSON report of
//! the structures to load and the colored residue bindings per column key.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use residue_overlay::ingest::CellValue;
use residue_overlay::scale::schemes::{available_schemes, scale_type_of};
use residue_overlay::scale::ScaleType;
use residue_overlay::session::{OverlaySession, StatusKind};
use residue_overlay::viewer::{RecordingViewer, StructureRequest};
use residue_overlay::{ColoredElement, OverlayError, OverlayOptions};
use serde::Serialize;

/// Overlay per-residue CSV data on protein structures.
#[derive(Parser, Debug)]
#[command(name = "residue-overlay", version)]
#[command(about = "Overlay per-residue CSV data on protein structures", long_about = None)]
struct Cli {
    /// CSV file with residue, chain and model columns
    csv: Option<PathBuf>,
    /// Options preset (TOML)
    #[arg(long)]
    options: Option<PathBuf>,
    /// Metric column to show (repeatable); defaults to every metric column
    #[arg(short, long = "column")]
    columns: Vec<String>,
    /// Condition to show (repeatable)
    #[arg(short = 'k', long = "condition")]
    conditions: Vec<String>,
    /// Show every condition found in the file
    #[arg(long, conflicts_with = "conditions")]
    all_conditions: bool,
    /// Scale type for every shown key (sequential, diverging, categorical)
    #[arg(short = 't', long)]
    scale_type: Option<String>,
    /// Color scheme for every shown key
    #[arg(short, long)]
    scheme: Option<String>,
    /// Write the effective options to this TOML file
    #[arg(long)]
    save_options: Option<PathBuf>,
    /// List the available color schemes and exit
    #[arg(long)]
    list_schemes: bool,
    /// Print the options JSON schema and exit
    #[arg(long)]
    print_schema: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    dataset: &'a str,
    status: &'a str,
    structures: &'a [StructureRequest],
    elements: Vec<ElementReport<'a>>,
}

#[derive(Serialize)]
struct ElementReport<'a> {
    name: &'a str,
    label: &'a str,
    scale_type: String,
    scheme: &'static str,
    default_color: String,
    warnings: Vec<String>,
    bindings: Vec<Binding<'a>>,
}

#[derive(Serialize)]
struct Binding<'a> {
    model: &'a str,
    chain: &'a str,
    residue: &'a str,
    value: &'a CellValue,
    color: String,
}

fn element_report(element: &ColoredElement) -> ElementReport<'_> {
    let lookup = element.lookup();
    let bindings = lookup
        .models()
        .iter()
        .flat_map(|model| {
            lookup
                .bindings(model)
                .into_iter()
                .map(move |(chain, residue, value)| Binding {
                    model,
                    chain,
                    residue,
                    value,
                    color: element.hex_of(value),
                })
        })
        .collect();
    ElementReport {
        name: element.name(),
        label: element.label(),
        scale_type: element.scale().scale_type().to_string(),
        scheme: element.scale().scheme(),
        default_color: element.default_hex(),
        warnings: element.warnings().iter().map(ToString::to_string).collect(),
        bindings,
    }
}

fn write_json(value: &impl Serialize) -> Result<(), OverlayError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value).map_err(std::io::Error::from)?;
    writeln!(out)?;
    Ok(())
}

fn list_schemes() -> Result<(), OverlayError> {
    write_json(&serde_json::json!({
        "sequential": available_schemes(&ScaleType::Sequential),
        "diverging": available_schemes(&ScaleType::Diverging),
        "categorical": available_schemes(&ScaleType::Categorical),
    }))
}

fn configure(cli: &Cli, session: &mut OverlaySession) {
    let Some(rows) = session.rows() else {
        return;
    };
    let columns = if cli.columns.is_empty() && session.options().selection.columns.is_empty() {
        rows.metric_columns()
    } else if cli.columns.is_empty() {
        session.options().selection.columns.clone()
    } else {
        cli.columns.clone()
    };
    let conditions = if cli.all_conditions {
        rows.conditions()
    } else if cli.conditions.is_empty() {
        session.options().selection.conditions.clone()
    } else {
        cli.conditions.clone()
    };
    let _ = session.set_columns(columns);
    let _ = session.set_conditions(conditions);

    let scale_type = cli
        .scale_type
        .as_deref()
        .map(ScaleType::from)
        .or_else(|| cli.scheme.as_deref().and_then(scale_type_of));
    if scale_type.is_none() && cli.scheme.is_none() {
        return;
    }
    let configs = session.options().scale_configs();
    for key in session.options().selection.keys() {
        let mut scale = configs.get(&key).cloned().unwrap_or_default();
        if let Some(kind) = &scale_type {
            scale.scale_type = kind.clone();
        }
        if let Some(scheme) = &cli.scheme {
            scale.scheme = Some(scheme.clone());
        }
        let _ = session.set_scale_config(&key, scale);
    }
}

fn run(cli: &Cli) -> Result<ExitCode, OverlayError> {
    if cli.list_schemes {
        list_schemes()?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.print_schema {
        write_json(&OverlayOptions::json_schema())?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(path) = &cli.csv else {
        return Err(OverlayError::MissingArgument("CSV file".to_owned()));
    };

    let options = match &cli.options {
        Some(options_path) => OverlayOptions::load(options_path)?,
        None => OverlayOptions::default(),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv")
        .to_owned();
    let text = std::fs::read_to_string(path)?;

    let mut session = OverlaySession::new(options);
    session.upload(&name, &text)?;
    configure(cli, &mut session);
    if let Some(save_path) = &cli.save_options {
        session.options().save(save_path)?;
        log::info!("saved options to {}", save_path.display());
    }

    let mut viewer = RecordingViewer::default();
    let _ = session.refresh(&mut viewer);
    let status = session.status();

    write_json(&Report {
        dataset: &name,
        status: &status.message,
        structures: viewer.structures(),
        elements: viewer.elements().iter().map(element_report).collect(),
    })?;

    Ok(if status.kind == StatusKind::Error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
