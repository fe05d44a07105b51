//! Command-line runner for configured resource queries.
//!
//! # Responsibility
//! - Open a SQLite database, bind one JSON-described resource, and run a
//!   query string against it.
//! - Print results as JSON on stdout; failures go to stderr with exit code 1.

use clap::Parser;
use datarepo_core::{
    core_version, default_log_level, init_logging, open_db, ApiRepository, ConfiguredSpec,
    QueryConfig, QueryParams, ResourceConfig, SqliteApiRepository,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Query a SQLite table through a resource description.
#[derive(Parser, Debug)]
#[command(name = "datarepo")]
#[command(version, about, long_about = None)]
struct Cli {
    /// SQLite database file
    #[arg(long)]
    db: PathBuf,

    /// Resource description (JSON)
    #[arg(long)]
    resource: PathBuf,

    /// Query string, e.g. `filter[status]=active&sort=-name`
    #[arg(long, default_value = "")]
    query: String,

    /// Free-text term matched against the resource's search fields
    #[arg(long)]
    search: Option<String>,

    /// Return a page with metadata and links instead of a plain list
    #[arg(long)]
    paginate: bool,

    /// Parameter names and page limits (JSON)
    #[arg(long)]
    query_config: Option<PathBuf>,

    /// Absolute directory for log files; logging is off when omitted
    #[arg(long)]
    log_dir: Option<String>,

    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("datarepo: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, Box<dyn Error>> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }
    info!(
        "event=cli_start module=cli status=ok version={} paginate={}",
        core_version(),
        cli.paginate
    );

    let query_config = match cli.query_config.as_ref() {
        Some(path) => QueryConfig::from_path(path)?,
        None => QueryConfig::default(),
    };
    let resource = ResourceConfig::from_path(&cli.resource)?;

    let conn = open_db(&cli.db, &[])?;
    let model = resource.model_definition().resolve(&conn)?;
    let params = QueryParams::parse_with(&cli.query, &query_config);
    let repo = SqliteApiRepository::new(&conn, model, ConfiguredSpec::new(resource))?
        .with_config(query_config);

    let output = match (cli.search.as_deref(), cli.paginate) {
        (Some(term), true) => {
            serde_json::to_string_pretty(&repo.paginate_search_resources(term, &params)?)?
        }
        (Some(term), false) => {
            serde_json::to_string_pretty(&repo.search_resources(term, &params)?)?
        }
        (None, true) => serde_json::to_string_pretty(&repo.paginate_all_resources(&params)?)?,
        (None, false) => serde_json::to_string_pretty(&repo.get_all_resources(&params)?)?,
    };
    Ok(output)
}
