use anyhow::Context;
use clap::{Parser, Subcommand};
use jobdash_report::config::ReportConfig;
use jobdash_report::dashboard::{load_home_page, load_tools_page};
use jobdash_report::logging::init_tracing;
use jobdash_report::trends::{TrendFilter, WILDCARD};
use jobdash_report::warehouse::Warehouse;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jobdash")]
#[command(version)]
#[command(about = "Render job openings dashboard data from the reporting warehouse")]
struct Args {
    /// YAML config file; defaults plus environment overrides when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Home page payload for the newest crawl
    Home,

    /// Tool trend line and popularity bar data
    Tools {
        #[arg(long, default_value = WILDCARD)]
        role: String,

        #[arg(long, default_value = WILDCARD)]
        category: String,
    },

    /// Reporting tables present in the warehouse
    Tables,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReportConfig::from_env().context("building config from environment")?,
    };
    init_tracing(&config.logging).context("initialising tracing")?;

    match args.command {
        Commands::Home => {
            let page = load_home_page(&config).context("rendering home page")?;
            print_json(&page, args.pretty)
        }
        Commands::Tools { role, category } => {
            let filter = TrendFilter::new(&role, &category);
            let page = load_tools_page(&config, filter).context("rendering tools page")?;
            print_json(&page, args.pretty)
        }
        Commands::Tables => {
            let mut warehouse = Warehouse::open(&config.warehouse).context("opening warehouse")?;
            let tables = warehouse.list_report_tables();
            warehouse.close();
            print_json(&tables, args.pretty)
        }
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}
