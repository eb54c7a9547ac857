mod charts;
mod clean;
mod db;
mod error;
mod fetch;
mod parser;
mod pipeline;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::charts::ChartSink;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "spotify_streams", about = "Spotify streaming records scraper")]
struct Cli {
    /// Settings file (toml, json or yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the page, clean the table, store it and draw the charts
    Run {
        /// Read the page from a saved HTML file instead of fetching it
        #[arg(long)]
        html: Option<PathBuf>,
        /// Write charts as HTML files into this directory instead of opening them
        #[arg(long)]
        charts_dir: Option<PathBuf>,
        /// Skip the charts
        #[arg(long, conflicts_with = "charts_dir")]
        no_charts: bool,
    },
    /// Summarize the stored table
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Run {
            html,
            charts_dir,
            no_charts,
        } => {
            let page = match html {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {:?}", path))?,
                None => fetch::fetch_page(&settings).context("Failed to fetch page")?,
            };

            let conn = db::connect(&settings.db_path)?;
            let outcome = pipeline::load(&page, &settings, &conn)
                .with_context(|| format!("Failed to load {:?}", settings.db_path))?;
            drop(conn);
            println!(
                "Parsed {} rows, kept {}, stored {} in {}",
                outcome.raw_rows,
                outcome.cleaned.records.len(),
                outcome.stored_rows,
                settings.table_name
            );

            if !no_charts {
                let sink = match charts_dir {
                    Some(dir) => ChartSink::HtmlDir(dir),
                    None => ChartSink::Display,
                };
                charts::render_all(&outcome.cleaned.records, &sink)
                    .context("Failed to render charts")?;
            }
        }
        Commands::Stats { json } => {
            let conn = db::open_existing(&settings.db_path)?;
            let s = db::get_stats(&conn, &settings.table_name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&s)?);
            } else {
                let years = match (s.first_year, s.last_year) {
                    (Some(a), Some(b)) => format!("{}-{}", a, b),
                    _ => "-".to_string(),
                };
                println!("Table:    {}", settings.table_name);
                println!("Rows:     {}", s.rows);
                println!("Years:    {}", years);
                println!("Artists:  {}", s.distinct_artists);
                println!("Streams:  {:.2} billion", s.total_streams_billions);
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}
