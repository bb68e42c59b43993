use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use thermal_poi_map::dashboard::{Dashboard, DashboardRequest};
use thermal_poi_map::table::RatingOrder;
use thermal_poi_map::types::{FilterSelection, Stage};
use thermal_poi_map::{config, data, server};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one filter pass and export the resulting table as CSV
    Filter {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        corridor: Vec<String>,
        #[arg(long)]
        municipality: Vec<String>,
        #[arg(long)]
        info_type: Vec<String>,
        #[arg(long)]
        category: Vec<String>,
        #[arg(long)]
        sub_category: Vec<String>,
        /// Sort ratings by value instead of by text
        #[arg(long)]
        numeric_sort: bool,
        /// Write the CSV here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Serve the dashboard API
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Filter {
            config,
            corridor,
            municipality,
            info_type,
            category,
            sub_category,
            numeric_sort,
            output,
        } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dataset = data::load_data(&app_config)?;
            let dashboard = Dashboard::new(dataset, app_config)?;

            let request = DashboardRequest {
                selection: FilterSelection::default()
                    .with(Stage::Corridor, corridor)
                    .with(Stage::Municipality, municipality)
                    .with(Stage::InfoType, info_type)
                    .with(Stage::Category, category)
                    .with(Stage::SubCategory, sub_category),
                sort: numeric_sort.then_some(RatingOrder::Numeric),
                ..Default::default()
            };

            let view = dashboard.pass(&request);
            for stage in &view.stages {
                info!(
                    stage = stage.stage.column(),
                    options = stage.options.len(),
                    selected = stage.selected.len(),
                    "Stage"
                );
            }
            info!(
                rows = view.count,
                lat = view.map.center[0],
                lon = view.map.center[1],
                "Map center"
            );
            if let Some(message) = view.message {
                info!("{}", message);
            }

            let csv = view.table.to_csv()?;
            match output {
                Some(path) => {
                    fs::write(&path, csv)?;
                    info!("Wrote {} rows to {:?}", view.table.rows.len(), path);
                }
                None => std::io::stdout().write_all(&csv)?,
            }
        }
        Commands::Serve { config } => {
            info!("Serving dashboard with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(&config)?;
            let dataset = data::load_data(&app_config)?;
            let dashboard = Dashboard::new(dataset, app_config)?;

            server::start_server(dashboard).await?;
        }
    }

    Ok(())
}
