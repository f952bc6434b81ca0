//! stockgrid-probe - read the stock grid of a live back office
//!
//! Opens the stock page, optionally applies filters through the same
//! synchronized operations the tests use, and prints the resulting rows.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockgrid::playwright::{Browser, PlaywrightDriver};
use stockgrid::{FilterState, GridConfig, GridResult, GridSnapshot, StockGrid, StockStatus};

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "stockgrid-probe")]
#[command(about = "Print the rows of the back-office stock grid")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "STOCKGRID_CONFIG", default_value = "stockgrid.toml")]
    config: PathBuf,

    /// Back-office root URL (overrides the config file)
    #[arg(long)]
    base_url: Option<String>,

    /// Search tag to apply; repeatable
    #[arg(short, long)]
    search: Vec<String>,

    /// Status filter (enabled, disabled, all)
    #[arg(long)]
    status: Option<StockStatus>,

    /// Category to select; repeatable
    #[arg(long)]
    category: Vec<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> GridResult<()> {
    let mut config = GridConfig::load(&args.config)?;
    config.apply_env()?;
    if let Some(url) = args.base_url {
        config.base_url = url;
    }
    if let Some(browser) = args.browser {
        config.playwright.browser = browser;
    }
    if args.headed {
        config.playwright.headless = false;
    }

    let driver = PlaywrightDriver::launch(&config.playwright)
        .await?
        .with_attribute_poll(config.sync.poll_interval());
    let grid = StockGrid::from_config(driver, &config);
    grid.open(&config.stock_url()).await?;

    let mut filters = FilterState::new();
    for tag in args.search {
        filters = filters.search(tag);
    }
    if let Some(status) = args.status {
        filters = filters.status(status);
    }
    for category in args.category {
        filters = filters.category(category);
    }
    if !filters.is_empty() {
        grid.apply_filter_state(&filters).await?;
    }

    let snapshot = grid.snapshot().await?;
    info!("{} row(s) listed", snapshot.len());
    print_snapshot(&snapshot, args.format)?;
    Ok(())
}

fn print_snapshot(snapshot: &GridSnapshot, format: OutputFormat) -> GridResult<()> {
    match format {
        OutputFormat::Table => {
            if snapshot.is_empty() {
                println!("No rows listed.");
                return Ok(());
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["#", "Name", "Reference", "Supplier", "Physical", "Reserved", "Available"]);
            for row in &snapshot.rows {
                table.add_row(vec![
                    row.position.to_string(),
                    row.name.clone(),
                    row.reference.clone(),
                    row.supplier.clone(),
                    row.physical.to_string(),
                    row.reserved.to_string(),
                    row.available.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
    }
    Ok(())
}
