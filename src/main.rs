//! Churn Preview - Main Entry Point
//!
//! Headless viewer for churn prediction results: lists the dataset catalog,
//! downloads exports, or walks result pages through the loader and prints
//! them as a tab-separated table.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::Receiver;
use tracing::{debug, error, info, warn};

use churn_preview::domain::{AppConfig, DatasetKey};
use churn_preview::eventing::LoaderEvent;
use churn_preview::features::loader::{LoaderHandle, SentinelGeometry, spawn_loader};
use churn_preview::helpers::{format_table, get_or_create_data_dir, init_tracing, write_export};
use churn_preview::services::{PredictionsApi, block_on};
use churn_preview::state::LoaderState;

/// Rendered row height used to place the end-of-list marker
const ROW_HEIGHT_PX: f32 = 24.0;
const VIEWPORT_HEIGHT_PX: f32 = 600.0;

#[derive(Parser, Debug)]
#[command(version, about = "Preview churn prediction results page by page")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[clap(long)]
    config: Option<PathBuf>,
    /// Write the effective configuration to the config file and exit
    #[clap(long)]
    init_config: bool,
    /// Prediction service base URL
    #[clap(long)]
    api_url: Option<String>,
    /// Uploaded file name (defaults to the first file in the catalog)
    #[clap(long)]
    file: Option<String>,
    /// Sheet name (defaults to the first sheet of the file)
    #[clap(long)]
    sheet: Option<String>,
    /// Search term applied after the dataset is selected
    #[clap(long)]
    search: Option<String>,
    /// Stop after this many pages
    #[clap(long, default_value_t = 1)]
    pages: u32,
    /// Rows per page
    #[clap(long)]
    page_size: Option<u32>,
    /// Truncate cells to this many characters
    #[clap(long, default_value_t = 40)]
    max_cell: usize,
    /// Download the spreadsheet export into DIR instead of previewing
    #[clap(long, value_name = "DIR")]
    export: Option<PathBuf>,
    /// List files and sheets available on the service
    #[clap(long)]
    list: bool,
    /// Also log to a daily file in the data directory when no log_dir is configured
    #[clap(long)]
    log_file: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }
    if let Some(page_size) = args.page_size {
        if page_size == 0 {
            bail!("--page-size must be at least 1");
        }
        config.loader.page_size = page_size;
    }

    if args.init_config {
        config.save(args.config.as_deref()).context("Failed to save config")?;
        return Ok(());
    }

    let log_dir = match (&config.logging.log_dir, args.log_file) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => Some(get_or_create_data_dir()?.join("logs")),
        (None, false) => None,
    };
    let _guard = init_tracing(log_dir.as_deref());
    info!("Starting churn-preview...");

    let api = PredictionsApi::new(&config.api)?;
    block_on(run(args, config, api))?
}

async fn run(args: Args, config: AppConfig, api: PredictionsApi) -> Result<()> {
    if args.list {
        return list_catalog(&api).await;
    }

    let dataset = resolve_dataset(&api, &args).await?;
    if let Some(dir) = &args.export {
        let artifact = api
            .export(&dataset)
            .await
            .with_context(|| format!("Failed to export {dataset}"))?;
        let path = write_export(dir, &artifact.file_name, &artifact.bytes)?;
        info!(
            path = %path.display(),
            bytes = artifact.bytes.len(),
            content_type = artifact.content_type.as_deref().unwrap_or("unknown"),
            "Export written"
        );
        println!("{}", path.display());
        return Ok(());
    }

    let (events_tx, events_rx) = crossbeam_channel::unbounded();
    let mut handle = spawn_loader(api, &config, events_tx)?;
    let state = preview(&mut handle, &events_rx, dataset, &args).await?;

    if let Some(message) = state.last_error() {
        bail!("Failed to load predictions: {message}");
    }
    if state.is_empty_result() {
        println!("No predictions found");
        return Ok(());
    }
    println!("{}", format_table(state.columns(), state.rows(), args.max_cell));
    eprintln!(
        "{} rows, page {} of {}",
        state.rows().len(),
        state.current_page(),
        state.total_pages()
    );
    Ok(())
}

async fn list_catalog(api: &PredictionsApi) -> Result<()> {
    for file in api.list_files().await? {
        let sheets = api
            .list_sheets(&file)
            .await
            .with_context(|| format!("Failed to list sheets of {file}"))?;
        for sheet in sheets {
            println!("{file}\t{sheet}");
        }
    }
    Ok(())
}

async fn resolve_dataset(api: &PredictionsApi, args: &Args) -> Result<DatasetKey> {
    if let Some(dataset) = DatasetKey::from_selection(args.file.as_deref(), args.sheet.as_deref()) {
        return Ok(dataset);
    }
    let Some(file) = &args.file else {
        return api
            .default_dataset()
            .await?
            .context("No prediction files available");
    };

    let sheet = api
        .list_sheets(file)
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("{file} has no sheets"))?;
    Ok(DatasetKey::new(file.as_str(), sheet.as_str())?)
}

/// Select the dataset and scroll until `--pages` pages are loaded or the
/// result set runs out
async fn preview(
    handle: &mut LoaderHandle,
    events: &Receiver<LoaderEvent>,
    dataset: DatasetKey,
    args: &Args,
) -> Result<LoaderState> {
    handle.select_dataset(Some(dataset))?;
    if let Some(term) = &args.search {
        handle.submit_search(term.as_str())?;
    }
    handle.flush().await?;
    let mut state = handle.wait_until(|s| !s.is_initial_loading()).await?;
    drain_events(events);

    while state.current_page() < args.pages {
        handle.on_render();
        let loaded = state.rows().len();
        let viewport_top = (loaded as f32 * ROW_HEIGHT_PX - VIEWPORT_HEIGHT_PX).max(0.0);
        let geometry =
            SentinelGeometry::after_rows(loaded, ROW_HEIGHT_PX, viewport_top, VIEWPORT_HEIGHT_PX);
        if !handle.on_scroll(geometry)? {
            break;
        }

        let before = state.current_page();
        handle.flush().await?;
        state = handle.wait_until(|s| !s.is_loading()).await?;
        drain_events(events);
        if state.current_page() == before {
            break;
        }
    }
    Ok(state)
}

fn drain_events(events: &Receiver<LoaderEvent>) {
    for event in events.try_iter() {
        match event {
            LoaderEvent::Notice {
                message,
                is_error: true,
            } => error!("{message}"),
            LoaderEvent::PageAbandoned { page, message, .. } => {
                warn!(page, "Page not loaded: {message}")
            }
            other => debug!(?other, "Loader event"),
        }
    }
}
