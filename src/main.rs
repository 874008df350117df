use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use pagesnap::host::{DirectorySink, JsonFilePreferences, PreferenceStore, SavedOutput};
use pagesnap::selection::{PointerButton, SelectionEvent, SelectionOutcome, SelectionTool};
use pagesnap::{Browser, CaptureConfig, CaptureService, OutputFormat, Page, Viewport};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pagesnap")]
#[command(about = "Screenshots of web pages: visible part, full page, or a selected area")]
#[command(version)]
struct Cli {
    /// Directory captures are written below
    #[arg(long, default_value = ".", global = true)]
    out_dir: PathBuf,

    /// Preference file holding the save folder [default: <out-dir>/pagesnap-prefs.json]
    #[arg(long, global = true)]
    prefs: Option<PathBuf>,

    /// JSON capture configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Browser viewport width
    #[arg(long, default_value_t = 1280, global = true)]
    width: u32,

    /// Browser viewport height
    #[arg(long, default_value_t = 720, global = true)]
    height: u32,

    /// Encoding for full-page and region captures (overrides the config file)
    #[arg(long, value_enum, global = true)]
    format: Option<FormatArg>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the visible part of a page
    Visible { url: String },
    /// Capture the whole scrollable page
    FullPage { url: String },
    /// Capture the rectangle dragged from one corner to the other
    Region {
        url: String,
        /// Corner where the drag starts, as X,Y
        #[arg(long, value_parser = parse_point)]
        from: Point,
        /// Corner where the drag ends, as X,Y
        #[arg(long, value_parser = parse_point)]
        to: Point,
    },
    /// Show or change the folder captures are saved into
    Folder {
        name: Option<String>,
        /// Save at the top level of the output directory again
        #[arg(long, conflicts_with = "name")]
        clear: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    x: u32,
    y: u32,
}

fn parse_point(raw: &str) -> std::result::Result<Point, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got '{}'", raw))?;
    let coord = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("bad coordinate '{}': {}", v, e))
    };
    Ok(Point { x: coord(x)?, y: coord(y)? })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let prefs_path = cli
        .prefs
        .clone()
        .unwrap_or_else(|| cli.out_dir.join("pagesnap-prefs.json"));
    let prefs = Arc::new(JsonFilePreferences::new(prefs_path));

    if let Commands::Folder { name, clear } = &cli.command {
        return folder(prefs.as_ref(), name.as_deref(), *clear).await;
    }

    let config = load_config(&cli)?;
    let service = Arc::new(CaptureService::new(
        config,
        Arc::new(DirectorySink::new(&cli.out_dir)),
        prefs,
    ));

    let browser = Browser::new(Viewport {
        width: cli.width,
        height: cli.height,
    })
    .await
    .context("failed to launch headless Chrome")?;
    let page = browser.new_page().await?;

    let result = capture(&cli.command, &service, &page).await;
    if let Err(e) = browser.close().await {
        warn!("Browser did not shut down cleanly: {}", e);
    }

    let saved = result?;
    println!("{}", saved.location);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CaptureConfig> {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CaptureConfig::default(),
    };
    if let Some(format) = cli.format {
        config.output_format = format.into();
    }
    config.validate().context("invalid capture configuration")?;
    Ok(config)
}

async fn capture(command: &Commands, service: &Arc<CaptureService>, page: &Page) -> Result<SavedOutput> {
    match command {
        Commands::Visible { url } => {
            let target = open(page, url).await?;
            Ok(service
                .capture_visible(target.window, page)
                .await
                .context("visible capture failed")?)
        }
        Commands::FullPage { url } => {
            let target = open(page, url).await?;

            let on_interrupt = Arc::clone(service);
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() && on_interrupt.cancel() {
                    info!("Interrupted, stopping capture");
                }
            });
            let result = service.capture_full_page(&target, page, page).await;
            watcher.abort();

            Ok(result.context("full-page capture failed")?)
        }
        Commands::Region { url, from, to } => {
            let rect = {
                let mut tool = SelectionTool::new(service.config().min_selection_px);
                tool.handle(SelectionEvent::PointerDown {
                    x: from.x,
                    y: from.y,
                    button: PointerButton::Primary,
                });
                tool.handle(SelectionEvent::PointerMove { x: to.x, y: to.y });
                match tool.handle(SelectionEvent::PointerUp { x: to.x, y: to.y }) {
                    Some(SelectionOutcome::Committed(rect)) => rect,
                    Some(SelectionOutcome::Discarded(rect)) => bail!(
                        "selection {}x{} is smaller than the {}px minimum",
                        rect.width,
                        rect.height,
                        service.config().min_selection_px
                    ),
                    _ => bail!("selection did not complete"),
                }
            };
            let target = open(page, url).await?;
            Ok(service
                .capture_selected_area(&target, rect, page)
                .await
                .context("selected-area capture failed")?)
        }
        Commands::Folder { .. } => bail!("folder does not capture"),
    }
}

async fn open(page: &Page, url: &str) -> Result<pagesnap::TargetPage> {
    page.goto(url)
        .await
        .with_context(|| format!("failed to load {}", url))?;
    Ok(page.target().await?)
}

async fn folder(prefs: &dyn PreferenceStore, name: Option<&str>, clear: bool) -> Result<()> {
    if clear {
        prefs.set_save_folder(None).await?;
        println!("Saving to the output directory");
    } else if let Some(name) = name {
        prefs.set_save_folder(Some(name)).await?;
        println!("Saving to folder '{}'", name);
    } else {
        match prefs.save_folder().await? {
            Some(folder) => println!("{}", folder),
            None => println!("(output directory)"),
        }
    }
    Ok(())
}
