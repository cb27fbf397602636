use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use page_export::{
    BlankDetection, CaptureKind, ExportOptions, PageMargins, PaginationStrategy, SurfaceTree,
    enumerate_units,
};
use page_export_runtime::{ExportCommand, ExportUpdate, spawn_worker};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pagex", about = "Paginated raster document export", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a surface tree to a paginated PDF
    Export {
        /// Input surface tree (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Paper size
        #[arg(long, default_value = "a4", value_enum)]
        paper: PaperArg,

        /// Page orientation
        #[arg(long, default_value = "portrait", value_enum)]
        orientation: OrientationArg,

        /// Content margin in mm (uniform on all sides)
        #[arg(long, default_value = "10.0")]
        margin: f32,

        /// Raster resolution in DPI
        #[arg(long, default_value = "96.0")]
        dpi: f32,

        /// Near-white channel threshold for blank-page detection (0-255)
        #[arg(long, default_value = "250")]
        threshold: u8,

        /// Per-page capture timeout in seconds (no timeout if omitted)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Document title metadata
        #[arg(long, default_value = "Document")]
        title: String,

        /// Show the capture plan only, don't rasterize or write anything
        #[arg(long)]
        stats_only: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PaperArg {
    A3,
    A4,
    A5,
    Letter,
    Legal,
    Tabloid,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<PaperArg> for page_export::PaperSize {
    fn from(arg: PaperArg) -> Self {
        match arg {
            PaperArg::A3 => Self::A3,
            PaperArg::A4 => Self::A4,
            PaperArg::A5 => Self::A5,
            PaperArg::Letter => Self::Letter,
            PaperArg::Legal => Self::Legal,
            PaperArg::Tabloid => Self::Tabloid,
        }
    }
}

impl From<OrientationArg> for page_export::Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            output,
            paper,
            orientation,
            margin,
            dpi,
            threshold,
            timeout_secs,
            title,
            stats_only,
        } => {
            let bytes = tokio::fs::read(&input).await?;
            let tree: SurfaceTree = serde_json::from_slice(&bytes)?;

            let options = ExportOptions {
                paper_size: paper.into(),
                orientation: orientation.into(),
                margins: PageMargins::uniform(margin),
                dpi,
                blank: BlankDetection {
                    white_threshold: threshold,
                    ..BlankDetection::default()
                },
                capture_timeout: timeout_secs.map(Duration::from_secs),
                title,
                ..ExportOptions::default()
            };

            if stats_only {
                print_plan(&tree, &options);
                return Ok(());
            }

            run_export(tree, options, output).await
        }
    }
}

fn print_plan(tree: &SurfaceTree, options: &ExportOptions) {
    let plan = enumerate_units(tree, options);
    println!("Capture plan:");
    println!("  Cover: {}", if plan.cover.is_some() { "yes" } else { "no" });
    match &plan.strategy {
        Some(PaginationStrategy::Discrete(units)) => {
            println!("  Discrete pages: {}", units.len());
            for (i, unit) in units.iter().enumerate() {
                let kind = match unit.kind {
                    CaptureKind::Cover => "cover",
                    CaptureKind::Page => "page",
                    CaptureKind::Flow => "flow",
                };
                println!(
                    "    {}. {} {}x{} px",
                    i + 1,
                    kind,
                    unit.target_width_px,
                    unit.target_height_px.unwrap_or(0)
                );
            }
        }
        Some(PaginationStrategy::Flow(unit)) => {
            println!(
                "  Flow capture at {} px wide, sliced after capture",
                unit.target_width_px
            );
        }
        None => println!("  No content units"),
    }
    println!("  Provisional total: {}", plan.provisional_total());
}

async fn run_export(tree: SurfaceTree, options: ExportOptions, output: PathBuf) -> Result<()> {
    let (commands, mut updates) = spawn_worker();
    commands.send(ExportCommand::Run {
        tree,
        options,
        output_path: output.clone(),
    })?;

    // Ctrl-C requests cancellation; the run stops between pages
    let cancel_commands = commands.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling export...");
            let _ = cancel_commands.send(ExportCommand::Cancel);
        }
    });

    while let Some(update) = updates.recv().await {
        match update {
            ExportUpdate::Progress {
                current,
                total,
                status,
            } => {
                println!("[{}/{}] {}", current, total, status);
            }
            ExportUpdate::Complete { path, summary } => {
                println!(
                    "Exported {} page(s) ({} blank skipped{}) → {}",
                    summary.total_pages(),
                    summary.skipped_blank,
                    if summary.sliced { ", flow-sliced" } else { "" },
                    path.display()
                );
                return Ok(());
            }
            ExportUpdate::Error { message } => {
                bail!(
                    "export failed: {}\nAs a fallback, try rendering the source \
                     directly with wkhtmltopdf",
                    message
                );
            }
        }
    }

    bail!("export worker stopped unexpectedly")
}
