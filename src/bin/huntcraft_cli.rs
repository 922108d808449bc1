//! Huntcraft CLI - preview a hunt and export its location codes
//!
//! Commands: validate, preview, export, export-all
//! Outputs JSON to stdout
//! Exit codes: 0 ok, 1 bad input or I/O, 2 validation/export failure

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use huntcraft_core::{
    codes::{CodeAsset, CodeMatrixEncoder, CodeMount},
    export::location_base_name,
    player::NO_LOCATIONS,
    validation::validate_bundle,
    AssetExportPipeline, ExportSettings, HuntBundle, LocationId, NativeHost, PreviewPlayer, QrSvgEncoder,
};

#[derive(Parser)]
#[command(name = "huntcraft-cli")]
#[command(about = "Huntcraft CLI - scavenger hunt preview and code export")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Export settings JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a hunt file against the data contract
    Validate {
        /// Hunt JSON file ({"project": ..., "locations": [...]})
        #[arg(long)]
        hunt: PathBuf,
    },

    /// Play through a hunt in preview mode
    Preview {
        #[arg(long)]
        hunt: PathBuf,

        /// `select:<location id>` or `home`, applied in order
        #[arg(short, long = "step")]
        steps: Vec<String>,
    },

    /// Export one location's code as PNG
    Export {
        #[arg(long)]
        hunt: PathBuf,

        #[arg(short, long)]
        location: LocationId,

        /// Output directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Code pixel size (overrides config)
        #[arg(long)]
        size: Option<u32>,
    },

    /// Export every location's code and print a manifest
    ExportAll {
        #[arg(long)]
        hunt: PathBuf,

        #[arg(short, long)]
        out: Option<PathBuf>,

        #[arg(long)]
        size: Option<u32>,
    },
}

enum Step {
    Select(LocationId),
    Home,
}

impl Step {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        if raw == "home" {
            return Ok(Self::Home);
        }
        match raw.strip_prefix("select:") {
            Some(id) => Ok(Self::Select(
                id.parse().with_context(|| format!("invalid location id in step '{}'", raw))?,
            )),
            None => bail!("unknown step '{}', expected select:<id> or home", raw),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.quiet, cli.verbose) {
        eprintln!("huntcraft error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            print_json(&serde_json::json!({"success": false, "error": format!("{e:#}")}));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> anyhow::Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("HUNTCRAFT_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = match &cli.config {
        Some(path) => ExportSettings::load_from_file(path)?,
        None => ExportSettings::default(),
    };

    match cli.command {
        Commands::Validate { hunt } => {
            let hunt = load_hunt(&hunt)?;
            let result = validate_bundle(&hunt);
            print_json(&result);
            Ok(if result.valid { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }

        Commands::Preview { hunt, steps } => {
            let steps = steps.iter().map(|s| Step::parse(s)).collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&preview(load_hunt(&hunt)?, &steps)?);
            Ok(ExitCode::SUCCESS)
        }

        Commands::Export { hunt, location, out, size } => {
            let hunt = load_hunt(&hunt)?;
            let settings = override_settings(settings, out, size)?;
            let code_size = settings.code_size;
            let pipeline = AssetExportPipeline::new(NativeHost::new(settings));

            let asset = CodeAsset::for_location(hunt.project.id, location, code_size);
            let base_name = match hunt.owned_location(location) {
                Some(loc) => {
                    pipeline.target().mount(&asset.dom_anchor_id, QrSvgEncoder.encode_asset(&asset)?);
                    location_base_name(loc)
                }
                // Nothing gets mounted for an unknown or foreign id; the export reports it missing.
                None => format!("location-{}", location),
            };

            match pipeline.export_as_raster(&asset.dom_anchor_id, &base_name).await {
                Ok(file) => {
                    print_json(&serde_json::json!({"success": true, "file": file}));
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    print_json(&serde_json::json!({"success": false, "error": e.to_string()}));
                    Ok(ExitCode::from(2))
                }
            }
        }

        Commands::ExportAll { hunt, out, size } => {
            let hunt = load_hunt(&hunt)?;
            let settings = override_settings(settings, out, size)?;
            let code_size = settings.code_size;
            let pipeline = AssetExportPipeline::new(NativeHost::new(settings));

            let manifest = pipeline.export_all(&QrSvgEncoder, &hunt, code_size).await?;
            print_json(&manifest);
            Ok(if manifest.failures.is_empty() { ExitCode::SUCCESS } else { ExitCode::from(2) })
        }
    }
}

#[derive(Serialize)]
struct StepReport<'a> {
    step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<huntcraft_core::SelectOutcome>,
    state: huntcraft_core::PlayerState,
    screen: huntcraft_core::Screen<'a>,
    progress: huntcraft_core::Progress,
}

fn preview(hunt: HuntBundle, steps: &[Step]) -> anyhow::Result<serde_json::Value> {
    let mut player = PreviewPlayer::new(hunt);

    let mut reports = vec![];
    for step in steps {
        let (label, outcome) = match step {
            Step::Select(id) => (format!("select:{}", id), Some(player.select_location(*id))),
            Step::Home => {
                player.return_home();
                ("home".to_string(), None)
            }
        };
        // Screens borrow the player, so each one is rendered to JSON right away.
        let report = StepReport {
            step: label,
            outcome,
            state: player.state(),
            screen: player.screen(),
            progress: player.progress(),
        };
        reports.push(serde_json::to_value(&report).context("rendering preview step")?);
    }

    let progress = player.progress();
    Ok(serde_json::json!({
        "header": player.header(),
        "action_label": player.action_label(),
        "options": player.location_options(),
        "empty_message": player.location_options().is_none().then_some(NO_LOCATIONS),
        "steps": reports,
        "final": {
            "state": player.state(),
            "screen": player.screen(),
            "score": progress.score_line(),
            "visited": progress.visited_line(),
        },
    }))
}

fn load_hunt(path: &Path) -> anyhow::Result<HuntBundle> {
    HuntBundle::load_from_file(path).with_context(|| format!("loading hunt {}", path.display()))
}

fn override_settings(mut settings: ExportSettings, out: Option<PathBuf>, size: Option<u32>) -> anyhow::Result<ExportSettings> {
    if let Some(out) = out {
        settings.output_dir = out;
    }
    if let Some(size) = size {
        settings.code_size = size;
    }
    settings.validate()?;
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("huntcraft error: failed to render output: {}", e),
    }
}
