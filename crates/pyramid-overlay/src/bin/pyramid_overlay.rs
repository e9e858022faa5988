use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use pyramid_overlay::{
    FramePipeline, ImageSequenceSink, ImageSequenceSource, OverlayConfig, StructureReport,
};

#[derive(Parser, Debug)]
#[command(name = "pyramid-overlay", version)]
#[command(about = "Overlay a translucent block pyramid on chessboard frames")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit structured JSON logs (tracing builds only).
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the overlay onto every frame of an image sequence.
    Render {
        /// Directory of input frames (png, jpg, bmp, tif).
        #[arg(long)]
        frames: PathBuf,
        /// Directory holding `<frame stem>.json` corner detections.
        #[arg(long)]
        detections: PathBuf,
        /// Output directory for annotated PNG frames.
        #[arg(long)]
        output: PathBuf,
        /// JSON configuration; defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Stop after this many frames.
        #[arg(long)]
        max_frames: Option<usize>,
    },
    /// Dump the generated pyramid as JSON.
    Structure {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write the default configuration.
    InitConfig {
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Render {
            frames,
            detections,
            output,
            config,
            max_frames,
        } => {
            let cfg = load_config(config.as_ref())?;
            let pipeline = FramePipeline::from_config(&cfg)?.with_max_frames(max_frames);
            let mut source = ImageSequenceSource::open(&frames, Some(detections.as_path()))?;
            let mut sink = ImageSequenceSink::create(&output)?;
            let summary = pipeline.run(&mut source, &mut sink)?;
            println!(
                "frames={} rendered={} skipped={}",
                summary.frames, summary.rendered, summary.skipped
            );
        }
        Commands::Structure { config, output } => {
            let cfg = load_config(config.as_ref())?;
            let report = StructureReport::from_structure(&cfg.build_structure()?);
            match output {
                Some(path) => {
                    report.write_json(&path)?;
                    log::info!("wrote {} blocks to {}", report.block_count, path.display());
                }
                None => println!("{}", report.to_json_pretty()?),
            }
        }
        Commands::InitConfig { output } => {
            OverlayConfig::default().write_json(&output)?;
            println!("wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<OverlayConfig, pyramid_overlay::ConfigError> {
    match path {
        Some(path) => {
            log::info!("loading config {}", path.display());
            OverlayConfig::load_json(path)
        }
        None => Ok(OverlayConfig::default()),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    let _ = tracing_log::LogTracer::init();
    let level = pyramid_overlay::core::level_from_verbosity(cli.verbose);
    pyramid_overlay::core::init_tracing(cli.log_json, level);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let level = pyramid_overlay::core::level_from_verbosity(cli.verbose);
    let _ = pyramid_overlay::core::init_with_level(level);
}
