//! FramePipe - read a script's frames in order
//!
//! Entry point for the `framepipe` command.

mod output;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use framepipe_core::FramePipeError;
use framepipe_input::{PatternHost, ScriptInput};
use framepipe_pipeline::PipelineConfig;
use output::RawSink;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "framepipe", version, about = "Sequential reader for asynchronous frame sources")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print stream information as JSON.
    Info(InfoArgs),
    /// Read frames in order, optionally writing raw planes.
    Read(ReadArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Script file to open.
    script: PathBuf,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ReadArgs {
    /// Script file to open.
    script: PathBuf,

    /// Raw planar output file. Frames are discarded if omitted.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Requests kept in flight; 1 reads one frame at a time.
    #[arg(long)]
    window: Option<usize>,

    /// Pipeline configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to read (default: the whole stream).
    #[arg(long)]
    frames: Option<usize>,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Read(args) => cmd_read(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("framepipe: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit status for a failure, by error category.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<FramePipeError>())
        .map(|e| e.category().exit_code())
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&text)
        .with_context(|| format!("parse config '{}'", path.display()))?;
    Ok(config)
}

fn cmd_info(args: InfoArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let input = ScriptInput::with_config(PatternHost, config);
    let (video, handle) = input
        .open(&args.script)
        .with_context(|| format!("open '{}'", args.script.display()))?;
    println!("{}", serde_json::to_string_pretty(&video)?);
    handle.close();
    Ok(())
}

fn cmd_read(args: ReadArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(window) = args.window {
        config.prefetch_window = Some(window);
    }
    config.validate()?;

    let input = ScriptInput::with_config(PatternHost, config);
    let (video, handle) = input
        .open(&args.script)
        .with_context(|| format!("open '{}'", args.script.display()))?;

    let cancel = handle.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("register Ctrl-C handler")?;

    let mut sink = RawSink::create(args.output.as_deref()).with_context(|| {
        format!(
            "create output '{}'",
            args.output.as_deref().unwrap_or(Path::new("-")).display()
        )
    })?;
    let mut picture = handle.allocate_picture(video.csp, video.width, video.height)?;
    let frames = args.frames.unwrap_or(video.num_frames);

    let started = Instant::now();
    let mut bytes = 0usize;
    for index in 0..frames {
        handle
            .read_frame(&mut picture, index)
            .with_context(|| format!("read frame {index}"))?;
        bytes += sink.write_picture(&picture).context("write frame")?;
    }
    sink.finish().context("flush output")?;

    let elapsed = started.elapsed().as_secs_f64();
    let fps = if elapsed > 0.0 {
        frames as f64 / elapsed
    } else {
        0.0
    };
    let stats = handle.stats();
    info!(
        frames,
        bytes,
        elapsed_s = elapsed,
        fps,
        peak_backlog = stats.peak_backlog,
        "Finished reading"
    );

    handle.release_picture(picture);
    handle.close();
    Ok(())
}
