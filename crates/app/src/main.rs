use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use spectrum_ring_core::{
    decode_bytes, AppConfig, FrameClock, LoadEvent, Renderer, TextRenderer, Visualiser,
    VisualiserError,
};
use tracing_subscriber::EnvFilter;

const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

fn main() -> spectrum_ring_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            input,
            config,
            elements,
            fps,
            frames,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(elements) = elements {
                config.ring.element_count = elements;
            }
            run_play(&input, &config, fps, frames)
        }
        Commands::Inspect { input } => run_inspect(&input),
    }
}

fn run_play(
    input: &Path,
    config: &AppConfig,
    fps: u32,
    max_frames: Option<u64>,
) -> spectrum_ring_core::Result<()> {
    tracing::info!(?input, fps, elements = config.ring.element_count, "starting playback");

    let bytes = std::fs::read(input)?;
    let mut visualiser = Visualiser::new(config)?;
    visualiser.request_load(bytes)?;

    match visualiser.engine_mut().wait_for_load(LOAD_TIMEOUT)? {
        Some(LoadEvent::Started { session, .. }) => tracing::info!(%session, "clip loaded"),
        Some(LoadEvent::Failed { error, .. }) => return Err(error),
        None => return Err(VisualiserError::msg("timed out waiting for the clip to decode")),
    }

    let stdout = io::stdout();
    let mut renderer = TextRenderer::new(stdout.lock(), &config.ring);
    let interval = Duration::from_secs_f32(1.0 / fps.max(1) as f32);
    let mut clock = FrameClock::default();
    clock.tick();

    loop {
        thread::sleep(interval);
        let delta = clock.tick();
        renderer.render(visualiser.frame(delta))?;

        let done = max_frames.is_some_and(|max| visualiser.frames_rendered() >= max);
        if done || !visualiser.engine().is_playing() {
            break;
        }
    }

    tracing::info!(frames = visualiser.frames_rendered(), "playback finished");
    Ok(())
}

fn run_inspect(input: &Path) -> spectrum_ring_core::Result<()> {
    tracing::info!(?input, "inspecting audio file");

    let clip = decode_bytes(std::fs::read(input)?)?;
    let mut out = io::stdout().lock();
    writeln!(out, "duration:    {:.3}s", clip.duration().as_secs_f32())?;
    writeln!(out, "sample rate: {} Hz", clip.sample_rate())?;
    writeln!(out, "channels:    {}", clip.source_channels())?;
    writeln!(out, "frames:      {}", clip.frames())?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> spectrum_ring_core::Result<AppConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            AppConfig::from_json_str(&text)
        }
        None => Ok(AppConfig::default()),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive ring visualiser", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play an audio file and render the ring to the terminal.
    Play {
        /// Audio file to play.
        input: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the number of ring elements.
        #[arg(short, long)]
        elements: Option<usize>,
        /// Frames rendered per second.
        #[arg(long, default_value_t = 30)]
        fps: u32,
        /// Stop after this many frames.
        #[arg(short = 'n', long)]
        frames: Option<u64>,
    },
    /// Decode an audio file and print a summary of it.
    Inspect {
        /// Audio file to decode.
        input: PathBuf,
    },
}
