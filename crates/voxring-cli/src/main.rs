//! voxring - stream a WAV file through the playback pipeline
//!
//! The file is cut into chunks and fed to the player the way a speech
//! synthesizer would deliver it, so buffering, rate changes and barge-in
//! can be heard (or rendered to a file) without a voice engine attached.
//!
//! ## Examples
//!
//! - `voxring devices`
//! - `voxring play reply.wav --rate 1.25`
//! - `voxring play reply.wav --barge-in-after-ms 800 --render-to cut.wav`

mod wav;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use voxring_core::audio::{output_devices, OfflineBackend, OfflineDriver, OutputBackend};
use voxring_core::config::{default_config_path, load_config};
use voxring_core::engine::PlaybackStats;
use voxring_core::{ms_to_samples, AudioPlayer, BufferState, PlayerConfig, Sample};

use wav::MonoClip;

/// voxring - streaming playback for synthesized speech
#[derive(Parser)]
#[command(name = "voxring", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List audio output devices
    Devices {
        /// Config file (defaults to the standard location)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Stream a WAV file through the player
    Play(PlayArgs),
}

#[derive(clap::Args)]
struct PlayArgs {
    /// WAV file at the configured sample rate
    input: PathBuf,

    /// Playback rate (0.5 - 2.0)
    #[arg(short, long, default_value = "1.0")]
    rate: f64,

    /// Size of each delivered chunk in milliseconds
    #[arg(long, default_value = "40")]
    chunk_ms: u32,

    /// Interrupt playback this long after the first chunk
    #[arg(long)]
    barge_in_after_ms: Option<u64>,

    /// Cushion before playback starts, in samples
    #[arg(long, env = "VOXRING_INITIAL_THRESHOLD")]
    threshold: Option<usize>,

    /// Config file (defaults to the standard location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render to this WAV file instead of the audio device
    #[arg(long)]
    render_to: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "info,voxring_core=debug,voxring=debug",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format_timestamp_millis()
        .init();

    let result = match cli.command {
        Command::Devices { config } => list_devices(config.as_deref()),
        Command::Play(args) => play(&args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Load the player config from `path` or the standard location
fn player_config(path: Option<&Path>) -> PlayerConfig {
    match path {
        Some(path) => load_config(path),
        None => load_config(&default_config_path()),
    }
}

fn list_devices(config: Option<&Path>) -> Result<()> {
    let sample_rate = player_config(config).sample_rate;
    let devices = output_devices().context("Failed to enumerate output devices")?;
    println!("Output devices (* default, ! cannot run at {} Hz):", sample_rate);
    for device in devices {
        let rates: Vec<String> = device.sample_rates.iter().map(u32::to_string).collect();
        println!(
            "{}{}{}  [{} ch, {}, {} Hz]",
            if device.is_default { '*' } else { ' ' },
            if device.supports_rate(sample_rate) { ' ' } else { '!' },
            device.id.display_label(),
            device.max_channels,
            if device.supports_f32 { "f32" } else { "int" },
            rates.join("/")
        );
    }
    Ok(())
}

fn play(args: &PlayArgs) -> Result<()> {
    let mut config = player_config(args.config.as_deref());
    if let Some(samples) = args.threshold {
        config = config.with_threshold_override(samples);
    }

    let clip = wav::read_mono(&args.input)?;
    if clip.sample_rate != config.sample_rate {
        bail!(
            "{:?} is {} Hz but the player runs at {} Hz; resample it first",
            args.input,
            clip.sample_rate,
            config.sample_rate
        );
    }
    log::info!(
        "Streaming {:?} ({} ms) in {} ms chunks at {}x",
        args.input,
        clip.duration_ms(),
        args.chunk_ms,
        args.rate
    );

    match &args.render_to {
        Some(out) => render_offline(args, config, &clip, out),
        None => play_live(args, config, &clip),
    }
}

/// Samples per delivered chunk, at least one
fn chunk_len(args: &PlayArgs, sample_rate: u32) -> usize {
    ms_to_samples(args.chunk_ms, sample_rate).max(1)
}

fn play_live(args: &PlayArgs, config: PlayerConfig, clip: &MonoClip) -> Result<()> {
    let sample_rate = config.sample_rate;
    let chunk = chunk_len(args, sample_rate);
    let chunk_duration = Duration::from_secs_f64(chunk as f64 / f64::from(sample_rate));
    let barge_in_at = args.barge_in_after_ms.map(Duration::from_millis);

    let mut player = AudioPlayer::new(config);
    player.start().context("Failed to start playback")?;
    player.set_playback_rate(args.rate)?;

    let started = Instant::now();
    let mut last_report = started;
    let mut interrupted = false;

    for piece in clip.samples.chunks(chunk) {
        if barge_in_at.is_some_and(|at| started.elapsed() >= at) {
            player.barge_in()?;
            interrupted = true;
            log::info!("Barge-in after {} ms", started.elapsed().as_millis());
            break;
        }
        player.play_audio(piece)?;
        thread::sleep(chunk_duration);

        if last_report.elapsed() >= Duration::from_millis(500) {
            report(&mut player, sample_rate);
            last_report = Instant::now();
        }
    }

    if !interrupted {
        // Let the cushion play out
        while player.stats().is_some_and(|s| draining(&s)) {
            thread::sleep(Duration::from_millis(20));
        }
        // One more device period so the tail reaches the speaker
        thread::sleep(Duration::from_millis(100));
    }

    report(&mut player, sample_rate);
    player.stop();
    Ok(())
}

fn render_offline(
    args: &PlayArgs,
    config: PlayerConfig,
    clip: &MonoClip,
    out: &Path,
) -> Result<()> {
    let sample_rate = config.sample_rate;
    let chunk = chunk_len(args, sample_rate);
    let quantum = config.output.buffer_size.frames_or_default() as usize;

    let backend = OfflineBackend::new(quantum);
    let mut driver = backend.driver();
    let mut player = AudioPlayer::with_backend(backend, config);
    player.start()?;
    player.set_playback_rate(args.rate)?;

    let barge_in_at = args
        .barge_in_after_ms
        .map(|ms| ms_to_samples(ms.min(u64::from(u32::MAX)) as u32, sample_rate));

    let mut rendered: Vec<Sample> = Vec::with_capacity(clip.samples.len());
    let mut delivered = 0usize;
    let mut interrupted = false;

    for piece in clip.samples.chunks(chunk) {
        if barge_in_at.is_some_and(|at| rendered.len() >= at) {
            player.barge_in()?;
            interrupted = true;
            log::info!("Barge-in after {} rendered samples", rendered.len());
            break;
        }
        player.play_audio(piece)?;
        delivered += piece.len();

        // Keep the clock in step with delivery: one chunk in, one chunk out
        while rendered.len() + quantum <= delivered {
            render_one(&mut driver, &mut rendered)?;
        }
    }

    // Drain what is still buffered, then one quantum of silence
    if !interrupted {
        while player.stats().is_some_and(|s| draining(&s)) {
            render_one(&mut driver, &mut rendered)?;
        }
    }
    render_one(&mut driver, &mut rendered)?;

    report(&mut player, sample_rate);
    if player.stats().is_some_and(|s| s.faulted) {
        bail!("Render worker faulted; {:?} not written", out);
    }
    player.stop();

    wav::write_mono(out, &rendered, sample_rate)?;
    log::info!(
        "Rendered {} samples ({} ms) to {:?}",
        rendered.len(),
        rendered.len() as u64 * 1000 / u64::from(sample_rate.max(1)),
        out
    );
    Ok(())
}

/// Buffered audio is still being played out
///
/// A tail shorter than the cushion never starts playing, so only a ready
/// buffer counts.
fn draining(stats: &PlaybackStats) -> bool {
    stats.buffered > 0 && stats.state == BufferState::Ready && !stats.faulted
}

fn render_one(driver: &mut OfflineDriver, rendered: &mut Vec<Sample>) -> Result<()> {
    let frame = driver
        .render_quantum()
        .context("Render worker detached unexpectedly")?;
    rendered.extend_from_slice(frame);
    Ok(())
}

fn report<B: OutputBackend>(player: &mut AudioPlayer<B>, sample_rate: u32) {
    let volume = player.volume();
    if let Some(stats) = player.stats() {
        log::info!(
            "buffered {:.0} ms, {:?}, rate {}x, underflow {}, growths {}, volume {:.3}",
            stats.buffered_ms(sample_rate),
            stats.state,
            stats.applied_rate,
            stats.underflow,
            stats.growths,
            volume
        );
    }
}
