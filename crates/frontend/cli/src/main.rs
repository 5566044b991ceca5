mod screenshot;
mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use kh_cdg::{CdgPlayer, GRAPHICS_MOUNT};
use kh_core::logging::{LogConfig, LogLevel};
use kh_core::Player;
use settings::Settings;
use std::fs;
use std::path::PathBuf;

const MAX_SCALE: u32 = 8;

#[derive(Parser, Debug)]
#[command(version, about = "Render CD+G karaoke graphics to PNG")]
struct Args {
    /// Path to a .cdg file
    input: PathBuf,

    /// Playback position to render, in milliseconds (default: last visible change)
    #[arg(long, conflicts_with = "frames")]
    at: Option<u64>,

    /// Step this many display frames instead of seeking
    #[arg(long)]
    frames: Option<u64>,

    /// Display frames per second when stepping
    #[arg(long)]
    fps: Option<u32>,

    /// Integer upscale of the written image (1-8)
    #[arg(long)]
    scale: Option<u32>,

    /// Write the rendered frame here
    #[arg(long, default_value = "frame.png")]
    out: PathBuf,

    /// Dump the player save-state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Restore a save-state before seeking or stepping
    #[arg(long)]
    load: Option<PathBuf>,

    /// Print track information and exit
    #[arg(long, default_value_t = false)]
    info: bool,

    /// Suppress all output, decoder logs included
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Decoder log level: off, error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,

    /// Send decoder logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Settings file (default: cdg-render.json next to the executable)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Command line merged over the settings file
#[derive(Debug, PartialEq, Eq)]
struct Options {
    fps: u32,
    scale: u32,
    log_level: LogLevel,
    log_file: Option<PathBuf>,
}

impl Options {
    fn resolve(args: &Args, settings: &Settings) -> Result<Self> {
        let level_name = args.log_level.as_deref().unwrap_or(&settings.log_level);
        let log_level = LogLevel::from_str(level_name)
            .with_context(|| format!("unknown log level {:?}", level_name))?;
        let log_level = if args.quiet { LogLevel::Off } else { log_level };

        Ok(Self {
            fps: args.fps.unwrap_or(settings.fps).max(1),
            scale: args.scale.unwrap_or(settings.scale).clamp(1, MAX_SCALE),
            log_level,
            log_file: args
                .log_file
                .clone()
                .or_else(|| settings.log_file.as_ref().map(PathBuf::from)),
        })
    }
}

/// The settings file contents that reproduce this run's options
fn merged_settings(args: &Args, settings: &Settings) -> Settings {
    Settings {
        fps: args.fps.unwrap_or(settings.fps).max(1),
        scale: args.scale.unwrap_or(settings.scale).clamp(1, MAX_SCALE),
        log_level: args
            .log_level
            .clone()
            .unwrap_or_else(|| settings.log_level.clone()),
        log_file: args
            .log_file
            .as_ref()
            .map(|p| p.display().to_string())
            .or_else(|| settings.log_file.clone()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load(&config_path);
    let opts = Options::resolve(&args, &settings)?;

    // An explicitly named config that does not exist yet is created from this run
    if args.config.is_some() && !config_path.exists() {
        merged_settings(&args, &settings)
            .save(&config_path)
            .with_context(|| format!("writing settings {}", config_path.display()))?;
        log::info!("Wrote settings to {}", config_path.display());
    }

    let log_config = LogConfig::global();
    log_config.set_global_level(opts.log_level);
    if let Some(path) = &opts.log_file {
        log_config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }

    let data =
        fs::read(&args.input).with_context(|| format!("reading {}", args.input.display()))?;
    let mut player = CdgPlayer::with_fps(opts.fps);
    player
        .mount(GRAPHICS_MOUNT, &data)
        .with_context(|| format!("loading {}", args.input.display()))?;

    let (packets, last_change) = {
        let stream = player.stream().context("no track mounted")?;
        (stream.len(), stream.last_change_ms())
    };
    log::debug!(
        "{}: {} packets, last change at {} ms",
        args.input.display(),
        packets,
        last_change
    );

    if args.info {
        println!("{}", args.input.display());
        println!("  packets:     {}", packets);
        println!("  duration:    {} ms", player.duration_ms());
        println!("  last change: {} ms", last_change);
        return Ok(());
    }

    if let Some(path) = &args.load {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading save-state {}", path.display()))?;
        let state: serde_json::Value = serde_json::from_str(&contents)?;
        player
            .load_state(&state)
            .with_context(|| format!("restoring save-state {}", path.display()))?;
    }

    let frame = match args.frames {
        Some(count) => {
            let mut frame = player.current_frame().to_argb();
            for n in 1..=count {
                frame = player.step_frame()?;
                if player.frame_changed() && !args.quiet {
                    println!("Frame {} ({} ms): changed", n, player.position_ms());
                }
            }
            frame
        }
        None => {
            // A restored state is rendered where it was saved unless asked otherwise
            let target = match (args.at, &args.load) {
                (Some(ms), _) => Some(ms),
                (None, None) => Some(last_change),
                (None, Some(_)) => None,
            };
            if let Some(ms) = target {
                player.seek(ms)?;
            }
            player.current_frame().to_argb()
        }
    };

    let frame = frame.scaled(opts.scale);
    screenshot::save_png(&args.out, &frame)?;
    if !args.quiet {
        println!(
            "Wrote {}x{} frame at {} ms to {}",
            frame.width,
            frame.height,
            player.position_ms(),
            args.out.display()
        );
    }

    if let Some(path) = &args.save {
        let state = player.save_state();
        fs::write(path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("writing save-state {}", path.display()))?;
    }

    Ok(())
}
