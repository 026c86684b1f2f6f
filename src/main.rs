use anyhow::{bail, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use beatlane::audio::{
    load_pitch_samples, spawn_analysis, AnalysisSource, AudioPlayback, ChannelMode, TrackAnalysis,
    TrackAnalyzer,
};
use beatlane::gameplay::{GameSession, TickReport, TrackClock, WallClock};
use beatlane::PipelineConfig;

#[derive(Parser)]
#[command(name = "beatlane")]
#[command(about = "Analyze a track and replay its beat schedule as lane gameplay")]
struct Args {
    /// Audio file to play (MP3, WAV, M4A, OGG, FLAC)
    #[arg()]
    input_file: PathBuf,

    /// Pipeline configuration (JSON); command-line options override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Replay a saved analysis instead of analyzing the track
    #[arg(long)]
    analysis: Option<PathBuf>,

    /// Pitch samples (JSON array of {time, frequencyHz}) to use instead of pitch tracking
    #[arg(long)]
    pitches: Option<PathBuf>,

    /// Analyze only the first channel instead of a mixdown
    #[arg(long)]
    channel0: bool,

    /// Run against a wall clock without opening an audio device
    #[arg(long)]
    headless: bool,

    /// Gameplay ticks per second
    #[arg(long, default_value = "60")]
    tick_hz: f64,

    #[arg(long)]
    lanes: Option<usize>,

    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    pool_capacity: Option<usize>,

    /// Playback volume (0.0-1.0)
    #[arg(long, default_value = "1.0")]
    volume: f32,
}

enum Player {
    Audio(AudioPlayback),
    Headless(WallClock),
}

impl Player {
    fn start(&mut self) {
        match self {
            Player::Audio(playback) => playback.play(),
            Player::Headless(clock) => clock.start(),
        }
    }

    fn track_time(&self) -> f64 {
        match self {
            Player::Audio(playback) => playback.track_time(),
            Player::Headless(clock) => clock.track_time(),
        }
    }

    fn audio_finished(&self) -> bool {
        match self {
            Player::Audio(playback) => playback.is_finished(),
            Player::Headless(_) => true,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.tick_hz <= 0.0 || !args.tick_hz.is_finite() {
        bail!("--tick-hz must be positive");
    }

    info!("Starting beatlane");
    info!("Input file: {}", args.input_file.display());

    let config = load_config(&args)?;
    let analysis = match &args.analysis {
        Some(path) => {
            info!("Loading saved analysis from {}", path.display());
            TrackAnalysis::load_json(path)?
        }
        None => analyze(&args, config.clone())?,
    };

    let mut session = GameSession::new(config.grid.clone(), config.gameplay.clone(), analysis.bpm);
    session.load_track(analysis.schedule.clone(), analysis.bpm);

    let mut player = if args.headless {
        Player::Headless(WallClock::new())
    } else {
        let mut playback = AudioPlayback::new()?;
        playback.load_file(&args.input_file)?;
        playback.set_volume(args.volume);
        Player::Audio(playback)
    };

    run(&mut session, &mut player, args.tick_hz);
    Ok(())
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(lanes) = args.lanes {
        config.grid.lanes = lanes;
    }
    if let Some(rows) = args.rows {
        config.grid.rows = rows;
    }
    if let Some(capacity) = args.pool_capacity {
        config.gameplay.pool_capacity = capacity;
    }
    config.validate()?;
    Ok(config)
}

fn analyze(args: &Args, config: PipelineConfig) -> Result<TrackAnalysis> {
    let mode = if args.channel0 {
        ChannelMode::FirstChannel
    } else {
        ChannelMode::Mixdown
    };
    let mut analyzer = TrackAnalyzer::new(config).with_channel_mode(mode);
    if let Some(path) = &args.pitches {
        analyzer = analyzer.with_pitches(load_pitch_samples(path)?);
    }

    let handle = spawn_analysis(AnalysisSource::File(args.input_file.clone()), analyzer)?;
    let mut waited = 0u32;
    loop {
        if let Some(result) = handle.try_result() {
            return Ok(result?);
        }
        waited += 1;
        if waited % 20 == 0 {
            info!("Still analyzing ({:.0}s)...", waited as f64 * 0.05);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn run(session: &mut GameSession, player: &mut Player, tick_hz: f64) {
    let tick = Duration::from_secs_f64(1.0 / tick_hz);
    let mut spawned = 0usize;
    let mut dropped = 0usize;

    info!(
        "Replaying {} events at {:.0} BPM (travel time {:.2}s)",
        session.scheduler().events().len(),
        session.bpm(),
        session.travel_time()
    );
    player.start();

    loop {
        let report = session.tick(player.track_time());
        log_report(&report);
        spawned += report.spawned.len();
        dropped += report.dropped.len();

        if session.is_finished() && player.audio_finished() {
            break;
        }
        thread::sleep(tick);
    }

    info!(
        "Playback complete: {} entities spawned, {} events dropped",
        spawned, dropped
    );
}

fn log_report(report: &TickReport) {
    for spawn in &report.spawned {
        info!(
            "Spawn {} in lane {}, row {} ({}), arriving at {:.2}s",
            spawn.id, spawn.lane, spawn.row, spawn.color, spawn.arrival_time
        );
    }
    for event in &report.dropped {
        debug!("Dropped beat at {:.2}s", event.time);
    }
    for update in &report.updates {
        debug!(
            "{} at ({:.2}, {:.2}, {:.2})",
            update.id, update.x, update.y, update.z
        );
    }
    for id in &report.retired {
        info!("Retired {}", id);
    }
}
