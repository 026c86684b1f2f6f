use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use beatlane::audio::{load_pitch_samples, ChannelMode, TrackAnalysis, TrackAnalyzer};
use beatlane::PipelineConfig;

#[derive(Parser)]
#[command(name = "beatlane-scan")]
#[command(about = "Analyze an audio file into onsets, tempo, pitch samples and a beat schedule")]
struct Args {
    /// Audio file to analyze (MP3, WAV, M4A, OGG, FLAC)
    #[arg()]
    input_file: PathBuf,

    /// Output file for the analysis (JSON)
    #[arg(short, long, default_value = "analysis.json")]
    output: PathBuf,

    /// Pipeline configuration (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pitch samples (JSON array of {time, frequencyHz}) to use instead of pitch tracking
    #[arg(long)]
    pitches: Option<PathBuf>,

    /// Analyze only the first channel instead of a mixdown
    #[arg(long)]
    channel0: bool,

    /// Onset hop size in samples
    #[arg(long)]
    hop_size: Option<usize>,

    /// Onset window size in samples
    #[arg(long)]
    window_size: Option<usize>,

    /// Write the effective configuration here and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(hop_size) = args.hop_size {
        config.onset.hop_size = hop_size;
    }
    if let Some(window_size) = args.window_size {
        config.onset.window_size = window_size;
    }
    config.validate()?;

    if let Some(path) = &args.dump_config {
        config.save(path)?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    info!("beatlane scan");
    info!("Input file: {}", args.input_file.display());
    info!("Output file: {}", args.output.display());
    info!(
        "Onset hop size: {}, window size: {}",
        config.onset.hop_size, config.onset.window_size
    );

    let mode = if args.channel0 {
        ChannelMode::FirstChannel
    } else {
        ChannelMode::Mixdown
    };
    let mut analyzer = TrackAnalyzer::new(config).with_channel_mode(mode);
    if let Some(path) = &args.pitches {
        analyzer = analyzer.with_pitches(load_pitch_samples(path)?);
    }

    let analysis = analyzer.analyze_file(&args.input_file)?;
    report(&analysis);

    analysis.save_json(&args.output)?;
    let file_size = std::fs::metadata(&args.output)?.len();
    info!("Analysis saved ({:.1} KB)", file_size as f64 / 1024.0);

    Ok(())
}

fn report(analysis: &TrackAnalysis) {
    let info_block = &analysis.file_info;
    info!("=== SCAN RESULTS ===");
    info!("Duration: {:.2} seconds", info_block.duration_seconds);
    info!(
        "Sample rate: {}Hz, {} source channel(s)",
        info_block.sample_rate, info_block.source_channels
    );
    info!("Onsets: {}", analysis.onsets.len());
    info!("Tempo: {:.0} BPM", analysis.bpm);
    info!("Pitch samples: {}", analysis.pitches.len());

    if let (Some(first), Some(last)) = (analysis.onsets.first(), analysis.onsets.last()) {
        info!("First onset at {:.2}s, last at {:.2}s", first.time, last.time);
    }

    let mut per_lane = std::collections::BTreeMap::new();
    let mut per_row = std::collections::BTreeMap::new();
    for event in &analysis.schedule {
        *per_lane.entry(event.lane).or_insert(0usize) += 1;
        *per_row.entry(event.row).or_insert(0usize) += 1;
    }
    info!("Events per lane: {:?}", per_lane);
    info!("Events per row: {:?}", per_row);
}
