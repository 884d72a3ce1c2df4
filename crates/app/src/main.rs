use std::{f32::consts::PI, path::PathBuf, time::Duration};

use beatdodge_core::{
    AnalysisFeed, DecodeJob, DecodedTrack, DecodedTrackSource, GameEvent, GameSession, GameState,
    Lane, Tuning,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 48_000;
const CLICK_FREQUENCY: f32 = 55.0;
const CLICK_SECONDS: f32 = 0.1;

fn main() -> beatdodge_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            bpm,
            duration,
            fps,
            tuning,
            autopilot,
        } => run_simulate(bpm, duration, fps, tuning.as_deref(), autopilot),
        Commands::Tuning { path } => run_tuning(path.as_deref()),
    }
}

/// Plays a synthesized click track through the full decode -> play -> end
/// pipeline and traces every event the session emits.
fn run_simulate(
    bpm: f32,
    duration: f32,
    fps: u32,
    tuning_path: Option<&std::path::Path>,
    autopilot: bool,
) -> beatdodge_core::Result<()> {
    let tuning = load_tuning(tuning_path)?;
    tracing::info!(bpm, duration, fps, autopilot, "starting simulation");

    let mut job = DecodeJob::new();
    job.resolve(DecodedTrack::new(
        SAMPLE_RATE,
        synth_click_track(bpm, duration, SAMPLE_RATE),
    )?)?;
    let track = job.into_result()?;
    let total = track.duration();

    let mut feed = AnalysisFeed::new(tuning.bin_count());
    feed.connect(Box::new(DecodedTrackSource::new(track, &tuning)));

    let mut session = GameSession::new(tuning);
    trace_events(Duration::ZERO, &session.track_decoded());

    let step = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut now = Duration::ZERO;
    let mut frames = 0u64;
    let mut spawns = 0u64;

    while session.state() == GameState::Playing {
        if now >= total {
            trace_events(now, &session.track_ended());
            break;
        }

        let report = {
            let sample = feed.sample(now);
            session.tick(now, sample)
        };
        spawns += trace_events(now, &report.events);

        if autopilot {
            dodge(&mut session);
        }

        now += step;
        frames += 1;
    }

    tracing::info!(
        frames,
        spawns,
        score = session.score(),
        state = ?session.state(),
        "simulation finished"
    );
    Ok(())
}

/// Validates a tuning file, or prints the built-in defaults as JSON when no
/// path is given.
fn run_tuning(path: Option<&std::path::Path>) -> beatdodge_core::Result<()> {
    match path {
        Some(path) => {
            let tuning = Tuning::from_json(&std::fs::read_to_string(path)?)?;
            tracing::info!(?path, cooldown_ms = tuning.spawn_cooldown_ms, "tuning file is valid");
        }
        None => println!("{}", Tuning::default().to_json()?),
    }
    Ok(())
}

fn load_tuning(path: Option<&std::path::Path>) -> beatdodge_core::Result<Tuning> {
    match path {
        Some(path) => Tuning::from_json(&std::fs::read_to_string(path)?),
        None => Ok(Tuning::default()),
    }
}

/// Low-frequency click bursts over silence, one per beat.
fn synth_click_track(bpm: f32, duration: f32, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let interval = 60.0 / bpm.max(1.0);
    let click_len = (CLICK_SECONDS * rate) as usize;
    let total = (duration.max(0.0) * rate) as usize;

    let mut samples = vec![0.0f32; total];
    let mut beat = 0.0f32;
    while (beat * rate) < total as f32 {
        let start = (beat * rate) as usize;
        for i in 0..click_len.min(total - start) {
            let t = i as f32 / rate;
            samples[start + i] = 0.9 * (2.0 * PI * CLICK_FREQUENCY * t).sin();
        }
        beat += interval;
    }
    samples
}

/// Minimal dodge logic standing in for a human player: when an obstacle is
/// closing in on the current lane, step into an adjacent lane, preferring a
/// clear one.
fn dodge(session: &mut GameSession) {
    const REACTION_DEPTH: f32 = -30.0;

    let threatened = |lane: Lane| {
        session
            .obstacles()
            .iter()
            .any(|o| o.lane == lane && !o.passed && o.depth > REACTION_DEPTH)
    };

    if !threatened(session.player_lane()) {
        return;
    }

    let mut candidates = Vec::new();
    if let Some(lane) = session.player_lane().left() {
        candidates.push(lane);
    }
    if let Some(lane) = session.player_lane().right() {
        candidates.push(lane);
    }

    let target = candidates
        .iter()
        .copied()
        .find(|&lane| !threatened(lane))
        .or_else(|| candidates.first().copied());
    if let Some(lane) = target {
        session.set_player_lane(lane);
    }
}

fn trace_events(now: Duration, events: &[GameEvent]) -> u64 {
    let t_ms = now.as_millis() as u64;
    let mut spawns = 0;
    for event in events {
        match event {
            GameEvent::StateChanged(state) => {
                tracing::info!(?state, t_ms, "state changed");
            }
            GameEvent::SpawnRequested(lane) => {
                spawns += 1;
                tracing::info!(lane = lane.index(), t_ms, "spawn requested");
            }
            GameEvent::ScoreChanged(score) => {
                tracing::info!(score, t_ms, "score changed");
            }
            GameEvent::ObstaclePassed(lane) => {
                tracing::debug!(lane = lane.index(), t_ms, "obstacle passed");
            }
        }
    }
    spawns
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat-reactive lane-dodge game core", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a headless game session against a synthesized click track.
    Simulate {
        /// Tempo of the synthesized track.
        #[arg(long, default_value_t = 120.0)]
        bpm: f32,
        /// Track length in seconds.
        #[arg(long, default_value_t = 20.0)]
        duration: f32,
        /// Frame rate the session is ticked at.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Optional tuning file overriding the default balance.
        #[arg(short, long)]
        tuning: Option<PathBuf>,
        /// Let a simple dodge AI play instead of a stationary craft.
        #[arg(long)]
        autopilot: bool,
    },
    /// Validate a tuning file, or print the default tuning as JSON.
    Tuning {
        /// Path to the tuning file to check.
        path: Option<PathBuf>,
    },
}
