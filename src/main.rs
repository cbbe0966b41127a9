use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;
use voice_recorder::catalog::Recording;
use voice_recorder::format::{format_date, format_duration, format_elapsed};
use voice_recorder::{
    AudioBackendFactory, AudioSource, CaptureOutcome, Catalog, Config, HeaderProbe, PlaybackState,
    Player, Preferences, Recorder, SortOrder, SystemClock, TimedPlaybackDevice, WavCaptureDevice,
};

#[derive(Parser)]
#[command(name = "voice-recorder")]
#[command(about = "Record, list and play back voice memos")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/voice-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List recordings
    List {
        /// Case-insensitive title search
        #[arg(short, long, default_value = "")]
        query: String,

        /// Date order: asc (oldest first) or desc (newest first)
        #[arg(short, long, default_value = "desc")]
        order: SortOrder,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Record a synthetic tone into the recordings directory
    Record {
        /// Active recording time in seconds
        #[arg(short, long, default_value = "5")]
        seconds: u64,

        /// Pause after this many seconds
        #[arg(long)]
        pause_at: Option<u64>,

        /// How long to stay paused, in seconds
        #[arg(long, default_value = "2")]
        pause_for: u64,

        /// Tone frequency in Hz
        #[arg(long, default_value = "440")]
        frequency: f32,
    },

    /// Play a recording until it finishes
    Play {
        title: String,

        /// Speed-cycle presses before playing (1 -> 1.5 -> 2 -> 0.5)
        #[arg(long, default_value = "0")]
        speed_steps: u8,
    },

    /// Rename a recording
    Rename { title: String, new_title: String },

    /// Delete a recording
    Delete {
        title: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show or toggle the theme preference
    Theme {
        #[arg(long)]
        toggle: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let clock = Arc::new(SystemClock);
    let mut catalog = Catalog::new(cfg.store(), Arc::new(HeaderProbe), clock.clone());

    info!("Recordings directory: {}", catalog.store().root().display());

    match args.command {
        Command::List { query, order, json } => {
            catalog.reload().await?;
            let recordings = catalog.view(&query, order);

            if json {
                println!("{}", serde_json::to_string_pretty(&recordings)?);
            } else {
                print_table(&recordings);
            }
        }

        Command::Record {
            seconds,
            pause_at,
            pause_for,
            frequency,
        } => {
            let recorder = Recorder::new(cfg.store(), clock.clone(), &cfg.session_config());
            let source = AudioBackendFactory::create(
                AudioSource::Tone {
                    frequency_hz: frequency,
                },
                cfg.backend_config(),
            );
            let device = WavCaptureDevice::new(source, cfg.temp_dir());

            let mut elapsed_rx = recorder.subscribe_elapsed();
            let display = tokio::spawn(async move {
                while elapsed_rx.changed().await.is_ok() {
                    let elapsed = *elapsed_rx.borrow_and_update();
                    print!("\r{}", format_elapsed(elapsed));
                    std::io::stdout().flush().ok();
                }
            });

            recorder.start(Box::new(device)).await?;

            match pause_at.filter(|&at| at < seconds) {
                Some(at) => {
                    sleep(Duration::from_secs(at)).await;
                    recorder.pause().await?;
                    sleep(Duration::from_secs(pause_for)).await;
                    recorder.resume().await?;
                    sleep(Duration::from_secs(seconds - at)).await;
                }
                None => sleep(Duration::from_secs(seconds)).await,
            }

            let outcome = recorder.stop().await?;
            display.abort();
            println!();

            match outcome {
                CaptureOutcome::Saved(path) => println!("Saved {}", path.display()),
                CaptureOutcome::NothingSaved => println!("Nothing saved"),
            }
        }

        Command::Play { title, speed_steps } => {
            catalog.reload().await?;
            let recording = find(&catalog, &title)?;
            if recording.duration().is_none() {
                bail!("{} has no known duration, cannot follow its progress", recording.title);
            }

            let device = Arc::new(TimedPlaybackDevice::new(clock.clone()));
            let player = Player::new(device, &cfg.session_config());

            for _ in 0..speed_steps {
                player.cycle_speed(&recording.locator).await?;
            }

            let mut progress_rx = player.subscribe().await;
            player.play(&recording.locator).await?;
            println!(
                "Playing {} ({}) at {}",
                recording.title,
                format_duration(recording.duration()),
                player.speed_for(&recording.locator).await
            );

            while progress_rx.changed().await.is_ok() {
                let progress = progress_rx.borrow_and_update().clone();
                print!("\r{:5.1}%", progress.fraction * 100.0);
                std::io::stdout().flush().ok();

                if progress.just_finished || progress.state == PlaybackState::Idle {
                    break;
                }
            }

            player.unload().await?;
            println!("\nDone");
        }

        Command::Rename { title, new_title } => {
            catalog.reload().await?;
            let recording = find(&catalog, &title)?;

            match catalog.rename(&recording, &new_title).await? {
                Some(path) => println!("Renamed to {}", path.display()),
                None => println!("Blank title, nothing renamed"),
            }
        }

        Command::Delete { title, yes } => {
            catalog.reload().await?;
            let recording = find(&catalog, &title)?;

            let deleted = catalog
                .delete(&recording, |r| yes || confirm_delete(r))
                .await?;

            if deleted {
                println!("Deleted {}", recording.title);
            }
        }

        Command::Theme { toggle } => {
            let prefs = Preferences::new(cfg.preferences_path());
            let theme = if toggle {
                prefs.toggle_theme()?
            } else {
                prefs.theme()
            };
            println!("{}", theme.as_str());
        }
    }

    Ok(())
}

fn find(catalog: &Catalog, title: &str) -> Result<Recording> {
    match catalog.find_by_title(title).or_else(|| catalog.find(title)) {
        Some(recording) => Ok(recording.clone()),
        None => bail!("No recording named {:?}", title),
    }
}

fn confirm_delete(recording: &Recording) -> bool {
    print!("Delete \"{}\"? This cannot be undone [y/N] ", recording.title);
    if std::io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer).is_ok() && answer.trim().eq_ignore_ascii_case("y")
}

fn print_table(recordings: &[Recording]) {
    if recordings.is_empty() {
        println!("No recordings");
        return;
    }

    for recording in recordings {
        println!(
            "{:<32} {:>10} {:>6}",
            recording.title,
            format_date(recording.created_at),
            format_duration(recording.duration())
        );
    }
}
