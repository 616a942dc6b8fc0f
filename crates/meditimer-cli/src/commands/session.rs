use std::io::Write;

use clap::Args;
use meditimer_core::audio::Direction;
use meditimer_core::session::{SessionCommand, SessionControls, SessionOutcome};
use meditimer_core::storage::Database;
use meditimer_core::{
    Config, Event, IntervalPolicy, Session, SessionConfig, SessionObserver, ValidationError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::backends::{self, PLAYER_BOOT_DELAY};

#[derive(Args)]
pub struct SessionArgs {
    /// Length in minutes (defaults to the configured default)
    #[arg(long, short)]
    minutes: Option<u32>,
    /// Interval bell: none, half, or every:N (minutes)
    #[arg(long, short)]
    interval: Option<IntervalPolicy>,
    /// Background track id (defaults to the selected track)
    #[arg(long)]
    audio: Option<String>,
    /// Intention noted at the start
    #[arg(long, default_value = "")]
    note: String,
    /// Print events as JSON lines instead of a countdown
    #[arg(long)]
    json: bool,
}

pub fn run(args: SessionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    let db = Database::open()?;
    let library = db.load_tracks()?;

    if let Some(id) = args.audio.as_deref() {
        if library.get(id).is_none() {
            return Err(ValidationError::NotFound {
                collection: "tracks".into(),
                id: id.to_string(),
            }
            .into());
        }
    }

    let json = args.json;
    let session_config = SessionConfig {
        duration_min: args.minutes.unwrap_or(config.default_duration),
        interval: args.interval.unwrap_or(config.default_interval),
        audio_id: args.audio.or_else(|| config.selected_audio_id.clone()),
        note: args.note,
    };
    let initial_audio = session_config.audio_id.clone();
    let prefs = config.preferences();

    let runtime = tokio::runtime::Runtime::new()?;
    let (outcome, selected, total_silence) = runtime.block_on(async {
        let (backends, bootstrap) = backends::terminal(PLAYER_BOOT_DELAY);
        let (controls, inputs) = SessionControls::channel(prefs.bells.total_silence);
        let observer = Box::new(TerminalObserver::new(json));
        let session = Session::enter(
            Some(session_config),
            &prefs,
            library,
            backends,
            Box::new(db),
            observer,
        )?;

        if !json {
            println!("keys: p pause/resume, n next track, b previous track, s silence, q stop");
        }
        let keys = tokio::spawn(read_keys(controls.clone()));
        let interrupt = tokio::spawn(stop_on_ctrl_c(controls.clone()));

        let outcome = session.run(inputs).await;
        keys.abort();
        interrupt.abort();
        bootstrap.abort();

        let selected = controls.selected.borrow().clone();
        let total_silence = *controls.total_silence.borrow();
        Ok::<_, Box<dyn std::error::Error>>((outcome, selected, total_silence))
    })?;
    // Stdin reads sit on a blocking thread that never finishes on its own.
    runtime.shutdown_background();

    if persist_changes(&mut config, initial_audio, selected, total_silence) {
        if let Err(e) = config.save() {
            warn!("failed to persist track selection: {e}");
        }
    }

    let SessionOutcome { record_id, log } = outcome?;
    if !json {
        println!();
        println!(
            "logged session #{record_id}: {} of {} min",
            log.actual_duration_min, log.planned_duration_min
        );
        if !config.journal.hide_journaling {
            println!("add a journal entry with: meditimer logs note {record_id} \"...\"");
        }
    }
    Ok(())
}

/// Copy what the user switched to mid-session into `config`. A field left
/// alone keeps its saved value, so an `--audio` override is not persisted.
fn persist_changes(
    config: &mut Config,
    initial_audio: Option<String>,
    selected: Option<String>,
    total_silence: bool,
) -> bool {
    let mut changed = false;
    if selected != initial_audio {
        config.selected_audio_id = selected;
        changed = true;
    }
    if total_silence != config.total_silence {
        config.total_silence = total_silence;
        changed = true;
    }
    changed
}

async fn read_keys(controls: SessionControls) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "p" => SessionCommand::TogglePause,
            "n" => SessionCommand::Cycle(Direction::Next),
            "b" => SessionCommand::Cycle(Direction::Previous),
            "q" => SessionCommand::Stop,
            "s" => {
                controls.total_silence.send_modify(|silent| *silent = !*silent);
                continue;
            }
            other => {
                debug!(key = other, "ignored input");
                continue;
            }
        };
        if controls.commands.send(command).await.is_err() {
            break;
        }
    }
}

async fn stop_on_ctrl_c(controls: SessionControls) {
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = controls.commands.send(SessionCommand::Stop).await;
    }
}

/// Renders a session as a countdown line, or as JSON event lines.
struct TerminalObserver {
    json: bool,
}

impl TerminalObserver {
    fn new(json: bool) -> Self {
        Self { json }
    }
}

impl SessionObserver for TerminalObserver {
    fn on_interval(&mut self, remaining_secs: u64, _total_secs: u64) {
        if self.json {
            return;
        }
        print!("\r  {}  ", format_clock(remaining_secs));
        let _ = std::io::stdout().flush();
    }

    fn on_complete(&mut self) {
        if !self.json {
            print!("\r  {}  ", format_clock(0));
        }
    }

    fn on_event(&mut self, event: &Event) {
        if self.json {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
            return;
        }
        let message = match event {
            Event::SessionStarted { duration_min, interval, .. } => {
                format!("{duration_min} min session, interval bell: {interval}")
            }
            Event::Paused { .. } => "paused".to_string(),
            Event::Resumed { .. } => "resumed".to_string(),
            Event::TrackChanged { name, kind, .. } => format!("playing {name} ({kind})"),
            Event::PlaybackStopped { .. } => "background audio off".to_string(),
            Event::WakeLockLost { .. } => "screen may sleep".to_string(),
            _ => return,
        };
        println!("\r{message:<40}");
    }
}

fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
