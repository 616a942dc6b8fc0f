use clap::Subcommand;
use meditimer_core::storage::Database;

#[derive(Subcommand)]
pub enum LogsAction {
    /// Most recent sessions, newest first
    List {
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Totals across all logged sessions
    Stats,
    /// Attach a journal entry to a logged session
    Note {
        /// Session log id
        id: i64,
        /// How the sit went
        text: String,
        /// Emotion tag (repeatable)
        #[arg(long = "emotion")]
        emotions: Vec<String>,
        /// Cause tag (repeatable)
        #[arg(long = "cause")]
        causes: Vec<String>,
    },
}

pub fn run(action: LogsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        LogsAction::List { limit, json } => {
            let records = db.recent_sessions(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("no sessions logged yet");
            }
            for record in records {
                let log = &record.log;
                let status = if log.completed { "done" } else { "stopped" };
                let local = log.end_time.with_timezone(&chrono::Local);
                println!(
                    "#{:<5} {}  {:>3}/{:<3} min  {:<7}  {}",
                    record.id,
                    local.format("%Y-%m-%d %H:%M"),
                    log.actual_duration_min,
                    log.planned_duration_min,
                    status,
                    log.audio.as_ref().map(|a| a.name.as_str()).unwrap_or("-"),
                );
            }
        }
        LogsAction::Stats => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        LogsAction::Note {
            id,
            text,
            emotions,
            causes,
        } => {
            db.set_end_note(id, &text, &emotions, &causes)?;
            println!("ok");
        }
    }
    Ok(())
}
