use clap::Subcommand;
use meditimer_core::storage::Database;
use meditimer_core::{AudioTrack, Config, ValidationError};

#[derive(Subcommand)]
pub enum TracksAction {
    /// List saved background tracks
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a track from a media or YouTube URL
    Add {
        url: String,
        /// Display name (defaults to the file name or video id)
        #[arg(long)]
        name: Option<String>,
        /// Also make it the selected track
        #[arg(long)]
        select: bool,
    },
    /// Remove a saved track
    Remove { id: String },
    /// Select the track played during sessions ("none" for silence)
    Select { id: String },
}

pub fn run(action: TracksAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut library = db.load_tracks()?;

    match action {
        TracksAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(library.tracks())?);
                return Ok(());
            }
            let selected = Config::load()?.selected_audio_id;
            for track in library.tracks() {
                let marker = if selected.as_deref() == Some(track.id.as_str()) {
                    '*'
                } else {
                    ' '
                };
                println!("{marker} {:<38} {:<8} {}", track.id, track.kind, track.name);
            }
        }
        TracksAction::Add { url, name, select } => {
            let track = AudioTrack::from_url(&url, name)?;
            let id = track.id.clone();
            library.add(track)?;
            db.save_tracks(&library)?;
            if select {
                Config::load()?.set("selected_audio_id", &id)?;
            }
            println!("added {id}");
        }
        TracksAction::Remove { id } => {
            let removed = library.remove(&id)?;
            db.save_tracks(&library)?;
            let mut config = Config::load()?;
            if config.selected_audio_id.as_deref() == Some(removed.id.as_str()) {
                config.set("selected_audio_id", "")?;
            }
            println!("removed {}", removed.name);
        }
        TracksAction::Select { id } => {
            let track = library.get(&id).ok_or_else(|| ValidationError::NotFound {
                collection: "tracks".into(),
                id: id.clone(),
            })?;
            println!("selected {}", track.name);
            Config::load()?.set("selected_audio_id", &id)?;
        }
    }
    Ok(())
}
