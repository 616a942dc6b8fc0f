//! Integration tests for the session orchestrator.
//!
//! Sessions run on Tokio's paused clock, so a twenty-minute sit finishes
//! instantly while every one-second tick is still delivered.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use meditimer_core::audio::{
    AudioContext, AudioSettings, AudioTrack, ContextState, EmbeddedPlayer, EmbeddedPlayerSlot,
    MediaElement, PlaybackError, PlayerError, TrackLibrary,
};
use meditimer_core::cues::{BellConfig, CueHandle, CueKind, CueLoader, SoundKey};
use meditimer_core::error::{CoreError, Result as CoreResult};
use meditimer_core::session::{
    Backends, Session, SessionCommand, SessionConfig, SessionControls, SessionLog, SessionLogSink,
    SessionObserver,
};
use meditimer_core::wake::{Visibility, WakeLock, WakeLockError};
use meditimer_core::{Event, IntervalPolicy, Preferences, SessionError};

type Journal = Arc<Mutex<Vec<String>>>;

fn note(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

fn count(journal: &Journal, prefix: &str) -> usize {
    journal
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .count()
}

struct Media(Journal);

impl MediaElement for Media {
    fn set_source(&mut self, url: &str) {
        note(&self.0, format!("media.src {url}"));
    }
    fn set_looping(&mut self, _: bool) {}
    fn set_volume(&mut self, _: f32) {}
    fn play(&mut self) -> Result<(), PlaybackError> {
        note(&self.0, "media.play");
        Ok(())
    }
    fn pause(&mut self) {
        note(&self.0, "media.pause");
    }
    fn rewind(&mut self) {}
}

struct Player(Journal);

impl EmbeddedPlayer for Player {
    fn is_ready(&self) -> bool {
        true
    }
    fn load_video_by_id(&self, video_id: &str) -> Result<(), PlayerError> {
        note(&self.0, format!("player.load {video_id}"));
        Ok(())
    }
    fn set_volume(&self, _: u8) -> Result<(), PlayerError> {
        Ok(())
    }
    fn play(&self) -> Result<(), PlayerError> {
        Ok(())
    }
    fn pause(&self) -> Result<(), PlayerError> {
        Ok(())
    }
    fn stop(&self) -> Result<(), PlayerError> {
        note(&self.0, "player.stop");
        Ok(())
    }
}

struct Context;

impl AudioContext for Context {
    fn state(&self) -> ContextState {
        ContextState::Running
    }
    fn resume(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }
}

struct Bell(Journal, String);

impl CueHandle for Bell {
    fn rewind(&mut self) {}
    fn play(&mut self) -> Result<(), PlaybackError> {
        note(&self.0, format!("bell {}", self.1));
        Ok(())
    }
}

struct Bells(Journal);

impl CueLoader for Bells {
    fn load(&mut self, asset: &str) -> Result<Box<dyn CueHandle>, PlaybackError> {
        Ok(Box::new(Bell(self.0.clone(), asset.to_string())))
    }
}

struct Lock(Journal);

impl WakeLock for Lock {
    fn request(&mut self) -> Result<(), WakeLockError> {
        note(&self.0, "wake.request");
        Ok(())
    }
    fn release(&mut self) {
        note(&self.0, "wake.release");
    }
}

#[derive(Clone, Default)]
struct Sink {
    logs: Arc<Mutex<Vec<SessionLog>>>,
    fail: bool,
}

impl SessionLogSink for Sink {
    fn record(&mut self, log: &SessionLog) -> CoreResult<i64> {
        if self.fail {
            return Err(CoreError::Custom("disk full".into()));
        }
        let mut logs = self.logs.lock().unwrap();
        logs.push(log.clone());
        Ok(logs.len() as i64)
    }
}

struct Observer {
    journal: Journal,
    events: Arc<Mutex<Vec<Event>>>,
}

impl SessionObserver for Observer {
    fn on_interval(&mut self, _remaining_secs: u64, _total_secs: u64) {
        note(&self.journal, "interval");
    }
    fn on_complete(&mut self) {
        note(&self.journal, "complete");
    }
    fn on_event(&mut self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Harness {
    journal: Journal,
    events: Arc<Mutex<Vec<Event>>>,
    sink: Sink,
}

impl Harness {
    fn new() -> Self {
        Self {
            journal: Arc::default(),
            events: Arc::default(),
            sink: Sink::default(),
        }
    }

    fn library() -> TrackLibrary {
        let mut rain = AudioTrack::direct("rain", "https://cdn.example.com/rain.mp3");
        rain.id = "rain".into();
        TrackLibrary::new(vec![
            AudioTrack::silence(),
            rain,
            AudioTrack::youtube("vid", "waves"),
        ])
    }

    fn session(&self, config: SessionConfig, bells: BellConfig) -> Result<Session, SessionError> {
        let slot = EmbeddedPlayerSlot::new();
        slot.install(Arc::new(Player(self.journal.clone())));
        let backends = Backends {
            media: Box::new(Media(self.journal.clone())),
            player: slot,
            audio_context: Box::new(|| Box::new(Context) as Box<dyn AudioContext>),
            cue_loader: Box::new(Bells(self.journal.clone())),
            wake_lock: Box::new(Lock(self.journal.clone())),
        };
        let prefs = Preferences {
            bells,
            audio: AudioSettings::default(),
        };
        Session::enter(
            Some(config),
            &prefs,
            Self::library(),
            backends,
            Box::new(self.sink.clone()),
            Box::new(Observer {
                journal: self.journal.clone(),
                events: self.events.clone(),
            }),
        )
    }

    fn logs(&self) -> Vec<SessionLog> {
        self.sink.logs.lock().unwrap().clone()
    }

    fn cue_events(&self, kind: CueKind) -> (usize, usize) {
        let events = self.events.lock().unwrap();
        let fired = events
            .iter()
            .filter(|e| matches!(e, Event::CueFired { cue, .. } if *cue == kind))
            .count();
        let suppressed = events
            .iter()
            .filter(|e| matches!(e, Event::CueSuppressed { cue, .. } if *cue == kind))
            .count();
        (fired, suppressed)
    }
}

fn config(minutes: u32, interval: IntervalPolicy, audio: Option<&str>) -> SessionConfig {
    SessionConfig {
        duration_min: minutes,
        interval,
        audio_id: audio.map(str::to_string),
        note: "breathe".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn full_session_completes_once_with_audio_still_looping() {
    let h = Harness::new();
    let session = h
        .session(config(10, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (_controls, inputs) = SessionControls::channel(false);

    let outcome = session.run(inputs).await.unwrap();

    assert_eq!(count(&h.journal, "interval"), 599);
    assert_eq!(count(&h.journal, "complete"), 1);
    assert_eq!(outcome.log.actual_duration_min, 10);
    assert!(outcome.log.completed);
    assert_eq!(outcome.log.start_note, "breathe");
    assert_eq!(outcome.log.audio.as_ref().map(|a| a.id.as_str()), Some("rain"));
    assert_eq!(h.logs().len(), 1);

    let journal = h.journal.lock().unwrap().clone();
    let complete_at = journal.iter().position(|e| e == "complete").unwrap();
    let play_at = journal.iter().position(|e| e == "media.play").unwrap();
    assert!(!journal[play_at..complete_at].iter().any(|e| e == "media.pause"));
    assert!(journal[complete_at..].iter().any(|e| e == "media.pause"));
    assert_eq!(journal.last().map(String::as_str), Some("wake.release"));

    assert_eq!(h.cue_events(CueKind::Start), (1, 0));
    assert_eq!(h.cue_events(CueKind::End), (1, 0));
    assert_eq!(h.cue_events(CueKind::Interval), (0, 0));
}

#[tokio::test(start_paused = true)]
async fn manual_stop_logs_floored_minutes_and_tears_down() {
    let h = Harness::new();
    let session = h
        .session(config(10, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(150_500)).await;
    controls.commands.send(SessionCommand::Stop).await.unwrap();
    let outcome = run.await.unwrap().unwrap();

    assert!(!outcome.log.completed);
    assert_eq!(outcome.log.actual_duration_min, 2);
    assert_eq!(count(&h.journal, "interval"), 150);
    assert_eq!(count(&h.journal, "complete"), 0);
    assert_eq!(count(&h.journal, "wake.release"), 1);
    assert_eq!(h.cue_events(CueKind::End), (0, 0));

    // Nothing ticks after teardown.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(count(&h.journal, "interval"), 150);
    let events = h.events.lock().unwrap();
    assert!(matches!(
        events.last(),
        Some(Event::SessionStopped { elapsed_secs: 150, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn interval_every_five_minutes_rings_three_times() {
    let h = Harness::new();
    let bells = BellConfig {
        start_sound: SoundKey::Bell1,
        interval_sound: SoundKey::Bell2,
        total_silence: false,
    };
    let session = h
        .session(config(20, IntervalPolicy::EveryMinutes(5), None), bells)
        .unwrap();
    let (_controls, inputs) = SessionControls::channel(false);
    session.run(inputs).await.unwrap();

    assert_eq!(h.cue_events(CueKind::Interval), (3, 0));
    assert_eq!(count(&h.journal, "bell bell-1"), 1);
    assert_eq!(count(&h.journal, "bell bell-2"), 3);
    assert_eq!(count(&h.journal, "bell bell-end"), 1);
}

#[tokio::test(start_paused = true)]
async fn total_silence_decides_but_never_plays() {
    let h = Harness::new();
    let bells = BellConfig {
        start_sound: SoundKey::Bell1,
        interval_sound: SoundKey::Bell2,
        total_silence: true,
    };
    let session = h
        .session(config(5, IntervalPolicy::EveryMinutes(1), Some("rain")), bells)
        .unwrap();
    let (_controls, inputs) = SessionControls::channel(true);
    session.run(inputs).await.unwrap();

    assert_eq!(h.cue_events(CueKind::Interval), (0, 4));
    assert_eq!(count(&h.journal, "bell "), 0);
    assert_eq!(count(&h.journal, "media.play"), 0);
}

#[tokio::test(start_paused = true)]
async fn swipe_switches_track_through_selection_signal() {
    let h = Harness::new();
    let session = h
        .session(config(5, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    controls
        .commands
        .send(SessionCommand::Swipe { dx: -20.0 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(controls.selected.borrow().as_deref(), Some("rain"));

    controls
        .commands
        .send(SessionCommand::Swipe { dx: -80.0 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(controls.selected.borrow().as_deref(), Some("vid"));
    assert_eq!(count(&h.journal, "player.load vid"), 1);

    // Wraps around past the end onto the silence entry, which stops audio.
    controls
        .commands
        .send(SessionCommand::Swipe { dx: -80.0 })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(controls.selected.borrow().as_deref(), Some("none"));

    controls.commands.send(SessionCommand::Stop).await.unwrap();
    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.log.actual_duration_min, 0);

    let events = h.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::PlaybackStopped { .. })));
}

#[tokio::test(start_paused = true)]
async fn silence_toggle_mid_session_stops_and_restarts_audio() {
    let h = Harness::new();
    let session = h
        .session(config(5, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    controls.total_silence.send_replace(true);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&h.journal, "media.play"), 1);

    controls.total_silence.send_replace(false);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&h.journal, "media.play"), 2);

    controls.commands.send(SessionCommand::Stop).await.unwrap();
    run.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn pause_holds_the_countdown() {
    let h = Harness::new();
    let session = h
        .session(config(1, IntervalPolicy::Half, None), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);
    let started = tokio::time::Instant::now();
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    controls.commands.send(SessionCommand::TogglePause).await.unwrap();
    tokio::time::sleep(Duration::from_secs(100)).await;
    assert_eq!(count(&h.journal, "interval"), 10);

    controls.commands.send(SessionCommand::TogglePause).await.unwrap();
    let outcome = run.await.unwrap().unwrap();

    assert!(outcome.log.completed);
    assert_eq!(count(&h.journal, "interval"), 59);
    assert_eq!(h.cue_events(CueKind::Interval), (1, 0));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(160) && elapsed <= Duration::from_secs(161));
}

#[tokio::test(start_paused = true)]
async fn configured_track_plays_without_host_selection() {
    let h = Harness::new();
    let session = h
        .session(config(1, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);

    let outcome = session.run(inputs).await.unwrap();

    assert_eq!(count(&h.journal, "media.play"), 1);
    assert_eq!(outcome.log.audio.as_ref().map(|a| a.id.as_str()), Some("rain"));
    assert_eq!(controls.selected.borrow().as_deref(), Some("rain"));
}

#[tokio::test(start_paused = true)]
async fn youtube_track_chosen_while_paused_waits_for_resume() {
    let h = Harness::new();
    let session = h
        .session(config(5, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(2_500)).await;
    controls.commands.send(SessionCommand::Pause).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(count(&h.journal, "media.pause"), 2);

    controls.selected.send_replace(Some("vid".into()));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(count(&h.journal, "player.load"), 0);
    assert_eq!(count(&h.journal, "interval"), 2);

    controls.commands.send(SessionCommand::Resume).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count(&h.journal, "player.load vid"), 1);

    controls.commands.send(SessionCommand::Stop).await.unwrap();
    let outcome = run.await.unwrap().unwrap();
    assert_eq!(outcome.log.audio.as_ref().map(|a| a.id.as_str()), Some("vid"));
}

#[tokio::test(start_paused = true)]
async fn wake_lock_reacquired_when_visible_again() {
    let h = Harness::new();
    let session = h
        .session(config(5, IntervalPolicy::None, None), BellConfig::default())
        .unwrap();
    let (controls, inputs) = SessionControls::channel(false);
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    controls.visibility.send_replace(Visibility::Hidden);
    tokio::time::sleep(Duration::from_secs(1)).await;
    controls.visibility.send_replace(Visibility::Visible);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(count(&h.journal, "wake.request"), 2);

    controls.commands.send(SessionCommand::Stop).await.unwrap();
    run.await.unwrap().unwrap();
    let events = h.events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, Event::WakeLockLost { .. })));
}

#[tokio::test(start_paused = true)]
async fn sink_failure_still_releases_resources() {
    let mut h = Harness::new();
    h.sink.fail = true;
    let session = h
        .session(config(1, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (_controls, inputs) = SessionControls::channel(false);

    assert!(session.run(inputs).await.is_err());
    assert_eq!(count(&h.journal, "wake.release"), 1);
    let journal = h.journal.lock().unwrap();
    let tail: Vec<&str> = journal.iter().rev().take(3).map(String::as_str).collect();
    assert_eq!(tail, ["wake.release", "player.stop", "media.pause"]);
}

#[tokio::test(start_paused = true)]
async fn dropping_a_running_session_tears_down() {
    let h = Harness::new();
    let session = h
        .session(config(5, IntervalPolicy::None, Some("rain")), BellConfig::default())
        .unwrap();
    let (_controls, inputs) = SessionControls::channel(false);
    let run = tokio::spawn(session.run(inputs));

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    run.abort();
    let _ = run.await;

    assert_eq!(count(&h.journal, "wake.release"), 1);
    assert!(h.logs().is_empty());
}

#[test]
fn entry_without_config_is_rejected() {
    let h = Harness::new();
    let slot = EmbeddedPlayerSlot::new();
    let backends = Backends {
        media: Box::new(Media(h.journal.clone())),
        player: slot,
        audio_context: Box::new(|| Box::new(Context) as Box<dyn AudioContext>),
        cue_loader: Box::new(Bells(h.journal.clone())),
        wake_lock: Box::new(Lock(h.journal.clone())),
    };
    let prefs = Preferences {
        bells: BellConfig::default(),
        audio: AudioSettings::default(),
    };
    let result = Session::enter(
        None,
        &prefs,
        TrackLibrary::default(),
        backends,
        Box::new(Sink::default()),
        Box::new(meditimer_core::session::NoopObserver),
    );
    assert_eq!(result.err(), Some(SessionError::MissingConfig));
    assert!(h.journal.lock().unwrap().is_empty());
}

#[test]
fn zero_minute_session_is_rejected() {
    let h = Harness::new();
    let result = h.session(config(0, IntervalPolicy::None, None), BellConfig::default());
    assert_eq!(result.err(), Some(SessionError::InvalidDuration(0)));
}

#[test]
fn entered_session_is_idle_until_run() {
    let h = Harness::new();
    let session = h
        .session(config(15, IntervalPolicy::Half, Some("rain")), BellConfig::default())
        .unwrap();
    assert_eq!(session.config().duration_min, 15);
    assert_eq!(session.engine().state(), meditimer_core::TimerState::Idle);
    assert_eq!(session.engine().remaining_secs(), 900);
    assert!(!session.audio().is_playing());
    drop(session);
    // Nothing was acquired, so nothing is released.
    assert_eq!(count(&h.journal, "wake.release"), 0);
}
