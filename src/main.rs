//! Application entry point — Thai pronunciation practice (terminal shell).
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`PracticeConfig`] from disk (returns default on first run).
//! 3. Load the lesson library, progress snapshot and favorites list.
//! 4. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Build the recorder (cpal → WAV) and the recognizer.
//! 6. Spawn the practice engine on the tokio runtime.
//! 7. Run the stdin command loop — blocks the main thread until `quit`.

use std::io::{BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use thai_practice::{
    config::{AppPaths, PracticeConfig},
    content::LessonLibrary,
    progress::ProgressSnapshot,
    queue::QueueMode,
    recognize::{SpeechRecognizer, UnavailableRecognizer},
    recorder::{Recorder, WavRecorder},
    session::{PracticeEngine, SessionCommand, SessionPhase, SharedView},
    store::AttemptStore,
};

// ---------------------------------------------------------------------------
// Favorites file
// ---------------------------------------------------------------------------

/// Load the favorites reference list (a JSON array of strings) written by the
/// host app. Missing or unreadable files load as an empty list.
fn load_favorites(path: &std::path::Path) -> Vec<String> {
    if !path.exists() {
        return Vec::new();
    }
    std::fs::read_to_string(path)
        .map_err(|e| log::warn!("failed to read favorites: {e}"))
        .ok()
        .and_then(|data| {
            serde_json::from_str(&data)
                .map_err(|e| log::warn!("failed to parse favorites: {e}"))
                .ok()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// View rendering
// ---------------------------------------------------------------------------

/// Render a one-screen status snapshot of the session.
fn render(view: &SharedView) {
    let v = view.lock().unwrap().clone();

    println!("----------------------------------------");
    println!("mode: {}   phase: {}", v.mode.label(), v.phase.label());

    match &v.current {
        Some(item) => {
            println!(
                "item {}/{}: {}  [{}]  ({})",
                v.position + 1,
                v.queue_len,
                item.phrase,
                item.transliteration,
                item.gloss
            );
        }
        None => println!("item: (queue empty)"),
    }

    if let Some(heard) = &v.heard_text {
        println!("heard: {heard}");
    }
    if let Some(score) = v.score {
        let verdict = match v.last_match {
            Some(true) => "match",
            Some(false) => "no match",
            None => "-",
        };
        println!("score: {score}/100 ({verdict}), attempts: {}", v.attempt_count);
    }
    if let Some(hint) = &v.hint {
        println!("hint: {hint}");
    }
    if let Some(audio) = &v.last_audio {
        println!("audio: {}", audio.display());
    }
    if v.phase == SessionPhase::Recording {
        let bars = (v.input_level * 20.0) as usize;
        println!("level: [{:<20}]", "#".repeat(bars.min(20)));
        if !v.partial_transcript.is_empty() {
            println!("partial: {}", v.partial_transcript);
        }
    }
    println!("----------------------------------------");
}

fn parse_mode(arg: &str) -> Option<QueueMode> {
    match arg {
        "learned" => Some(QueueMode::Learned),
        "lesson" => Some(QueueMode::CurrentLesson),
        "favorites" => Some(QueueMode::Favorites),
        "random" => Some(QueueMode::Random),
        _ => None,
    }
}

fn print_help() {
    println!("commands:");
    println!("  record            start recording an attempt");
    println!("  stop              stop recording and analyze");
    println!("  next / prev       move through the queue (wraps)");
    println!("  sel <n>           jump to queue position n (1-based)");
    println!("  repeat            clear the shown result and try again");
    println!("  mode <m>          learned | lesson | favorites | random");
    println!("  show              print the current session state");
    println!("  quit              exit");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Thai pronunciation practice starting up");

    // 2. Configuration
    let config = PracticeConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        PracticeConfig::default()
    });

    // 3. Learner data
    let paths = AppPaths::new();
    let library = Arc::new(LessonLibrary::load_or_default(&paths.lessons_file));
    if library.is_empty() {
        log::warn!(
            "lesson library is empty — put content at {}",
            paths.lessons_file.display()
        );
    }
    let snapshot = ProgressSnapshot::load_from(&paths.progress_file);
    let favorites = load_favorites(&paths.favorites_file);
    let store = AttemptStore::open(paths.attempts_file.clone());

    // 4. Tokio runtime (2 worker threads — engine loop + recognition)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    // 5. Recorder + recognizer. No on-device recognition backend is wired up
    //    yet, so scoring degrades to the "unavailable" hint while recording
    //    and replay keep working.
    let mut recorder = WavRecorder::new(paths.capture_file.clone());
    if !rt.block_on(recorder.request_permission()) {
        log::warn!("microphone access unavailable — recording will fail until granted");
    }
    let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(UnavailableRecognizer);

    // 6. Practice engine
    let engine = PracticeEngine::new(
        Box::new(recorder),
        recognizer,
        store,
        library,
        snapshot,
        favorites,
        config,
    );
    let view = engine.shared_view();
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
    let engine_task = rt.spawn(engine.run(command_rx));

    // Give the engine a beat to build the initial queue before first render.
    std::thread::sleep(Duration::from_millis(100));
    print_help();
    render(&view);

    // 7. stdin command loop
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }

        let mut parts = line.split_whitespace();
        let command = match (parts.next(), parts.next()) {
            (Some("record"), _) => Some(SessionCommand::StartAttempt),
            (Some("stop"), _) => Some(SessionCommand::StopAndAnalyze),
            (Some("next"), _) => Some(SessionCommand::Next),
            (Some("prev"), _) => Some(SessionCommand::Prev),
            (Some("repeat"), _) => Some(SessionCommand::Repeat),
            (Some("sel"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => Some(SessionCommand::Select(n - 1)),
                _ => {
                    println!("usage: sel <n>  (1-based queue position)");
                    None
                }
            },
            (Some("mode"), Some(m)) => match parse_mode(m) {
                Some(mode) => Some(SessionCommand::SetMode(mode)),
                None => {
                    println!("unknown mode; one of: learned lesson favorites random");
                    None
                }
            },
            (Some("show"), _) => {
                render(&view);
                None
            }
            (Some("help"), _) => {
                print_help();
                None
            }
            (Some("quit") | Some("exit"), _) => break,
            (Some(other), _) => {
                println!("unknown command: {other} (try `help`)");
                None
            }
            (None, _) => None,
        };

        if let Some(command) = command {
            if command_tx.blocking_send(command).is_err() {
                log::error!("engine stopped unexpectedly");
                break;
            }
            // Let the transition land before rendering.
            std::thread::sleep(Duration::from_millis(150));
            render(&view);
        }
    }

    // Closing the channel stops the engine; it drains in-flight analysis
    // before returning so results are persisted.
    drop(command_tx);
    rt.block_on(engine_task)?;
    log::info!("goodbye");
    Ok(())
}
