//! App runners for the recording and conversion commands

use std::env;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::ports::{ConfigStore, PlaybackStore, PreviewPlayer};
use crate::application::{
    convert_upload, CallSite, PushToTalkButton, RecorderCallbacks, RecorderController,
    RecorderPolicy, UploadedFile,
};
use crate::domain::audio::{AudioFile, AudioMimeType, FinishedRecording, RecordingMetadata};
use crate::domain::config::AppConfig;
use crate::domain::recording::{format_clock, DurationDisplay};
use crate::infrastructure::{
    CpalCaptureFacility, RodioPreviewPlayer, SymphoniaDecoder, TempFilePlaybackStore,
    XdgConfigStore,
};

use super::args::{ConvertArgs, OutputOptions};
use super::presenter::Presenter;
use super::signals::InterruptSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;
pub const EXIT_CANCELLED: u8 = 130;

/// Environment override for `output_dir`
pub const OUTPUT_DIR_ENV: &str = "VOICE_CAPTURE_OUTPUT_DIR";

/// Controller callbacks forwarded to the terminal loop
#[derive(Debug)]
enum UiEvent {
    Started,
    Duration(u64),
    Stopped,
    Complete(Option<FinishedRecording>),
    Error(String),
}

fn ui_callbacks(tx: mpsc::UnboundedSender<UiEvent>) -> RecorderCallbacks {
    let (started, duration, stopped, complete, error) =
        (tx.clone(), tx.clone(), tx.clone(), tx.clone(), tx);
    RecorderCallbacks {
        on_recording_complete: Some(Box::new(move |f: Option<&FinishedRecording>| {
            let _ = complete.send(UiEvent::Complete(f.cloned()));
        })),
        on_duration_change: Some(Box::new(move |secs: u64| {
            let _ = duration.send(UiEvent::Duration(secs));
        })),
        on_start_recording: Some(Box::new(move || {
            let _ = started.send(UiEvent::Started);
        })),
        on_stop_recording: Some(Box::new(move || {
            let _ = stopped.send(UiEvent::Stopped);
        })),
        on_error: Some(Box::new(move |message: &str| {
            let _ = error.send(UiEvent::Error(message.to_string()));
        })),
    }
}

/// A line typed while recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Stop,
    Cancel,
}

fn parse_input(line: &str) -> Option<Input> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "s" | "stop" => Some(Input::Stop),
        "c" | "cancel" => Some(Input::Cancel),
        _ => None,
    }
}

/// Read stdin on a plain thread so a pending read never holds up exit
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!(error = %e, "Keyboard control unavailable");
    }
    rx
}

/// The two recorder variants behind one set of gestures
enum Recorder {
    Form(RecorderController),
    PushToTalk(PushToTalkButton),
}

impl Recorder {
    fn controller(&self) -> &RecorderController {
        match self {
            Self::Form(controller) => controller,
            Self::PushToTalk(button) => button.controller(),
        }
    }

    async fn begin(&self) {
        match self {
            Self::Form(controller) => controller.start().await,
            Self::PushToTalk(button) => button.pointer_down().await,
        }
    }

    async fn finish(&self) {
        match self {
            Self::Form(controller) => controller.stop().await,
            Self::PushToTalk(button) => button.pointer_up().await,
        }
    }

    async fn discard(&self) {
        match self {
            Self::Form(controller) => controller.cancel().await,
            Self::PushToTalk(button) => button.pointer_leave().await,
        }
    }

    async fn shutdown(self) {
        match self {
            Self::Form(controller) => controller.shutdown().await,
            Self::PushToTalk(button) => button.shutdown().await,
        }
    }
}

/// What `--json` prints for a finished file
#[derive(Debug, Serialize)]
struct OutputRecord<'a> {
    path: String,
    name: &'a str,
    #[serde(flatten)]
    metadata: RecordingMetadata,
}

/// Record one sample for `call_site` and write it to the output directory
pub async fn run_recorder(call_site: CallSite, config: AppConfig, output: OutputOptions) -> ExitCode {
    let mut presenter = Presenter::new();
    let policy = call_site.policy(&config);

    let mut interrupts = match InterruptSignal::new() {
        Ok(signal) => signal,
        Err(e) => {
            presenter.error(&format!("Failed to setup signal handler: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (tx, mut events) = mpsc::unbounded_channel();
    let controller = RecorderController::new(
        Arc::new(CpalCaptureFacility::new()),
        Arc::new(SymphoniaDecoder::new(config.decode_contexts_or_default())),
        Arc::new(TempFilePlaybackStore::new()),
        policy.clone(),
        ui_callbacks(tx),
    );
    let recorder = match call_site {
        CallSite::VoiceChat => Recorder::PushToTalk(PushToTalkButton::new(controller)),
        CallSite::Enrollment | CallSite::Verification => Recorder::Form(controller),
    };

    let total_secs = policy.max_duration.map(|d| d.as_secs());
    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut error = None;

    presenter.info(match call_site {
        CallSite::VoiceChat => "Press Enter to send, 'c' then Enter to discard",
        _ => "Press Enter to stop, 'c' then Enter to cancel",
    });
    presenter.start_spinner("Waiting for microphone...");
    recorder.begin().await;

    let outcome = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(UiEvent::Started) => {
                    presenter.update_recording_progress(
                        DurationDisplay::for_counter(0, policy.max_duration),
                        total_secs,
                    );
                }
                Some(UiEvent::Duration(secs)) => {
                    presenter.update_recording_progress(
                        DurationDisplay::for_counter(secs, policy.max_duration),
                        total_secs,
                    );
                }
                Some(UiEvent::Stopped) => presenter.update_spinner("Encoding..."),
                Some(UiEvent::Error(message)) => error = Some(message),
                Some(UiEvent::Complete(result)) => break result,
                None => break None,
            },
            line = lines.recv(), if stdin_open => match line.as_deref().map(parse_input) {
                Some(Some(Input::Stop)) => recorder.finish().await,
                Some(Some(Input::Cancel)) => recorder.discard().await,
                Some(None) => debug!("Ignoring unrecognised input"),
                None => stdin_open = false,
            },
            Some(()) = interrupts.recv() => recorder.discard().await,
        }
    };

    presenter.stop_spinner();
    let code = match outcome {
        Some(finished) => {
            presenter.success(&format!(
                "Recorded {} ({})",
                format_clock(finished.metadata.duration_secs),
                finished.file.human_readable_size()
            ));
            deliver(&recorder, &policy, finished, &output, &presenter).await
        }
        None => match error {
            Some(message) => {
                presenter.error(&message);
                EXIT_ERROR
            }
            None => {
                presenter.warn("Recording cancelled");
                EXIT_CANCELLED
            }
        },
    };

    recorder.shutdown().await;
    ExitCode::from(code)
}

async fn deliver(
    recorder: &Recorder,
    policy: &RecorderPolicy,
    finished: FinishedRecording,
    output: &OutputOptions,
    presenter: &Presenter,
) -> u8 {
    if let Some(min) = policy.min_duration {
        if !policy.meets_minimum(&finished) {
            recorder.controller().clear();
            presenter.error(&format!(
                "Voice sample must be at least {} seconds long.",
                min.as_secs()
            ));
            return EXIT_ERROR;
        }
    }

    if output.preview {
        if let Some(location) = recorder.controller().playback_location() {
            preview(&location, presenter).await;
        }
    }

    save_and_report(&finished, output, presenter).await
}

/// Convert an audio file to canonical WAV
pub async fn run_convert(args: ConvertArgs, config: AppConfig, output: OutputOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let bytes = match tokio::fs::read(&args.file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            presenter.error(&format!("Failed to read {}: {}", args.file.display(), e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let upload = UploadedFile {
        name: args
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string()),
        bytes,
        content_type: args
            .content_type
            .or_else(|| guess_content_type(&args.file))
            .unwrap_or_else(|| "application/octet-stream".to_string()),
    };

    presenter.start_spinner("Converting...");
    let decoder = SymphoniaDecoder::new(config.decode_contexts_or_default());
    let finished =
        match convert_upload(&decoder, upload, config.max_upload_bytes_or_default()).await {
            Ok(finished) => finished,
            Err(e) => {
                debug!(error = %e, "Conversion failed");
                presenter.stop_spinner();
                presenter.error(e.user_message());
                return ExitCode::from(EXIT_ERROR);
            }
        };
    presenter.stop_spinner();
    presenter.success(&format!(
        "Converted {} ({})",
        finished.file.name(),
        finished.file.human_readable_size()
    ));

    if output.preview {
        let store = TempFilePlaybackStore::new();
        match store.create(&finished.file) {
            Ok(handle) => {
                preview(handle.location(), &presenter).await;
                store.release(handle);
            }
            Err(e) => presenter.warn(&format!("Preview unavailable: {}", e)),
        }
    }

    ExitCode::from(save_and_report(&finished, &output, &presenter).await)
}

async fn preview(location: &Path, presenter: &Presenter) {
    presenter.info("Playing back...");
    if let Err(e) = RodioPreviewPlayer::new().play(location).await {
        presenter.warn(&format!("Preview failed: {}", e));
    }
}

async fn save_and_report(
    finished: &FinishedRecording,
    output: &OutputOptions,
    presenter: &Presenter,
) -> u8 {
    let path = match write_recording(&output.output_dir, &finished.file).await {
        Ok(path) => path,
        Err(e) => {
            presenter.error(&format!(
                "Failed to write to {}: {}",
                output.output_dir.display(),
                e
            ));
            return EXIT_ERROR;
        }
    };

    if output.json {
        match render_json(&path, finished) {
            Ok(json) => presenter.output(&json),
            Err(e) => {
                presenter.error(&format!("Failed to serialize metadata: {}", e));
                return EXIT_ERROR;
            }
        }
    } else {
        presenter.output(&path.to_string_lossy());
    }
    EXIT_SUCCESS
}

/// Write `file` under `dir`, creating the directory if needed
async fn write_recording(dir: &Path, file: &AudioFile) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(file.name());
    tokio::fs::write(&path, file.data()).await?;
    debug!(path = %path.display(), size = file.size_bytes(), "Wrote recording");
    Ok(path)
}

fn render_json(path: &Path, finished: &FinishedRecording) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutputRecord {
        path: path.to_string_lossy().into_owned(),
        name: finished.file.name(),
        metadata: finished.metadata,
    })
}

fn guess_content_type(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(AudioMimeType::from_extension)
        .map(|mime| mime.as_str().to_string())
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = match store.load().await {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable config file");
            AppConfig::empty()
        }
    };

    let env_config = AppConfig {
        output_dir: env::var(OUTPUT_DIR_ENV).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::{encode_wav, DecodedAudio};

    fn finished() -> FinishedRecording {
        let decoded = DecodedAudio::new(8000, vec![vec![0.0; 8000]]).unwrap();
        let bytes = encode_wav(&decoded);
        FinishedRecording {
            metadata: RecordingMetadata {
                duration_secs: 1,
                frames: 8000,
                sample_rate: 8000,
                channels: 1,
                size_bytes: bytes.len(),
            },
            file: AudioFile::timestamped_wav("voice-recording", bytes),
        }
    }

    #[test]
    fn input_lines() {
        assert_eq!(parse_input(""), Some(Input::Stop));
        assert_eq!(parse_input("  \n"), Some(Input::Stop));
        assert_eq!(parse_input("C"), Some(Input::Cancel));
        assert_eq!(parse_input("cancel"), Some(Input::Cancel));
        assert_eq!(parse_input("what"), None);
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(
            guess_content_type(Path::new("a/take.MP3")).as_deref(),
            Some("audio/mpeg")
        );
        assert_eq!(
            guess_content_type(Path::new("take.wav")).as_deref(),
            Some("audio/wav")
        );
        assert!(guess_content_type(Path::new("notes.txt")).is_none());
        assert!(guess_content_type(Path::new("noext")).is_none());
    }

    #[test]
    fn json_flattens_metadata() {
        let finished = finished();
        let json = render_json(Path::new("/out/take.wav"), &finished).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["path"], "/out/take.wav");
        assert_eq!(value["name"], finished.file.name());
        assert_eq!(value["duration_secs"], 1);
        assert_eq!(value["sample_rate"], 8000);
        assert_eq!(value["size_bytes"], 44 + 16000);
    }

    #[tokio::test]
    async fn writes_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out");
        let finished = finished();

        let path = write_recording(&target, &finished.file).await.unwrap();
        assert_eq!(path, target.join(finished.file.name()));
        assert_eq!(std::fs::read(&path).unwrap(), finished.file.data());
    }

    #[tokio::test]
    async fn callbacks_forward_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let callbacks = ui_callbacks(tx);

        (callbacks.on_start_recording.as_ref().unwrap())();
        (callbacks.on_duration_change.as_ref().unwrap())(3);
        (callbacks.on_error.as_ref().unwrap())("boom");
        (callbacks.on_recording_complete.as_ref().unwrap())(None);

        assert!(matches!(rx.recv().await, Some(UiEvent::Started)));
        assert!(matches!(rx.recv().await, Some(UiEvent::Duration(3))));
        assert!(matches!(rx.recv().await, Some(UiEvent::Error(m)) if m == "boom"));
        assert!(matches!(rx.recv().await, Some(UiEvent::Complete(None))));
    }
}
