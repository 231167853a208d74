//! Recorder controller: call-site policy around a recording session

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::audio::{FinishedRecording, CHAT_PREFIX, RECORDING_PREFIX};
use crate::domain::config::AppConfig;
use crate::domain::recording::{Duration, DurationDisplay, RecordingState};

use super::error::RecorderError;
use super::ports::{AudioDecoder, CaptureFacility, PlaybackHandle, PlaybackStore};
use super::session::{
    RecordingSession, SessionConfig, SessionError, SessionEvent, SessionHandle,
};

/// The features that embed a recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    Enrollment,
    Verification,
    VoiceChat,
}

impl CallSite {
    /// Recorder policy for this call site, with ceilings taken from config
    pub fn policy(&self, config: &AppConfig) -> RecorderPolicy {
        match self {
            Self::Enrollment => RecorderPolicy {
                max_duration: None,
                min_duration: Some(config.enroll_min_duration_or_default()),
                file_prefix: RECORDING_PREFIX,
                acquire_timeout: config.acquire_timeout_or_default(),
            },
            Self::Verification => RecorderPolicy {
                max_duration: Some(config.verify_max_duration_or_default()),
                min_duration: None,
                file_prefix: RECORDING_PREFIX,
                acquire_timeout: config.acquire_timeout_or_default(),
            },
            Self::VoiceChat => RecorderPolicy {
                max_duration: Some(config.chat_max_duration_or_default()),
                min_duration: None,
                file_prefix: CHAT_PREFIX,
                acquire_timeout: config.acquire_timeout_or_default(),
            },
        }
    }
}

/// Duration limits and naming for one controller
#[derive(Debug, Clone)]
pub struct RecorderPolicy {
    /// Auto-stop ceiling
    pub max_duration: Option<Duration>,
    /// Shortest acceptable recording. Checked by the consuming feature
    /// against [`crate::domain::audio::RecordingMetadata::duration_secs`].
    pub min_duration: Option<Duration>,
    pub file_prefix: &'static str,
    pub acquire_timeout: Duration,
}

impl RecorderPolicy {
    /// Whether a finished recording is long enough for the consuming feature
    pub fn meets_minimum(&self, finished: &FinishedRecording) -> bool {
        match self.min_duration {
            Some(min) => finished.metadata.duration_secs >= min.as_secs(),
            None => true,
        }
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.file_prefix)
            .with_max_duration(self.max_duration)
            .with_acquire_timeout(self.acquire_timeout)
    }
}

/// Callbacks into the embedding feature
#[derive(Default)]
#[allow(clippy::type_complexity)]
pub struct RecorderCallbacks {
    /// Called with the finished recording, or `None` on cancel, clear and failure
    pub on_recording_complete: Option<Box<dyn Fn(Option<&FinishedRecording>) + Send + Sync>>,
    /// Called with elapsed seconds on start and every tick
    pub on_duration_change: Option<Box<dyn Fn(u64) + Send + Sync>>,
    /// Called when the device is live
    pub on_start_recording: Option<Box<dyn Fn() + Send + Sync>>,
    /// Called on every exit from recording
    pub on_stop_recording: Option<Box<dyn Fn() + Send + Sync>>,
    /// Called with the user-facing message of a failure
    pub on_error: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl RecorderCallbacks {
    fn complete(&self, finished: Option<&FinishedRecording>) {
        if let Some(cb) = &self.on_recording_complete {
            cb(finished);
        }
    }

    fn duration(&self, secs: u64) {
        if let Some(cb) = &self.on_duration_change {
            cb(secs);
        }
    }

    fn started(&self) {
        if let Some(cb) = &self.on_start_recording {
            cb();
        }
    }

    fn stopped(&self) {
        if let Some(cb) = &self.on_stop_recording {
            cb();
        }
    }

    fn error(&self, message: &str) {
        if let Some(cb) = &self.on_error {
            cb(message);
        }
    }
}

/// The latest result and its playback handle
#[derive(Default)]
struct PlaybackSlot {
    handle: Option<PlaybackHandle>,
    latest: Option<FinishedRecording>,
}

/// State shared between the controller and its event pump
struct Shared {
    playback: Arc<dyn PlaybackStore>,
    slot: Mutex<PlaybackSlot>,
    callbacks: RecorderCallbacks,
    elapsed_secs: AtomicU64,
    disabled: AtomicBool,
    unsupported: AtomicBool,
}

impl Shared {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, PlaybackSlot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Release the current playback handle, if any
    fn release_playback(&self) {
        let handle = {
            let mut slot = self.lock_slot();
            slot.latest = None;
            slot.handle.take()
        };
        if let Some(handle) = handle {
            debug!(id = handle.id(), "Releasing playback handle");
            self.playback.release(handle);
        }
    }

    fn set_elapsed(&self, secs: u64) {
        self.elapsed_secs.store(secs, Ordering::SeqCst);
        self.callbacks.duration(secs);
    }

    fn on_finished(&self, finished: FinishedRecording) {
        self.release_playback();
        let handle = match self.playback.create(&finished.file) {
            Ok(handle) => {
                debug!(id = handle.id(), url = %handle.url(), "Created playback handle");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Recording finished without a playback handle");
                None
            }
        };

        self.callbacks.complete(Some(&finished));
        let mut slot = self.lock_slot();
        slot.handle = handle;
        slot.latest = Some(finished);
    }

    fn on_failed(&self, err: RecorderError) {
        if err == RecorderError::UnsupportedPlatform
            && self.unsupported.swap(true, Ordering::SeqCst)
        {
            debug!("Unsupported platform already reported");
            self.callbacks.complete(None);
            return;
        }
        self.callbacks.error(err.user_message());
        self.callbacks.complete(None);
    }

    fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Acquiring => debug!("Waiting for microphone"),
            SessionEvent::Started => {
                self.release_playback();
                self.set_elapsed(0);
                self.callbacks.started();
            }
            SessionEvent::Tick { elapsed_secs } => self.set_elapsed(elapsed_secs),
            SessionEvent::Stopping { reason, .. } => {
                debug!(?reason, "Recording stopped");
                self.callbacks.stopped();
            }
            SessionEvent::Finished(finished) => self.on_finished(finished),
            SessionEvent::Cancelled => {
                self.set_elapsed(0);
                self.callbacks.complete(None);
            }
            SessionEvent::Failed(err) => {
                self.set_elapsed(0);
                self.on_failed(err);
            }
        }
    }
}

/// Presentation-facing recorder.
///
/// Owns one session and the playback handle of its latest result. Every
/// operation is a no-op where the session would reject it.
pub struct RecorderController {
    session: SessionHandle,
    shared: Arc<Shared>,
    pump: JoinHandle<()>,
    policy: RecorderPolicy,
}

impl RecorderController {
    pub fn new(
        facility: Arc<dyn CaptureFacility>,
        decoder: Arc<dyn AudioDecoder>,
        playback: Arc<dyn PlaybackStore>,
        policy: RecorderPolicy,
        callbacks: RecorderCallbacks,
    ) -> Self {
        let (session, events) = RecordingSession::spawn(facility, decoder, policy.session_config());
        let shared = Arc::new(Shared {
            playback,
            slot: Mutex::new(PlaybackSlot::default()),
            callbacks,
            elapsed_secs: AtomicU64::new(0),
            disabled: AtomicBool::new(false),
            unsupported: AtomicBool::new(false),
        });
        let pump = tokio::spawn(pump_events(events, Arc::clone(&shared)));

        Self {
            session,
            shared,
            pump,
            policy,
        }
    }

    pub fn policy(&self) -> &RecorderPolicy {
        &self.policy
    }

    pub fn state(&self) -> RecordingState {
        self.session.status().state
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.shared.disabled.store(disabled, Ordering::SeqCst);
    }

    pub fn is_disabled(&self) -> bool {
        self.shared.disabled.load(Ordering::SeqCst)
    }

    /// Start recording. No-op if disabled, unsupported or already active.
    pub async fn start(&self) {
        if self.is_disabled() {
            debug!("Recorder disabled, ignoring start");
            return;
        }
        if self.shared.unsupported.load(Ordering::SeqCst) {
            debug!("Recording unsupported on this platform, ignoring start");
            return;
        }
        log_rejection("start", self.session.start().await);
    }

    /// Stop and encode. No-op unless recording.
    pub async fn stop(&self) {
        log_rejection("stop", self.session.stop().await);
    }

    /// Discard the current attempt. No-op when idle.
    pub async fn cancel(&self) {
        log_rejection("cancel", self.session.cancel().await);
    }

    /// Push-to-talk release: stop when recording, drop the attempt when acquiring
    pub async fn release(&self) {
        log_rejection("release", self.session.release().await);
    }

    /// Push-to-talk gesture lost: cancel, never encode
    pub async fn leave(&self) {
        log_rejection("leave", self.session.leave().await);
    }

    /// Drop the previewable result and report an empty recording
    pub fn clear(&self) {
        if self.state() != RecordingState::Idle {
            debug!("Recorder busy, ignoring clear");
            return;
        }
        self.shared.release_playback();
        self.shared.set_elapsed(0);
        self.shared.callbacks.complete(None);
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.shared.elapsed_secs.load(Ordering::SeqCst)
    }

    /// Elapsed or remaining time, depending on the configured ceiling
    pub fn duration_display(&self) -> DurationDisplay {
        DurationDisplay::for_counter(self.elapsed_secs(), self.policy.max_duration)
    }

    /// The latest finished recording, if it has not been cleared
    pub fn latest(&self) -> Option<FinishedRecording> {
        self.shared.lock_slot().latest.clone()
    }

    pub fn playback_url(&self) -> Option<String> {
        self.shared.lock_slot().handle.as_ref().map(PlaybackHandle::url)
    }

    pub fn playback_location(&self) -> Option<PathBuf> {
        self.shared
            .lock_slot()
            .handle
            .as_ref()
            .map(|h| h.location().to_path_buf())
    }

    /// Tear down: cancel anything in flight, drain events, release playback
    pub async fn shutdown(self) {
        self.session.shutdown().await;
        drop(self.session);
        if let Err(e) = self.pump.await {
            warn!(error = %e, "Recorder event pump failed");
        }
        self.shared.release_playback();
    }
}

async fn pump_events(mut events: mpsc::UnboundedReceiver<SessionEvent>, shared: Arc<Shared>) {
    while let Some(event) = events.recv().await {
        shared.handle_event(event);
    }
    shared.release_playback();
    debug!("Recorder event pump finished");
}

fn log_rejection(action: &str, result: Result<(), SessionError>) {
    if let Err(e) = result {
        debug!(action, error = %e, "Request ignored");
    }
}
