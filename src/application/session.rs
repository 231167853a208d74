//! Recording session actor
//!
//! One task owns the state machine, the live device, the tick timer and the
//! chunk buffer. Hosts talk to it through a [`SessionHandle`] and observe it
//! through a stream of [`SessionEvent`]s plus a status watch.
//!
//! The device and the timer live together in a [`LiveCapture`] that exists only
//! while the state is `Recording`; dropping it is the single release path.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::audio::{CaptureChunk, CaptureFormat, ChunkBuffer, FinishedRecording};
use crate::domain::recording::{
    Duration, DurationCounter, InvalidStateTransition, RecordingState, RecordingStateMachine,
};

use super::error::RecorderError;
use super::pipeline;
use super::ports::{
    AudioDecoder, CaptureError, CaptureFacility, CaptureStream, ChunkReceiver, DeviceHandle,
};

const TICK: std::time::Duration = std::time::Duration::from_secs(1);

/// Errors returned to callers of a [`SessionHandle`]
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidState(#[from] InvalidStateTransition),

    #[error("Recording session has shut down")]
    Closed,
}

/// Per-session settings supplied by the controller
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Auto-stop ceiling. `None` records until stopped.
    pub max_duration: Option<Duration>,
    pub acquire_timeout: Duration,
    /// Name prefix of finished files
    pub file_prefix: String,
}

impl SessionConfig {
    pub fn new(file_prefix: impl Into<String>) -> Self {
        Self {
            max_duration: None,
            acquire_timeout: Duration::default_acquire_timeout(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn with_max_duration(mut self, max: Option<Duration>) -> Self {
        self.max_duration = max;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Why the session left `Recording`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Explicit,
    MaxDuration,
    Cancelled,
    DeviceLost,
}

/// Everything observable about a session, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Acquiring,
    Started,
    Tick { elapsed_secs: u64 },
    /// Emitted on every exit from `Recording`
    Stopping {
        reason: StopReason,
        elapsed_secs: u64,
    },
    Finished(FinishedRecording),
    Cancelled,
    Failed(RecorderError),
}

/// Snapshot published after every step of the actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub state: RecordingState,
    pub elapsed_secs: u64,
    /// Whether a device handle and tick timer are currently held
    pub device_live: bool,
}

type Ack = oneshot::Sender<Result<(), InvalidStateTransition>>;

enum Command {
    Start(Ack),
    Stop(Ack),
    Cancel(Ack),
    Release(Ack),
    Leave(Ack),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front door to a running session
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    /// Begin acquiring the device. Rejected unless idle.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.request(Command::Start).await
    }

    /// Finalize buffered chunks. Rejected unless recording.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(Command::Stop).await
    }

    /// Discard everything. Rejected when idle.
    pub async fn cancel(&self) -> Result<(), SessionError> {
        self.request(Command::Cancel).await
    }

    /// End of a hold gesture: stop if recording, drop the attempt if still
    /// acquiring. Decided by the actor against its own state.
    pub async fn release(&self) -> Result<(), SessionError> {
        self.request(Command::Release).await
    }

    /// Gesture lost: cancel if acquiring or recording, never encode
    pub async fn leave(&self) -> Result<(), SessionError> {
        self.request(Command::Leave).await
    }

    /// Cancel whatever is in flight and end the actor
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    async fn request(&self, command: impl FnOnce(Ack) -> Command) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }
}

type AcquireFuture = Pin<Box<dyn Future<Output = Result<CaptureStream, CaptureError>> + Send>>;

/// Device, chunk feed and tick timer of one recording
struct LiveCapture {
    format: CaptureFormat,
    chunks: ChunkReceiver,
    device: Box<dyn DeviceHandle>,
    ticker: Interval,
}

impl LiveCapture {
    fn new(stream: CaptureStream) -> Self {
        let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            format: stream.format,
            chunks: stream.chunks,
            device: stream.device,
            ticker,
        }
    }

    /// Move chunks already delivered into `buffer`, keeping their order
    fn drain_into(&mut self, buffer: &mut ChunkBuffer) {
        while let Ok(item) = self.chunks.try_recv() {
            match item {
                Ok(chunk) => buffer.push(chunk),
                Err(e) => warn!(error = %e, "Capture error queued at stop"),
            }
        }
    }
}

impl Drop for LiveCapture {
    fn drop(&mut self) {
        self.device.release();
        debug!("Capture device and tick timer released");
    }
}

/// Resources held in each state
enum Phase {
    Idle,
    Acquiring(AcquireFuture),
    Recording(LiveCapture),
    Processing(JoinHandle<Result<FinishedRecording, RecorderError>>),
}

enum PhaseEvent {
    Acquired(Result<CaptureStream, CaptureError>),
    Tick,
    Chunk(Option<Result<CaptureChunk, CaptureError>>),
    Processed(Result<FinishedRecording, RecorderError>),
}

impl Phase {
    /// Wait for whatever the current phase produces next.
    /// Every branch is cancel-safe so commands can interrupt it.
    async fn next_event(&mut self) -> PhaseEvent {
        match self {
            Phase::Idle => std::future::pending().await,
            Phase::Acquiring(acquire) => PhaseEvent::Acquired(acquire.as_mut().await),
            Phase::Recording(live) => tokio::select! {
                _ = live.ticker.tick() => PhaseEvent::Tick,
                chunk = live.chunks.recv() => PhaseEvent::Chunk(chunk),
            },
            Phase::Processing(task) => PhaseEvent::Processed(match task.await {
                Ok(result) => result,
                Err(e) => Err(RecorderError::DecodeFailed(format!(
                    "processing task failed: {}",
                    e
                ))),
            }),
        }
    }
}

enum Step {
    Command(Option<Command>),
    Phase(PhaseEvent),
}

/// The recording session actor
pub struct RecordingSession {
    facility: Arc<dyn CaptureFacility>,
    decoder: Arc<dyn AudioDecoder>,
    config: SessionConfig,
    machine: RecordingStateMachine,
    counter: DurationCounter,
    buffer: ChunkBuffer,
    phase: Phase,
    events: mpsc::UnboundedSender<SessionEvent>,
    status: watch::Sender<SessionStatus>,
}

impl RecordingSession {
    /// Spawn a session on the current runtime.
    ///
    /// The session ends when [`SessionHandle::shutdown`] is called or every
    /// handle is dropped; either way held resources are released first.
    pub fn spawn(
        facility: Arc<dyn CaptureFacility>,
        decoder: Arc<dyn AudioDecoder>,
        config: SessionConfig,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        let session = Self {
            facility,
            decoder,
            config,
            machine: RecordingStateMachine::new(),
            counter: DurationCounter::new(),
            buffer: ChunkBuffer::new(),
            phase: Phase::Idle,
            events: event_tx,
            status: status_tx,
        };
        tokio::spawn(session.run(command_rx));

        (
            SessionHandle {
                commands: command_tx,
                status: status_rx,
            },
            event_rx,
        )
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            let step = tokio::select! {
                biased;
                command = commands.recv() => Step::Command(command),
                event = self.phase.next_event() => Step::Phase(event),
            };

            let keep_running = match step {
                Step::Command(Some(command)) => self.handle_command(command),
                Step::Command(None) => {
                    self.teardown();
                    false
                }
                Step::Phase(event) => {
                    self.handle_phase_event(event);
                    true
                }
            };

            self.publish_status();
            if !keep_running {
                debug!("Recording session ended");
                break;
            }
        }
    }

    fn handle_command(&mut self, command: Command) -> bool {
        let (ack, result) = match command {
            Command::Start(ack) => (ack, self.start()),
            Command::Stop(ack) => (ack, self.stop(StopReason::Explicit)),
            Command::Cancel(ack) => (ack, self.cancel()),
            Command::Release(ack) => (ack, self.release()),
            Command::Leave(ack) => (ack, self.leave()),
            Command::Shutdown(ack) => {
                self.teardown();
                let _ = ack.send(());
                return false;
            }
        };
        // Callers read the watch right after the ack; it must already be current.
        self.publish_status();
        let _ = ack.send(result);
        true
    }

    fn handle_phase_event(&mut self, event: PhaseEvent) {
        match event {
            PhaseEvent::Acquired(Ok(stream)) => self.on_acquired(stream),
            PhaseEvent::Acquired(Err(err)) => {
                self.phase = Phase::Idle;
                self.fail(err.into());
            }
            PhaseEvent::Tick => self.on_tick(),
            PhaseEvent::Chunk(Some(Ok(chunk))) => self.buffer.push(chunk),
            PhaseEvent::Chunk(Some(Err(err))) => self.lose_device(err),
            PhaseEvent::Chunk(None) => {
                self.lose_device(CaptureError::DeviceLost("capture stream closed".into()))
            }
            PhaseEvent::Processed(result) => {
                self.phase = Phase::Idle;
                match result {
                    Ok(finished) => {
                        if let Err(e) = self.machine.complete() {
                            warn!(error = %e, "Dropping finished recording");
                            return;
                        }
                        self.emit(SessionEvent::Finished(finished));
                    }
                    Err(err) => self.fail(err),
                }
            }
        }
    }

    fn start(&mut self) -> Result<(), InvalidStateTransition> {
        self.machine.begin_acquiring()?;

        let facility = Arc::clone(&self.facility);
        let limit = self.config.acquire_timeout.as_std();
        self.phase = Phase::Acquiring(Box::pin(async move {
            match time::timeout(limit, facility.acquire()).await {
                Ok(result) => result,
                Err(_) => Err(CaptureError::Timeout),
            }
        }));

        info!("Acquiring microphone");
        self.emit(SessionEvent::Acquiring);
        Ok(())
    }

    fn on_acquired(&mut self, stream: CaptureStream) {
        let live = LiveCapture::new(stream);
        if let Err(e) = self.machine.acquired() {
            warn!(error = %e, "Releasing device acquired out of turn");
            return;
        }

        self.counter.reset();
        self.buffer.discard();
        info!(format = %live.format, "Recording started");
        self.phase = Phase::Recording(live);
        self.emit(SessionEvent::Started);
    }

    fn on_tick(&mut self) {
        let elapsed_secs = self.counter.tick();
        self.emit(SessionEvent::Tick { elapsed_secs });

        if self.counter.reached(self.config.max_duration) {
            info!(elapsed_secs, "Maximum duration reached");
            if let Err(e) = self.stop(StopReason::MaxDuration) {
                warn!(error = %e, "Auto-stop rejected");
            }
        }
    }

    fn stop(&mut self, reason: StopReason) -> Result<(), InvalidStateTransition> {
        self.machine.stop()?;
        let Some(format) = self.leave_recording(reason) else {
            self.fail(RecorderError::EmptyCapture);
            return Ok(());
        };

        if self.buffer.is_empty() {
            self.fail(RecorderError::EmptyCapture);
            return Ok(());
        }

        debug!(
            chunks = self.buffer.chunk_count(),
            bytes = self.buffer.total_bytes(),
            "Processing capture"
        );
        let bytes = self.buffer.take_bytes();
        let decoder = Arc::clone(&self.decoder);
        let duration_secs = self.counter.elapsed_secs();
        let prefix = self.config.file_prefix.clone();
        self.phase = Phase::Processing(tokio::spawn(async move {
            pipeline::process_capture(decoder.as_ref(), bytes, format, duration_secs, &prefix).await
        }));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), InvalidStateTransition> {
        let previous = self.machine.cancel()?;
        if previous == RecordingState::Recording {
            self.leave_recording(StopReason::Cancelled);
        }

        // Dropping an in-flight decode detaches it; its result is never read.
        self.phase = Phase::Idle;
        self.buffer.discard();
        self.counter.reset();

        info!(from = %previous, "Recording cancelled");
        self.emit(SessionEvent::Cancelled);
        Ok(())
    }

    fn release(&mut self) -> Result<(), InvalidStateTransition> {
        match self.machine.state() {
            RecordingState::Recording => self.stop(StopReason::Explicit),
            RecordingState::Acquiring => self.cancel(),
            current_state => Err(InvalidStateTransition {
                current_state,
                action: "release",
            }),
        }
    }

    fn leave(&mut self) -> Result<(), InvalidStateTransition> {
        match self.machine.state() {
            RecordingState::Recording | RecordingState::Acquiring => self.cancel(),
            current_state => Err(InvalidStateTransition {
                current_state,
                action: "leave",
            }),
        }
    }

    fn lose_device(&mut self, err: CaptureError) {
        self.leave_recording(StopReason::DeviceLost);
        self.fail(err.into());
    }

    /// Release the live capture, keeping any chunks it already delivered.
    /// Returns `None` if nothing was live.
    fn leave_recording(&mut self, reason: StopReason) -> Option<CaptureFormat> {
        let mut live = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Recording(live) => live,
            other => {
                self.phase = other;
                return None;
            }
        };
        live.drain_into(&mut self.buffer);
        let format = live.format;
        drop(live);

        self.emit(SessionEvent::Stopping {
            reason,
            elapsed_secs: self.counter.elapsed_secs(),
        });
        Some(format)
    }

    fn fail(&mut self, err: RecorderError) {
        self.phase = Phase::Idle;
        self.buffer.discard();

        match self.machine.fail() {
            Ok(previous) => debug!(from = %previous, "Entering error state"),
            Err(e) => debug!(error = %e, "Failure reported outside an active state"),
        }
        if let Err(e) = self.machine.recover() {
            debug!(error = %e, "Recover skipped");
        }

        warn!(error = %err, "Recording failed");
        self.emit(SessionEvent::Failed(err));
    }

    fn teardown(&mut self) {
        if !self.machine.is_idle() {
            let _ = self.cancel();
        }
        self.phase = Phase::Idle;
    }

    fn emit(&self, event: SessionEvent) {
        // A host that stopped listening is not an error for the session.
        let _ = self.events.send(event);
    }

    fn publish_status(&self) {
        self.status.send_replace(SessionStatus {
            state: self.machine.state(),
            elapsed_secs: self.counter.elapsed_secs(),
            device_live: matches!(self.phase, Phase::Recording(_)),
        });
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::ports::DecodeError;
    use crate::domain::audio::{AudioMimeType, DecodedAudio};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[derive(Clone)]
    pub(crate) enum Acquire {
        Succeed(Vec<Vec<u8>>),
        Fail(CaptureError),
        Hang,
        LoseDevice,
    }

    pub(crate) struct MockDevice {
        live: Arc<AtomicUsize>,
        feed: Option<mpsc::UnboundedSender<Result<CaptureChunk, CaptureError>>>,
    }

    impl DeviceHandle for MockDevice {
        fn release(&mut self) {
            if self.feed.take().is_some() {
                self.live.fetch_sub(1, Ordering::SeqCst);
            }
        }

        fn is_live(&self) -> bool {
            self.feed.is_some()
        }
    }

    pub(crate) struct MockFacility {
        behaviour: Acquire,
        pub(crate) live: Arc<AtomicUsize>,
        pub(crate) acquisitions: AtomicUsize,
    }

    impl MockFacility {
        pub(crate) fn new(behaviour: Acquire) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                live: Arc::new(AtomicUsize::new(0)),
                acquisitions: AtomicUsize::new(0),
            })
        }

        pub(crate) fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        pub(crate) fn acquisitions(&self) -> usize {
            self.acquisitions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CaptureFacility for MockFacility {
        async fn acquire(&self) -> Result<CaptureStream, CaptureError> {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            let chunks = match &self.behaviour {
                Acquire::Succeed(chunks) => chunks.clone(),
                Acquire::Fail(err) => return Err(err.clone()),
                Acquire::Hang => std::future::pending().await,
                Acquire::LoseDevice => Vec::new(),
            };

            let (tx, rx) = mpsc::unbounded_channel();
            for chunk in chunks {
                let _ = tx.send(Ok(CaptureChunk::new(chunk)));
            }
            if matches!(self.behaviour, Acquire::LoseDevice) {
                let _ = tx.send(Err(CaptureError::DeviceLost("unplugged".into())));
            }

            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(CaptureStream {
                format: CaptureFormat::Encoded(AudioMimeType::Webm),
                chunks: rx,
                device: Box::new(MockDevice {
                    live: Arc::clone(&self.live),
                    feed: Some(tx),
                }),
            })
        }
    }

    /// Decodes every byte into one mono frame at 8 kHz
    pub(crate) struct MockDecoder {
        pub(crate) delay: StdDuration,
    }

    #[async_trait]
    impl AudioDecoder for MockDecoder {
        async fn decode(
            &self,
            bytes: Vec<u8>,
            _format: CaptureFormat,
        ) -> Result<DecodedAudio, DecodeError> {
            tokio::time::sleep(self.delay).await;
            Ok(DecodedAudio::new(8000, vec![vec![0.5; bytes.len()]])?)
        }
    }

    fn spawn_session(
        facility: Arc<MockFacility>,
        config: SessionConfig,
        decode_delay: StdDuration,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        RecordingSession::spawn(facility, Arc::new(MockDecoder { delay: decode_delay }), config)
    }

    async fn next(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        events.recv().await.expect("session event")
    }

    /// Skip ticks until a non-tick event arrives
    async fn next_non_tick(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        loop {
            match next(events).await {
                SessionEvent::Tick { .. } => continue,
                other => return other,
            }
        }
    }

    async fn settle() {
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn three_ticks_then_stop_encodes_three_seconds() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 100], vec![2; 50]]));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next(&mut events).await, SessionEvent::Started);

        tokio::time::sleep(StdDuration::from_millis(3500)).await;
        for expected in 1..=3 {
            assert_eq!(
                next(&mut events).await,
                SessionEvent::Tick {
                    elapsed_secs: expected
                }
            );
        }

        handle.stop().await.unwrap();
        assert_eq!(
            next(&mut events).await,
            SessionEvent::Stopping {
                reason: StopReason::Explicit,
                elapsed_secs: 3
            }
        );
        assert_eq!(facility.live(), 0);

        let SessionEvent::Finished(finished) = next(&mut events).await else {
            panic!("expected a finished recording");
        };
        assert_eq!(finished.metadata.duration_secs, 3);
        assert_eq!(finished.metadata.frames, 150);
        assert_eq!(finished.file.size_bytes(), 44 + 150 * 2);
        assert!(finished.file.name().starts_with("voice-recording-"));

        settle().await;
        assert_eq!(handle.status().state, RecordingState::Idle);
        assert!(!handle.status().device_live);
    }

    #[tokio::test(start_paused = true)]
    async fn auto_stops_at_ceiling_and_encodes() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![0; 10]]));
        let config =
            SessionConfig::new("voice-chat").with_max_duration(Some(Duration::from_secs(5)));
        let (handle, mut events) =
            spawn_session(Arc::clone(&facility), config, StdDuration::ZERO);

        handle.start().await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(6500)).await;

        let mut ticks = Vec::new();
        let stopping = loop {
            match next(&mut events).await {
                SessionEvent::Tick { elapsed_secs } => ticks.push(elapsed_secs),
                SessionEvent::Acquiring | SessionEvent::Started => {}
                other => break other,
            }
        };
        assert_eq!(ticks, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            stopping,
            SessionEvent::Stopping {
                reason: StopReason::MaxDuration,
                elapsed_secs: 5
            }
        );
        assert!(matches!(next(&mut events).await, SessionEvent::Finished(_)));
        assert_eq!(facility.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_acquisition_returns_to_idle_without_recording() {
        let facility = MockFacility::new(Acquire::Fail(CaptureError::PermissionDenied(
            "denied".into(),
        )));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(
            next(&mut events).await,
            SessionEvent::Failed(RecorderError::PermissionDenied("denied".into()))
        );

        settle().await;
        assert_eq!(handle.status().state, RecordingState::Idle);
        assert_eq!(facility.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_recording_discards() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 20]]));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(1500)).await;
        handle.cancel().await.unwrap();

        assert_eq!(
            next_non_tick(&mut events).await,
            SessionEvent::Acquiring
        );
        assert_eq!(next_non_tick(&mut events).await, SessionEvent::Started);
        assert_eq!(
            next_non_tick(&mut events).await,
            SessionEvent::Stopping {
                reason: StopReason::Cancelled,
                elapsed_secs: 1
            }
        );
        assert_eq!(next_non_tick(&mut events).await, SessionEvent::Cancelled);

        settle().await;
        let status = handle.status();
        assert_eq!(status.state, RecordingState::Idle);
        assert!(!status.device_live);
        assert_eq!(facility.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_while_acquiring_drops_request() {
        let facility = MockFacility::new(Acquire::Hang);
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        settle().await;
        assert_eq!(handle.status().state, RecordingState::Acquiring);

        handle.cancel().await.unwrap();
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next(&mut events).await, SessionEvent::Cancelled);
        assert_eq!(facility.live(), 0);
        assert_eq!(facility.acquisitions(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_recording_is_rejected_without_reset() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 4]]));
        let (handle, _events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        tokio::time::sleep(StdDuration::from_millis(2500)).await;

        let second = handle.start().await;
        assert!(matches!(second, Err(SessionError::InvalidState(_))));
        assert_eq!(facility.acquisitions(), 1);
        assert_eq!(facility.live(), 1);

        settle().await;
        assert_eq!(handle.status().elapsed_secs, 2);
        assert_eq!(handle.status().state, RecordingState::Recording);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_with_no_chunks_is_empty_capture() {
        let facility = MockFacility::new(Acquire::Succeed(Vec::new()));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        settle().await;
        handle.stop().await.unwrap();

        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next(&mut events).await, SessionEvent::Started);
        assert!(matches!(
            next(&mut events).await,
            SessionEvent::Stopping { .. }
        ));
        assert_eq!(
            next(&mut events).await,
            SessionEvent::Failed(RecorderError::EmptyCapture)
        );
        settle().await;
        assert_eq!(handle.status().state, RecordingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_processing_discards_result() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 8]]));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::from_secs(5),
        );

        handle.start().await.unwrap();
        settle().await;
        handle.stop().await.unwrap();
        settle().await;
        assert_eq!(handle.status().state, RecordingState::Processing);

        handle.cancel().await.unwrap();
        tokio::time::sleep(StdDuration::from_secs(10)).await;

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.last(), Some(&SessionEvent::Cancelled));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, SessionEvent::Finished(_))));
        assert_eq!(handle.status().state, RecordingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn device_loss_tears_down_then_fails() {
        let facility = MockFacility::new(Acquire::LoseDevice);
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next(&mut events).await, SessionEvent::Started);
        assert_eq!(
            next(&mut events).await,
            SessionEvent::Stopping {
                reason: StopReason::DeviceLost,
                elapsed_secs: 0
            }
        );
        assert!(matches!(
            next(&mut events).await,
            SessionEvent::Failed(RecorderError::DeviceLost(_))
        ));
        assert_eq!(facility.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_acquisition_times_out() {
        let facility = MockFacility::new(Acquire::Hang);
        let config = SessionConfig::new("voice-recording")
            .with_acquire_timeout(Duration::from_secs(2));
        let (handle, mut events) = spawn_session(Arc::clone(&facility), config, StdDuration::ZERO);

        handle.start().await.unwrap();
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert!(matches!(
            next(&mut events).await,
            SessionEvent::Failed(RecorderError::AcquisitionFailed(_))
        ));
        settle().await;
        assert_eq!(handle.status().state, RecordingState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_live_device() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 8]]));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        settle().await;
        assert_eq!(facility.live(), 1);

        handle.shutdown().await;
        assert_eq!(facility.live(), 0);
        assert_eq!(next_non_tick(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next_non_tick(&mut events).await, SessionEvent::Started);
        assert!(matches!(
            next_non_tick(&mut events).await,
            SessionEvent::Stopping {
                reason: StopReason::Cancelled,
                ..
            }
        ));
        assert_eq!(next_non_tick(&mut events).await, SessionEvent::Cancelled);
        assert!(matches!(handle.start().await, Err(SessionError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_cancel_rejected_when_idle() {
        let facility = MockFacility::new(Acquire::Succeed(Vec::new()));
        let (handle, _events) = spawn_session(
            facility,
            SessionConfig::new("voice-recording"),
            StdDuration::ZERO,
        );

        assert!(matches!(
            handle.stop().await,
            Err(SessionError::InvalidState(_))
        ));
        assert!(matches!(
            handle.cancel().await,
            Err(SessionError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn release_stops_recording_and_drops_acquisition() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 8]]));
        let (handle, mut events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-chat"),
            StdDuration::ZERO,
        );

        handle.start().await.unwrap();
        settle().await;
        handle.release().await.unwrap();
        assert_eq!(handle.status().state, RecordingState::Processing);
        settle().await;
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next(&mut events).await, SessionEvent::Started);
        assert!(matches!(
            next_non_tick(&mut events).await,
            SessionEvent::Stopping {
                reason: StopReason::Explicit,
                ..
            }
        ));
        assert!(matches!(
            next(&mut events).await,
            SessionEvent::Finished(_)
        ));

        let hanging = MockFacility::new(Acquire::Hang);
        let (handle, mut events) = spawn_session(
            hanging,
            SessionConfig::new("voice-chat"),
            StdDuration::ZERO,
        );
        handle.start().await.unwrap();
        handle.release().await.unwrap();
        assert_eq!(handle.status().state, RecordingState::Idle);
        assert_eq!(next(&mut events).await, SessionEvent::Acquiring);
        assert_eq!(next(&mut events).await, SessionEvent::Cancelled);

        assert!(matches!(
            handle.release().await,
            Err(SessionError::InvalidState(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn leave_cancels_but_never_touches_processing() {
        let facility = MockFacility::new(Acquire::Succeed(vec![vec![1; 8]]));
        let (handle, _events) = spawn_session(
            Arc::clone(&facility),
            SessionConfig::new("voice-chat"),
            StdDuration::from_secs(3),
        );

        handle.start().await.unwrap();
        settle().await;
        handle.leave().await.unwrap();
        assert_eq!(handle.status().state, RecordingState::Idle);
        assert_eq!(facility.live(), 0);

        handle.start().await.unwrap();
        settle().await;
        handle.stop().await.unwrap();
        assert!(matches!(
            handle.leave().await,
            Err(SessionError::InvalidState(_))
        ));
        assert_eq!(handle.status().state, RecordingState::Processing);
    }

    #[tokio::test]
    async fn drain_keeps_chunks_around_a_queued_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(Ok(CaptureChunk::new(vec![1, 2]))).unwrap();
        tx.send(Err(CaptureError::DeviceLost("unplugged".into())))
            .unwrap();
        tx.send(Ok(CaptureChunk::new(vec![3]))).unwrap();

        let mut live = LiveCapture::new(CaptureStream {
            format: CaptureFormat::PcmF32 {
                sample_rate: 8000,
                channels: 1,
            },
            chunks: rx,
            device: Box::new(MockDevice {
                live: Arc::new(AtomicUsize::new(0)),
                feed: None,
            }),
        });
        let mut buffer = ChunkBuffer::new();
        live.drain_into(&mut buffer);

        assert_eq!(buffer.chunk_count(), 2);
        assert_eq!(buffer.take_bytes(), vec![1, 2, 3]);
    }
}
