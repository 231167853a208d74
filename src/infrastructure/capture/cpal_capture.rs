//! Microphone capture using cpal
//!
//! The cpal stream is not `Send`, so each acquisition owns a dedicated thread
//! that opens the default input device, streams interleaved f32le chunks at the
//! device's native rate, and parks until the handle is released.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::application::ports::{CaptureError, CaptureFacility, CaptureStream, DeviceHandle};
use crate::domain::audio::{CaptureChunk, CaptureFormat, MAX_CHANNELS};

type ChunkSender = mpsc::UnboundedSender<Result<CaptureChunk, CaptureError>>;

/// Capture facility backed by the default cpal host
pub struct CpalCaptureFacility;

impl CpalCaptureFacility {
    pub fn new() -> Self {
        Self
    }

    /// Whether this platform has any audio host at all
    pub fn is_supported() -> bool {
        !cpal::available_hosts().is_empty()
    }
}

impl Default for CpalCaptureFacility {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureFacility for CpalCaptureFacility {
    async fn acquire(&self) -> Result<CaptureStream, CaptureError> {
        if !Self::is_supported() {
            return Err(CaptureError::UnsupportedPlatform);
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let (chunk_tx, chunk_rx) = mpsc::unbounded_channel();
        let live = Arc::new(AtomicBool::new(false));

        let thread_live = Arc::clone(&live);
        std::thread::Builder::new()
            .name("cpal-capture".into())
            .spawn(move || run_capture(ready_tx, stop_rx, chunk_tx, thread_live))
            .map_err(|e| CaptureError::AcquisitionFailed(e.to_string()))?;

        let format = ready_rx.await.map_err(|_| {
            CaptureError::AcquisitionFailed("capture thread exited before opening the device".into())
        })??;

        Ok(CaptureStream {
            format,
            chunks: chunk_rx,
            device: Box::new(CpalDevice {
                stop: Some(stop_tx),
                live,
            }),
        })
    }
}

/// Handle to the capture thread. Dropping the stop sender wakes the thread,
/// which then drops the cpal stream.
struct CpalDevice {
    stop: Option<std_mpsc::Sender<()>>,
    live: Arc<AtomicBool>,
}

impl DeviceHandle for CpalDevice {
    fn release(&mut self) {
        if self.stop.take().is_some() {
            debug!("Signalled capture thread to close the device");
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.release();
    }
}

fn run_capture(
    ready: oneshot::Sender<Result<CaptureFormat, CaptureError>>,
    stop: std_mpsc::Receiver<()>,
    chunks: ChunkSender,
    live: Arc<AtomicBool>,
) {
    let (stream, format) = match open_stream(chunks) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    live.store(true, Ordering::SeqCst);
    if ready.send(Ok(format)).is_err() {
        debug!("Acquisition abandoned, closing device");
        live.store(false, Ordering::SeqCst);
        return;
    }
    info!(%format, "Input stream running");

    // Parks until the handle releases (sends or drops the sender).
    let _ = stop.recv();
    drop(stream);
    live.store(false, Ordering::SeqCst);
    info!("Input stream closed");
}

fn open_stream(chunks: ChunkSender) -> Result<(cpal::Stream, CaptureFormat), CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
    if let Ok(name) = device.name() {
        debug!(device = %name, "Opening input device");
    }

    let supported = input_config(&device)?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let format = CaptureFormat::PcmF32 {
        sample_rate: config.sample_rate.0,
        channels: config.channels,
    };

    let error_tx = chunks.clone();
    let on_error = move |err: cpal::StreamError| {
        warn!(error = %err, "Input stream error");
        let _ = error_tx.send(Err(CaptureError::DeviceLost(err.to_string())));
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                send_chunk(&chunks, data.iter().copied())
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                send_chunk(&chunks, data.iter().map(|&s| i16_to_f32(s)))
            },
            on_error,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                send_chunk(&chunks, data.iter().map(|&s| u16_to_f32(s)))
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::AcquisitionFailed(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    }
    .map_err(map_build_error)?;

    stream
        .play()
        .map_err(|e| classify(e.to_string()))?;

    Ok((stream, format))
}

/// The device's default layout, or a mono/stereo layout at the same rate
fn input_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig, CaptureError> {
    let default = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::NoDevice,
        other => classify(other.to_string()),
    })?;
    if default.channels() <= MAX_CHANNELS {
        return Ok(default);
    }

    let rate = default.sample_rate();
    device
        .supported_input_configs()
        .map_err(|e| classify(e.to_string()))?
        .filter(|range| {
            range.channels() <= MAX_CHANNELS
                && range.min_sample_rate() <= rate
                && range.max_sample_rate() >= rate
        })
        .max_by_key(|range| range.channels())
        .map(|range| range.with_sample_rate(rate))
        .ok_or_else(|| {
            CaptureError::AcquisitionFailed(format!(
                "no mono or stereo input layout at {} Hz",
                rate.0
            ))
        })
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
        other => classify(other.to_string()),
    }
}

/// Backends report permission problems only as text
fn classify(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::AcquisitionFailed(message)
    }
}

fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / 32768.0
}

fn u16_to_f32(sample: u16) -> f32 {
    (sample as f32 - 32768.0) / 32768.0
}

fn send_chunk(chunks: &ChunkSender, samples: impl ExactSizeIterator<Item = f32>) {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    // The session may already be gone; the thread exits on its next wake.
    let _ = chunks.send(Ok(CaptureChunk::new(bytes)));
}
