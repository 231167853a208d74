//! Symphonia-based decoder
//!
//! Raw f32le PCM from the capture facility is split directly; everything else
//! is probed and decoded by symphonia on a blocking thread. A fixed pool of
//! decode contexts bounds how many decodes run at once.

use std::io::{Cursor, ErrorKind};
use std::sync::Arc;

use async_trait::async_trait;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::application::ports::{AudioDecoder, DecodeError};
use crate::domain::audio::{AudioMimeType, CaptureFormat, DecodedAudio, MAX_CHANNELS};

/// Decoder backed by symphonia with a bounded context pool
pub struct SymphoniaDecoder {
    contexts: Arc<Semaphore>,
}

impl SymphoniaDecoder {
    /// Create a decoder with `contexts` concurrent decode slots
    pub fn new(contexts: usize) -> Self {
        Self {
            contexts: Arc::new(Semaphore::new(contexts)),
        }
    }

    /// Decode slots currently free
    pub fn available_contexts(&self) -> usize {
        self.contexts.available_permits()
    }
}

#[async_trait]
impl AudioDecoder for SymphoniaDecoder {
    async fn decode(
        &self,
        bytes: Vec<u8>,
        format: CaptureFormat,
    ) -> Result<DecodedAudio, DecodeError> {
        let permit = Arc::clone(&self.contexts)
            .try_acquire_owned()
            .map_err(|_| DecodeError::ContextUnavailable)?;

        debug!(bytes = bytes.len(), %format, "Decoding");
        tokio::task::spawn_blocking(move || {
            let result = match format {
                CaptureFormat::PcmF32 {
                    sample_rate,
                    channels,
                } => decode_pcm_f32(&bytes, sample_rate, channels),
                CaptureFormat::Encoded(mime) => decode_encoded(bytes, mime),
            };
            drop(permit);
            result
        })
        .await
        .map_err(|e| DecodeError::Unparseable(format!("decode task failed: {}", e)))?
    }
}

fn check_layout(channels: usize) -> Result<(), DecodeError> {
    if channels == 0 || channels > MAX_CHANNELS as usize {
        return Err(DecodeError::UnsupportedLayout(channels));
    }
    Ok(())
}

fn decode_pcm_f32(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<DecodedAudio, DecodeError> {
    check_layout(channels as usize)?;
    let samples: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(DecodedAudio::from_interleaved(sample_rate, channels, &samples)?)
}

fn decode_encoded(bytes: Vec<u8>, mime: AudioMimeType) -> Result<DecodedAudio, DecodeError> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(mime.as_str());
    hint.with_extension(mime.extension());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Unparseable(e.to_string()))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::Unparseable("no audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => DecodeError::UnsupportedCodec(what.to_string()),
            other => DecodeError::Unparseable(other.to_string()),
        })?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Unparseable(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(buffer) => {
                let spec = *buffer.spec();
                let count = spec.channels.count();
                check_layout(count)?;
                sample_rate = Some(spec.rate);
                channels = Some(count);

                let mut interleaved = SampleBuffer::<f32>::new(buffer.capacity() as u64, spec);
                interleaved.copy_interleaved_ref(buffer);
                samples.extend_from_slice(interleaved.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(error = msg, "Skipping undecodable packet");
            }
            Err(e) => return Err(DecodeError::Unparseable(e.to_string())),
        }
    }

    let sample_rate =
        sample_rate.ok_or_else(|| DecodeError::Unparseable("unknown sample rate".into()))?;
    let channels = channels.ok_or_else(|| DecodeError::Unparseable("unknown channel layout".into()))?;
    check_layout(channels)?;

    debug!(
        sample_rate,
        channels,
        frames = samples.len() / channels,
        "Decoded"
    );
    Ok(DecodedAudio::from_interleaved(
        sample_rate,
        channels as u16,
        &samples,
    )?)
}
