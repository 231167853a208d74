//! Audio value objects and the canonical encoder

mod asset;
mod chunk;
mod content_type;
mod decoded;
mod pcm_encoder;

pub use asset::{
    wav_name_for, AudioFile, FinishedRecording, RecordingMetadata, CHAT_PREFIX, RECORDING_PREFIX,
};
pub use chunk::{CaptureChunk, ChunkBuffer};
pub use content_type::{AudioMimeType, CaptureFormat};
pub use decoded::{DecodedAudio, MAX_CHANNELS};
pub use pcm_encoder::{encode_wav, quantize, WavHeader, BITS_PER_SAMPLE, WAV_HEADER_LEN};
