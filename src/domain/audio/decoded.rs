//! Decoded sample data

use crate::domain::error::MalformedAudio;

/// Largest channel layout the canonical container carries (stereo)
pub const MAX_CHANNELS: u16 = 2;

/// Per-channel normalized float samples produced by one decode.
///
/// Invariants: `sample_rate > 0`, `1 <= channels <= MAX_CHANNELS`,
/// and every channel holds the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl DecodedAudio {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, MalformedAudio> {
        if sample_rate == 0 {
            return Err(MalformedAudio::ZeroSampleRate);
        }
        if channels.is_empty() || channels.len() > MAX_CHANNELS as usize {
            return Err(MalformedAudio::ChannelCount(channels.len()));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(MalformedAudio::RaggedChannels);
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Split interleaved samples into per-channel arrays.
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: u16,
        interleaved: &[f32],
    ) -> Result<Self, MalformedAudio> {
        let count = channel_count as usize;
        if count == 0 || count > MAX_CHANNELS as usize {
            return Err(MalformedAudio::ChannelCount(count));
        }

        let frames = interleaved.len() / count;
        let mut channels = vec![Vec::with_capacity(frames); count];
        for frame in interleaved.chunks_exact(count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Length of the clip in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}
