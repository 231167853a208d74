//! Canonical 16-bit PCM WAV encoder
//!
//! Layout (all integers little-endian):
//! - `RIFF` <size> `WAVE`
//! - `fmt ` chunk: 16 bytes, format tag 1, channels, rate, byte rate, block align, 16 bits
//! - `data` chunk: interleaved i16 samples, one frame after another
//!
//! The header is always exactly 44 bytes.

use super::decoded::DecodedAudio;

/// Size of the canonical header
pub const WAV_HEADER_LEN: usize = 44;

/// Bit depth of every encoded sample
pub const BITS_PER_SAMPLE: u16 = 16;

const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
const FORMAT_PCM: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Quantize one normalized sample.
///
/// The input is clamped to [-1, 1] first; negative values scale by 32768 and
/// non-negative values by 32767 so that +1.0 cannot overflow. NaN encodes as silence.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Encode decoded audio into a canonical WAV container.
///
/// Total over every well-formed [`DecodedAudio`]: the output is always
/// `44 + frames * channels * 2` bytes. Size fields that would not fit in
/// 32 bits saturate instead of wrapping.
pub fn encode_wav(audio: &DecodedAudio) -> Vec<u8> {
    let channels = audio.channel_count();
    let sample_rate = audio.sample_rate();
    let frames = audio.frames();

    let data_len = frames * channels as usize * BYTES_PER_SAMPLE as usize;
    let data_len_field = u32::try_from(data_len).unwrap_or(u32::MAX);
    let riff_len_field = data_len_field.saturating_add(36);
    let block_align = channels * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate.saturating_mul(block_align as u32);

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&riff_len_field.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len_field.to_le_bytes());

    let planes: Vec<&[f32]> = (0..channels as usize)
        .filter_map(|index| audio.channel(index))
        .collect();
    for frame in 0..frames {
        for plane in &planes {
            out.extend_from_slice(&quantize(plane[frame]).to_le_bytes());
        }
    }

    out
}

/// Header fields read back from a canonical container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_len: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Parse the fixed 44-byte layout produced by [`encode_wav`]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < WAV_HEADER_LEN
            || &bytes[0..4] != b"RIFF"
            || &bytes[8..12] != b"WAVE"
            || &bytes[12..16] != b"fmt "
            || &bytes[36..40] != b"data"
        {
            return None;
        }

        let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let u32_at = |at: usize| {
            u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };

        if u32_at(16) != FMT_CHUNK_LEN || u16_at(20) != FORMAT_PCM {
            return None;
        }

        Some(Self {
            riff_len: u32_at(4),
            channels: u16_at(22),
            sample_rate: u32_at(24),
            byte_rate: u32_at(28),
            block_align: u16_at(32),
            bits_per_sample: u16_at(34),
            data_len: u32_at(40),
        })
    }

    /// Number of frames the data chunk declares
    pub fn frames(&self) -> u64 {
        if self.block_align == 0 {
            return 0;
        }
        self.data_len as u64 / self.block_align as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_of(bytes: &[u8]) -> Vec<i16> {
        bytes[WAV_HEADER_LEN..]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    #[test]
    fn quantize_extremes() {
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(-0.5), -16384);
        assert_eq!(quantize(0.5), 16383);
    }

    #[test]
    fn quantize_clamps_out_of_range_and_nan() {
        assert_eq!(quantize(7.5), 32767);
        assert_eq!(quantize(-3.0), -32768);
        assert_eq!(quantize(f32::INFINITY), 32767);
        assert_eq!(quantize(f32::NEG_INFINITY), -32768);
        assert_eq!(quantize(f32::NAN), 0);
    }

    #[test]
    fn header_fields_are_consistent() {
        for &(rate, channels) in &[(8000u32, 1u16), (16000, 2), (44100, 1), (48000, 2)] {
            let audio = DecodedAudio::new(rate, vec![vec![0.25; 10]; channels as usize]).unwrap();
            let bytes = encode_wav(&audio);
            let header = WavHeader::parse(&bytes).unwrap();

            assert_eq!(header.channels, channels);
            assert_eq!(header.sample_rate, rate);
            assert_eq!(header.byte_rate, rate * channels as u32 * 2);
            assert_eq!(header.block_align, channels * 2);
            assert_eq!(header.bits_per_sample, 16);
            assert_eq!(header.data_len as usize, 10 * channels as usize * 2);
            assert_eq!(header.riff_len as usize, bytes.len() - 8);
        }
    }

    #[test]
    fn size_formula_holds() {
        let audio = DecodedAudio::new(22050, vec![vec![0.0; 1234], vec![0.0; 1234]]).unwrap();
        assert_eq!(encode_wav(&audio).len(), 44 + 1234 * 2 * 2);
    }

    #[test]
    fn interleaves_channels_per_frame() {
        let audio =
            DecodedAudio::new(8000, vec![vec![1.0, 0.0, -1.0], vec![-1.0, 0.5, 2.0]]).unwrap();
        let bytes = encode_wav(&audio);
        assert_eq!(
            samples_of(&bytes),
            vec![32767, -32768, 0, 16383, -32768, 32767]
        );
    }

    #[test]
    fn empty_clip_encodes_header_only() {
        let audio = DecodedAudio::new(16000, vec![Vec::new()]).unwrap();
        let bytes = encode_wav(&audio);
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.data_len, 0);
        assert_eq!(header.frames(), 0);
    }

    #[test]
    fn parse_rejects_foreign_bytes() {
        assert!(WavHeader::parse(b"not a wav file at all, definitely not 44 bytes").is_none());
        assert!(WavHeader::parse(&[0u8; 10]).is_none());
    }
}
