//! Audio codecs
//!
//! WAV in (any PCM layout `hound` reads) and 16-bit linear PCM WAV out.
//! Everything works on in-memory bytes; callers own the file system.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;
use sha2::{Digest, Sha256};

use super::buffer::AudioBuffer;
use crate::error::{MixError, Result};

/// Size of the canonical RIFF/WAVE header written by the encoder
pub const WAV_HEADER_LEN: usize = 44;

/// Output codecs the engine knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    /// 16-bit little-endian linear PCM in a WAV container
    #[default]
    Wav,
    /// MPEG layer III; no encoder is linked, so requesting it is an error
    Mp3,
}

impl Codec {
    /// File extension for the codec
    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Wav => "wav",
            Codec::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Codec {
    type Err = MixError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(Codec::Wav),
            "mp3" => Ok(Codec::Mp3),
            other => Err(MixError::UnsupportedCodec {
                codec: other.to_string(),
            }),
        }
    }
}

/// Encode a buffer with the requested codec
pub fn encode(buffer: &AudioBuffer, codec: Codec) -> Result<Vec<u8>> {
    match codec {
        Codec::Wav => encode_wav16(buffer),
        Codec::Mp3 => Err(MixError::UnsupportedCodec {
            codec: codec.to_string(),
        }),
    }
}

/// Convert one float sample to 16-bit PCM
///
/// Input is clamped to [-1, 1]; the negative half scales by 32768 and the
/// positive half by 32767 so both extremes are representable.
#[inline]
fn to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

fn encode_error(e: hound::Error) -> MixError {
    MixError::Encode {
        reason: e.to_string(),
    }
}

/// Serialize a buffer to canonical 16-bit PCM WAV bytes
pub fn encode_wav16(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let channels = buffer.channels();
    let total_samples = channels * buffer.len();
    let capacity = u32::try_from(total_samples).map_err(|_| MixError::Encode {
        reason: format!("{} samples exceed the WAV size limit", total_samples),
    })?;

    let spec = WavSpec {
        channels: channels as u16,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + total_samples * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
        let mut samples = writer.get_i16_writer(capacity);
        for frame in 0..buffer.len() {
            for channel in &buffer.samples {
                samples.write_sample(to_i16(channel[frame]));
            }
        }
        samples.flush().map_err(encode_error)?;
        writer.finalize().map_err(encode_error)?;
    }

    let bytes = cursor.into_inner();
    debug!(
        "encoded {} frames x {} ch into {} bytes",
        buffer.len(),
        channels,
        bytes.len()
    );
    Ok(bytes)
}

fn decode_error(what: &str, e: hound::Error) -> MixError {
    MixError::Decode {
        reason: format!("Failed to read {}: {}", what, e),
        source: Some(Box::new(e)),
    }
}

/// Decode WAV bytes into a buffer
///
/// Integer PCM of 8, 16, 24 or 32 bits and 32-bit float are accepted.
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer> {
    let mut reader =
        WavReader::new(Cursor::new(bytes)).map_err(|e| decode_error("WAV header", e))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error("float samples", e))?,
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| v as f32 / 128.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error("8-bit samples", e))?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error("16-bit samples", e))?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error("24-bit samples", e))?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| decode_error("32-bit samples", e))?,
        (format, bits) => {
            return Err(MixError::Decode {
                reason: format!("unsupported sample layout: {:?} {}-bit", format, bits),
                source: None,
            })
        }
    };

    AudioBuffer::from_interleaved(&interleaved, spec.channels as usize, spec.sample_rate)
}

/// Header summary of a WAV stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub is_float: bool,
    pub frames: u32,
}

impl WavInfo {
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }
}

/// Read just the header fields of WAV bytes
pub fn inspect_wav(bytes: &[u8]) -> Result<WavInfo> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| decode_error("WAV header", e))?;
    let spec = reader.spec();
    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        is_float: spec.sample_format == SampleFormat::Float,
        frames: reader.duration(),
    })
}

/// SHA-256 of encoded bytes, lowercase hex
pub fn checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
