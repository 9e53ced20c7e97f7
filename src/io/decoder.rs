//! Audio decoding using Symphonia

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ScanError;

/// Decoded audio at its native rate and channel layout
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Native sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: usize,
}

impl DecodedAudio {
    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }
}

/// Decode an in-memory audio file to interleaved f32 samples
///
/// # Arguments
///
/// * `bytes` - Raw file contents (any container/codec Symphonia supports)
/// * `extension` - Optional file extension used as a format hint
///
/// # Errors
///
/// Returns `ScanError::Decode` if the container is not recognized, no audio
/// track exists, or the codec is unsupported. Corrupt packets inside an
/// otherwise readable stream are skipped with a warning.
///
/// The format reader and decoder are owned locally and released on every
/// return path.
pub fn decode_audio(bytes: &[u8], extension: Option<&str>) -> Result<DecodedAudio, ScanError> {
    log::debug!("Decoding {} bytes (hint: {:?})", bytes.len(), extension);

    if bytes.is_empty() {
        return Err(ScanError::Decode("Empty input".to_string()));
    }

    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ScanError::Decode(format!("Format detection failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ScanError::Decode("No supported audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ScanError::Decode("Track has no sample rate".to_string()))?;
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ScanError::Decode(format!("Decoder creation failed: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            // End of stream
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                if samples.is_empty() {
                    return Err(ScanError::Decode(format!("Failed to read packet: {}", e)));
                }
                log::warn!("Stopping decode after read error: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                skipped_packets += 1;
                log::warn!("Skipping corrupt packet: {}", e);
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => {
                return Err(ScanError::Decode(format!("Decoder failed: {}", e)));
            }
        }
    }

    if channels == 0 {
        return Err(ScanError::Decode("Track has no channel layout".to_string()));
    }

    log::debug!(
        "Decoded {} frames at {} Hz, {} channel(s), {} packet(s) skipped",
        samples.len() / channels,
        sample_rate,
        channels,
        skipped_packets
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}
