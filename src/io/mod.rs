//! Audio I/O modules
//!
//! Container decoding with Symphonia and canonical 16-bit WAV framing with hound.

pub mod decoder;
pub mod wav;

pub use decoder::{decode_audio, DecodedAudio};
pub use wav::encode_wav;
