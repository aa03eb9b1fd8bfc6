//! Core audio types and the speech enhancement pipeline.
//!
//! A [`SpeechSource`] turns text into a [`Waveform`]; a [`SpeechEnhancer`]
//! post-processes it. Both are object safe so callers can swap in their own
//! implementations.

pub mod device;
pub mod enhance;
mod error;
mod waveform;
pub mod wav;

pub use device::{Device, DeviceProbe, SystemProbe};
pub use enhance::{EnhancementConfig, EnhancementPipeline};
pub use error::{Result, TtsError};
pub use waveform::Waveform;

/// Produces speech audio for a piece of text.
pub trait SpeechSource: Send + Sync {
    fn generate(&self, text: &str, language_symbol: &str) -> Result<Waveform>;
}

/// Transforms synthesized speech. The returned waveform carries its own
/// (possibly new) sample rate.
pub trait SpeechEnhancer: Send + Sync {
    fn enhance(&self, waveform: Waveform) -> Result<Waveform>;
}
