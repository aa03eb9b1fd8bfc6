//! Text-to-speech through a remote synthesis API, with optional local
//! enhancement of the result.

pub mod config;
mod tts;

pub use config::TtsConfig;
pub use tts::{load_speech_enhancer, load_speech_generator, TextToSpeech};
pub use tts_client::{GenerationConfig, SynthesisClient};
pub use tts_core::{
    EnhancementConfig, EnhancementPipeline, Result, SpeechEnhancer, SpeechSource, TtsError,
    Waveform,
};
