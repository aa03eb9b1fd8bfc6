use thiserror::Error;

/// Errors raised anywhere between the synthesis request and the last
/// enhancement stage.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("synthesis request failed: {message}")]
    SynthesisRequest {
        message: String,
        status: Option<u16>,
    },

    #[error("could not decode synthesis response: {0}")]
    Decoding(String),

    #[error("unsupported or corrupt audio data: {0}")]
    AudioFormat(String),

    #[error("compute device '{0}' is unavailable")]
    DeviceUnavailable(String),

    #[error("effect chain rejected parameters at stage '{stage}': {reason}")]
    EffectChain { stage: &'static str, reason: String },
}

impl TtsError {
    pub fn request(message: impl Into<String>) -> Self {
        TtsError::SynthesisRequest {
            message: message.into(),
            status: None,
        }
    }

    pub fn effect(stage: &'static str, reason: impl Into<String>) -> Self {
        TtsError::EffectChain {
            stage,
            reason: reason.into(),
        }
    }

    /// Name of the stage that produced the error, for logs.
    pub fn stage(&self) -> &'static str {
        match self {
            TtsError::Config(_) => "config",
            TtsError::SynthesisRequest { .. } => "request",
            TtsError::Decoding(_) => "decode",
            TtsError::AudioFormat(_) => "audio",
            TtsError::DeviceUnavailable(_) => "device",
            TtsError::EffectChain { stage, .. } => *stage,
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;
