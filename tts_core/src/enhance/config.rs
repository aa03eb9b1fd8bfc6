use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `speech_enhancement` section of the configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnhancementConfig {
    /// Identifier of the pretrained enhancement model.
    pub pretrained_model: String,
    /// Local cache directory for the model's parameters.
    pub save_pretrained_dir: PathBuf,
    /// Preferred compute device (`cuda`, `cuda:N`, `metal`, `cpu`).
    pub device: String,
    /// Linear amplitude multiplier applied last.
    pub volume_gain: f32,
    pub fade_in_ratio: f32,
    pub fade_out_ratio: f32,
    pub fade_shape: String,
    pub gain_type: String,
    /// Pitch shift in cents.
    pub pitch: f32,
    /// Output sample rate.
    pub new_sr: u32,
    pub tempo: f32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            pretrained_model: "speechbrain/metricgan-plus-voicebank".to_string(),
            save_pretrained_dir: PathBuf::from("./speech-enhancement-model"),
            device: "cuda".to_string(),
            volume_gain: 1.1,
            fade_in_ratio: 0.30,
            fade_out_ratio: 0.5,
            fade_shape: "linear".to_string(),
            gain_type: "-n".to_string(),
            pitch: 40.0,
            new_sr: 48000,
            tempo: 1.15,
        }
    }
}
