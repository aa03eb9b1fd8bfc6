// Configuration document and environment lookups

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use tts_client::GenerationConfig;
use tts_core::{EnhancementConfig, Result, TtsError};

/// Config path used when neither the caller nor `TTSAPI_CONFIG` names one.
pub const DEFAULT_CONFIG_PATH: &str = "configs.yaml";

/// Both sections of the YAML configuration; missing sections and fields take
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TtsConfig {
    pub speech_generation: GenerationConfig,
    pub speech_enhancement: EnhancementConfig,
}

impl TtsConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        // An empty document parses as null; treat it as all defaults.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| TtsError::Config(format!("invalid config: {e}")))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| TtsError::Config(format!("failed to load {}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
            .map_err(|e| TtsError::Config(format!("{}: {e}", path.display())))
    }
}

/// `TTSAPI_CONFIG` if set, otherwise [`DEFAULT_CONFIG_PATH`].
pub fn default_config_path() -> String {
    std::env::var("TTSAPI_CONFIG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Read the API credential from the variable the config names.
pub fn credential_from_env(config: &GenerationConfig) -> Option<String> {
    std::env::var(&config.token_variable_name).ok()
}
