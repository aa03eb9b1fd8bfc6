use std::path::Path;

use tracing::debug;
use tts_client::SynthesisClient;
use tts_core::{EnhancementPipeline, Result, SpeechEnhancer, SpeechSource, Waveform};

use crate::config::{credential_from_env, TtsConfig};

/// Synthesize speech remotely, then optionally enhance it.
pub struct TextToSpeech {
    speech_generator: Box<dyn SpeechSource>,
    speech_enhancer: Box<dyn SpeechEnhancer>,
}

impl TextToSpeech {
    pub fn new(
        speech_generator: Box<dyn SpeechSource>,
        speech_enhancer: Box<dyn SpeechEnhancer>,
    ) -> Self {
        Self {
            speech_generator,
            speech_enhancer,
        }
    }

    /// Build both components from the configuration file.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_components(path, None, None)
    }

    /// Use the given components and load the missing ones from `path`. The
    /// file is only read when something is missing.
    pub fn with_components<P: AsRef<Path>>(
        path: P,
        speech_generator: Option<Box<dyn SpeechSource>>,
        speech_enhancer: Option<Box<dyn SpeechEnhancer>>,
    ) -> Result<Self> {
        let (speech_generator, speech_enhancer) = match (speech_generator, speech_enhancer) {
            (Some(generator), Some(enhancer)) => (generator, enhancer),
            (generator, enhancer) => {
                let config = TtsConfig::load(path)?;
                let enhancer = match enhancer {
                    Some(enhancer) => enhancer,
                    None => Box::new(build_enhancer(&config)?),
                };
                let generator = match generator {
                    Some(generator) => generator,
                    None => Box::new(build_generator(&config)?),
                };
                (generator, enhancer)
            }
        };
        Ok(Self::new(speech_generator, speech_enhancer))
    }

    /// Always synthesizes; the enhancement stages run only when
    /// `apply_enhancement` is set, and then all of them run.
    pub fn produce(
        &self,
        text: &str,
        language_symbol: &str,
        apply_enhancement: bool,
    ) -> Result<Waveform> {
        let waveform = self.speech_generator.generate(text, language_symbol)?;
        debug!(
            sample_rate = waveform.sample_rate(),
            samples = waveform.len(),
            "synthesized"
        );
        if !apply_enhancement {
            return Ok(waveform);
        }
        self.speech_enhancer.enhance(waveform)
    }
}

/// Build only the synthesis client from the configuration file.
pub fn load_speech_generator<P: AsRef<Path>>(path: P) -> Result<SynthesisClient> {
    build_generator(&TtsConfig::load(path)?)
}

/// Build only the enhancement pipeline from the configuration file.
pub fn load_speech_enhancer<P: AsRef<Path>>(path: P) -> Result<EnhancementPipeline> {
    build_enhancer(&TtsConfig::load(path)?)
}

fn build_generator(config: &TtsConfig) -> Result<SynthesisClient> {
    let generation = config.speech_generation.clone();
    let credential = credential_from_env(&generation);
    SynthesisClient::new(generation, credential)
}

fn build_enhancer(config: &TtsConfig) -> Result<EnhancementPipeline> {
    EnhancementPipeline::from_config(&config.speech_enhancement)
}
