//! Post-processing of synthesized speech.
//!
//! Stages run in a fixed order:
//! 1. spectral enhancement of the mono mixdown,
//! 2. the effect chain (gain, pitch, rate, tempo), which moves the signal to
//!    the configured output rate,
//! 3. fade-in/fade-out with lengths derived from the output rate,
//! 4. volume scaling.

mod config;
pub mod dsp;
mod effects;
mod fade;
mod model;

pub use config::EnhancementConfig;
pub use effects::{EffectChain, EffectEngine, GainType, NativeEffects};
pub use fade::{Fade, FadeShape};
pub use model::{MaskHparams, SpectralMaskModel, SpeechEnhancementModel};

use tracing::{debug, info};

use crate::device::{resolve_device, Device, DeviceProbe, SystemProbe};
use crate::error::{Result, TtsError};
use crate::waveform::Waveform;
use crate::SpeechEnhancer;

pub struct EnhancementPipeline {
    model: Box<dyn SpeechEnhancementModel>,
    engine: Box<dyn EffectEngine>,
    effects: EffectChain,
    fade: Fade,
    volume_gain: f32,
    device: Device,
}

impl std::fmt::Debug for EnhancementPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhancementPipeline")
            .field("model", &"<SpeechEnhancementModel>")
            .field("engine", &"<EffectEngine>")
            .field("effects", &self.effects)
            .field("fade", &self.fade)
            .field("volume_gain", &self.volume_gain)
            .field("device", &self.device)
            .finish()
    }
}

impl EnhancementPipeline {
    /// Build with injected capabilities. Parameters are validated here so a
    /// bad configuration fails before any audio is processed.
    pub fn new(
        config: &EnhancementConfig,
        model: Box<dyn SpeechEnhancementModel>,
        engine: Box<dyn EffectEngine>,
        probe: &dyn DeviceProbe,
    ) -> Result<Self> {
        let device = resolve_device(&config.device, probe);
        Self::with_device(config, model, engine, device)
    }

    /// Build with a device that was already resolved.
    pub fn with_device(
        config: &EnhancementConfig,
        model: Box<dyn SpeechEnhancementModel>,
        engine: Box<dyn EffectEngine>,
        device: Device,
    ) -> Result<Self> {
        let effects = EffectChain::from_config(config)?;
        let shape: FadeShape = config.fade_shape.parse()?;
        let fade = Fade::from_ratios(
            config.new_sr,
            config.fade_in_ratio,
            config.fade_out_ratio,
            shape,
        )?;
        if !config.volume_gain.is_finite() {
            return Err(TtsError::effect("volume", "volume gain must be finite"));
        }

        Ok(Self {
            model,
            engine,
            effects,
            fade,
            volume_gain: config.volume_gain,
            device,
        })
    }

    /// Build with the native model and effect engine. The device is resolved
    /// before the model is loaded so the model is bound to it.
    pub fn from_config(config: &EnhancementConfig) -> Result<Self> {
        let device = resolve_device(&config.device, &SystemProbe);
        let model = SpectralMaskModel::from_pretrained(
            &config.pretrained_model,
            &config.save_pretrained_dir,
            device,
        )?;
        let pipeline = Self::with_device(config, Box::new(model), Box::new(NativeEffects), device)?;
        info!(
            model = %config.pretrained_model,
            device = %pipeline.device,
            target_rate = pipeline.effects.target_rate,
            "speech enhancer ready"
        );
        Ok(pipeline)
    }

    /// Device resolved at construction.
    pub fn device(&self) -> Device {
        self.device
    }

    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    pub fn fade(&self) -> &Fade {
        &self.fade
    }

    pub fn volume_gain(&self) -> f32 {
        self.volume_gain
    }

    fn enhance_speech(&self, waveform: &Waveform) -> Result<Vec<f32>> {
        let mono = waveform.to_mono();
        let enhanced = self.model.enhance(&mono, waveform.sample_rate(), self.device)?;
        if enhanced.len() != mono.len() {
            return Err(TtsError::effect(
                "enhance",
                format!(
                    "model returned {} samples for {} input samples",
                    enhanced.len(),
                    mono.len()
                ),
            ));
        }
        Ok(enhanced)
    }

    fn apply_effects(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(Vec<f32>, u32)> {
        let (samples, rate) = self.engine.apply(samples, sample_rate, &self.effects)?;
        if rate != self.effects.target_rate {
            return Err(TtsError::effect(
                "rate",
                format!(
                    "effect engine produced {rate} Hz instead of {} Hz",
                    self.effects.target_rate
                ),
            ));
        }
        Ok((samples, rate))
    }

    fn apply_transforms(&self, samples: &mut [f32]) -> Result<()> {
        self.fade.apply(samples)?;
        for sample in samples.iter_mut() {
            *sample *= self.volume_gain;
        }
        Ok(())
    }
}

impl SpeechEnhancer for EnhancementPipeline {
    fn enhance(&self, waveform: Waveform) -> Result<Waveform> {
        debug!(
            channels = waveform.channels(),
            samples = waveform.len(),
            sample_rate = waveform.sample_rate(),
            "enhancing speech"
        );
        let enhanced = self.enhance_speech(&waveform)?;
        let (mut samples, sample_rate) = self.apply_effects(enhanced, waveform.sample_rate())?;
        self.apply_transforms(&mut samples)?;
        Waveform::mono(samples, sample_rate)
    }
}
