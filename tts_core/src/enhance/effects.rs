use std::str::FromStr;

use tracing::debug;

use super::{config::EnhancementConfig, dsp};
use crate::error::{Result, TtsError};

/// How the first effect in the chain adjusts level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainType {
    /// `-n [dB]`: scale so the peak sits at the given dBFS (0 when omitted).
    Normalize { headroom_db: f32 },
    /// `<dB>`: fixed gain.
    Fixed { db: f32 },
}

impl FromStr for GainType {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TtsError::effect("gain", format!("unrecognized gain type '{s}'"));
        let mut tokens = s.split_whitespace();
        let gain = match tokens.next() {
            Some("-n") => {
                let headroom_db = match tokens.next() {
                    Some(db) => db.parse::<f32>().map_err(|_| invalid())?,
                    None => 0.0,
                };
                GainType::Normalize { headroom_db }
            }
            Some(db) => GainType::Fixed {
                db: db.parse::<f32>().map_err(|_| invalid())?,
            },
            None => return Err(invalid()),
        };
        if tokens.next().is_some() {
            return Err(invalid());
        }
        Ok(gain)
    }
}

/// Parameters of the gain -> pitch -> rate -> tempo chain.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectChain {
    pub gain: GainType,
    /// Pitch shift in cents.
    pub pitch_cents: f32,
    pub target_rate: u32,
    /// Speed multiplier; pitch is preserved.
    pub tempo: f32,
}

impl EffectChain {
    pub fn from_config(config: &EnhancementConfig) -> Result<Self> {
        let gain = config.gain_type.parse()?;
        if !config.pitch.is_finite() {
            return Err(TtsError::effect("pitch", "pitch shift must be finite"));
        }
        if config.new_sr == 0 {
            return Err(TtsError::effect("rate", "target sample rate must be positive"));
        }
        if !(config.tempo.is_finite() && config.tempo > 0.0) {
            return Err(TtsError::effect(
                "tempo",
                format!("tempo must be a positive factor, got {}", config.tempo),
            ));
        }
        Ok(Self {
            gain,
            pitch_cents: config.pitch,
            target_rate: config.new_sr,
            tempo: config.tempo,
        })
    }
}

/// Applies an [`EffectChain`] to a single-channel signal.
///
/// Implementations must return the chain's `target_rate` as the new rate.
pub trait EffectEngine: Send + Sync {
    fn apply(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        chain: &EffectChain,
    ) -> Result<(Vec<f32>, u32)>;
}

/// Pure Rust effect engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEffects;

impl EffectEngine for NativeEffects {
    fn apply(
        &self,
        mut samples: Vec<f32>,
        sample_rate: u32,
        chain: &EffectChain,
    ) -> Result<(Vec<f32>, u32)> {
        match chain.gain {
            GainType::Normalize { headroom_db } => dsp::normalize(&mut samples, headroom_db),
            GainType::Fixed { db } => dsp::apply_db(&mut samples, db),
        }

        let samples = dsp::pitch_shift(&samples, sample_rate, chain.pitch_cents);
        let samples = dsp::resample(&samples, sample_rate, chain.target_rate)?;
        let samples = dsp::time_stretch(&samples, chain.target_rate, chain.tempo as f64);
        debug!(
            from = sample_rate,
            to = chain.target_rate,
            samples = samples.len(),
            "effect chain applied"
        );

        Ok((samples, chain.target_rate))
    }
}
