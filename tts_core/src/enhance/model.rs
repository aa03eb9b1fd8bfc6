//! Spectral mask speech enhancement.

use std::{fs, path::Path};

use num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::dsp::hann;
use crate::device::Device;
use crate::error::{Result, TtsError};

const HPARAMS_FILE: &str = "hparams.yaml";

/// Enhancement model invoked on one mono utterance at a time.
///
/// The output must have the same length and sample rate as the input.
/// `device` is the device the pipeline resolved; models that can offload
/// should run there.
pub trait SpeechEnhancementModel: Send + Sync {
    fn enhance(&self, samples: &[f32], sample_rate: u32, device: Device) -> Result<Vec<f32>>;
}

/// Hyper-parameters of [`SpectralMaskModel`], cached next to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskHparams {
    /// Model identifier the parameters were saved for.
    pub source: String,
    /// STFT frame length in seconds; rounded up to a power of two in samples.
    pub frame_secs: f32,
    /// Quantile of each bin's magnitudes taken as its noise floor.
    pub noise_quantile: f32,
    /// Over-subtraction factor for the noise power.
    pub over_subtraction: f32,
    /// Lowest gain the mask may apply.
    pub mask_floor: f32,
}

impl Default for MaskHparams {
    fn default() -> Self {
        Self {
            source: String::new(),
            frame_secs: 0.032,
            noise_quantile: 0.3,
            over_subtraction: 2.5,
            mask_floor: 0.1,
        }
    }
}

/// Estimates a stationary noise floor per frequency bin and applies a soft
/// Wiener-style mask over the whole utterance.
#[derive(Debug, Clone)]
pub struct SpectralMaskModel {
    hparams: MaskHparams,
    device: Device,
}

impl SpectralMaskModel {
    pub fn new(hparams: MaskHparams) -> Result<Self> {
        if !(hparams.frame_secs.is_finite() && hparams.frame_secs > 0.0) {
            return Err(TtsError::Config("frame_secs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&hparams.noise_quantile) {
            return Err(TtsError::Config("noise_quantile must lie in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&hparams.mask_floor) {
            return Err(TtsError::Config("mask_floor must lie in [0, 1]".into()));
        }
        if !(hparams.over_subtraction.is_finite() && hparams.over_subtraction >= 0.0) {
            return Err(TtsError::Config(
                "over_subtraction must be finite and non-negative".into(),
            ));
        }
        Ok(Self {
            hparams,
            device: Device::Cpu,
        })
    }

    /// Load hyper-parameters from `savedir`, writing the defaults there on
    /// first use, and bind the model to `device`.
    pub fn from_pretrained(source: &str, savedir: &Path, device: Device) -> Result<Self> {
        let path = savedir.join(HPARAMS_FILE);
        let hparams = if path.exists() {
            let text = fs::read_to_string(&path)
                .map_err(|e| TtsError::Config(format!("failed to read {}: {e}", path.display())))?;
            let hparams: MaskHparams = serde_yaml::from_str(&text)
                .map_err(|e| TtsError::Config(format!("invalid {}: {e}", path.display())))?;
            if hparams.source != source {
                warn!(
                    cached = %hparams.source,
                    requested = %source,
                    "cached enhancement parameters were saved for a different model"
                );
            }
            hparams
        } else {
            let hparams = MaskHparams {
                source: source.to_string(),
                ..MaskHparams::default()
            };
            fs::create_dir_all(savedir).map_err(|e| {
                TtsError::Config(format!("failed to create {}: {e}", savedir.display()))
            })?;
            let text = serde_yaml::to_string(&hparams)
                .map_err(|e| TtsError::Config(format!("failed to serialize hparams: {e}")))?;
            fs::write(&path, text)
                .map_err(|e| TtsError::Config(format!("failed to write {}: {e}", path.display())))?;
            info!(path = %path.display(), "saved default enhancement parameters");
            hparams
        };
        let model = Self::new(hparams)?.on_device(device);
        info!(source, device = %model.device, "enhancement model loaded");
        Ok(model)
    }

    /// Bind the model to `device`. The STFT runs on host memory, so
    /// accelerator devices are only recorded.
    pub fn on_device(mut self, device: Device) -> Self {
        if device != Device::Cpu {
            debug!(%device, "spectral mask model computes on the host");
        }
        self.device = device;
        self
    }

    pub fn hparams(&self) -> &MaskHparams {
        &self.hparams
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl SpeechEnhancementModel for SpectralMaskModel {
    fn enhance(&self, samples: &[f32], sample_rate: u32, device: Device) -> Result<Vec<f32>> {
        if device != self.device {
            debug!(bound = %self.device, requested = %device, "model used on another device");
        }
        if samples.is_empty() {
            return Ok(Vec::new());
        }

        let frame = ((sample_rate as f32 * self.hparams.frame_secs).ceil() as usize)
            .max(16)
            .next_power_of_two();
        let hop = frame / 2;
        let window = hann(frame);
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(frame);
        let inverse = planner.plan_fft_inverse(frame);

        // Half a frame of silence on the left so the first sample sits under a
        // full window, and enough on the right to finish the last frame.
        let mut padded = vec![0.0f32; hop];
        padded.extend_from_slice(samples);
        padded.resize(hop + samples.len() + frame, 0.0);
        let n_frames = (padded.len() - frame) / hop + 1;

        let mut spectra: Vec<Vec<Complex<f32>>> = Vec::with_capacity(n_frames);
        for t in 0..n_frames {
            let start = t * hop;
            let mut buffer: Vec<Complex<f32>> = padded[start..start + frame]
                .iter()
                .zip(&window)
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            forward.process(&mut buffer);
            spectra.push(buffer);
        }

        let noise_power: Vec<f32> = (0..frame)
            .map(|bin| {
                let mut mags: Vec<f32> = spectra.iter().map(|s| s[bin].norm()).collect();
                mags.sort_by(|a, b| a.total_cmp(b));
                let idx = ((mags.len() - 1) as f32 * self.hparams.noise_quantile).round() as usize;
                mags[idx] * mags[idx]
            })
            .collect();

        let mut output = vec![0.0f32; padded.len()];
        let mut weights = vec![0.0f32; padded.len()];
        let scale = 1.0 / frame as f32;
        for (t, spectrum) in spectra.iter_mut().enumerate() {
            for (bin, value) in spectrum.iter_mut().enumerate() {
                let power = value.norm_sqr();
                let gain = if power > 0.0 {
                    (1.0 - self.hparams.over_subtraction * noise_power[bin] / power)
                        .max(self.hparams.mask_floor)
                } else {
                    self.hparams.mask_floor
                };
                *value *= gain;
            }
            inverse.process(spectrum);

            let start = t * hop;
            for (i, (value, &w)) in spectrum.iter().zip(&window).enumerate() {
                output[start + i] += value.re * scale;
                weights[start + i] += w;
            }
        }

        let enhanced: Vec<f32> = output[hop..hop + samples.len()]
            .iter()
            .zip(&weights[hop..hop + samples.len()])
            .map(|(&s, &w)| if w > 1e-6 { s / w } else { s })
            .collect();
        debug!(frames = n_frames, frame, "spectral mask applied");
        Ok(enhanced)
    }
}
