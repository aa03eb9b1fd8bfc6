//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use tts_core::{
    enhance::{EffectChain, EffectEngine, SpeechEnhancementModel},
    wav, Device, DeviceProbe, Result, SpeechEnhancer, SpeechSource, Waveform,
};

/// 16-bit mono WAV with a 220 Hz tone at half scale.
pub fn tone_wav(sample_rate: u32, secs: f32) -> Vec<u8> {
    let n = (sample_rate as f32 * secs) as usize;
    let samples: Vec<f32> = (0..n)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin())
        .collect();
    let waveform = Waveform::mono(samples, sample_rate).unwrap();
    wav::encode_wav(&waveform).unwrap()
}

/// Speech source that decodes a fixed WAV buffer, as the API client would.
#[derive(Clone)]
pub struct CannedSource {
    pub wav: Vec<u8>,
    pub calls: Arc<AtomicUsize>,
}

impl CannedSource {
    pub fn new(wav: Vec<u8>) -> Self {
        Self {
            wav,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpeechSource for CannedSource {
    fn generate(&self, _text: &str, _language_symbol: &str) -> Result<Waveform> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        wav::decode_wav(&self.wav)
    }
}

/// Enhancer that counts calls and returns its input.
#[derive(Clone, Default)]
pub struct CountingEnhancer {
    pub calls: Arc<AtomicUsize>,
}

impl CountingEnhancer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SpeechEnhancer for CountingEnhancer {
    fn enhance(&self, waveform: Waveform) -> Result<Waveform> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(waveform)
    }
}

/// Model stand-in that leaves the audio alone.
pub struct PassThrough;

impl SpeechEnhancementModel for PassThrough {
    fn enhance(&self, samples: &[f32], _sample_rate: u32, _device: Device) -> Result<Vec<f32>> {
        Ok(samples.to_vec())
    }
}

/// Effect engine stand-in that repeats each sample to reach the target rate
/// when the ratio is whole, and otherwise leaves samples as they are.
pub struct RepeatEngine;

impl EffectEngine for RepeatEngine {
    fn apply(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        chain: &EffectChain,
    ) -> Result<(Vec<f32>, u32)> {
        let factor = (chain.target_rate / sample_rate).max(1) as usize;
        let out = samples
            .into_iter()
            .flat_map(|s| std::iter::repeat(s).take(factor))
            .collect();
        Ok((out, chain.target_rate))
    }
}

pub struct CpuOnly;

impl DeviceProbe for CpuOnly {
    fn is_available(&self, device: Device) -> bool {
        device == Device::Cpu
    }
}
