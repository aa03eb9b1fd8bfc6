use ndarray::{Array2, ArrayView1, Axis};

use crate::error::{Result, TtsError};

/// Audio buffer laid out as channels x samples, tagged with its sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    data: Array2<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(data: Array2<f32>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TtsError::AudioFormat("sample rate must be positive".into()));
        }
        if data.nrows() == 0 {
            return Err(TtsError::AudioFormat("waveform has no channels".into()));
        }
        Ok(Self { data, sample_rate })
    }

    /// Single-channel waveform.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        let len = samples.len();
        let data = Array2::from_shape_vec((1, len), samples)
            .map_err(|e| TtsError::AudioFormat(format!("mono buffer: {e}")))?;
        Self::new(data, sample_rate)
    }

    /// Build from per-channel sample vectors. All channels must have the same length.
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let n_channels = channels.len();
        let len = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|c| c.len() != len) {
            return Err(TtsError::AudioFormat("channels have different lengths".into()));
        }
        let flat: Vec<f32> = channels.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((n_channels, len), flat)
            .map_err(|e| TtsError::AudioFormat(format!("channel buffer: {e}")))?;
        Self::new(data, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.data.nrows()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn channel(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.channels()).then(|| self.data.row(index))
    }

    /// Average of all channels.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels() == 1 {
            return self.data.row(0).to_vec();
        }
        self.data
            .mean_axis(Axis(0))
            .map(|mean| mean.to_vec())
            .unwrap_or_default()
    }

    /// Frame-major samples, as stored in a WAV data chunk.
    pub fn interleaved(&self) -> Vec<f32> {
        self.data.t().iter().copied().collect()
    }

    pub fn into_parts(self) -> (Array2<f32>, u32) {
        (self.data, self.sample_rate)
    }
}
