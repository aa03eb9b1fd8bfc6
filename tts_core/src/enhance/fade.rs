use std::{f32::consts::PI, str::FromStr};

use crate::error::{Result, TtsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeShape {
    Linear,
    Exponential,
    Logarithmic,
    QuarterSine,
    HalfSine,
}

impl FromStr for FadeShape {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(FadeShape::Linear),
            "exponential" => Ok(FadeShape::Exponential),
            "logarithmic" => Ok(FadeShape::Logarithmic),
            "quarter_sine" => Ok(FadeShape::QuarterSine),
            "half_sine" => Ok(FadeShape::HalfSine),
            other => Err(TtsError::effect("fade", format!("unknown fade shape '{other}'"))),
        }
    }
}

impl FadeShape {
    /// Fade-in gain at `t` in [0, 1].
    fn rise(self, t: f32) -> f32 {
        match self {
            FadeShape::Linear => t,
            FadeShape::Exponential => 2.0_f32.powf((t - 1.0) * 5.0),
            FadeShape::Logarithmic => (0.1 + t).log10() + 1.0,
            FadeShape::QuarterSine => (t * PI / 2.0).sin(),
            FadeShape::HalfSine => (t * PI - PI / 2.0).sin() / 2.0 + 0.5,
        }
    }

    /// Fade-out gain at `t` in [0, 1].
    fn fall(self, t: f32) -> f32 {
        match self {
            FadeShape::Linear => 1.0 - t,
            FadeShape::Exponential => 2.0_f32.powf(-t * 5.0),
            FadeShape::Logarithmic => (1.1 - t).log10() + 1.0,
            FadeShape::QuarterSine => (t * PI / 2.0 + PI / 2.0).sin(),
            FadeShape::HalfSine => (t * PI + PI / 2.0).sin() / 2.0 + 0.5,
        }
    }
}

/// Fade-in/fade-out envelope with lengths fixed in samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub fade_in_len: usize,
    pub fade_out_len: usize,
    pub shape: FadeShape,
}

impl Fade {
    /// Lengths are `round(sample_rate * ratio)`.
    pub fn from_ratios(
        sample_rate: u32,
        fade_in_ratio: f32,
        fade_out_ratio: f32,
        shape: FadeShape,
    ) -> Result<Self> {
        Ok(Self {
            fade_in_len: ratio_len(sample_rate, fade_in_ratio, "fade_in_ratio")?,
            fade_out_len: ratio_len(sample_rate, fade_out_ratio, "fade_out_ratio")?,
            shape,
        })
    }

    /// Apply both ramps. Either ramp longer than the signal is an error; the
    /// two ramps may overlap.
    pub fn apply(&self, samples: &mut [f32]) -> Result<()> {
        let len = samples.len();
        for (name, fade_len) in [("fade-in", self.fade_in_len), ("fade-out", self.fade_out_len)] {
            if fade_len > len {
                return Err(TtsError::effect(
                    "fade",
                    format!("{name} of {fade_len} samples exceeds waveform of {len} samples"),
                ));
            }
        }

        for (i, sample) in samples[..self.fade_in_len].iter_mut().enumerate() {
            *sample *= self.shape.rise(ramp_position(i, self.fade_in_len));
        }
        let out_start = len - self.fade_out_len;
        for (i, sample) in samples[out_start..].iter_mut().enumerate() {
            *sample *= self.shape.fall(ramp_position(i, self.fade_out_len));
        }
        Ok(())
    }
}

fn ratio_len(sample_rate: u32, ratio: f32, field: &str) -> Result<usize> {
    if !(ratio.is_finite() && ratio >= 0.0) {
        return Err(TtsError::effect(
            "fade",
            format!("{field} must be a non-negative number, got {ratio}"),
        ));
    }
    Ok((sample_rate as f64 * ratio as f64).round() as usize)
}

/// Evenly spaced over [0, 1], both ends included.
fn ramp_position(i: usize, len: usize) -> f32 {
    if len <= 1 {
        0.0
    } else {
        i as f32 / (len - 1) as f32
    }
}
