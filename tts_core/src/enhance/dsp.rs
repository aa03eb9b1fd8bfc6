//! Sample-level signal processing used by the native effect engine.

use rubato::{FftFixedIn, Resampler};

use crate::error::{Result, TtsError};

const RESAMPLE_CHUNK: usize = 1024;

/// WSOLA analysis/synthesis frame length.
const WSOLA_FRAME_SECS: f64 = 0.030;
/// How far the next frame may drift from its nominal position.
const WSOLA_TOLERANCE_SECS: f64 = 0.008;
/// Shortest frame WSOLA runs with; clips under two of these are too short to
/// overlap-add.
const WSOLA_MIN_FRAME: usize = 16;

/// Scale samples so the absolute peak sits at `headroom_db` dBFS.
pub fn normalize(samples: &mut [f32], headroom_db: f32) {
    let target_peak = 10.0_f32.powf(headroom_db / 20.0);
    let current_peak = peak(samples);

    if current_peak > 0.0 {
        let gain = target_peak / current_peak;
        for sample in samples.iter_mut() {
            *sample *= gain;
        }
    }
}

/// Apply a fixed gain in decibels.
pub fn apply_db(samples: &mut [f32], db: f32) {
    let gain = 10.0_f32.powf(db / 20.0);
    for sample in samples.iter_mut() {
        *sample *= gain;
    }
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}

/// Linear interpolation onto exactly `out_len` samples, stepping through the
/// input by `len / out_len`. The last output sample may fall short of the last
/// input sample.
pub fn interpolate_to_len(audio: &[f32], out_len: usize) -> Vec<f32> {
    if audio.is_empty() || out_len == 0 {
        return vec![0.0; out_len];
    }
    if audio.len() == out_len {
        return audio.to_vec();
    }

    let step = audio.len() as f64 / out_len as f64;
    let last = audio.len() - 1;
    (0..out_len)
        .map(|idx| {
            let src_pos = idx as f64 * step;
            let left = (src_pos.floor() as usize).min(last);
            let right = (left + 1).min(last);
            let frac = (src_pos - left as f64) as f32;
            audio[left] * (1.0 - frac) + audio[right] * frac
        })
        .collect()
}

/// Band-limited sample rate conversion.
///
/// The resampler's group delay is compensated and the result holds exactly
/// `ceil(len * target / source)` samples.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if target_rate == 0 || source_rate == 0 {
        return Err(TtsError::effect("rate", "sample rates must be positive"));
    }
    if samples.is_empty() || source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let expected =
        (samples.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .map_err(|e| TtsError::effect("rate", format!("failed to create resampler: {e}")))?;

    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
    let mut pos = 0;

    // Keep feeding (zero padding past the end) until the delayed tail is flushed.
    while output.len() < expected + delay {
        let frames_needed = resampler.input_frames_next();
        let end = (pos + frames_needed).min(samples.len());

        let mut input_chunk = samples[pos..end].to_vec();
        input_chunk.resize(frames_needed, 0.0);

        let resampled = resampler
            .process(&[input_chunk], None)
            .map_err(|e| TtsError::effect("rate", format!("resampling failed: {e}")))?;
        if let Some(chunk) = resampled.into_iter().next() {
            output.extend(chunk);
        }
        pos = end;
    }

    Ok(output.into_iter().skip(delay).take(expected).collect())
}

/// Change playback speed by `tempo` without changing pitch (WSOLA).
///
/// The output holds `round(len / tempo)` samples. Clips shorter than two
/// nominal frames run with a shorter frame; below `WSOLA_MIN_FRAME` they are
/// linearly stretched, which also moves their pitch.
pub fn time_stretch(input: &[f32], sample_rate: u32, tempo: f64) -> Vec<f32> {
    let expected = (input.len() as f64 / tempo).round() as usize;
    if input.is_empty() || (tempo - 1.0).abs() < 1e-9 {
        return input.to_vec();
    }

    let Some(frame) = wsola_frame(input.len(), sample_rate) else {
        return interpolate_to_len(input, expected);
    };

    let hop_out = frame / 2;
    let hop_in = hop_out as f64 * tempo;
    let tolerance = ((sample_rate as f64 * WSOLA_TOLERANCE_SECS).round() as usize).min(hop_out);
    let window = hann(frame);
    let last_start = input.len() - frame;

    let mut output = vec![0.0f32; expected + frame];
    let mut weights = vec![0.0f32; expected + frame];
    let mut prev_start = 0usize;
    let mut k = 0usize;

    loop {
        let out_pos = k * hop_out;
        if out_pos >= expected {
            break;
        }
        let nominal = ((k as f64 * hop_in).round() as usize).min(last_start);
        let start = if k == 0 {
            0
        } else {
            let natural = (prev_start + hop_out).min(last_start);
            best_match(input, natural, nominal, tolerance, hop_out, last_start)
        };

        for (i, &w) in window.iter().enumerate() {
            output[out_pos + i] += input[start + i] * w;
            weights[out_pos + i] += w;
        }
        prev_start = start;
        k += 1;
    }

    for (sample, &weight) in output.iter_mut().zip(&weights) {
        if weight > 1e-6 {
            *sample /= weight;
        }
    }
    output.truncate(expected);
    output
}

/// Shift pitch by `cents` while keeping the duration.
///
/// Clips too short for WSOLA are resampled by the pitch ratio alone, so their
/// length changes by `1 / ratio`.
pub fn pitch_shift(input: &[f32], sample_rate: u32, cents: f32) -> Vec<f32> {
    if input.is_empty() || cents == 0.0 {
        return input.to_vec();
    }
    let ratio = 2.0_f64.powf(cents as f64 / 1200.0);
    if wsola_frame(input.len(), sample_rate).is_none() {
        let out_len = ((input.len() as f64 / ratio).round() as usize).max(1);
        return interpolate_to_len(input, out_len);
    }
    // Stretch to len * ratio, then read it back `ratio` times faster.
    let stretched = time_stretch(input, sample_rate, 1.0 / ratio);
    interpolate_to_len(&stretched, input.len())
}

/// Even WSOLA frame length for a clip of `len` samples, capped so at least two
/// frames fit.
fn wsola_frame(len: usize, sample_rate: u32) -> Option<usize> {
    let nominal = (((sample_rate as f64 * WSOLA_FRAME_SECS).round() as usize).max(8) + 1) & !1;
    let frame = nominal.min(len / 2) & !1;
    (frame >= WSOLA_MIN_FRAME).then_some(frame)
}

/// Frame start within `nominal ± tolerance` whose leading overlap region best
/// matches the natural continuation of the previous frame.
fn best_match(
    input: &[f32],
    natural: usize,
    nominal: usize,
    tolerance: usize,
    overlap: usize,
    last_start: usize,
) -> usize {
    let lo = nominal.saturating_sub(tolerance);
    let hi = (nominal + tolerance).min(last_start);
    let reference = &input[natural..natural + overlap];

    let mut best = nominal.min(hi).max(lo);
    let mut best_score = f32::NEG_INFINITY;
    for candidate in lo..=hi {
        let segment = &input[candidate..candidate + overlap];
        let (mut dot, mut energy) = (0.0f32, 0.0f32);
        for (a, b) in segment.iter().zip(reference) {
            dot += a * b;
            energy += a * a;
        }
        let score = dot / (energy.sqrt() + 1e-9);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }
    best
}

/// Periodic Hann window.
pub(crate) fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / len as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    /// Zero crossings per second, a cheap pitch estimate for pure tones.
    fn crossing_rate(samples: &[f32], sample_rate: u32) -> f32 {
        let crossings = samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        crossings as f32 / 2.0 / (samples.len() as f32 / sample_rate as f32)
    }

    #[test]
    fn normalize_hits_target_peak() {
        let mut samples = vec![0.1, -0.25, 0.2];
        normalize(&mut samples, 0.0);
        assert!((peak(&samples) - 1.0).abs() < 1e-6);

        normalize(&mut samples, -6.0);
        assert!((peak(&samples) - 0.501_187).abs() < 1e-4);
    }

    #[test]
    fn normalize_leaves_silence_alone() {
        let mut samples = vec![0.0; 16];
        normalize(&mut samples, 0.0);
        assert!(samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn resample_produces_exact_length() {
        let input = sine(440.0, 16000, 0.5);
        let output = resample(&input, 16000, 48000).unwrap();
        assert_eq!(output.len(), input.len() * 3);

        let odd = resample(&input[..1001], 22050, 48000).unwrap();
        assert_eq!(odd.len(), (1001u64 * 48000).div_ceil(22050) as usize);
    }

    #[test]
    fn resample_keeps_frequency() {
        let input = sine(440.0, 16000, 1.0);
        let output = resample(&input, 16000, 48000).unwrap();
        let rate = crossing_rate(&output, 48000);
        assert!((rate - 440.0).abs() < 10.0, "rate was {rate}");
    }

    #[test]
    fn resample_rejects_zero_rate() {
        let err = resample(&[0.0; 8], 16000, 0).unwrap_err();
        assert_eq!(err.stage(), "rate");
    }

    #[test]
    fn time_stretch_shortens_without_changing_pitch() {
        let input = sine(300.0, 16000, 1.0);
        let output = time_stretch(&input, 16000, 1.15);
        assert_eq!(output.len(), (16000.0_f64 / 1.15).round() as usize);
        let rate = crossing_rate(&output, 16000);
        assert!((rate - 300.0).abs() < 15.0, "rate was {rate}");
    }

    #[test]
    fn time_stretch_handles_short_input() {
        let output = time_stretch(&[0.1; 100], 16000, 2.0);
        assert_eq!(output.len(), 50);
    }

    #[test]
    fn pitch_shift_raises_frequency_and_keeps_length() {
        let input = sine(400.0, 16000, 1.0);
        let output = pitch_shift(&input, 16000, 1200.0);
        assert_eq!(output.len(), input.len());
        let rate = crossing_rate(&output, 16000);
        assert!((rate - 800.0).abs() < 40.0, "rate was {rate}");
    }

    #[test]
    fn pitch_shift_moves_short_clips() {
        let input = sine(400.0, 16000, 1.0)[..900].to_vec();
        let output = pitch_shift(&input, 16000, 1200.0);
        assert_eq!(output.len(), 900);
        let rate = crossing_rate(&output, 16000);
        assert!((rate - 800.0).abs() < 80.0, "rate was {rate}");
    }

    #[test]
    fn pitch_shift_resamples_tiny_clips() {
        let input = sine(1000.0, 16000, 1.0)[..16].to_vec();
        let output = pitch_shift(&input, 16000, 1200.0);
        assert_eq!(output.len(), 8);
    }

    #[test]
    fn time_stretch_keeps_pitch_of_short_clips() {
        let input = sine(400.0, 16000, 1.0)[..900].to_vec();
        let output = time_stretch(&input, 16000, 1.15);
        assert_eq!(output.len(), (900.0_f64 / 1.15).round() as usize);
        let rate = crossing_rate(&output, 16000);
        assert!((rate - 400.0).abs() < 50.0, "rate was {rate}");
    }

    #[test]
    fn interpolate_steps_through_the_input() {
        let out = interpolate_to_len(&[0.0, 1.0], 4);
        assert_eq!(out, vec![0.0, 0.5, 1.0, 1.0]);
    }
}
