use std::io::Cursor;

use base64::{engine::general_purpose, Engine as _};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::{Result, TtsError};
use crate::waveform::Waveform;

/// Decode a WAV container into a float waveform.
///
/// Integer PCM of any depth up to 32 bits is scaled to [-1.0, 1.0) by
/// dividing by `2^(bits - 1)`; 32-bit float data is passed through.
pub fn decode_wav(bytes: &[u8]) -> Result<Waveform> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| TtsError::AudioFormat(format!("invalid WAV container: {e}")))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(TtsError::AudioFormat("WAV header declares zero channels".into()));
    }

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| TtsError::AudioFormat(format!("float sample: {e}")))?,
        (SampleFormat::Int, bits @ 1..=32) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| TtsError::AudioFormat(format!("pcm sample: {e}")))?
        }
        (format, bits) => {
            return Err(TtsError::AudioFormat(format!(
                "unsupported sample format {format:?} with {bits} bits"
            )))
        }
    };

    if interleaved.len() % channels != 0 {
        return Err(TtsError::AudioFormat(format!(
            "{} samples do not divide into {channels} channels",
            interleaved.len()
        )));
    }

    let frames = interleaved.len() / channels;
    let data = ndarray::Array2::from_shape_fn((channels, frames), |(c, i)| {
        interleaved[i * channels + c]
    });
    Waveform::new(data, spec.sample_rate)
}

/// Encode a waveform as 16-bit PCM WAV (RIFF).
pub fn encode_wav(waveform: &Waveform) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: waveform.channels() as u16,
        sample_rate: waveform.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    // WAV header (44 bytes) + 2 bytes per sample
    let estimated_size = 44 + waveform.len() * waveform.channels() * 2;
    let mut cursor = Cursor::new(Vec::<u8>::with_capacity(estimated_size));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| TtsError::AudioFormat(format!("wav write err: {e}")))?;

        const I16_MAX_F32: f32 = i16::MAX as f32;
        for s in waveform.interleaved() {
            let v = (s.clamp(-1.0, 1.0) * I16_MAX_F32) as i16;
            writer
                .write_sample(v)
                .map_err(|e| TtsError::AudioFormat(format!("wav sample err: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| TtsError::AudioFormat(format!("wav finalize err: {e}")))?;
    }

    Ok(cursor.into_inner())
}

/// Encode a waveform as 16-bit PCM WAV and return Base64.
pub fn encode_wav_base64(waveform: &Waveform) -> Result<String> {
    Ok(general_purpose::STANDARD.encode(encode_wav(waveform)?))
}
