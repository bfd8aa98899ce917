//! WAV fixture generator

use std::io::Cursor;
use std::path::Path;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 2.0,
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

fn write_tone<W: std::io::Write + std::io::Seek>(
    sink: W,
    config: &AudioConfig,
) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(sink, spec)?;
    let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

    // 220Hz tone at 30% amplitude
    for i in 0..total_frames {
        let t = i as f32 / config.sample_rate as f32;
        let sample = (0.3 * (2.0 * std::f32::consts::PI * 220.0 * t).sin() * i16::MAX as f32) as i16;
        for _ in 0..config.channels {
            writer.write_sample(sample)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// In-memory WAV file
pub fn wav_bytes(config: &AudioConfig) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    write_tone(&mut cursor, config).expect("generate wav");
    cursor.into_inner()
}

/// WAV file at `path`
pub fn generate_test_wav(path: &Path, config: &AudioConfig) -> anyhow::Result<()> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_tone(file, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_bytes_have_riff_header() {
        let bytes = wav_bytes(&AudioConfig::default());
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        // 2s of 16-bit mono at 16kHz plus header
        assert!(bytes.len() > 64_000);
    }
}
