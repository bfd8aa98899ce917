//! Audio decoding utilities
//!
//! Decodes uploaded audio to mono f32 PCM with symphonia. Used to measure
//! durations and to cut long recordings into transcription windows.

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Decoded audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count before mixdown
    pub channels: usize,
    pub duration_seconds: f64,
}

fn open_format(file_path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Failed to probe audio file: {}", file_path.display()))?;

    Ok(probed.format)
}

/// Decode an audio file to mono f32 samples
///
/// Corrupt packets are skipped; the stream ends at the first EOF.
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let mut format = open_format(file_path)?;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;
    let channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => samples.extend(mix_to_mono(&decoded)),
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(path = %file_path.display(), error = e, "Skipping corrupt packet");
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to decode packet in: {}", file_path.display())
                })
            }
        }
    }

    let duration_seconds = samples.len() as f64 / sample_rate as f64;

    tracing::debug!(
        path = %file_path.display(),
        sample_rate,
        channels = channel_count,
        duration_seconds = format!("{:.2}", duration_seconds),
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels: channel_count,
        duration_seconds,
    })
}

/// Duration of an audio file in seconds
///
/// Read from the container header when it declares a frame count, otherwise
/// measured by decoding the whole stream.
pub fn audio_duration_secs(file_path: &Path) -> Result<f64> {
    let format = open_format(file_path)?;
    let declared = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .and_then(|t| match (t.codec_params.n_frames, t.codec_params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => Some(frames as f64 / rate as f64),
            _ => None,
        });

    match declared {
        Some(duration) => Ok(duration),
        None => Ok(decode_audio_file(file_path)?.duration_seconds),
    }
}

fn mix_buffer<S>(buf: &AudioBuffer<S>) -> Vec<f32>
where
    S: Sample,
    f32: FromSample<S>,
{
    let channels = buf.spec().channels.count().max(1);
    (0..buf.frames())
        .map(|frame| {
            let sum: f32 = (0..channels)
                .map(|ch| f32::from_sample(buf.chan(ch)[frame]))
                .sum();
            sum / channels as f32
        })
        .collect()
}

/// Average all channels of a decoded buffer into mono f32
fn mix_to_mono(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => mix_buffer(buf),
        AudioBufferRef::U16(buf) => mix_buffer(buf),
        AudioBufferRef::U24(buf) => mix_buffer(buf),
        AudioBufferRef::U32(buf) => mix_buffer(buf),
        AudioBufferRef::S8(buf) => mix_buffer(buf),
        AudioBufferRef::S16(buf) => mix_buffer(buf),
        AudioBufferRef::S24(buf) => mix_buffer(buf),
        AudioBufferRef::S32(buf) => mix_buffer(buf),
        AudioBufferRef::F32(buf) => mix_buffer(buf),
        AudioBufferRef::F64(buf) => mix_buffer(buf),
    }
}
