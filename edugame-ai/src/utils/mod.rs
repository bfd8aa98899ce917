//! Utility modules for edugame-ai

pub mod audio_decoder;
pub mod temp_audio;
pub mod wav_writer;

pub use audio_decoder::{audio_duration_secs, decode_audio_file, DecodedAudio};
pub use temp_audio::TempAudioFile;
pub use wav_writer::write_wav_mono;
