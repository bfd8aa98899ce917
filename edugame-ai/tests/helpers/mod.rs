//! Test Helper Utilities
//!
//! Shared utilities for testing edugame-ai

#![allow(dead_code)]

pub mod app;
pub mod audio_generator;

pub use app::{
    body_json, count_files, get, post_json, post_multipart, post_wav, Part, TestApp,
};
pub use audio_generator::{generate_test_wav, wav_bytes, AudioConfig};
