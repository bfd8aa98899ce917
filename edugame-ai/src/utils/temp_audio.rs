//! Scoped temp files for uploaded audio
//!
//! The file is removed when the guard drops, on success and error paths
//! alike.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PREFIX: &str = "edugame-audio-";
const MAX_SUFFIX_LEN: usize = 5;

/// Audio file on disk for the duration of one request
#[derive(Debug)]
pub struct TempAudioFile {
    file: NamedTempFile,
}

/// Reduce an extension to a safe `.ext` suffix
///
/// Only short ASCII-alphanumeric extensions are kept; anything else yields
/// no suffix.
pub fn sanitize_extension(extension: Option<&str>) -> String {
    match extension {
        Some(ext)
            if !ext.is_empty()
                && ext.len() <= MAX_SUFFIX_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

impl TempAudioFile {
    /// Create an empty temp file in `dir` (system temp dir when `None`)
    pub fn create(dir: Option<&Path>, extension: Option<&str>) -> io::Result<Self> {
        let suffix = sanitize_extension(extension);
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX).suffix(&suffix);

        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(Self { file })
    }

    /// Create a temp file holding `bytes`
    pub async fn write(dir: Option<&Path>, extension: Option<&str>, bytes: &[u8]) -> io::Result<Self> {
        let temp = Self::create(dir, extension)?;
        tokio::fs::write(temp.path(), bytes).await?;
        tracing::debug!(path = %temp.path().display(), bytes = bytes.len(), "Wrote temp audio file");
        Ok(temp)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(sanitize_extension(Some("WEBM")), ".webm");
        assert_eq!(sanitize_extension(Some("wav")), ".wav");
        assert_eq!(sanitize_extension(Some("../../etc")), "");
        assert_eq!(sanitize_extension(Some("toolongext")), "");
        assert_eq!(sanitize_extension(None), "");
    }

    #[tokio::test]
    async fn file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let temp = TempAudioFile::write(Some(dir.path()), Some("wav"), b"RIFF")
            .await
            .unwrap();
        let path = temp.to_path_buf();

        assert!(path.exists());
        assert!(path.to_string_lossy().ends_with(".wav"));
        drop(temp);
        assert!(!path.exists());
    }
}
