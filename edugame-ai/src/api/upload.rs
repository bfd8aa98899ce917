//! Multipart audio uploads
//!
//! A declared Content-Type is checked before the audio part is read. The
//! part is then buffered while its size is counted, sniffed when no usable
//! type was declared, and only then written to a [`TempAudioFile`].
//! Rejected uploads never touch disk.

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::{ApiResult, ServiceError};
use crate::utils::TempAudioFile;

/// Form field carrying the audio file
pub const AUDIO_FIELD: &str = "audio_file";

/// Audio content types accepted on upload routes
pub const ACCEPTED_AUDIO_TYPES: [&str; 10] = [
    "audio/wav",
    "audio/x-wav",
    "audio/wave",
    "audio/mpeg",
    "audio/mp3",
    "audio/m4a",
    "audio/x-m4a",
    "audio/mp4",
    "audio/ogg",
    "audio/webm",
];

/// Uploaded audio on disk for the rest of the request
#[derive(Debug)]
pub struct AudioUpload {
    pub file: TempAudioFile,
    pub content_type: String,
    pub size: u64,
}

impl AudioUpload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Parsed multipart form: at most one audio part plus text fields
#[derive(Debug, Default)]
pub struct UploadForm {
    pub audio: Option<AudioUpload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Trimmed text field, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// The audio part, or 400 when the form has none
    pub fn require_audio(self) -> ApiResult<AudioUpload> {
        self.audio
            .ok_or_else(|| ServiceError::InvalidInput(format!("missing '{}' field", AUDIO_FIELD)))
    }
}

/// Lowercased media type without parameters
fn normalize_media_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Declared media type, unless missing or `application/octet-stream`
pub fn declared_audio_type(declared: Option<&str>) -> Option<String> {
    declared
        .map(normalize_media_type)
        .filter(|t| !t.is_empty() && t != "application/octet-stream")
}

/// Media type sniffed from the leading bytes
///
/// Container types that sniff as video (webm, mp4) are treated as their
/// audio counterparts.
pub fn sniff_audio_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| match kind.mime_type() {
        "video/webm" => "audio/webm".to_string(),
        "video/mp4" => "audio/mp4".to_string(),
        other => other.to_string(),
    })
}

fn unsupported(declared: Option<&str>) -> ServiceError {
    ServiceError::UnsupportedMediaType(format!(
        "{} (accepted: {})",
        declared.unwrap_or("unknown"),
        ACCEPTED_AUDIO_TYPES.join(", ")
    ))
}

pub fn is_accepted_audio_type(media_type: &str) -> bool {
    ACCEPTED_AUDIO_TYPES.contains(&media_type)
}

/// File extension for the temp file
fn extension_for(filename: Option<&str>, media_type: &str) -> Option<String> {
    let from_name = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_string);
    from_name.or_else(|| {
        let ext = match media_type {
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/m4a" | "audio/x-m4a" => "m4a",
            "audio/mp4" => "mp4",
            "audio/ogg" => "ogg",
            "audio/webm" => "webm",
            _ => return None,
        };
        Some(ext.to_string())
    })
}

fn multipart_error(e: MultipartError, limit: u64) -> ServiceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge {
            size: limit.saturating_add(1),
            limit,
        }
    } else {
        ServiceError::InvalidInput(format!("multipart error: {}", e.body_text()))
    }
}

async fn read_limited(mut field: Field<'_>, max_bytes: u64) -> ApiResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let size = (data.len() + chunk.len()) as u64;
        if size > max_bytes {
            return Err(ServiceError::PayloadTooLarge {
                size,
                limit: max_bytes,
            });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Read a multipart form, storing the audio part in `temp_dir`
///
/// An empty audio part without a file name is treated as absent, which is
/// what browsers send for an unselected file input.
pub async fn read_upload_form(
    multipart: &mut Multipart,
    temp_dir: Option<&Path>,
    max_bytes: u64,
) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name != AUDIO_FIELD {
            let value = field
                .text()
                .await
                .map_err(|e| multipart_error(e, max_bytes))?;
            form.fields.insert(name, value);
            continue;
        }

        if form.audio.is_some() {
            return Err(ServiceError::InvalidInput(format!(
                "more than one '{}' field",
                AUDIO_FIELD
            )));
        }

        let filename = field.file_name().map(str::to_string);
        let declared = field.content_type().map(str::to_string);

        // A usable declared type is checked before any byte is read
        let declared_type = declared_audio_type(declared.as_deref());
        if declared_type
            .as_deref()
            .is_some_and(|t| !is_accepted_audio_type(t))
        {
            return Err(unsupported(declared.as_deref()));
        }

        let data = read_limited(field, max_bytes).await?;

        if data.is_empty() {
            if filename.as_deref().map_or(true, str::is_empty) {
                continue;
            }
            return Err(ServiceError::InvalidInput(format!(
                "'{}' is empty",
                AUDIO_FIELD
            )));
        }

        let content_type = declared_type
            .or_else(|| sniff_audio_type(&data))
            .filter(|t| is_accepted_audio_type(t))
            .ok_or_else(|| unsupported(declared.as_deref()))?;

        let extension = extension_for(filename.as_deref(), &content_type);
        let file = TempAudioFile::write(temp_dir, extension.as_deref(), &data).await?;
        debug!(
            filename = filename.as_deref().unwrap_or(""),
            content_type = %content_type,
            bytes = data.len(),
            "Audio upload stored"
        );

        form.audio = Some(AudioUpload {
            file,
            content_type,
            size: data.len() as u64,
        });
    }

    Ok(form)
}
