//! Media file whitelist checks.
//!
//! Callers run these before handing a file to the transfer step; the upload
//! client itself never validates file content.

/// MIME types accepted for upload
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    // video
    "video/mp4",
    "video/avi",
    "video/mov",
    "video/quicktime",
    "video/wmv",
    "video/flv",
    "video/webm",
    "video/mkv",
    "video/m4v",
    "video/3gp",
    "video/ts",
    "video/mts",
    "video/m2ts",
    "video/vob",
    "video/ogv",
    "video/asf",
    "video/rm",
    "video/rmvb",
    "video/dv",
    "video/mxf",
    "video/xvid",
    "video/x-msvideo",
    "video/x-ms-wmv",
    "video/x-flv",
    "video/x-matroska",
    // audio
    "audio/mp3",
    "audio/wav",
    "audio/aac",
    "audio/ogg",
    "audio/flac",
    "audio/m4a",
    "audio/wma",
    "audio/ra",
    "audio/amr",
    "audio/ape",
    "audio/opus",
    "audio/webm",
    "audio/mp4",
    "audio/3gpp",
    "audio/3gpp2",
    "audio/x-wav",
    "audio/x-aiff",
    "audio/x-m4a",
    "audio/x-ms-wma",
];

/// File extensions accepted when the MIME type is missing or unknown
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    // video
    ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".mkv", ".m4v", ".3gp", ".ts", ".mts",
    ".m2ts", ".vob", ".ogv", ".asf", ".rm", ".rmvb", ".dv", ".mxf", ".xvid", ".divx", ".f4v",
    ".f4p", ".f4a", ".f4b", ".m4b", ".m4p", ".m4r", ".3g2", ".3gp2", ".3gpp", ".3gpp2", ".3ga",
    ".3ga2", ".3gpa", ".3gpp3", ".3gpp4",
    // audio
    ".mp3", ".wav", ".aac", ".ogg", ".flac", ".m4a", ".wma", ".ra", ".amr", ".ape", ".opus",
    ".f4r", ".f4s", ".f4t", ".f4u", ".f4w", ".f4x", ".f4y", ".f4z",
];

/// Common validation errors for media files
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported media file: {file_name} (content type: {})", .content_type.as_deref().unwrap_or("unknown"))]
    UnsupportedMedia {
        file_name: String,
        content_type: Option<String>,
    },

    #[error("Empty file: {0}")]
    EmptyFile(String),
}

pub fn is_allowed_content_type(content_type: &str) -> bool {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    ALLOWED_CONTENT_TYPES.contains(&normalized.as_str())
}

pub fn has_allowed_extension(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    ALLOWED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// A file is accepted if its MIME type is whitelisted, otherwise if its
/// name ends with a whitelisted extension.
pub fn is_valid_media_file(file_name: &str, content_type: Option<&str>) -> bool {
    if content_type.is_some_and(is_allowed_content_type) {
        return true;
    }
    has_allowed_extension(file_name)
}

pub fn validate_media_file(
    file_name: &str,
    content_type: Option<&str>,
    size: usize,
) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile(file_name.to_string()));
    }
    if !is_valid_media_file(file_name, content_type) {
        return Err(ValidationError::UnsupportedMedia {
            file_name: file_name.to_string(),
            content_type: content_type.map(str::to_string),
        });
    }
    Ok(())
}
