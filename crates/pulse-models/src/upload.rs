//! Upload validation rules.
//!
//! Both the file extension and the declared MIME type must be on the
//! allow-list, and validation runs before any storage write.

use thiserror::Error;

/// Maximum accepted upload size in bytes (100 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Maximum title length after trimming.
pub const MAX_TITLE_LENGTH: usize = 500;

/// Allowed video file extensions (lowercase, no dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm"];

/// Allowed declared MIME types.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
    "video/webm",
];

/// Upload rejected before any storage write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadValidationError {
    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(Option<String>),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("file exceeds maximum size of {max_bytes} bytes")]
    TooLarge { size_bytes: usize, max_bytes: usize },
}

/// Extract the lowercase extension from a filename.
fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Validate filename extension, declared MIME type, and size.
pub fn validate_upload(
    filename: &str,
    content_type: &str,
    size_bytes: usize,
    max_bytes: usize,
) -> Result<(), UploadValidationError> {
    let ext = extension_of(filename);
    match &ext {
        Some(e) if ALLOWED_EXTENSIONS.contains(&e.as_str()) => {}
        _ => return Err(UploadValidationError::UnsupportedExtension(ext)),
    }

    let declared = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&declared.as_str()) {
        return Err(UploadValidationError::UnsupportedContentType(declared));
    }

    if size_bytes > max_bytes {
        return Err(UploadValidationError::TooLarge {
            size_bytes,
            max_bytes,
        });
    }

    Ok(())
}

/// Trim and cap a user-provided title.
pub fn sanitize_title(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        trimmed.chars().take(MAX_TITLE_LENGTH).collect()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_formats() {
        for (name, mime) in [
            ("clip.mp4", "video/mp4"),
            ("holiday.MOV", "video/quicktime"),
            ("old.avi", "video/x-msvideo"),
            ("rip.mkv", "video/x-matroska"),
        ] {
            assert!(validate_upload(name, mime, 1024, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        }
    }

    #[test]
    fn rejects_disallowed_extension() {
        let err = validate_upload("malware.exe", "video/mp4", 1024, DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, UploadValidationError::UnsupportedExtension(Some(e)) if e == "exe"));
    }

    #[test]
    fn rejects_missing_extension() {
        let err =
            validate_upload("noext", "video/mp4", 1024, DEFAULT_MAX_UPLOAD_BYTES).unwrap_err();
        assert!(matches!(err, UploadValidationError::UnsupportedExtension(None)));
    }

    #[test]
    fn rejects_mismatched_content_type() {
        let err = validate_upload("clip.mp4", "application/octet-stream", 1024, DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, UploadValidationError::UnsupportedContentType(_)));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert!(validate_upload(
            "clip.mp4",
            "video/mp4; codecs=\"avc1.42E01E\"",
            1024,
            DEFAULT_MAX_UPLOAD_BYTES
        )
        .is_ok());
    }

    #[test]
    fn rejects_oversized_upload() {
        let err = validate_upload("clip.mp4", "video/mp4", 200 * 1024 * 1024, DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert!(matches!(err, UploadValidationError::TooLarge { .. }));
    }

    #[test]
    fn title_is_trimmed_and_capped() {
        assert_eq!(sanitize_title("  Demo  "), "Demo");
        let long = "x".repeat(MAX_TITLE_LENGTH + 50);
        assert_eq!(sanitize_title(&long).chars().count(), MAX_TITLE_LENGTH);
    }
}
