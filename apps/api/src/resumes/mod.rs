// Resume intake and status. The pipeline itself runs in crate::pipeline.

pub mod handlers;

/// MIME types the NLP service can extract text from.
pub const ALLOWED_MIME_TYPES: [&str; 2] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Resolves the MIME type of an upload. Browsers sometimes send
/// `application/octet-stream`, so the file extension is the fallback.
pub fn resolve_mime_type(declared: Option<&str>, file_name: &str) -> Option<&'static str> {
    let declared = declared
        .map(|m| m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase())
        .unwrap_or_default();

    if let Some(allowed) = ALLOWED_MIME_TYPES.into_iter().find(|m| *m == declared) {
        return Some(allowed);
    }
    if !declared.is_empty() && declared != "application/octet-stream" {
        return None;
    }

    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => Some(ALLOWED_MIME_TYPES[0]),
        Some("docx") => Some(ALLOWED_MIME_TYPES[1]),
        _ => None,
    }
}
