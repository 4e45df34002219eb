//! Attachment validation and encoding.
//!
//! Images from a small mime allowlist are inlined as base64; anything
//! else is optimistically treated as text, capped in size. Violations
//! are validation errors raised before any network call.

use base64::Engine;

use crate::AiError;

/// Image types that can be sent as inline parts.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Cap for non-image attachments, to keep prompts bounded.
pub const MAX_TEXT_ATTACHMENT_BYTES: usize = 500 * 1024;

/// A file the user attached to a message, as read from disk.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// An attachment validated and encoded for sending.
#[derive(Debug, Clone)]
pub enum PreparedAttachment {
    InlineImage { mime: String, data: String },
    TextFile { name: String, content: String },
}

/// Validate and encode an attachment.
///
/// Oversized or undecodable files fail here, with no request sent.
pub fn prepare_attachment(attachment: &Attachment) -> Result<PreparedAttachment, AiError> {
    if SUPPORTED_IMAGE_TYPES.contains(&attachment.mime.as_str()) {
        let data = base64::engine::general_purpose::STANDARD.encode(&attachment.bytes);
        return Ok(PreparedAttachment::InlineImage {
            mime: attachment.mime.clone(),
            data,
        });
    }

    if attachment.bytes.len() > MAX_TEXT_ATTACHMENT_BYTES {
        return Err(AiError::Validation(format!(
            "could not process \"{}\": file size exceeds the 500KB limit",
            attachment.name
        )));
    }

    match String::from_utf8(attachment.bytes.clone()) {
        Ok(content) => Ok(PreparedAttachment::TextFile {
            name: attachment.name.clone(),
            content,
        }),
        Err(_) => Err(AiError::Validation(format!(
            "could not process \"{}\": please ensure it's a text-based file under 500KB",
            attachment.name
        ))),
    }
}
