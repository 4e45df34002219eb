/// Generate a fresh opaque identifier (uuid v4, string form).
///
/// Used for session ids and anywhere a stable unique key is needed.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Generate a short identifier for tagging individual tool calls.
pub fn new_call_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}
