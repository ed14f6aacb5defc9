use encoding_rs::WINDOWS_1252;

/// Decode object bytes as UTF-8, falling back to windows-1252 for files
/// exported by older tooling. The fallback maps every byte to a character,
/// so decoding never fails on malformed input.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.strip_prefix('\u{feff}').unwrap_or(text).to_string(),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}
