/// MIME type of a content type: everything before the first `;`, trimmed.
///
/// `text/plain;charset=utf-8` → `text/plain`
pub fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
}

/// Decode a hex payload, tolerating a `0x` prefix.
pub fn decode_content(raw: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_type_drops_parameters() {
        assert_eq!(normalize_mime_type("text/plain;charset=utf-8"), "text/plain");
        assert_eq!(normalize_mime_type("image/png"), "image/png");
        assert_eq!(normalize_mime_type(" text/html ; q=1"), "text/html");
        assert_eq!(normalize_mime_type(""), "");
    }

    #[test]
    fn content_decoding() {
        assert_eq!(decode_content("0x48656C6C6F").unwrap(), b"Hello");
        assert_eq!(decode_content("576f726c64").unwrap(), b"World");
        assert!(decode_content("0xzz").is_err());
    }
}
