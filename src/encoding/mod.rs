//! Encoding detection and transcoding.
//!
//! Documents are loaded as bytes and decoded to UTF-8 before parsing; on save the
//! serialized text is encoded back into the encoding named by the document's XML
//! declaration. Both directions go through `encoding_rs`.
//!
//! Detection order on load:
//!
//! 1. A Byte Order Mark at the start of the input selects UTF-8 or UTF-16.
//! 2. Without a BOM the input is assumed to be UTF-8.
//! 3. The `encoding=` pseudo-attribute of the XML declaration overrides the
//!    guess when it names a different encoding.

use std::fmt;

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order Mark.
///
/// Returns the encoding name and the number of BOM bytes to skip.
///
/// ```
/// use xmledit::encoding::detect_encoding;
///
/// assert_eq!(detect_encoding(b"\xEF\xBB\xBF<a/>"), ("UTF-8", 3));
/// assert_eq!(detect_encoding(b"<a/>"), ("UTF-8", 0));
/// ```
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    match bytes {
        [0xEF, 0xBB, 0xBF, ..] => ("UTF-8", 3),
        [0xFE, 0xFF, ..] => ("UTF-16BE", 2),
        [0xFF, 0xFE, ..] => ("UTF-16LE", 2),
        _ => ("UTF-8", 0),
    }
}

/// Transcodes a byte slice from the named encoding into a UTF-8 `String`.
///
/// # Errors
///
/// Returns `EncodingError` if the encoding name is not recognized or if the
/// input contains malformed byte sequences.
pub fn transcode(bytes: &[u8], encoding_name: &str) -> Result<String, EncodingError> {
    let encoding = lookup(encoding_name)?;
    let (result, _used_encoding, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {encoding_name}"
        )));
    }
    Ok(result.into_owned())
}

/// Decodes raw XML bytes into a UTF-8 string, detecting the encoding from the
/// BOM and the XML declaration.
///
/// # Errors
///
/// Returns `EncodingError` if the bytes are invalid for the detected encoding or
/// the declared encoding is unsupported.
///
/// ```
/// use xmledit::encoding::decode_to_utf8;
///
/// let text = decode_to_utf8(b"<?xml version=\"1.0\"?><root/>").unwrap();
/// assert!(text.ends_with("<root/>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);
    let content = &bytes[bom_skip..];

    if bom_encoding == "UTF-8" {
        if let Ok(text) = std::str::from_utf8(content) {
            return match declared_encoding(text.as_bytes()) {
                Some(declared) if !is_utf8_label(&declared) => transcode(content, &declared),
                _ => Ok(text.to_string()),
            };
        }
        // The declaration is ASCII-compatible, so it can be read off the raw
        // bytes of a single-byte encoding such as ISO-8859-1.
        if let Some(declared) = declared_encoding(content) {
            return transcode(content, &declared);
        }
        return Err(EncodingError::new("input is not valid UTF-8"));
    }

    let text = transcode(content, bom_encoding)?;
    if let Some(declared) = declared_encoding(text.as_bytes()) {
        let declared = declared.to_ascii_uppercase();
        // A BOM wins over "UTF-16" since it fixes the byte order.
        if declared != bom_encoding && declared != "UTF-16" {
            return transcode(content, &declared);
        }
    }
    Ok(text)
}

/// Encodes serialized UTF-8 text into the named encoding.
///
/// UTF-16 output is written with a byte order mark. Characters that the target
/// encoding cannot represent are written as numeric character references.
/// Those are only valid in text and attribute values; callers check names and
/// other markup with [`first_unencodable`] first.
///
/// # Errors
///
/// Returns `EncodingError` if the encoding name is not recognized.
pub fn encode_from_utf8(text: &str, encoding_name: &str) -> Result<Vec<u8>, EncodingError> {
    match encoding_name.to_ascii_uppercase().as_str() {
        "UTF-8" | "UTF8" => Ok(text.as_bytes().to_vec()),
        "UTF-16" | "UTF-16LE" => Ok(encode_utf16(text, u16::to_le_bytes, [0xFF, 0xFE])),
        "UTF-16BE" => Ok(encode_utf16(text, u16::to_be_bytes, [0xFE, 0xFF])),
        _ => {
            let encoding = lookup(encoding_name)?;
            let (bytes, _used_encoding, _had_unmappable) = encoding.encode(text);
            Ok(bytes.into_owned())
        }
    }
}

/// Returns the first character of `text` that the named encoding cannot
/// represent, or `None` if all of it can be written.
///
/// # Errors
///
/// Returns `EncodingError` if the encoding name is not recognized.
pub fn first_unencodable(text: &str, encoding_name: &str) -> Result<Option<char>, EncodingError> {
    if is_unicode_label(encoding_name) {
        return Ok(None);
    }
    let encoding = lookup(encoding_name)?;
    let (_, _, had_unmappable) = encoding.encode(text);
    if !had_unmappable {
        return Ok(None);
    }
    let mut buf = [0u8; 4];
    Ok(text
        .chars()
        .find(|c| encoding.encode(c.encode_utf8(&mut buf)).2))
}

fn is_unicode_label(encoding_name: &str) -> bool {
    matches!(
        encoding_name.to_ascii_uppercase().as_str(),
        "UTF-8" | "UTF8" | "UTF-16" | "UTF-16LE" | "UTF-16BE"
    )
}

fn encode_utf16(text: &str, to_bytes: fn(u16) -> [u8; 2], bom: [u8; 2]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + text.len() * 2);
    out.extend_from_slice(&bom);
    for unit in text.encode_utf16() {
        out.extend_from_slice(&to_bytes(unit));
    }
    out
}

fn lookup(encoding_name: &str) -> Result<&'static encoding_rs::Encoding, EncodingError> {
    encoding_rs::Encoding::for_label(encoding_name.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {encoding_name}")))
}

/// Reads the `encoding` pseudo-attribute from a leading XML declaration.
///
/// Works on raw bytes so it can run before the input has been decoded.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let scan = &bytes[..bytes.len().min(256)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let needle = b"encoding";
    let at = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = skip_ascii_whitespace(&decl[at + needle.len()..]);
    let rest = skip_ascii_whitespace(rest.strip_prefix(b"=")?);

    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let end = value.iter().position(|&b| b == quote)?;
    let value = &value[..end];
    value
        .is_ascii()
        .then(|| String::from_utf8_lossy(value).into_owned())
}

fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("UTF-8") || label.eq_ignore_ascii_case("UTF8")
}
