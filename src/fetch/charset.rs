//! Charset detection and body decoding
//!
//! The charset comes from the `Content-Type` header's `charset=` attribute,
//! defaulting to UTF-8. Decoding never fails: an unknown label or bytes
//! that are invalid for the declared charset fall back to UTF-8 with
//! U+FFFD substitution, and the outcome says which path was taken.
//!
//! ASCII and ISO-8859-1 are decoded by their own definitions rather than
//! the WHATWG table, which folds both into windows-1252: ASCII rejects any
//! byte above 0x7F and Latin-1 maps every byte to the code point of the
//! same value.

use encoding_rs::Encoding;

/// Result of turning a response body into text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// Decoded cleanly with the declared (or default) charset
    Decoded(String),
    /// Fell back to lossy UTF-8
    DecodedWithReplacement(String),
}

impl DecodeOutcome {
    pub fn into_text(self) -> String {
        match self {
            Self::Decoded(text) | Self::DecodedWithReplacement(text) => text,
        }
    }

    pub const fn used_replacement(&self) -> bool {
        matches!(self, Self::DecodedWithReplacement(_))
    }
}

/// Extract the `charset` attribute from a `Content-Type` value
///
/// Takes the text after the last `charset=` up to the next `;`, trimmed and
/// unquoted. Returns `None` when absent or empty.
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    const KEY: &str = "charset=";

    // ASCII lowercasing keeps byte offsets aligned with the original
    let lowered = content_type.to_ascii_lowercase();
    let start = lowered.rfind(KEY)? + KEY.len();
    let value = content_type[start..]
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '"' || c == '\'');

    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Labels that mean 7-bit US-ASCII
const ASCII_LABELS: &[&str] = &[
    "ascii",
    "us_ascii",
    "us",
    "646",
    "ansi_x3.4_1968",
    "ansi_x3.4_1986",
    "iso646_us",
    "iso_ir_6",
    "cp367",
    "ibm367",
    "csascii",
];

/// Labels that mean ISO-8859-1 proper
const LATIN1_LABELS: &[&str] = &[
    "latin1",
    "latin_1",
    "latin",
    "l1",
    "iso_8859_1",
    "iso8859_1",
    "iso_8859_1:1987",
    "8859",
    "iso_ir_100",
    "cp819",
    "ibm819",
    "csisolatin1",
];

/// Lowercase a label and unify `-` and space with `_`
fn normalize_label(label: &str) -> String {
    label
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Decode `bytes` using `charset` (UTF-8 when `None`)
///
/// ASCII and Latin-1 labels are handled here; every other label follows
/// the WHATWG Encoding Standard. A BOM is kept as text rather than used to
/// override the declared charset.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> DecodeOutcome {
    let label = charset.unwrap_or("utf-8");
    let normalized = normalize_label(label);

    let decoded = if ASCII_LABELS.contains(&normalized.as_str()) {
        decode_ascii(bytes)
    } else if LATIN1_LABELS.contains(&normalized.as_str()) {
        Some(decode_latin1(bytes))
    } else {
        Encoding::for_label(label.trim().as_bytes())
            .and_then(|encoding| encoding.decode_without_bom_handling_and_without_replacement(bytes))
            .map(std::borrow::Cow::into_owned)
    };

    match decoded {
        Some(text) => DecodeOutcome::Decoded(text),
        None => {
            DecodeOutcome::DecodedWithReplacement(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Strict 7-bit decode, `None` on the first byte above 0x7F
fn decode_ascii(bytes: &[u8]) -> Option<String> {
    bytes
        .is_ascii()
        .then(|| bytes.iter().copied().map(char::from).collect())
}

/// Every byte is the code point of the same value, C1 range included
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}
