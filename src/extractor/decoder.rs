use regex::Captures;
use tracing::trace;

use super::patterns::{PERCENT_ESCAPE_REGEX, UNICODE_ESCAPE_REGEX};

/// Bare escape forms that survive HTML text extraction without their
/// leading backslash or with a double-encoded percent sign.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("u002F", "/"),
    ("u002f", "/"),
    ("u002E", "."),
    ("u002e", "."),
    ("u0040", "@"),
    ("u000A", " "),
    ("u000a", " "),
    ("u00A0", " "),
    ("u00a0", " "),
    ("u003C", "<"),
    ("u003c", "<"),
    ("u003E", ">"),
    ("u003e", ">"),
    ("%252F", "/"),
    ("%252f", "/"),
    ("%252E", "."),
    ("%252e", "."),
];

/// Decodes obfuscated characters so domains hidden behind escapes surface as
/// plain text.
///
/// Generic `\uXXXX` decoding runs first, then the fixed substitution table,
/// then generic `%XX` decoding. Only escapes that decode to printable ASCII
/// are replaced; all other sequences are left as they are.
pub fn decode_escapes(text: &str) -> String {
    let mut decoded = UNICODE_ESCAPE_REGEX
        .replace_all(text, |caps: &Captures| {
            decode_hex(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();

    for (from, to) in SUBSTITUTIONS {
        if decoded.contains(from) {
            decoded = decoded.replace(from, to);
        }
    }

    let decoded = PERCENT_ESCAPE_REGEX.replace_all(&decoded, |caps: &Captures| {
        decode_hex(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    trace!("Decoded {} bytes of page text", decoded.len());
    decoded.into_owned()
}

fn decode_hex(hex: &str) -> Option<String> {
    let code = u32::from_str_radix(hex, 16).ok()?;
    let c = char::from_u32(code)?;
    if c.is_ascii() && (c.is_ascii_graphic() || c == ' ') {
        Some(c.to_string())
    } else {
        None
    }
}
