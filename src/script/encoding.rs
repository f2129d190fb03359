//! Decoding of script file bytes.
//!
//! Scripts written on Windows are often saved in a legacy code page and say so
//! with a `# -*- coding: cp1252 -*-` declaration on one of their first two
//! lines. A byte-order mark takes precedence over the declaration, and UTF-8
//! is assumed when neither is present.

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Coding declaration, e.g. `# -*- coding: latin-1 -*-` or `# vim: set fileencoding=utf-8 :`
static CODING_COOKIE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u)^[ \t\x0c]*#[^\r\n]*?coding[:=][ \t]*([-\w.]+)").unwrap()
});

/// Decode raw script bytes to text. Malformed sequences become U+FFFD.
pub(crate) fn decode_source(bytes: &[u8], source_id: &str) -> String {
    let declared = declared_encoding(bytes, source_id).unwrap_or(UTF_8);
    // `decode` sniffs and strips a byte-order mark before using `declared`
    let (text, used, had_errors) = declared.decode(bytes);
    if had_errors {
        warn!(
            "{}: source is not valid {}, undecodable bytes were replaced",
            source_id,
            used.name()
        );
    }
    text.into_owned()
}

fn declared_encoding(bytes: &[u8], source_id: &str) -> Option<&'static Encoding> {
    let label = coding_cookie(bytes)?;
    match Encoding::for_label(normalize_label(&label).as_bytes()) {
        // Declarations are themselves ASCII, so UTF-16 and friends cannot be honest
        Some(encoding) if encoding.is_ascii_compatible() => {
            debug!("{}: declared encoding '{}' ({})", source_id, label, encoding.name());
            Some(encoding)
        }
        _ => {
            warn!(
                "{}: unsupported source encoding '{}', reading as UTF-8",
                source_id, label
            );
            None
        }
    }
}

/// Encoding name from the coding declaration on line 1 or 2.
///
/// Line 2 only counts when line 1 is blank or a comment (usually a shebang).
fn coding_cookie(bytes: &[u8]) -> Option<String> {
    for line in bytes.split(|&b| b == b'\n').take(2) {
        if let Some(captures) = CODING_COOKIE_RE.captures(line) {
            return Some(String::from_utf8_lossy(&captures[1]).into_owned());
        }
        if !is_blank_or_comment(line) {
            return None;
        }
    }
    None
}

fn is_blank_or_comment(line: &[u8]) -> bool {
    matches!(
        line.iter()
            .copied()
            .find(|b| !matches!(b, b' ' | b'\t' | b'\x0c' | b'\r')),
        None | Some(b'#')
    )
}

/// Map Python's spelling of an encoding name onto a WHATWG label
fn normalize_label(label: &str) -> String {
    let lower = label.to_ascii_lowercase().replace('_', "-");
    if lower == "utf-8" || lower.starts_with("utf-8-") {
        return "utf-8".to_string();
    }
    for latin in ["latin-1", "iso-8859-1", "iso-latin-1"] {
        if lower == latin || lower.starts_with(&format!("{}-", latin)) {
            return "iso-8859-1".to_string();
        }
    }
    lower
}
