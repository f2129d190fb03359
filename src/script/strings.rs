/// Python string literal decoding
/// Handles prefixes (r, u, b and combinations), all quote styles and escape sequences
use crate::errors::LiteralError;

/// Decoded value of a single string literal token
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StringLiteral {
    Text(String),
    Bytes(Vec<u8>),
}

impl StringLiteral {
    /// Append another literal, as implicit concatenation (`"a" "b"`) does
    pub(crate) fn concat(self, other: StringLiteral) -> Result<StringLiteral, LiteralError> {
        match (self, other) {
            (StringLiteral::Text(mut a), StringLiteral::Text(b)) => {
                a.push_str(&b);
                Ok(StringLiteral::Text(a))
            }
            (StringLiteral::Bytes(mut a), StringLiteral::Bytes(b)) => {
                a.extend_from_slice(&b);
                Ok(StringLiteral::Bytes(a))
            }
            _ => Err(LiteralError::MixedStringKinds),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Prefix {
    raw: bool,
    bytes: bool,
    formatted: bool,
}

fn parse_prefix(prefix: &str) -> Result<Prefix, LiteralError> {
    let mut flags = Prefix::default();
    for c in prefix.chars() {
        match c.to_ascii_lowercase() {
            'r' => flags.raw = true,
            'b' => flags.bytes = true,
            'f' => flags.formatted = true,
            'u' => {}
            _ => {
                return Err(LiteralError::UnsupportedString {
                    reason: format!("unknown string prefix '{}'", prefix),
                })
            }
        }
    }
    Ok(flags)
}

/// Decode the full source text of one string token, prefix and quotes included
pub(crate) fn decode_string_literal(text: &str) -> Result<StringLiteral, LiteralError> {
    let prefix_len = text
        .find(|c: char| c == '\'' || c == '"')
        .ok_or_else(|| LiteralError::UnsupportedString {
            reason: "missing quotes".to_string(),
        })?;
    let (prefix, quoted) = text.split_at(prefix_len);
    let flags = parse_prefix(prefix)?;

    if flags.formatted {
        return Err(LiteralError::UnsupportedString {
            reason: "f-strings are evaluated at runtime".to_string(),
        });
    }

    let quote_len = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        3
    } else {
        1
    };
    let delimiter = &quoted[..quote_len];
    if quoted.len() < quote_len * 2 || !quoted.ends_with(delimiter) {
        return Err(LiteralError::UnsupportedString {
            reason: "unterminated string".to_string(),
        });
    }
    let body = &quoted[quote_len..quoted.len() - quote_len];

    let mut sink = if flags.bytes {
        Sink::Bytes(Vec::with_capacity(body.len()))
    } else {
        Sink::Text(String::with_capacity(body.len()))
    };

    if flags.raw {
        for c in body.chars() {
            sink.push_char(c)?;
        }
    } else {
        decode_escapes(body, &mut sink)?;
    }

    Ok(sink.finish())
}

enum Sink {
    Text(String),
    Bytes(Vec<u8>),
}

impl Sink {
    fn push_char(&mut self, c: char) -> Result<(), LiteralError> {
        match self {
            Sink::Text(s) => s.push(c),
            Sink::Bytes(b) => {
                if !c.is_ascii() {
                    return Err(LiteralError::UnsupportedString {
                        reason: "bytes can only contain ASCII literal characters".to_string(),
                    });
                }
                b.push(c as u8);
            }
        }
        Ok(())
    }

    /// Push a numeric escape value (`\x..`, octal, `\u....`)
    fn push_code(&mut self, code: u32, escape: &str) -> Result<(), LiteralError> {
        let invalid = || LiteralError::InvalidEscape {
            escape: escape.to_string(),
        };
        match self {
            Sink::Text(s) => s.push(char::from_u32(code).ok_or_else(invalid)?),
            Sink::Bytes(b) => b.push(u8::try_from(code).map_err(|_| invalid())?),
        }
        Ok(())
    }

    fn is_bytes(&self) -> bool {
        matches!(self, Sink::Bytes(_))
    }

    fn finish(self) -> StringLiteral {
        match self {
            Sink::Text(s) => StringLiteral::Text(s),
            Sink::Bytes(b) => StringLiteral::Bytes(b),
        }
    }
}

fn decode_escapes(body: &str, sink: &mut Sink) -> Result<(), LiteralError> {
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            sink.push_char(c)?;
            continue;
        }

        let Some(escaped) = chars.next() else {
            return Err(LiteralError::InvalidEscape {
                escape: "\\".to_string(),
            });
        };

        match escaped {
            // Line continuation
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' | '\'' | '"' => sink.push_char(escaped)?,
            'a' => sink.push_char('\x07')?,
            'b' => sink.push_char('\x08')?,
            'f' => sink.push_char('\x0c')?,
            'n' => sink.push_char('\n')?,
            'r' => sink.push_char('\r')?,
            't' => sink.push_char('\t')?,
            'v' => sink.push_char('\x0b')?,
            '0'..='7' => {
                let mut digits = String::from(escaped);
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(&d) if ('0'..='7').contains(&d) => {
                            digits.push(d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let escape = format!("\\{}", digits);
                let code = u32::from_str_radix(&digits, 8).map_err(|_| LiteralError::InvalidEscape {
                    escape: escape.clone(),
                })?;
                sink.push_code(code, &escape)?;
            }
            'x' => {
                let (code, escape) = take_hex(&mut chars, 'x', 2)?;
                sink.push_code(code, &escape)?;
            }
            'u' | 'U' if !sink.is_bytes() => {
                let width = if escaped == 'u' { 4 } else { 8 };
                let (code, escape) = take_hex(&mut chars, escaped, width)?;
                sink.push_code(code, &escape)?;
            }
            'N' if !sink.is_bytes() => {
                return Err(LiteralError::UnsupportedString {
                    reason: "named unicode escapes (\\N{...})".to_string(),
                });
            }
            // Unknown escapes are kept verbatim
            other => {
                sink.push_char('\\')?;
                sink.push_char(other)?;
            }
        }
    }

    Ok(())
}

fn take_hex(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    marker: char,
    width: usize,
) -> Result<(u32, String), LiteralError> {
    let mut digits = String::with_capacity(width);
    for _ in 0..width {
        match chars.peek() {
            Some(d) if d.is_ascii_hexdigit() => {
                digits.push(*d);
                chars.next();
            }
            _ => break,
        }
    }
    let escape = format!("\\{}{}", marker, digits);
    if digits.len() != width {
        return Err(LiteralError::InvalidEscape { escape });
    }
    let code = u32::from_str_radix(&digits, 16)
        .map_err(|_| LiteralError::InvalidEscape { escape: escape.clone() })?;
    Ok((code, escape))
}
