//! sh/bash quoting
//!
//! Three escape modes exist. ANSI-C (`$'...'`) is the default, POSIX
//! single quotes are portable to any `sh`, and the legacy table keeps
//! scripts generated by older runners byte-identical.

use girder_core::FeatureSet;

/// Quoting style for POSIX shells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BashEscapeMode {
    /// `$'...'` with C escapes and `\xHH` for everything non-printable
    #[default]
    AnsiC,
    /// `'...'` with `'\''` for embedded apostrophes
    Posix,
    /// Historic `$'...'` table kept for already generated scripts
    Legacy,
}

impl BashEscapeMode {
    /// Picks the mode from the job's feature flags
    pub fn from_features(features: &FeatureSet) -> Self {
        if features.posixly_correct_escapes {
            BashEscapeMode::Posix
        } else if features.use_new_shell_escape {
            BashEscapeMode::AnsiC
        } else {
            BashEscapeMode::Legacy
        }
    }
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn push_hex(out: &mut String, byte: u8) {
    out.push('\\');
    out.push('x');
    out.push(HEX[(byte >> 4) as usize] as char);
    out.push(HEX[(byte & 0x0f) as usize] as char);
}

/// Quotes `input` as a single shell word
pub fn quote(input: &str, mode: BashEscapeMode) -> String {
    match mode {
        BashEscapeMode::AnsiC => ansi_c(input),
        BashEscapeMode::Posix => posix(input),
        BashEscapeMode::Legacy => legacy(input),
    }
}

fn ansi_c(input: &str) -> String {
    if input.is_empty() {
        return "''".to_string();
    }

    let mut out = String::with_capacity(input.len() * 2);
    let mut escape = false;

    for &byte in input.as_bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' => out.push(byte as char),
            b',' | b'-' | b'.' | b'/' | b'@' | b'_' | b':' | b'+' => out.push(byte as char),

            b' ' | b'!' | b'"' | b'#' | b'$' | b'%' | b'&' | b'(' | b')' | b'*' | b';' | b'<'
            | b'=' | b'>' | b'?' | b'[' | b']' | b'^' | b'`' | b'{' | b'|' | b'}' | b'~' => {
                out.push(byte as char);
                escape = true;
            }

            0x07 | 0x08 | b'\t' | b'\n' | 0x0b | 0x0c | b'\r' | b'\'' | b'\\' => {
                out.push_str(match byte {
                    0x07 => "\\a",
                    0x08 => "\\b",
                    b'\t' => "\\t",
                    b'\n' => "\\n",
                    0x0b => "\\v",
                    0x0c => "\\f",
                    b'\r' => "\\r",
                    b'\'' => "\\'",
                    _ => "\\\\",
                });
                escape = true;
            }

            _ => {
                push_hex(&mut out, byte);
                escape = true;
            }
        }
    }

    if escape { format!("$'{}'", out) } else { out }
}

fn is_posix_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ',' | '-' | '.' | '/' | ':' | '@' | '_' | '+' | '%')
}

fn posix(input: &str) -> String {
    if input.is_empty() {
        return "''".to_string();
    }
    if input.chars().all(is_posix_safe) {
        return input.to_string();
    }
    format!("'{}'", input.replace('\'', "'\\''"))
}

fn legacy(input: &str) -> String {
    if input.is_empty() {
        return "''".to_string();
    }

    let mut out = String::with_capacity(input.len() * 2);
    let mut escape = false;

    for &byte in input.as_bytes() {
        match byte {
            b','..=b'9' | b'@'..=b'Z' | b'_' | b'a'..=b'z' => {
                out.push(byte as char);
                continue;
            }
            b'\t' => out.push_str("\\t"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            0x00..=0x1f => push_hex(&mut out, byte),
            b'\'' | b'\\' => {
                out.push('\\');
                out.push(byte as char);
            }
            b' '..=b'&' | b'('..=b'+' | b':'..=b'?' | b'[' | b']' | b'^' | b'`' | b'{'..=b'~' => {
                out.push(byte as char)
            }
            _ => push_hex(&mut out, byte),
        }
        escape = true;
    }

    if escape { format!("$'{}'", out) } else { out }
}

/// Double-quoted word in which `$NAME` still expands at run time
pub fn quote_expand(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for c in input.chars() {
        if matches!(c, '"' | '\\' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Reverses any word produced by `quote`
///
/// Returns `None` for input that is not a single word built from the
/// supported quoting forms.
pub fn unquote(word: &str) -> Option<String> {
    let bytes = word.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'\'') => {
                i = read_ansi_c(bytes, i + 2, &mut out)?;
            }
            b'\'' => {
                let end = bytes[i + 1..].iter().position(|&b| b == b'\'')? + i + 1;
                out.extend_from_slice(&bytes[i + 1..end]);
                i = end + 1;
            }
            b'"' => {
                i += 1;
                loop {
                    match *bytes.get(i)? {
                        b'"' => break,
                        b'\\' if matches!(bytes.get(i + 1), Some(b'"' | b'\\' | b'`' | b'$')) => {
                            out.push(bytes[i + 1]);
                            i += 2;
                        }
                        other => {
                            out.push(other);
                            i += 1;
                        }
                    }
                }
                i += 1;
            }
            b'\\' => {
                out.push(*bytes.get(i + 1)?);
                i += 2;
            }
            b' ' | b'\t' | b'\n' => return None,
            other => {
                out.push(other);
                i += 1;
            }
        }
    }

    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

// Decodes the body of `$'...'` starting at `i`; returns the index after the closing quote
fn read_ansi_c(bytes: &[u8], mut i: usize, out: &mut Vec<u8>) -> Option<usize> {
    loop {
        match *bytes.get(i)? {
            b'\'' => return Some(i + 1),
            b'\\' => {
                let escaped = *bytes.get(i + 1)?;
                i += 2;
                match escaped {
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b't' => out.push(b'\t'),
                    b'n' => out.push(b'\n'),
                    b'v' => out.push(0x0b),
                    b'f' => out.push(0x0c),
                    b'r' => out.push(b'\r'),
                    b'e' | b'E' => out.push(0x1b),
                    b'x' => {
                        let high = hex_value(*bytes.get(i)?)?;
                        match bytes.get(i + 1).and_then(|&b| hex_value(b)) {
                            Some(low) => {
                                out.push(high << 4 | low);
                                i += 2;
                            }
                            None => {
                                out.push(high);
                                i += 1;
                            }
                        }
                    }
                    other => out.push(other),
                }
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "plain",
        "https://g/x.git",
        "a b",
        "it's",
        "tab\there",
        "line\nbreak\r\n",
        "$HOME `id` $(whoami)",
        "back\\slash",
        "quote\"d",
        "caf\u{e9} \u{1f600}",
        "bell\x07\x1b[0m",
        "%PATH% & | ; < > ( ) { } [ ] * ? ~ ! # ^ =",
    ];

    #[test]
    fn test_ansi_c_literals() {
        assert_eq!(quote("", BashEscapeMode::AnsiC), "''");
        assert_eq!(quote("abc-1.2/x_y@z", BashEscapeMode::AnsiC), "abc-1.2/x_y@z");
        assert_eq!(
            quote("+refs/heads/feature/x:refs/remotes/origin/feature/x", BashEscapeMode::AnsiC),
            "+refs/heads/feature/x:refs/remotes/origin/feature/x"
        );
    }

    #[test]
    fn test_ansi_c_escapes() {
        assert_eq!(quote("a b", BashEscapeMode::AnsiC), "$'a b'");
        assert_eq!(quote("it's", BashEscapeMode::AnsiC), "$'it\\'s'");
        assert_eq!(quote("a\nb\tc", BashEscapeMode::AnsiC), "$'a\\nb\\tc'");
        assert_eq!(quote("\x1b", BashEscapeMode::AnsiC), "$'\\x1b'");
        assert_eq!(quote("\u{e9}", BashEscapeMode::AnsiC), "$'\\xc3\\xa9'");
        assert_eq!(
            quote("Running on $(hostname) via worker-1...", BashEscapeMode::AnsiC),
            "$'Running on $(hostname) via worker-1...'"
        );
    }

    #[test]
    fn test_posix_mode() {
        assert_eq!(quote("", BashEscapeMode::Posix), "''");
        assert_eq!(quote("safe/path-1.0", BashEscapeMode::Posix), "safe/path-1.0");
        assert_eq!(quote("a b", BashEscapeMode::Posix), "'a b'");
        assert_eq!(quote("it's", BashEscapeMode::Posix), "'it'\\''s'");
        assert_eq!(quote("$HOME", BashEscapeMode::Posix), "'$HOME'");
    }

    #[test]
    fn test_legacy_mode() {
        assert_eq!(quote("", BashEscapeMode::Legacy), "''");
        assert_eq!(quote("plain-1.0/x", BashEscapeMode::Legacy), "plain-1.0/x");
        assert_eq!(quote("a b", BashEscapeMode::Legacy), "$'a b'");
        assert_eq!(quote("it's", BashEscapeMode::Legacy), "$'it\\'s'");
        assert_eq!(quote("\x01", BashEscapeMode::Legacy), "$'\\x01'");
        assert_eq!(quote("a:b", BashEscapeMode::Legacy), "$'a:b'");
    }

    #[test]
    fn test_unquote_reverses_every_mode() {
        for mode in [BashEscapeMode::AnsiC, BashEscapeMode::Posix, BashEscapeMode::Legacy] {
            for sample in SAMPLES {
                let quoted = quote(sample, mode);
                assert_eq!(
                    unquote(&quoted).as_deref(),
                    Some(*sample),
                    "{:?} via {:?}",
                    quoted,
                    mode
                );
            }
        }
    }

    #[test]
    fn test_quote_expand() {
        assert_eq!(quote_expand("$GIT_SSL_CAINFO"), "\"$GIT_SSL_CAINFO\"");
        assert_eq!(quote_expand("a\"b`c\\"), "\"a\\\"b\\`c\\\\\"");
        assert_eq!(unquote("\"a\\\"b\"").as_deref(), Some("a\"b"));
    }

    #[test]
    fn test_unquote_rejects_multiple_words() {
        assert_eq!(unquote("a b"), None);
        assert_eq!(unquote("'unterminated"), None);
    }

    #[test]
    fn test_mode_from_features() {
        let features = FeatureSet::default();
        assert_eq!(BashEscapeMode::from_features(&features), BashEscapeMode::AnsiC);

        let features = FeatureSet::default().with(girder_core::features::USE_NEW_SHELL_ESCAPE, false);
        assert_eq!(BashEscapeMode::from_features(&features), BashEscapeMode::Legacy);

        let features =
            FeatureSet::default().with(girder_core::features::POSIXLY_CORRECT_ESCAPES, true);
        assert_eq!(BashEscapeMode::from_features(&features), BashEscapeMode::Posix);
    }
}
