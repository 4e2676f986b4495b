//! PowerShell quoting
//!
//! Everything is emitted as a double-quoted string with backtick escapes.
//! PowerShell also closes double-quoted strings on the typographic quotes
//! U+201C, U+201D and U+201E, so those are escaped as well.

fn escape_into(out: &mut String, c: char, escape_dollar: bool) {
    match c {
        '`' => out.push_str("``"),
        '\u{7}' => out.push_str("`a"),
        '\u{8}' => out.push_str("`b"),
        '\u{c}' => out.push_str("`f"),
        '\r' => out.push_str("`r"),
        '\n' => out.push_str("`n"),
        '\t' => out.push_str("`t"),
        '\u{b}' => out.push_str("`v"),
        '#' | '\'' | '"' | '\u{201c}' | '\u{201d}' | '\u{201e}' => {
            out.push('`');
            out.push(c);
        }
        '$' if escape_dollar => out.push_str("`$"),
        _ => out.push(c),
    }
}

fn quote_with(input: &str, escape_dollar: bool) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for c in input.chars() {
        escape_into(&mut out, c, escape_dollar);
    }
    out.push('"');
    out
}

/// Literal string; `$` does not interpolate
pub fn quote(input: &str) -> String {
    quote_with(input, true)
}

/// Literal used on the right-hand side of variable assignments
pub fn quote_variable(input: &str) -> String {
    quote_with(input, true)
}

/// String in which `$name` and `$(...)` still interpolate
pub fn quote_expand(input: &str) -> String {
    quote_with(input, false)
}

/// Reverses `quote` and `quote_expand`
pub fn unquote(word: &str) -> Option<String> {
    let inner = word.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '`' {
            out.push(c);
            continue;
        }
        let escaped = chars.next()?;
        out.push(match escaped {
            'a' => '\u{7}',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'r' => '\r',
            'n' => '\n',
            't' => '\t',
            'v' => '\u{b}',
            '0' => '\0',
            other => other,
        });
    }

    Some(out)
}
