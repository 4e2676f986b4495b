//! cmd.exe escaping
//!
//! Scripts run with delayed expansion enabled, so `!` needs a double
//! caret and newlines are spelled `!nl!` (defined in the script header).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchMode {
    /// Quoted argument, `%VAR%` still expands
    Normal,
    /// Unquoted text such as `echo` output
    Escape,
    /// Quoted command argument, `%` escaped
    Command,
    /// Right-hand side of `SET`, `%` doubled
    Variable,
}

fn escape_mode(input: &str, mode: BatchMode) -> String {
    let mut out = String::with_capacity(input.len() * 2);
    let mut quote = false;

    for c in input.chars() {
        match c {
            '^' | '&' | '<' | '>' | '|' => {
                out.push('^');
                out.push(c);
            }
            '!' => out.push_str("^^!"),
            '\r' => {}
            '\n' => out.push_str("!nl!"),
            ' ' | '=' | ';' | ',' | '/' => {
                out.push(c);
                quote = true;
            }
            '(' | ')' => {
                if matches!(mode, BatchMode::Escape | BatchMode::Variable) {
                    out.push('^');
                } else {
                    quote = true;
                }
                out.push(c);
            }
            '%' if mode == BatchMode::Command => out.push_str("^%"),
            '%' if mode == BatchMode::Variable => out.push_str("%%"),
            _ => out.push(c),
        }
    }

    if matches!(mode, BatchMode::Normal | BatchMode::Command) && (quote || out.len() != input.len())
    {
        return format!("\"{}\"", out);
    }

    out
}

/// Quoted argument in which `%NAME%` expands at run time
pub fn quote(input: &str) -> String {
    escape_mode(input, BatchMode::Normal)
}

/// Quoted command argument taken literally
pub fn quote_command(input: &str) -> String {
    escape_mode(input, BatchMode::Command)
}

/// Value for `SET KEY=<value>`
pub fn escape_variable(input: &str) -> String {
    escape_mode(input, BatchMode::Variable)
}

/// Unquoted text, e.g. the operand of `echo`
pub fn escape(input: &str) -> String {
    escape_mode(input, BatchMode::Escape)
}

/// Reverses `quote`, `quote_command` and `escape`
pub fn unquote(word: &str) -> Option<String> {
    let inner = match word.strip_prefix('"') {
        Some(rest) => rest.strip_suffix('"')?,
        None => word,
    };
    Some(unescape(inner, false))
}

/// Reverses `escape_variable`
pub fn unescape_variable(value: &str) -> String {
    unescape(value, true)
}

fn unescape(text: &str, doubled_percent: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(tail) = rest.strip_prefix("^^!") {
            out.push('!');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("!nl!") {
            out.push('\n');
            rest = tail;
        } else if doubled_percent && rest.starts_with("%%") {
            out.push('%');
            rest = &rest[2..];
        } else if c == '^' && rest.len() > 1 {
            rest = &rest[1..];
            if let Some(next) = rest.chars().next() {
                out.push(next);
                rest = &rest[next.len_utf8()..];
            }
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_escape() {
        assert_eq!(escape_variable("a & b"), "a ^& b");
        assert_eq!(escape_variable("100%"), "100%%");
        assert_eq!(escape_variable("(x)"), "^(x^)");
        assert_eq!(escape_variable("hi!"), "hi^^!");
    }

    #[test]
    fn test_quote_modes() {
        assert_eq!(quote("plain"), "plain");
        assert_eq!(quote("C:\\a b"), "\"C:\\a b\"");
        assert_eq!(quote("%CD%\\x"), "%CD%\\x");
        assert_eq!(quote_command("%PATH%"), "\"^%PATH^%\"");
        assert_eq!(quote_command("a|b"), "\"a^|b\"");
        assert_eq!(quote("(x)"), "\"(x)\"");
    }

    #[test]
    fn test_newlines() {
        assert_eq!(escape("a\r\nb"), "a!nl!b");
    }

    #[test]
    fn test_unquote_reverses() {
        let samples = [
            "plain",
            "a & b",
            "C:\\Program Files\\x",
            "hi! ^caret^ <in> |pipe|",
            "(group) x=1;y,z/w",
            "100% done",
            "two\nlines",
            "literal !nl! marker",
        ];
        for sample in samples {
            assert_eq!(unquote(&quote_command(sample)).as_deref(), Some(sample), "{}", sample);
            assert_eq!(unescape_variable(&escape_variable(sample)), sample, "{}", sample);
        }
    }
}
