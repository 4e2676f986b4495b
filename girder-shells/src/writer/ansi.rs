//! ANSI palette used for job log lines

pub const BOLD_GREEN: &str = "\x1b[32;1m";
pub const YELLOW: &str = "\x1b[0;33m";
pub const BOLD_RED: &str = "\x1b[31;1m";
pub const RESET: &str = "\x1b[0;m";

/// Erases the rest of the line; follows section markers
pub const CLEAR: &str = "\x1b[0K";

pub fn notice(text: &str) -> String {
    format!("{}{}{}", BOLD_GREEN, text, RESET)
}

pub fn warning(text: &str) -> String {
    format!("{}{}{}", YELLOW, text, RESET)
}

pub fn error(text: &str) -> String {
    format!("{}{}{}", BOLD_RED, text, RESET)
}

pub fn plain(text: &str) -> String {
    format!("{}{}", RESET, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_wrap_text() {
        assert_eq!(notice("ok"), "\x1b[32;1mok\x1b[0;m");
        assert_eq!(warning("careful"), "\x1b[0;33mcareful\x1b[0;m");
        assert_eq!(error("bad"), "\x1b[31;1mbad\x1b[0;m");
        assert_eq!(plain("x"), "\x1b[0;mx");
    }
}
