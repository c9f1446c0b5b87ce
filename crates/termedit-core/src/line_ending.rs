//! Line ending helpers.
//!
//! Rows always store LF (`'\n'`) terminators. Text read from disk is split and normalized here,
//! and the dominant convention is remembered so the buffer can be written back unchanged.

/// The newline sequence used when saving a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    /// Unix-style LF (`'\n'`).
    #[default]
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    Crlf,
    /// Classic Mac CR (`'\r'`).
    Cr,
}

impl LineEnding {
    /// Detect the dominant line ending of `text`.
    ///
    /// Counts every LF, CRLF and lone CR; the most frequent one wins and ties resolve in the
    /// order LF, CRLF, CR. Text without any newline is LF.
    pub fn detect_in_text(text: &str) -> Self {
        split_lines(text).1
    }

    /// The byte sequence written for each newline.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::Crlf => "\r\n",
            Self::Cr => "\r",
        }
    }

    /// Short name suitable for a status line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Lf => "LF",
            Self::Crlf => "CRLF",
            Self::Cr => "CR",
        }
    }

    /// Convert an LF-normalized text to this line ending for saving.
    pub fn apply_to_text(self, text: &str) -> String {
        match self {
            Self::Lf => text.to_string(),
            other => text.replace('\n', other.as_str()),
        }
    }
}

/// Split `text` into LF-terminated lines and report its dominant line ending.
///
/// Every returned line except possibly the last ends with `'\n'`. CRLF pairs and lone CRs are
/// normalized to LF.
pub fn split_lines(text: &str) -> (Vec<String>, LineEnding) {
    let (mut lf, mut crlf, mut cr) = (0usize, 0usize, 0usize);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\r' if chars.peek() == Some(&'\n') => {
                chars.next();
                crlf += 1;
            }
            '\r' => cr += 1,
            '\n' => lf += 1,
            other => {
                current.push(other);
                continue;
            }
        }
        current.push('\n');
        lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let ending = if lf >= crlf && lf >= cr {
        LineEnding::Lf
    } else if crlf >= cr {
        LineEnding::Crlf
    } else {
        LineEnding::Cr
    };
    (lines, ending)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_mixed_endings() {
        let (lines, ending) = split_lines("a\r\nb\r\nc\nd");
        assert_eq!(lines, vec!["a\n", "b\n", "c\n", "d"]);
        assert_eq!(ending, LineEnding::Crlf);
    }

    #[test]
    fn test_split_lone_cr() {
        let (lines, ending) = split_lines("one\rtwo\r");
        assert_eq!(lines, vec!["one\n", "two\n"]);
        assert_eq!(ending, LineEnding::Cr);
    }

    #[test]
    fn test_detect_defaults_to_lf() {
        assert_eq!(LineEnding::detect_in_text("no newline"), LineEnding::Lf);
        assert_eq!(LineEnding::detect_in_text(""), LineEnding::Lf);
        // tie between LF and CRLF
        assert_eq!(LineEnding::detect_in_text("a\nb\r\n"), LineEnding::Lf);
    }

    #[test]
    fn test_apply_to_text() {
        assert_eq!(LineEnding::Crlf.apply_to_text("a\nb\n"), "a\r\nb\r\n");
        assert_eq!(LineEnding::Cr.apply_to_text("a\nb"), "a\rb");
        assert_eq!(LineEnding::Lf.apply_to_text("a\nb"), "a\nb");
    }
}
