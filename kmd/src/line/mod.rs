use std::ops::Range;

/// One non-blank source line, trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    /// Indentation level in units of two columns (a tab counts as two columns).
    pub indent: usize,
    /// Byte span of the trimmed text in source.
    pub span: Range<usize>,
}

impl Line {
    pub fn new(text: impl Into<String>, indent: usize, span: Range<usize>) -> Self {
        Line {
            text: text.into(),
            indent,
            span,
        }
    }

    /// Comment lines start with `#`. They take part in indentation but never run.
    pub fn is_comment(&self) -> bool {
        self.text.starts_with('#')
    }

    /// The command name: the first whitespace-delimited token.
    pub fn command(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }

    /// Byte span of the command name in source.
    pub fn command_span(&self) -> Range<usize> {
        self.span.start..self.span.start + self.command().len()
    }

    /// Everything after the command name, tokens rejoined with single spaces.
    /// `None` when the line is a bare command.
    pub fn argument(&self) -> Option<String> {
        let rest: Vec<&str> = self.text.split_whitespace().skip(1).collect();
        if rest.is_empty() {
            None
        } else {
            Some(rest.join(" "))
        }
    }
}

/// Indentation level of a line's leading whitespace.
pub fn indent_level(leading: &str) -> usize {
    let columns: usize = leading
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    columns / 2
}
