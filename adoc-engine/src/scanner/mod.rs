//! Splits decoded source text into classified [`Line`]s.
mod line;

pub use line::{Line, LineKind, ListMarker, classify};

/// Lazily classifies the lines of a decoded source.
///
/// Line terminators (`\n` or `\r\n`) are dropped. Trailing whitespace stays
/// in [`Line::raw`] for verbatim content and is ignored when classifying.
/// An attribute declaration whose value ends in ` \` continues on the next
/// line; the folded record spans every line it consumed.
#[derive(Debug)]
pub struct Scanner {
    source: String,
    position: usize,
    line_number: usize,
}

impl Scanner {
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            position: 0,
            line_number: 0,
        }
    }

    fn next_raw(&mut self) -> Option<String> {
        let rest = self.source.get(self.position..)?;
        if rest.is_empty() {
            return None;
        }
        let (text, consumed) = match rest.find('\n') {
            Some(index) => (rest.get(..index).unwrap_or_default(), index + 1),
            None => (rest, rest.len()),
        };
        let text = text.strip_suffix('\r').unwrap_or(text).to_string();
        self.position += consumed;
        self.line_number += 1;
        Some(text)
    }

    /// Folds ` \` continuations into a single declaration value. Every
    /// consumed source line is appended to `raw`.
    fn continue_value(&mut self, mut value: String, raw: &mut String) -> String {
        while let Some(stripped) = value.strip_suffix(" \\") {
            let stripped = stripped.trim_end().to_string();
            let Some(next) = self.next_raw() else {
                return stripped;
            };
            raw.push('\n');
            raw.push_str(&next);
            value = format!("{stripped} {}", next.trim());
        }
        value
    }
}

impl Iterator for Scanner {
    type Item = Line;

    fn next(&mut self) -> Option<Self::Item> {
        let mut raw = self.next_raw()?;
        let number = self.line_number;
        let kind = match classify(&raw) {
            LineKind::AttributeDeclaration { name, value } => LineKind::AttributeDeclaration {
                name,
                value: self.continue_value(value, &mut raw),
            },
            kind => kind,
        };
        let line = Line {
            number,
            end: self.line_number,
            kind,
            raw,
        };
        tracing::trace!(number, kind = line.kind.name(), "scanned line");
        Some(line)
    }
}
