use rustc_hash::FxHashMap;

use crate::{
    Error,
    constants::{DEFAULT_ID_PREFIX, DEFAULT_ID_SEPARATOR},
    error::Detail,
    model::{Attributes, ElementReferences, Footnote, InlineElement, plain_text},
};

/// Everything the substitution engine learns while it walks a document.
///
/// A context belongs to exactly one parse: attribute declarations update its
/// attribute map as they are reached, so a reference only sees what was
/// declared above it.
#[derive(Debug, Default)]
pub struct ProcessingContext {
    pub(crate) attributes: Attributes,
    pub(crate) counters: Counters,
    pub(crate) footnotes: FootnoteTracker,
    pub(crate) element_references: ElementReferences,
}

impl ProcessingContext {
    /// Create a context whose attribute map starts out as `attributes`.
    #[must_use]
    pub fn new(attributes: Attributes) -> Self {
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Attributes as they stand at the current point of the document.
    #[must_use]
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Every distinct footnote registered so far, in document order.
    #[must_use]
    pub fn footnotes(&self) -> &[Footnote] {
        &self.footnotes.footnotes
    }

    #[must_use]
    pub fn element_references(&self) -> &ElementReferences {
        &self.element_references
    }

    /// Takes the references and footnotes out of a finished context.
    #[must_use]
    pub fn into_parts(self) -> (Attributes, ElementReferences, Vec<Footnote>) {
        (
            self.attributes,
            self.element_references,
            self.footnotes.footnotes,
        )
    }

    /// Value an attribute reference stands for. Unknown names are kept as
    /// the literal reference.
    pub(crate) fn attribute_text(&self, name: &str) -> String {
        self.attributes
            .get(name)
            .and_then(crate::model::AttributeValue::as_text)
            .unwrap_or_else(|| {
                tracing::debug!(name, "unresolved attribute reference");
                format!("{{{name}}}")
            })
    }

    /// Generates a section id from its substituted title.
    ///
    /// The id is the lowercased title with runs of spaces, `-` and `.`
    /// turned into the separator and any other punctuation dropped,
    /// prefixed with `idprefix`. Ids already in use get a numeric suffix.
    pub(crate) fn generate_id(&self, title: &[InlineElement]) -> String {
        let prefix = self
            .attributes
            .get_str("idprefix")
            .unwrap_or(DEFAULT_ID_PREFIX);
        let separator = self
            .attributes
            .get_str("idseparator")
            .unwrap_or(DEFAULT_ID_SEPARATOR);

        let mut words = String::new();
        let mut pending_separator = false;
        for c in plain_text(title).to_lowercase().chars() {
            if c.is_alphanumeric() {
                if pending_separator && !words.is_empty() {
                    words.push_str(separator);
                }
                pending_separator = false;
                words.push(c);
            } else if c.is_whitespace() || matches!(c, '-' | '.' | '_') {
                pending_separator = true;
            }
        }

        let base = format!("{prefix}{words}");
        let mut id = base.clone();
        let mut suffix = 2usize;
        while self.element_references.contains(&id) {
            id = format!("{base}{separator}{suffix}");
            suffix += 1;
        }
        id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CounterValue {
    Number(i64),
    Character(char),
}

impl CounterValue {
    fn text(self) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Character(c) => c.to_string(),
        }
    }
}

/// Named counters driven by `{counter:name}` and `{counter2:name}`.
#[derive(Debug, Default)]
pub(crate) struct Counters(FxHashMap<String, CounterValue>);

impl Counters {
    /// Advances `name` and returns its new value.
    ///
    /// The first use starts at `start` (an integer, or a single character
    /// that then steps through code points) or at 1 without one. A start
    /// value on a later use is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CounterValue`] for a start value that is neither an
    /// integer nor a single character, and for a character counter that runs
    /// past the last code point.
    pub(crate) fn step(
        &mut self,
        name: &str,
        start: Option<&str>,
        line: usize,
    ) -> Result<String, Error> {
        let next = match self.0.get(name) {
            Some(CounterValue::Number(number)) => CounterValue::Number(number.saturating_add(1)),
            Some(CounterValue::Character(c)) => u32::from(*c)
                .checked_add(1)
                .and_then(char::from_u32)
                .map(CounterValue::Character)
                .ok_or_else(|| Error::CounterValue(Detail::at(line), c.to_string()))?,
            None => Self::initial(start, line)?,
        };
        tracing::trace!(name, ?next, "counter advanced");
        self.0.insert(name.to_string(), next);
        Ok(next.text())
    }

    fn initial(start: Option<&str>, line: usize) -> Result<CounterValue, Error> {
        let Some(start) = start.map(str::trim) else {
            return Ok(CounterValue::Number(1));
        };
        if let Ok(number) = start.parse() {
            return Ok(CounterValue::Number(number));
        }
        let mut chars = start.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(CounterValue::Character(c)),
            (Some(_) | None, _) => Err(Error::CounterValue(Detail::at(line), start.to_string())),
        }
    }
}

/// Numbers footnotes in the order they are registered.
#[derive(Debug, Default)]
pub(crate) struct FootnoteTracker {
    /// Each distinct footnote once, numbered from 1.
    pub(crate) footnotes: Vec<Footnote>,
    /// Numbers already handed to named footnotes, so later references
    /// reuse them.
    named: FxHashMap<String, usize>,
}

impl FootnoteTracker {
    #[tracing::instrument(level = "trace", skip_all, fields(id = ?footnote.id))]
    pub(crate) fn register(&mut self, footnote: &mut Footnote) {
        if let Some(id) = &footnote.id
            && let Some(&number) = self.named.get(id)
        {
            footnote.number = number;
            return;
        }
        let number = self.footnotes.len() + 1;
        footnote.number = number;
        if let Some(id) = &footnote.id {
            self.named.insert(id.clone(), number);
        }
        self.footnotes.push(footnote.clone());
    }
}
