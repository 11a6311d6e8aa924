//! Inline elements produced by the substitution engine.
use serde::Serialize;

use crate::{
    constants::predefined_attribute_value,
    model::{AttributeValue, Attributes, SubstitutionGroup},
};

/// A single inline node.
///
/// Blocks start out holding `RawLine`s (and `SingleLineComment`s inside
/// paragraphs); every substitution step replaces them with parsed structure.
/// `ElementPlaceholder` only exists while a substitution step re-parses
/// serialised content and never survives a finished step.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InlineElement {
    RawLine(String),
    SingleLineComment(String),
    StringElement(String),
    QuotedText(QuotedText),
    AttributeSubstitution(String),
    CounterSubstitution(CounterSubstitution),
    PredefinedAttribute(String),
    SpecialCharacter(String),
    Symbol(String),
    InlineLink(InlineLink),
    InlineImage(InlineImage),
    InlinePassthrough(InlinePassthrough),
    Callout(u32),
    CrossReference(CrossReference),
    Footnote(Footnote),
    IndexTerm(Vec<InlineElement>),
    ConcealedIndexTerm(ConcealedIndexTerm),
    InlineAnchor(InlineAnchor),
    Keyboard(Vec<String>),
    Button(String),
    Icon(Icon),
    LineBreak,
    ElementPlaceholder(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotedTextKind {
    SingleQuoteBold,
    DoubleQuoteBold,
    SingleQuoteItalic,
    DoubleQuoteItalic,
    SingleQuoteMonospace,
    DoubleQuoteMonospace,
    SingleQuoteMarked,
    DoubleQuoteMarked,
    SingleQuoteSubscript,
    SingleQuoteSuperscript,
    CurvedDoubleQuote,
    CurvedSingleQuote,
}

impl QuotedTextKind {
    /// Kinds that may not be recognised inside content of this kind.
    ///
    /// Same-kind nesting is never allowed. Bold additionally rejects its
    /// other form, while italic, monospace and marked text accept single
    /// inside double and double inside single.
    #[must_use]
    pub fn nested_exclusions(self) -> &'static [QuotedTextKind] {
        match self {
            Self::SingleQuoteBold | Self::DoubleQuoteBold => {
                &[Self::SingleQuoteBold, Self::DoubleQuoteBold]
            }
            Self::SingleQuoteItalic => &[Self::SingleQuoteItalic],
            Self::DoubleQuoteItalic => &[Self::DoubleQuoteItalic],
            Self::SingleQuoteMonospace => &[Self::SingleQuoteMonospace],
            Self::DoubleQuoteMonospace => &[Self::DoubleQuoteMonospace],
            Self::SingleQuoteMarked => &[Self::SingleQuoteMarked],
            Self::DoubleQuoteMarked => &[Self::DoubleQuoteMarked],
            Self::SingleQuoteSubscript => &[Self::SingleQuoteSubscript],
            Self::SingleQuoteSuperscript => &[Self::SingleQuoteSuperscript],
            Self::CurvedDoubleQuote => &[Self::CurvedDoubleQuote],
            Self::CurvedSingleQuote => &[Self::CurvedSingleQuote],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QuotedText {
    pub kind: QuotedTextKind,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub elements: Vec<InlineElement>,
}

/// `{counter:name}`, `{counter:name:start}` or `{counter2:name}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CounterSubstitution {
    pub name: String,
    pub value: Option<String>,
    pub hidden: bool,
}

/// Target of a link or image: an optional URL scheme and the path.
///
/// The path is an inline sequence so attribute references inside it can be
/// resolved like any other content.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Location {
    pub scheme: String,
    pub path: Vec<InlineElement>,
}

const SCHEMES: &[&str] = &[
    "https://", "http://", "ftp://", "irc://", "file://", "mailto:", "data:",
];

impl Location {
    /// Builds a location from a raw target, splitting off a known scheme.
    #[must_use]
    pub fn from_target(target: &str) -> Self {
        for scheme in SCHEMES {
            if let Some(rest) = target.strip_prefix(scheme) {
                return Self {
                    scheme: (*scheme).to_string(),
                    path: vec![InlineElement::StringElement(rest.to_string())],
                };
            }
        }
        Self {
            scheme: String::new(),
            path: vec![InlineElement::StringElement(target.to_string())],
        }
    }

    /// Builds a location from already-parsed path elements.
    ///
    /// The scheme is only detected on a leading string run.
    #[must_use]
    pub fn from_elements(mut path: Vec<InlineElement>) -> Self {
        if let Some(InlineElement::StringElement(first)) = path.first_mut() {
            for scheme in SCHEMES {
                if let Some(rest) = first.strip_prefix(scheme) {
                    let rest = rest.to_string();
                    *first = rest;
                    if first.is_empty() {
                        path.remove(0);
                    }
                    return Self {
                        scheme: (*scheme).to_string(),
                        path,
                    };
                }
            }
        }
        Self {
            scheme: String::new(),
            path,
        }
    }

    #[must_use]
    pub fn is_relative(&self) -> bool {
        self.scheme.is_empty()
            && !matches!(self.path.first(), Some(InlineElement::StringElement(p) | InlineElement::RawLine(p)) if p.starts_with('/'))
    }

    /// Prepends `dir` to a relative path.
    pub fn prefix_with(&mut self, dir: &str) {
        if dir.is_empty() || !self.is_relative() {
            return;
        }
        let prefix = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        self.path.insert(0, InlineElement::StringElement(prefix));
        self.path = merge_adjacent_strings(std::mem::take(&mut self.path));
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        format!("{}{}", self.scheme, plain_text(&self.path))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineLink {
    pub location: Location,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineImage {
    pub location: Location,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughKind {
    SinglePlus,
    DoublePlus,
    TriplePlus,
    Macro,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlinePassthrough {
    pub kind: PassthroughKind,
    /// Substitutions requested by `pass:<subs>[...]`, applied once to the
    /// passthrough content after the enclosing block is substituted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub substitutions: Vec<SubstitutionGroup>,
    pub elements: Vec<InlineElement>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossReference {
    pub id: String,
    pub label: Option<Vec<InlineElement>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Footnote {
    pub id: Option<String>,
    pub number: usize,
    pub elements: Vec<InlineElement>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConcealedIndexTerm {
    pub term1: String,
    pub term2: Option<String>,
    pub term3: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InlineAnchor {
    pub id: String,
    pub reftext: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Icon {
    pub name: String,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

impl InlineElement {
    /// Calls `f` on every inline sequence nested inside this element.
    pub(crate) fn for_each_nested_mut(&mut self, f: &mut impl FnMut(&mut Vec<InlineElement>)) {
        match self {
            Self::QuotedText(quoted) => f(&mut quoted.elements),
            Self::InlineLink(InlineLink {
                location,
                attributes,
            })
            | Self::InlineImage(InlineImage {
                location,
                attributes,
            }) => {
                f(&mut location.path);
                for_each_inlines_attribute(attributes, f);
            }
            Self::Icon(icon) => for_each_inlines_attribute(&mut icon.attributes, f),
            Self::InlinePassthrough(passthrough) => f(&mut passthrough.elements),
            Self::CrossReference(CrossReference {
                label: Some(label), ..
            }) => f(label),
            Self::Footnote(footnote) => f(&mut footnote.elements),
            Self::IndexTerm(term) => f(term),
            Self::RawLine(_)
            | Self::SingleLineComment(_)
            | Self::StringElement(_)
            | Self::AttributeSubstitution(_)
            | Self::CounterSubstitution(_)
            | Self::PredefinedAttribute(_)
            | Self::SpecialCharacter(_)
            | Self::Symbol(_)
            | Self::Callout(_)
            | Self::CrossReference(CrossReference { label: None, .. })
            | Self::ConcealedIndexTerm(_)
            | Self::InlineAnchor(_)
            | Self::Keyboard(_)
            | Self::Button(_)
            | Self::LineBreak
            | Self::ElementPlaceholder(_) => {}
        }
    }

    /// Read-only counterpart of [`InlineElement::for_each_nested_mut`].
    #[cfg(test)]
    pub(crate) fn for_each_nested(&self, f: &mut impl FnMut(&[InlineElement])) {
        match self {
            Self::QuotedText(quoted) => f(&quoted.elements),
            Self::InlineLink(InlineLink {
                location,
                attributes,
            })
            | Self::InlineImage(InlineImage {
                location,
                attributes,
            }) => {
                f(&location.path);
                for (_, value) in attributes.iter() {
                    if let AttributeValue::Inlines(elements) = value {
                        f(elements);
                    }
                }
            }
            Self::Icon(icon) => {
                for (_, value) in icon.attributes.iter() {
                    if let AttributeValue::Inlines(elements) = value {
                        f(elements);
                    }
                }
            }
            Self::InlinePassthrough(passthrough) => f(&passthrough.elements),
            Self::CrossReference(CrossReference {
                label: Some(label), ..
            }) => f(label),
            Self::Footnote(footnote) => f(&footnote.elements),
            Self::IndexTerm(term) => f(term),
            Self::RawLine(_)
            | Self::SingleLineComment(_)
            | Self::StringElement(_)
            | Self::AttributeSubstitution(_)
            | Self::CounterSubstitution(_)
            | Self::PredefinedAttribute(_)
            | Self::SpecialCharacter(_)
            | Self::Symbol(_)
            | Self::Callout(_)
            | Self::CrossReference(CrossReference { label: None, .. })
            | Self::ConcealedIndexTerm(_)
            | Self::InlineAnchor(_)
            | Self::Keyboard(_)
            | Self::Button(_)
            | Self::LineBreak
            | Self::ElementPlaceholder(_) => {}
        }
    }
}

fn for_each_inlines_attribute(
    attributes: &mut Attributes,
    f: &mut impl FnMut(&mut Vec<InlineElement>),
) {
    for (_, value) in attributes.iter_mut() {
        if let AttributeValue::Inlines(elements) = value {
            f(elements);
        }
    }
}

/// Joins adjacent `StringElement`s into one run and drops empty ones.
#[must_use]
pub fn merge_adjacent_strings(elements: Vec<InlineElement>) -> Vec<InlineElement> {
    let mut merged: Vec<InlineElement> = Vec::with_capacity(elements.len());
    for element in elements {
        if let InlineElement::StringElement(text) = &element {
            if text.is_empty() {
                continue;
            }
            if let Some(InlineElement::StringElement(previous)) = merged.last_mut() {
                previous.push_str(text);
                continue;
            }
        }
        merged.push(element);
    }
    merged
}

/// Flattens an inline sequence to the text a reader would see.
#[must_use]
pub fn plain_text(elements: &[InlineElement]) -> String {
    let mut text = String::new();
    push_plain_text(elements, &mut text);
    text
}

fn push_plain_text(elements: &[InlineElement], text: &mut String) {
    for element in elements {
        match element {
            InlineElement::RawLine(content)
            | InlineElement::StringElement(content)
            | InlineElement::SpecialCharacter(content)
            | InlineElement::Button(content) => text.push_str(content),
            InlineElement::Symbol(symbol) => text.push_str(symbol_text(symbol)),
            InlineElement::PredefinedAttribute(name) => {
                text.push_str(predefined_attribute_value(name).unwrap_or_default());
            }
            InlineElement::AttributeSubstitution(name) => {
                text.push('{');
                text.push_str(name);
                text.push('}');
            }
            InlineElement::QuotedText(QuotedText { elements, .. })
            | InlineElement::InlinePassthrough(InlinePassthrough { elements, .. })
            | InlineElement::IndexTerm(elements) => push_plain_text(elements, text),
            InlineElement::InlineLink(link) => {
                if let Some(AttributeValue::Inlines(label)) = link
                    .attributes
                    .get(crate::model::RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT)
                {
                    push_plain_text(label, text);
                } else {
                    text.push_str(&link.location.to_text());
                }
            }
            InlineElement::CrossReference(CrossReference { id, label }) => match label {
                Some(label) => push_plain_text(label, text),
                None => text.push_str(id),
            },
            InlineElement::Keyboard(keys) => text.push_str(&keys.join("+")),
            InlineElement::LineBreak => text.push('\n'),
            InlineElement::Callout(number) => {
                text.push_str(&format!("<{number}>"));
            }
            InlineElement::SingleLineComment(_)
            | InlineElement::CounterSubstitution(_)
            | InlineElement::InlineImage(_)
            | InlineElement::Footnote(_)
            | InlineElement::ConcealedIndexTerm(_)
            | InlineElement::InlineAnchor(_)
            | InlineElement::Icon(_)
            | InlineElement::ElementPlaceholder(_) => {}
        }
    }
}

/// The typographic character a replacement symbol stands for.
#[must_use]
pub fn symbol_text(symbol: &str) -> &str {
    match symbol {
        "(C)" => "\u{a9}",
        "(R)" => "\u{ae}",
        "(TM)" => "\u{2122}",
        "--" => "\u{2014}",
        "..." => "\u{2026}",
        "->" => "\u{2192}",
        "=>" => "\u{21d2}",
        "<-" => "\u{2190}",
        "<=" => "\u{21d0}",
        "'" | "`'" => "\u{2019}",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn merges_adjacent_strings_and_drops_empty_runs() {
        let merged = merge_adjacent_strings(vec![
            InlineElement::StringElement("a".into()),
            InlineElement::StringElement(String::new()),
            InlineElement::StringElement("b".into()),
            InlineElement::LineBreak,
            InlineElement::StringElement("c".into()),
        ]);
        assert_eq!(
            merged,
            vec![
                InlineElement::StringElement("ab".into()),
                InlineElement::LineBreak,
                InlineElement::StringElement("c".into()),
            ]
        );
    }

    #[test]
    fn location_detects_scheme() {
        let location = Location::from_target("https://example.org/a.png");
        assert_eq!(location.scheme, "https://");
        assert_eq!(
            location.path,
            vec![InlineElement::StringElement("example.org/a.png".into())]
        );
        assert!(!location.is_relative());
    }

    #[test]
    fn prefix_skips_absolute_paths() {
        let mut location = Location::from_target("/abs/a.png");
        location.prefix_with("img");
        assert_eq!(location.to_text(), "/abs/a.png");

        let mut location = Location::from_target("a.png");
        location.prefix_with("img/");
        assert_eq!(location.to_text(), "img/a.png");
    }

    #[test]
    fn plain_text_flattens_quotes_and_symbols() {
        let elements = vec![
            InlineElement::QuotedText(QuotedText {
                kind: QuotedTextKind::SingleQuoteBold,
                attributes: Attributes::default(),
                elements: vec![InlineElement::StringElement("Hello".into())],
            }),
            InlineElement::Symbol("...".into()),
        ];
        assert_eq!(plain_text(&elements), "Hello\u{2026}");
    }
}
