//! The document tree handed to renderers.
use serde::{
    Serialize,
    ser::{SerializeMap, Serializer},
};

mod attributes;
mod inlines;
mod lists;
mod substitution;

pub use attributes::*;
pub use inlines::*;
pub use lists::*;
pub use substitution::*;

use crate::Error;

/// Inclusive, 1-based range of source lines a block was built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn line(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Number of source lines covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == 0 && self.end == 0
    }

    /// Extends the span to also cover `other`.
    pub fn cover(&mut self, other: Span) {
        if self.is_empty() {
            *self = other;
        } else {
            self.start = self.start.min(other.start);
            self.end = self.end.max(other.end);
        }
    }
}

/// The parsed document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    /// Attributes declared in the document header.
    pub attributes: Attributes,
    pub element_references: ElementReferences,
    pub elements: Vec<Block>,
    pub footnotes: Vec<Footnote>,
}

impl Document {
    /// The level 0 section that opened the document, if any.
    #[must_use]
    pub fn header(&self) -> Option<&Section> {
        self.elements
            .first()
            .and_then(|block| {
                if let Block::Section(section) = block {
                    Some(section)
                } else {
                    None
                }
            })
            .filter(|section| section.level == 0)
    }
}

/// Element ids mapped to their title, in order of appearance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementReferences(Vec<(String, Vec<InlineElement>)>);

impl ElementReferences {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&[InlineElement]> {
        self.0
            .iter()
            .find_map(|(key, title)| (key == id).then_some(title.as_slice()))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|(key, _)| key == id)
    }

    pub fn insert(&mut self, id: impl Into<String>, title: Vec<InlineElement>) {
        let id = id.into();
        if let Some(existing) = self.0.iter_mut().find(|(key, _)| *key == id) {
            existing.1 = title;
        } else {
            self.0.push((id, title));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ElementReferences {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

/// A block-level element.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    DelimitedBlock(DelimitedBlock),
    Section(Section),
    AttributeDeclaration(AttributeDeclaration),
    AttributeReset(AttributeReset),
    ImageBlock(ImageBlock),
    ThematicBreak(Break),
    PageBreak(Break),
    SingleLineComment(Comment),
    BlankLine(BlankLine),
    List(List),
    ListElement(ListElement),
    ListContinuation(ListContinuation),
    Table(Table),
}

impl Block {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Block::Paragraph(Paragraph { span, .. })
            | Block::DelimitedBlock(DelimitedBlock { span, .. })
            | Block::Section(Section { span, .. })
            | Block::AttributeDeclaration(AttributeDeclaration { span, .. })
            | Block::AttributeReset(AttributeReset { span, .. })
            | Block::ImageBlock(ImageBlock { span, .. })
            | Block::ThematicBreak(Break { span, .. })
            | Block::PageBreak(Break { span, .. })
            | Block::SingleLineComment(Comment { span, .. })
            | Block::BlankLine(BlankLine { span })
            | Block::List(List { span, .. })
            | Block::ListElement(ListElement { span, .. })
            | Block::ListContinuation(ListContinuation { span })
            | Block::Table(Table { span, .. }) => *span,
        }
    }

    /// The block's attribute map, for the kinds that carry one.
    #[must_use]
    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Block::Paragraph(Paragraph { attributes, .. })
            | Block::DelimitedBlock(DelimitedBlock { attributes, .. })
            | Block::Section(Section { attributes, .. })
            | Block::ImageBlock(ImageBlock { attributes, .. })
            | Block::ThematicBreak(Break { attributes, .. })
            | Block::PageBreak(Break { attributes, .. })
            | Block::List(List { attributes, .. })
            | Block::ListElement(ListElement { attributes, .. })
            | Block::Table(Table { attributes, .. }) => Some(attributes),
            Block::AttributeDeclaration(_)
            | Block::AttributeReset(_)
            | Block::SingleLineComment(_)
            | Block::BlankLine(_)
            | Block::ListContinuation(_) => None,
        }
    }

    pub fn attributes_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            Block::Paragraph(Paragraph { attributes, .. })
            | Block::DelimitedBlock(DelimitedBlock { attributes, .. })
            | Block::Section(Section { attributes, .. })
            | Block::ImageBlock(ImageBlock { attributes, .. })
            | Block::ThematicBreak(Break { attributes, .. })
            | Block::PageBreak(Break { attributes, .. })
            | Block::List(List { attributes, .. })
            | Block::ListElement(ListElement { attributes, .. })
            | Block::Table(Table { attributes, .. }) => Some(attributes),
            Block::AttributeDeclaration(_)
            | Block::AttributeReset(_)
            | Block::SingleLineComment(_)
            | Block::BlankLine(_)
            | Block::ListContinuation(_) => None,
        }
    }

    /// `true` for blocks that only exist while the pipeline runs and never
    /// reach a renderer on their own.
    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self, Block::SingleLineComment(_))
            || matches!(
                self,
                Block::DelimitedBlock(DelimitedBlock {
                    kind: DelimiterKind::Comment,
                    ..
                })
            )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paragraph {
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub elements: Vec<InlineElement>,
    pub span: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterKind {
    Listing,
    Literal,
    Fenced,
    Example,
    Sidebar,
    Quote,
    Verse,
    Open,
    Passthrough,
    Comment,
    Table,
    MarkdownQuote,
}

impl DelimiterKind {
    /// Verbatim kinds keep their lines as-is; the others nest blocks.
    #[must_use]
    pub fn is_verbatim(self) -> bool {
        matches!(
            self,
            Self::Listing
                | Self::Literal
                | Self::Fenced
                | Self::Passthrough
                | Self::Comment
                | Self::Table
                | Self::Verse
                | Self::MarkdownQuote
        )
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Listing => "listing",
            Self::Literal => "literal",
            Self::Fenced => "fenced",
            Self::Example => "example",
            Self::Sidebar => "sidebar",
            Self::Quote => "quote",
            Self::Verse => "verse",
            Self::Open => "open",
            Self::Passthrough => "passthrough",
            Self::Comment => "comment",
            Self::Table => "table",
            Self::MarkdownQuote => "markdown quote",
        }
    }
}

/// Content of a delimited block: inline content for verbatim kinds, nested
/// blocks for compound ones.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DelimitedContent {
    Inline(Vec<InlineElement>),
    Blocks(Vec<Block>),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DelimitedBlock {
    pub kind: DelimiterKind,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(rename = "elements")]
    pub content: DelimitedContent,
    pub span: Span,
}

impl DelimitedBlock {
    #[must_use]
    pub fn elements(&self) -> &[InlineElement] {
        match &self.content {
            DelimitedContent::Inline(elements) => elements,
            DelimitedContent::Blocks(_) => &[],
        }
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        match &self.content {
            DelimitedContent::Blocks(blocks) => blocks,
            DelimitedContent::Inline(_) => &[],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    pub level: usize,
    pub title: Vec<InlineElement>,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub elements: Vec<Block>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeDeclaration {
    pub name: String,
    pub value: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeReset {
    pub name: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImageBlock {
    pub location: Location,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub span: Span,
}

/// A thematic or page break.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Break {
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comment {
    pub content: String,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlankLine {
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub header: Option<TableRow>,
    pub rows: Vec<TableRow>,
    pub span: Span,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TableCell {
    pub elements: Vec<InlineElement>,
}

/// A provisional group of blocks in transit between pipeline stages.
///
/// A fragment that carries an `error` is forwarded unchanged by every stage
/// after the one that set it.
#[derive(Debug)]
pub struct DocumentFragment {
    pub line_offset: usize,
    pub elements: Vec<Block>,
    pub error: Option<Error>,
}

impl DocumentFragment {
    #[must_use]
    pub fn new(line_offset: usize, elements: Vec<Block>) -> Self {
        Self {
            line_offset,
            elements,
            error: None,
        }
    }

    #[must_use]
    pub fn single(block: Block) -> Self {
        Self::new(block.span().start, vec![block])
    }

    #[must_use]
    pub fn failed(line_offset: usize, error: Error) -> Self {
        Self {
            line_offset,
            elements: Vec::new(),
            error: Some(error),
        }
    }
}
