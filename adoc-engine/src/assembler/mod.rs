//! Groups classified lines into provisional block fragments.
//!
//! At the top level the assembler dispatches on each line's kind. Block
//! attribute and title lines are collected until the block they belong to
//! shows up (a blank line drops them); every other line opens a block that
//! is read to its end before the fragment is handed on. Verbatim delimited
//! blocks keep their lines untouched while compound ones are assembled again
//! by a nested assembler. A run of list items, continuations and attached
//! blocks leaves as one flat fragment for the list arranger to nest.
use std::iter::Peekable;

use crate::{
    Error,
    arranger::{CalloutTracker, arrange},
    constants::ADMONITION_STYLES,
    error::Detail,
    grammar::{AttributeListContext, parse_attribute_list},
    model::{
        AttributeDeclaration, AttributeReset, Attributes, BlankLine, Block, Break, Comment,
        DelimitedBlock, DelimitedContent, DelimiterKind, DocumentFragment, ImageBlock,
        InlineElement, ListContinuation, ListElement, ListElementKind, Location, NumberingStyle,
        Paragraph, RESERVED_NAMED_ATTRIBUTE_LANGUAGE, RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR,
        RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE, RESERVED_NAMED_ATTRIBUTE_STYLE,
        RESERVED_NAMED_ATTRIBUTE_TITLE, Section, Span,
    },
    scanner::{Line, LineKind, ListMarker},
};

mod table;

/// Attribute and title lines waiting for their block.
#[derive(Debug)]
struct Pending {
    attributes: Attributes,
    start: usize,
}

/// Turns a stream of [`Line`]s into [`DocumentFragment`]s.
///
/// Fragments hold one block each, except for list runs which keep every
/// item, blank line, continuation and attached block of the run together.
pub struct Assembler<I: Iterator<Item = Line>> {
    lines: Peekable<I>,
    pushback: Vec<Line>,
    pending: Option<Pending>,
    level_offset: isize,
    /// The compound block being assembled, `None` at document level.
    context: Option<DelimiterKind>,
}

impl<I: Iterator<Item = Line>> Assembler<I> {
    #[must_use]
    pub fn new(lines: I, level_offset: isize) -> Self {
        Self {
            lines: lines.peekable(),
            pushback: Vec::new(),
            pending: None,
            level_offset,
            context: None,
        }
    }

    fn next_line(&mut self) -> Option<Line> {
        self.pushback.pop().or_else(|| self.lines.next())
    }

    fn peek_line(&mut self) -> Option<&Line> {
        if self.pushback.is_empty() {
            self.lines.peek()
        } else {
            self.pushback.last()
        }
    }

    /// Takes the collected attributes for the block opened by `line`,
    /// together with the line the block's span starts on.
    fn take_pending(&mut self, line: &Line) -> (Attributes, usize) {
        match self.pending.take() {
            Some(Pending { attributes, start }) => (attributes, start.min(line.number)),
            None => (Attributes::new(), line.number),
        }
    }

    /// Buffers a block attribute or title line. Returns `false` for any
    /// other kind of line.
    fn collect(&mut self, line: &Line) -> Result<bool, Error> {
        let attributes = if let LineKind::BlockAttributes { content } = &line.kind {
            parse_attribute_list(content, AttributeListContext::Block)
                .map_err(|content| Error::BlockAttributes(Detail::at(line.number), content))?
        } else if let LineKind::Title { title } = &line.kind {
            let mut attributes = Attributes::new();
            attributes.insert(RESERVED_NAMED_ATTRIBUTE_TITLE, title.clone());
            attributes
        } else {
            return Ok(false);
        };
        tracing::trace!(line = line.number, ?attributes, "collecting block attributes");
        self.pending
            .get_or_insert_with(|| Pending {
                attributes: Attributes::new(),
                start: line.number,
            })
            .attributes
            .merge(attributes);
        Ok(true)
    }

    fn discard_pending(&mut self, line: &Line) {
        if self.pending.take().is_some() {
            tracing::debug!(
                line = line.number,
                "blank line separates block attributes from their block"
            );
        }
    }

    fn next_fragment(&mut self) -> Option<DocumentFragment> {
        loop {
            let line = self.next_line()?;
            match self.collect(&line) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(error) => return Some(DocumentFragment::failed(line.number, error)),
            }
            if line.is_blank() {
                self.discard_pending(&line);
                continue;
            }
            let offset = self
                .pending
                .as_ref()
                .map_or(line.number, |pending| pending.start);
            return Some(match self.read_block(&line, false) {
                Ok(elements) => DocumentFragment::new(offset, elements),
                Err(error) => DocumentFragment::failed(error.line().unwrap_or(offset), error),
            });
        }
    }

    /// Reads the block opened by `line`. `in_list` is set for blocks
    /// attached to a list item with a continuation.
    fn read_block(&mut self, line: &Line, in_list: bool) -> Result<Vec<Block>, Error> {
        let block = match &line.kind {
            LineKind::Comment { content } => Block::SingleLineComment(Comment {
                content: content.clone(),
                span: Span::line(line.number),
            }),
            LineKind::AttributeDeclaration { name, value } => {
                Block::AttributeDeclaration(AttributeDeclaration {
                    name: name.clone(),
                    value: value.clone(),
                    span: Span::new(line.number, line.end),
                })
            }
            LineKind::AttributeReset { name } => Block::AttributeReset(AttributeReset {
                name: name.clone(),
                span: Span::line(line.number),
            }),
            LineKind::ListItem { .. } => return self.read_list(line),
            LineKind::Section { level, title } => self.read_section(line, *level, title)?,
            LineKind::Delimiter {
                delimiter_kind,
                delimiter,
                language,
            } => self.read_delimited(line, *delimiter_kind, delimiter, language.as_deref())?,
            LineKind::ImageBlock { target, attributes } => {
                self.read_image(line, target, attributes)?
            }
            LineKind::ThematicBreak => Block::ThematicBreak(self.read_break(line)),
            LineKind::PageBreak => Block::PageBreak(self.read_break(line)),
            LineKind::Raw
            | LineKind::Continuation
            | LineKind::Title { .. }
            | LineKind::BlockAttributes { .. }
            | LineKind::Blank => self.read_paragraph(line, in_list)?,
        };
        Ok(vec![block])
    }

    fn read_section(&mut self, line: &Line, level: usize, title: &str) -> Result<Block, Error> {
        let (attributes, start) = self.take_pending(line);
        if let Some(context) = self.context
            && attributes.style() != Some("discrete")
        {
            return Err(Error::structural(
                line.number,
                line.kind.name(),
                &format!("{} block", context.name()),
            ));
        }
        let shifted = level.saturating_add_signed(self.level_offset).min(5);
        if shifted != level {
            tracing::trace!(level, shifted, "applied section level offset");
        }
        Ok(Block::Section(Section {
            level: shifted,
            title: vec![InlineElement::RawLine(title.to_string())],
            attributes,
            elements: Vec::new(),
            span: Span::new(start, line.end),
        }))
    }

    fn read_break(&mut self, line: &Line) -> Break {
        let (attributes, start) = self.take_pending(line);
        Break {
            attributes,
            span: Span::new(start, line.end),
        }
    }

    fn read_image(&mut self, line: &Line, target: &str, content: &str) -> Result<Block, Error> {
        let (mut attributes, start) = self.take_pending(line);
        let macro_attributes = parse_attribute_list(content, AttributeListContext::Image)
            .map_err(|content| Error::BlockAttributes(Detail::at(line.number), content))?;
        attributes.merge(macro_attributes);
        Ok(Block::ImageBlock(ImageBlock {
            location: Location {
                scheme: String::new(),
                path: vec![InlineElement::RawLine(target.to_string())],
            },
            attributes,
            span: Span::new(start, line.end),
        }))
    }

    /// Collects the lines up to the delimiter line matching `delimiter`.
    ///
    /// Inside compound blocks, nested delimited blocks are tracked so that
    /// their lines (and the closing delimiters of verbatim ones) are kept
    /// as content. An unclosed block runs to the end of the input.
    fn collect_delimited(
        &mut self,
        kind: DelimiterKind,
        delimiter: &str,
        open: &Line,
    ) -> (Vec<Line>, usize) {
        let mut inner = Vec::new();
        let mut nested: Vec<(String, bool)> = Vec::new();
        let mut end = open.end;
        while let Some(line) = self.next_line() {
            end = line.end;
            if let LineKind::Delimiter {
                delimiter: found,
                delimiter_kind,
                ..
            } = &line.kind
            {
                if nested.is_empty() && found == delimiter {
                    return (inner, end);
                }
                if nested.last().is_some_and(|(top, _)| top == found) {
                    nested.pop();
                } else if !kind.is_verbatim() && !nested.last().is_some_and(|(_, verbatim)| *verbatim)
                {
                    nested.push((found.clone(), delimiter_kind.is_verbatim()));
                }
            }
            inner.push(line);
        }
        tracing::debug!(
            line = open.number,
            kind = kind.name(),
            "unclosed delimited block runs to the end of the document"
        );
        (inner, end)
    }

    fn read_delimited(
        &mut self,
        line: &Line,
        kind: DelimiterKind,
        delimiter: &str,
        language: Option<&str>,
    ) -> Result<Block, Error> {
        let (mut attributes, start) = self.take_pending(line);
        let kind = promote_delimited(kind, attributes.style());
        let (inner, end) = self.collect_delimited(kind, delimiter, line);
        let span = Span::new(start, end);
        tracing::trace!(kind = kind.name(), ?span, "assembled delimited block");

        if kind == DelimiterKind::Fenced {
            if attributes.style().is_none() {
                attributes.insert(RESERVED_NAMED_ATTRIBUTE_STYLE, "source");
            }
            if let Some(language) = language
                && !attributes.contains_key(RESERVED_NAMED_ATTRIBUTE_LANGUAGE)
            {
                attributes.insert(RESERVED_NAMED_ATTRIBUTE_LANGUAGE, language);
            }
        }
        if kind == DelimiterKind::Table {
            return Ok(Block::Table(table::build(attributes, &inner, span)));
        }
        if kind.is_verbatim() {
            return Ok(Block::DelimitedBlock(DelimitedBlock {
                kind,
                attributes,
                content: DelimitedContent::Inline(raw_lines(&inner)),
                span,
            }));
        }

        let mut blocks = Vec::new();
        let mut callouts = CalloutTracker::default();
        for fragment in Assembler::nested(inner, self.level_offset, kind) {
            if let Some(error) = fragment.error {
                return Err(error);
            }
            blocks.extend(arrange(fragment.elements, &mut callouts));
        }
        Ok(Block::DelimitedBlock(DelimitedBlock {
            kind,
            attributes,
            content: DelimitedContent::Blocks(blocks),
            span,
        }))
    }

    fn read_paragraph(&mut self, first: &Line, in_list: bool) -> Result<Block, Error> {
        let (mut attributes, start) = self.take_pending(first);
        let literal = first.is_indented() && attributes.style().is_none();
        let mut lines = vec![first.clone()];
        while let Some(next) = self.peek_line() {
            if ends_paragraph(&next.kind, in_list, literal) {
                break;
            }
            if let Some(next) = self.next_line() {
                lines.push(next);
            }
        }
        let span = Span::new(start, lines.last().map_or(first.end, |line| line.end));

        if literal {
            attributes.insert(RESERVED_NAMED_ATTRIBUTE_STYLE, "literal");
            return Ok(verbatim(
                DelimiterKind::Literal,
                attributes,
                dedent(&lines),
                span,
            ));
        }

        let elements = paragraph_lines(&lines);
        let style = attributes.style().unwrap_or_default().to_string();
        let block = match style.as_str() {
            "literal" => verbatim(DelimiterKind::Literal, attributes, raw_lines(&lines), span),
            "listing" | "source" => {
                verbatim(DelimiterKind::Listing, attributes, raw_lines(&lines), span)
            }
            "pass" => verbatim(
                DelimiterKind::Passthrough,
                attributes,
                raw_lines(&lines),
                span,
            ),
            "verse" => verbatim(DelimiterKind::Verse, attributes, elements, span),
            "quote" => Block::DelimitedBlock(DelimitedBlock {
                kind: DelimiterKind::Quote,
                attributes,
                content: DelimitedContent::Blocks(vec![Block::Paragraph(Paragraph {
                    attributes: Attributes::new(),
                    elements,
                    span,
                })]),
                span,
            }),
            "" if !in_list && is_markdown_quote(first) => markdown_quote(attributes, &lines, span),
            _ => {
                let elements = if style.is_empty() {
                    strip_admonition(&mut attributes, elements)
                } else {
                    elements
                };
                Block::Paragraph(Paragraph {
                    attributes,
                    elements,
                    span,
                })
            }
        };
        Ok(block)
    }

    fn read_list(&mut self, first: &Line) -> Result<Vec<Block>, Error> {
        let mut blocks = Vec::new();
        let mut next_item = Some(first.clone());
        while let Some(item_line) = next_item.take() {
            blocks.push(Block::ListElement(self.read_item(&item_line)?));
            let mut blanks = 0usize;
            while let Some(line) = self.next_line() {
                match &line.kind {
                    LineKind::Blank => {
                        self.discard_pending(&line);
                        blanks += 1;
                        blocks.push(Block::BlankLine(BlankLine {
                            span: Span::line(line.number),
                        }));
                    }
                    LineKind::Comment { .. } => {}
                    LineKind::ListItem { .. } => {
                        next_item = Some(line);
                        break;
                    }
                    LineKind::BlockAttributes { .. } | LineKind::Title { .. } => {
                        self.collect(&line)?;
                    }
                    LineKind::Continuation => {
                        blocks.push(Block::ListContinuation(ListContinuation {
                            span: Span::line(line.number),
                        }));
                        blocks.extend(self.read_attached()?);
                        blanks = 0;
                    }
                    LineKind::Raw if blanks > 0 && line.is_indented() => {
                        blocks.push(self.read_paragraph(&line, true)?);
                        blanks = 0;
                    }
                    LineKind::Raw
                    | LineKind::Delimiter { .. }
                    | LineKind::AttributeDeclaration { .. }
                    | LineKind::AttributeReset { .. }
                    | LineKind::Section { .. }
                    | LineKind::ImageBlock { .. }
                    | LineKind::ThematicBreak
                    | LineKind::PageBreak => {
                        self.pushback.push(line);
                        break;
                    }
                }
            }
        }
        tracing::trace!(blocks = blocks.len(), "assembled list run");
        Ok(blocks)
    }

    /// Reads the block following a `+` continuation.
    fn read_attached(&mut self) -> Result<Vec<Block>, Error> {
        while let Some(line) = self.next_line() {
            if self.collect(&line)? {
                continue;
            }
            match &line.kind {
                LineKind::Comment { .. } => {}
                LineKind::Blank
                | LineKind::ListItem { .. }
                | LineKind::Section { .. }
                | LineKind::Continuation => {
                    tracing::debug!(line = line.number, "list continuation without a block");
                    self.pushback.push(line);
                    return Ok(Vec::new());
                }
                LineKind::Raw
                | LineKind::Delimiter { .. }
                | LineKind::AttributeDeclaration { .. }
                | LineKind::AttributeReset { .. }
                | LineKind::ImageBlock { .. }
                | LineKind::ThematicBreak
                | LineKind::PageBreak
                | LineKind::BlockAttributes { .. }
                | LineKind::Title { .. } => return self.read_block(&line, true),
            }
        }
        Ok(Vec::new())
    }

    fn read_item(&mut self, line: &Line) -> Result<ListElement, Error> {
        let LineKind::ListItem { marker, body } = &line.kind else {
            return Err(Error::structural(line.number, line.kind.name(), "list"));
        };
        let (attributes, _) = self.take_pending(line);

        let mut text = Vec::new();
        if !body.is_empty() {
            text.push(InlineElement::RawLine(body.clone()));
        }
        let mut end = line.end;
        while let Some(next) = self.peek_line() {
            if !matches!(
                next.kind,
                LineKind::Raw | LineKind::Title { .. } | LineKind::Comment { .. }
            ) {
                break;
            }
            if let Some(next) = self.next_line() {
                end = next.end;
                text.push(if let LineKind::Comment { content } = next.kind {
                    InlineElement::SingleLineComment(content)
                } else {
                    InlineElement::RawLine(next.text().trim_start().to_string())
                });
            }
        }

        let (kind, level) = match marker.clone() {
            ListMarker::Unordered {
                bullet,
                level,
                checked,
            } => (ListElementKind::Unordered { bullet, checked }, level),
            ListMarker::Ordered { style, level } => (
                ListElementKind::Ordered {
                    style: style.unwrap_or_else(|| NumberingStyle::for_level(level)),
                    implicit: style.is_none(),
                },
                level,
            ),
            ListMarker::Labeled {
                term,
                level,
                delimiter,
            } => (
                ListElementKind::Labeled {
                    term: vec![InlineElement::RawLine(term)],
                    delimiter,
                },
                level,
            ),
            ListMarker::Callout { number } => (
                ListElementKind::Callout {
                    number,
                    matched: false,
                },
                1,
            ),
        };
        let span = Span::new(line.number, end);
        let elements = if text.is_empty() {
            Vec::new()
        } else {
            vec![Block::Paragraph(Paragraph {
                attributes: Attributes::new(),
                elements: text,
                span,
            })]
        };
        Ok(ListElement {
            kind,
            level,
            attributes,
            elements,
            span,
        })
    }
}

impl Assembler<std::vec::IntoIter<Line>> {
    fn nested(lines: Vec<Line>, level_offset: isize, context: DelimiterKind) -> Self {
        let mut assembler = Self::new(lines.into_iter(), level_offset);
        assembler.context = Some(context);
        assembler
    }
}

impl<I: Iterator<Item = Line>> Iterator for Assembler<I> {
    type Item = DocumentFragment;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_fragment()
    }
}

/// Applies block styles that turn one delimited kind into another.
fn promote_delimited(kind: DelimiterKind, style: Option<&str>) -> DelimiterKind {
    match (kind, style.unwrap_or_default()) {
        (DelimiterKind::Quote | DelimiterKind::Open, "verse") => DelimiterKind::Verse,
        (DelimiterKind::Open, "source" | "listing") => DelimiterKind::Listing,
        (DelimiterKind::Open, "literal") => DelimiterKind::Literal,
        (DelimiterKind::Open, "pass") => DelimiterKind::Passthrough,
        (DelimiterKind::Open, "quote") => DelimiterKind::Quote,
        (DelimiterKind::Open, "sidebar") => DelimiterKind::Sidebar,
        (DelimiterKind::Open, "example") => DelimiterKind::Example,
        (kind, _) => kind,
    }
}

fn ends_paragraph(kind: &LineKind, in_list: bool, literal: bool) -> bool {
    match kind {
        LineKind::Blank => true,
        LineKind::Delimiter { .. } | LineKind::Section { .. } => !literal,
        LineKind::ListItem { .. } | LineKind::Continuation => in_list,
        LineKind::BlockAttributes { .. } => in_list && !literal,
        LineKind::Raw
        | LineKind::Comment { .. }
        | LineKind::AttributeDeclaration { .. }
        | LineKind::AttributeReset { .. }
        | LineKind::Title { .. }
        | LineKind::ImageBlock { .. }
        | LineKind::ThematicBreak
        | LineKind::PageBreak => false,
    }
}

fn verbatim(
    kind: DelimiterKind,
    attributes: Attributes,
    elements: Vec<InlineElement>,
    span: Span,
) -> Block {
    Block::DelimitedBlock(DelimitedBlock {
        kind,
        attributes,
        content: DelimitedContent::Inline(elements),
        span,
    })
}

/// One `RawLine` per source line, folded declarations split back apart.
fn raw_lines(lines: &[Line]) -> Vec<InlineElement> {
    lines
        .iter()
        .flat_map(|line| line.raw.split('\n'))
        .map(|raw| InlineElement::RawLine(raw.to_string()))
        .collect()
}

/// Paragraph content: comment lines stay as comments so the substitution
/// engine can drop them without joining the lines around them.
fn paragraph_lines(lines: &[Line]) -> Vec<InlineElement> {
    lines
        .iter()
        .map(|line| {
            if let LineKind::Comment { content } = &line.kind {
                InlineElement::SingleLineComment(content.clone())
            } else {
                InlineElement::RawLine(line.text().to_string())
            }
        })
        .collect()
}

/// Removes the space and tab indentation shared by every non-empty line.
fn dedent(lines: &[Line]) -> Vec<InlineElement> {
    let indent = lines
        .iter()
        .filter(|line| !line.text().is_empty())
        .map(|line| line.raw.len() - line.raw.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or_default();
    lines
        .iter()
        .map(|line| {
            let raw = line.raw.get(indent..).unwrap_or(line.raw.as_str());
            InlineElement::RawLine(raw.to_string())
        })
        .collect()
}

fn is_markdown_quote(line: &Line) -> bool {
    line.text().starts_with("> ") || line.text() == ">"
}

fn markdown_quote(mut attributes: Attributes, lines: &[Line], span: Span) -> Block {
    let mut content = lines
        .iter()
        .map(|line| {
            let text = line.text();
            text.strip_prefix("> ")
                .or_else(|| text.strip_prefix('>'))
                .unwrap_or(text)
                .to_string()
        })
        .collect::<Vec<_>>();
    if let Some(attribution) = content
        .last()
        .and_then(|last| last.strip_prefix("-- "))
        .map(|attribution| attribution.trim().to_string())
    {
        content.pop();
        let (author, title) = match attribution.split_once(", ") {
            Some((author, title)) => (author.to_string(), Some(title.to_string())),
            None => (attribution, None),
        };
        attributes.insert(RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR, author);
        if let Some(title) = title {
            attributes.insert(RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE, title);
        }
    }
    verbatim(
        DelimiterKind::MarkdownQuote,
        attributes,
        content.into_iter().map(InlineElement::RawLine).collect(),
        span,
    )
}

/// Turns a `NOTE: text` paragraph into a paragraph styled `NOTE`.
fn strip_admonition(
    attributes: &mut Attributes,
    mut elements: Vec<InlineElement>,
) -> Vec<InlineElement> {
    if let Some(InlineElement::RawLine(first)) = elements.first_mut() {
        for label in ADMONITION_STYLES {
            if let Some(rest) = first
                .strip_prefix(label)
                .and_then(|rest| rest.strip_prefix(": "))
            {
                *first = rest.trim_start().to_string();
                attributes.insert(RESERVED_NAMED_ATTRIBUTE_STYLE, *label);
                break;
            }
        }
    }
    elements
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests;
