//! Runs the pipeline stages and builds the final [`Document`].
use std::io::Read;

use rayon::prelude::*;

use crate::{
    Error, Options,
    arranger::ListArranger,
    assembler::Assembler,
    model::{
        AttributeDeclaration, AttributeReset, Attributes, Block, DelimitedContent, Document,
        Section,
    },
    reader::read_source,
    scanner::Scanner,
    splitter::Splitter,
    substitution::SubstitutionEngine,
};

/// Parse an `AsciiDoc` document from a reader.
///
/// The bytes are decoded as described in [`read_source`] before parsing.
///
/// # Errors
///
/// Returns the error of the first fragment that failed, or [`Error::Io`] if
/// reading fails.
pub fn parse(reader: impl Read, options: &Options) -> Result<Document, Error> {
    let input =
        read_source(reader).map_err(|error| error.with_filename(options.filename.as_deref()))?;
    parse_str(&input, options)
}

/// Parse an `AsciiDoc` document from a string.
///
/// # Example
///
/// ```
/// use adoc_engine::{Block, Options, parse_str};
///
/// let document = parse_str(":product: Widget\n\nUse {product}.", &Options::default())?;
/// assert_eq!(document.attributes.get_str("product"), Some("Widget"));
/// assert!(matches!(document.elements.first(), Some(Block::Paragraph(_))));
/// # Ok::<(), adoc_engine::Error>(())
/// ```
///
/// # Errors
///
/// No partial document is returned: the error of the first fragment that
/// failed is returned instead, with the configured file name attached.
#[tracing::instrument(skip_all, fields(filename = options.filename.as_deref()))]
pub fn parse_str(input: &str, options: &Options) -> Result<Document, Error> {
    let fragments = Splitter::new(ListArranger::new(Assembler::new(
        Scanner::new(input),
        options.level_offset,
    )));
    let mut engine = SubstitutionEngine::new(fragments, options.attributes.clone());

    let mut blocks = Vec::new();
    for fragment in engine.by_ref() {
        if let Some(error) = fragment.error {
            tracing::debug!(line = fragment.line_offset, "stopping at the first error");
            return Err(error.with_filename(options.filename.as_deref()));
        }
        blocks.extend(fragment.elements);
    }

    let (_, element_references, footnotes) = engine.into_context().into_parts();
    let mut attributes = options.attributes.clone();
    let mut body = fold_header(drop_comments(blocks), &mut attributes)
        .into_iter()
        .peekable();

    // The document title is not a container: the body follows it.
    let mut elements = Vec::new();
    if let Some(Block::Section(title)) = body.peek()
        && title.level == 0
    {
        elements.extend(body.next());
    }
    elements.extend(nest_sections(body));

    tracing::debug!(
        elements = elements.len(),
        footnotes = footnotes.len(),
        "document parsed"
    );
    Ok(Document {
        attributes,
        element_references,
        elements,
        footnotes,
    })
}

/// Parse many independent documents in parallel.
///
/// Each document gets its own processing context, so counters and
/// attributes never leak from one to another.
#[must_use]
pub fn parse_documents(inputs: &[&str], options: &Options) -> Vec<Result<Document, Error>> {
    inputs
        .par_iter()
        .map(|input| parse_str(input, options))
        .collect()
}

/// Folds the declarations of the header into `attributes`.
///
/// The header is every declaration (and the level 0 title) before the first
/// other block. Declarations after it stay in the body.
fn fold_header(blocks: Vec<Block>, attributes: &mut Attributes) -> Vec<Block> {
    let mut body = Vec::with_capacity(blocks.len());
    let mut in_header = true;
    for block in blocks {
        if !in_header {
            body.push(block);
            continue;
        }
        match block {
            Block::AttributeDeclaration(AttributeDeclaration { name, value, .. }) => {
                attributes.insert(name, value);
            }
            Block::AttributeReset(AttributeReset { name, .. }) => {
                attributes.remove(&name);
            }
            Block::Section(section) if section.level == 0 && body.is_empty() => {
                body.push(Block::Section(section));
            }
            other => {
                in_header = false;
                body.push(other);
            }
        }
    }
    body
}

/// Removes comment blocks at any depth.
fn drop_comments(blocks: Vec<Block>) -> Vec<Block> {
    blocks
        .into_iter()
        .filter(|block| !block.is_comment())
        .map(|mut block| {
            match &mut block {
                Block::DelimitedBlock(delimited) => {
                    if let DelimitedContent::Blocks(children) = &mut delimited.content {
                        *children = drop_comments(std::mem::take(children));
                    }
                }
                Block::Section(section) => {
                    section.elements = drop_comments(std::mem::take(&mut section.elements));
                }
                Block::List(list) => {
                    for element in &mut list.elements {
                        element.elements = drop_comments(std::mem::take(&mut element.elements));
                    }
                }
                Block::ListElement(element) => {
                    element.elements = drop_comments(std::mem::take(&mut element.elements));
                }
                Block::Paragraph(_)
                | Block::AttributeDeclaration(_)
                | Block::AttributeReset(_)
                | Block::ImageBlock(_)
                | Block::ThematicBreak(_)
                | Block::PageBreak(_)
                | Block::SingleLineComment(_)
                | Block::BlankLine(_)
                | Block::ListContinuation(_)
                | Block::Table(_) => {}
            }
            block
        })
        .collect()
}

/// Moves the blocks following a section into it, up to the next section of
/// the same or a lower level. Discrete headings stay where they are.
fn nest_sections(blocks: impl IntoIterator<Item = Block>) -> Vec<Block> {
    let mut output = Vec::new();
    let mut open: Vec<Section> = Vec::new();
    for block in blocks {
        match block {
            Block::Section(section) if section.attributes.style() != Some("discrete") => {
                close_sections(&mut open, &mut output, section.level);
                if let Some(parent) = open.last()
                    && section.level > parent.level + 1
                {
                    tracing::warn!(
                        line = section.span.start,
                        parent = parent.level,
                        level = section.level,
                        "section level skipped"
                    );
                }
                open.push(section);
            }
            other => {
                if let Some(section) = open.last_mut() {
                    section.span.cover(other.span());
                    section.elements.push(other);
                } else {
                    output.push(other);
                }
            }
        }
    }
    close_sections(&mut open, &mut output, 0);
    output
}

fn close_sections(open: &mut Vec<Section>, output: &mut Vec<Block>, level: usize) {
    while open.last().is_some_and(|section| section.level >= level) {
        let Some(section) = open.pop() else {
            break;
        };
        if let Some(parent) = open.last_mut() {
            parent.span.cover(section.span);
            parent.elements.push(Block::Section(section));
        } else {
            output.push(Block::Section(section));
        }
    }
}
