//! Pipeline invariants checked against generated input
//!
//! - Critical: the pipeline never panics and never leaks placeholders.
//! - Structural: list arrangement is idempotent.
//! - Behavioural: attribute round trips, `subs=none` and verbatim content.

use proptest::prelude::*;

use crate::{
    Block, DelimitedContent, Document, InlineElement, ListElementKind, Options,
    arranger::{CalloutTracker, arrange},
    assembler::Assembler,
    constants::PLACEHOLDER_START,
    model::{AttributeValue, plain_text},
    parse_str,
    scanner::Scanner,
};

use super::generators::*;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 500,
        max_shrink_iters: 10000,
        .. ProptestConfig::default()
    })]

    /// Every input yields a document or an error, never a panic.
    #[test]
    fn pipeline_never_panics(input in any_document_string()) {
        let _ = parse_str(&input, &Options::default());
    }

    #[test]
    fn structured_input_never_panics(input in structured_document()) {
        let _ = parse_str(&input, &Options::default());
    }

    /// No placeholder survives a finished substitution, at any depth.
    #[test]
    fn placeholders_never_leak(input in structured_document()) {
        if let Ok(document) = parse_str(&input, &Options::default()) {
            let mut leaked = Vec::new();
            visit_document(&document, &mut |elements| {
                if has_placeholder(elements) {
                    leaked.push(elements.to_vec());
                }
            });
            prop_assert!(leaked.is_empty(), "placeholders leaked: {leaked:?}");
        }
    }

    /// Comments travel the pipeline but never reach the document, at any
    /// depth.
    #[test]
    fn comments_are_dropped(input in structured_document()) {
        if let Ok(document) = parse_str(&input, &Options::default()) {
            let mut comments = 0usize;
            walk_blocks(&document.elements, &mut |block| {
                if block.is_comment() {
                    comments += 1;
                }
            });
            prop_assert_eq!(comments, 0, "{:?}", document.elements);
        }
    }

    /// Arranging an arranged fragment again changes nothing.
    #[test]
    fn list_arrangement_is_idempotent(input in list_run()) {
        for fragment in Assembler::new(Scanner::new(input), 0) {
            prop_assume!(fragment.error.is_none());
            let once = arrange(fragment.elements, &mut CalloutTracker::default());
            let twice = arrange(once.clone(), &mut CalloutTracker::default());
            prop_assert_eq!(once, twice);
        }
    }

    /// A declared value comes back verbatim through a reference.
    #[test]
    fn attribute_round_trip(name in attribute_name(), value in plain_words()) {
        let source = format!(":{name}: {value}\n\n{{{name}}}");
        let document = parse_str(&source, &Options::default());
        prop_assert!(document.is_ok(), "{document:?}");
        let Some(Block::Paragraph(paragraph)) =
            document.ok().and_then(|document| document.elements.into_iter().last())
        else {
            return Err(TestCaseError::fail("expected a paragraph last"));
        };
        prop_assert_eq!(paragraph.elements, vec![InlineElement::StringElement(value)]);
    }

    /// `subs=none` keeps the raw lines, newlines included.
    #[test]
    fn subs_none_keeps_the_source(lines in paragraph_lines()) {
        let text = lines.join("\n");
        let document = parse_str(&format!("[subs=none]\n{text}"), &Options::default());
        let Some(Block::Paragraph(paragraph)) =
            document.ok().and_then(|document| document.elements.into_iter().next())
        else {
            return Err(TestCaseError::fail("expected a paragraph"));
        };
        prop_assert_eq!(paragraph.elements, vec![InlineElement::StringElement(text)]);
    }

    /// Listing content keeps its whitespace and never holds quoted text.
    #[test]
    fn verbatim_content_is_preserved(lines in verbatim_lines()) {
        let content = lines.join("\n");
        let document = parse_str(&format!("----\n{content}\n----"), &Options::default());
        let Some(Block::DelimitedBlock(block)) =
            document.ok().and_then(|document| document.elements.into_iter().next())
        else {
            return Err(TestCaseError::fail("expected a listing block"));
        };
        prop_assert!(!block.elements().iter().any(|element| matches!(element, InlineElement::QuotedText(_))));
        let text = plain_text(block.elements());
        prop_assert_eq!(text.trim_matches('\n'), content.trim_matches('\n'));
    }
}

/// Calls `f` on every block of the tree, parents before children.
fn walk_blocks(blocks: &[Block], f: &mut impl FnMut(&Block)) {
    for block in blocks {
        f(block);
        match block {
            Block::DelimitedBlock(delimited) => walk_blocks(delimited.blocks(), f),
            Block::Section(section) => walk_blocks(&section.elements, f),
            Block::List(list) => {
                for element in &list.elements {
                    walk_blocks(&element.elements, f);
                }
            }
            Block::ListElement(element) => walk_blocks(&element.elements, f),
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
    }
}

fn has_placeholder(elements: &[InlineElement]) -> bool {
    elements.iter().any(|element| match element {
        InlineElement::ElementPlaceholder(_) => true,
        InlineElement::StringElement(text) => text.contains(PLACEHOLDER_START),
        other => {
            let mut nested = false;
            other.for_each_nested(&mut |elements| nested |= has_placeholder(elements));
            nested
        }
    })
}

/// Calls `f` on every top-level inline sequence of the document.
fn visit_document(document: &Document, f: &mut impl FnMut(&[InlineElement])) {
    for footnote in &document.footnotes {
        f(&footnote.elements);
    }
    visit_blocks(&document.elements, f);
}

fn visit_blocks(blocks: &[Block], f: &mut impl FnMut(&[InlineElement])) {
    for block in blocks {
        if let Some(attributes) = block.attributes() {
            for (_, value) in attributes.iter() {
                if let AttributeValue::Inlines(elements) = value {
                    f(elements);
                }
            }
        }
        match block {
            Block::Paragraph(paragraph) => f(&paragraph.elements),
            Block::DelimitedBlock(delimited) => match &delimited.content {
                DelimitedContent::Inline(elements) => f(elements),
                DelimitedContent::Blocks(blocks) => visit_blocks(blocks, f),
            },
            Block::Section(section) => {
                f(&section.title);
                visit_blocks(&section.elements, f);
            }
            Block::ImageBlock(image) => f(&image.location.path),
            Block::List(list) => {
                for element in &list.elements {
                    if let ListElementKind::Labeled { term, .. } = &element.kind {
                        f(term);
                    }
                    visit_blocks(&element.elements, f);
                }
            }
            Block::ListElement(element) => visit_blocks(&element.elements, f),
            Block::Table(table) => {
                for row in table.header.iter().chain(&table.rows) {
                    for cell in &row.cells {
                        f(&cell.elements);
                    }
                }
            }
            Block::AttributeDeclaration(_)
            | Block::AttributeReset(_)
            | Block::ThematicBreak(_)
            | Block::PageBreak(_)
            | Block::SingleLineComment(_)
            | Block::BlankLine(_)
            | Block::ListContinuation(_) => {}
        }
    }
}
