use pretty_assertions::assert_eq;

use super::*;
use crate::{model::plain_text, scanner::Scanner};

fn fragments(source: &str) -> Vec<DocumentFragment> {
    Assembler::new(Scanner::new(source), 0).collect()
}

fn blocks(source: &str) -> Vec<Block> {
    fragments(source)
        .into_iter()
        .flat_map(|fragment| {
            assert!(fragment.error.is_none(), "unexpected {:?}", fragment.error);
            fragment.elements
        })
        .collect()
}

fn single(source: &str) -> Block {
    match blocks(source).as_slice() {
        [block] => block.clone(),
        other => panic!("expected one block, got {other:?}"),
    }
}

fn delimited(block: &Block) -> &DelimitedBlock {
    match block {
        Block::DelimitedBlock(block) => block,
        other => panic!("expected a delimited block, got {other:?}"),
    }
}

fn raw(text: &str) -> InlineElement {
    InlineElement::RawLine(text.to_string())
}

#[test]
fn paragraph_collects_lines_until_blank() {
    let blocks = blocks("one\ntwo\n\nthree");
    assert_eq!(blocks.len(), 2);
    let Some(Block::Paragraph(first)) = blocks.first() else {
        panic!("expected a paragraph");
    };
    assert_eq!(first.elements, vec![raw("one"), raw("two")]);
    assert_eq!(first.span, Span::new(1, 2));
}

#[test]
fn attributes_attach_to_the_next_block() {
    let Block::Paragraph(paragraph) = single("[.lead]\n.Intro\ntext") else {
        panic!("expected a paragraph");
    };
    assert_eq!(paragraph.attributes.roles(), ["lead".to_string()]);
    assert_eq!(paragraph.attributes.get_str("title"), Some("Intro"));
    assert_eq!(paragraph.span, Span::new(1, 3));
}

#[test]
fn blank_line_discards_pending_attributes() {
    let Block::Paragraph(paragraph) = single("[.lead]\n\ntext") else {
        panic!("expected a paragraph");
    };
    assert!(paragraph.attributes.is_empty());
}

#[test]
fn stacked_attribute_lines_accumulate() {
    let Block::Paragraph(paragraph) = single("[.first]\n[.second#id]\ntext") else {
        panic!("expected a paragraph");
    };
    assert_eq!(
        paragraph.attributes.roles(),
        ["first".to_string(), "second".to_string()]
    );
    assert_eq!(paragraph.attributes.id(), Some("id"));
}

#[test]
fn verbatim_block_keeps_blank_lines_and_indentation() {
    let block = single("----\nfn main() {\n\n    body\n}\n----");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Listing);
    assert_eq!(
        block.elements(),
        [raw("fn main() {"), raw(""), raw("    body"), raw("}")]
    );
    assert_eq!(block.span, Span::new(1, 6));
}

#[test]
fn unclosed_block_runs_to_the_end() {
    let block = single("....\nliteral\n\nstill literal");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Literal);
    assert_eq!(block.elements().len(), 3);
}

#[test]
fn longer_delimiter_needs_an_exact_close() {
    let block = single("------\n----\ninside\n------");
    assert_eq!(delimited(&block).elements(), [raw("----"), raw("inside")]);
}

#[test]
fn compound_block_nests_blocks() {
    let block = single("====\npara\n\n* item\n----\n====\n----\n====");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Example);
    let kinds = block
        .blocks()
        .iter()
        .map(|b| match b {
            Block::Paragraph(_) => "paragraph",
            Block::List(_) => "list",
            Block::DelimitedBlock(_) => "delimited",
            other => panic!("unexpected {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(kinds, vec!["paragraph", "list", "delimited"]);
}

#[test]
fn section_inside_compound_block_is_an_error() {
    let fragments = fragments("****\n== Nope\n****");
    let error = fragments.first().and_then(|f| f.error.as_ref());
    assert_eq!(
        error.map(ToString::to_string),
        Some("unexpected section title in sidebar block, position: line 2".to_string())
    );
}

#[test]
fn fenced_block_records_language() {
    let block = single("```rust\nlet x = 1;\n```");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Fenced);
    assert_eq!(block.attributes.style(), Some("source"));
    assert_eq!(block.attributes.get_str("language"), Some("rust"));
}

#[test]
fn quote_block_with_attribution() {
    let block = single("[quote, Jane, Title]\n____\nfoo\n____");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Quote);
    assert_eq!(block.attributes.get_str("quote_author"), Some("Jane"));
    assert_eq!(block.attributes.get_str("quote_title"), Some("Title"));
    assert!(matches!(block.blocks(), [Block::Paragraph(_)]));
}

#[test]
fn verse_style_keeps_lines() {
    let block = single("[verse, Poet]\n____\nline one\n\nline two\n____");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Verse);
    assert_eq!(block.elements().len(), 3);
}

#[test]
fn literal_paragraph_is_dedented() {
    let block = single("  indented\n    more");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Literal);
    assert_eq!(block.attributes.style(), Some("literal"));
    assert_eq!(block.elements(), [raw("indented"), raw("  more")]);
}

#[test]
fn style_promotes_paragraphs() {
    let block = single("[source,python]\nprint(1)");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::Listing);
    assert_eq!(block.attributes.get_str("language"), Some("python"));
}

#[test]
fn markdown_quote_with_signature() {
    let block = single("> Quoted\n> text\n> -- Someone, Somewhere");
    let block = delimited(&block);
    assert_eq!(block.kind, DelimiterKind::MarkdownQuote);
    assert_eq!(block.elements(), [raw("Quoted"), raw("text")]);
    assert_eq!(block.attributes.get_str("quote_author"), Some("Someone"));
    assert_eq!(block.attributes.get_str("quote_title"), Some("Somewhere"));
}

#[test]
fn admonition_paragraph() {
    let Block::Paragraph(paragraph) = single("WARNING: Hot surface") else {
        panic!("expected a paragraph");
    };
    assert_eq!(paragraph.attributes.style(), Some("WARNING"));
    assert_eq!(plain_text(&paragraph.elements), "Hot surface");
}

#[test]
fn comment_inside_paragraph_does_not_break_it() {
    let Block::Paragraph(paragraph) = single("one\n// hi\ntwo") else {
        panic!("expected a paragraph");
    };
    assert_eq!(
        paragraph.elements,
        vec![
            raw("one"),
            InlineElement::SingleLineComment("hi".into()),
            raw("two")
        ]
    );
}

#[test]
fn top_level_comment_is_its_own_fragment() {
    let blocks = blocks("// hi\ntext");
    assert!(matches!(blocks.first(), Some(Block::SingleLineComment(_))));
    assert!(matches!(blocks.get(1), Some(Block::Paragraph(_))));
}

#[test]
fn image_block_merges_attributes() {
    let Block::ImageBlock(image) = single(".Diagram\nimage::{dir}/foo.png[Flow, 300]") else {
        panic!("expected an image block");
    };
    assert_eq!(image.location.path, vec![raw("{dir}/foo.png")]);
    assert_eq!(image.attributes.get_str("title"), Some("Diagram"));
    assert_eq!(image.attributes.get_str("image_alt"), Some("Flow"));
    assert_eq!(image.attributes.get_str("width"), Some("300"));
}

#[test]
fn section_level_offset_applies() {
    let blocks = Assembler::new(Scanner::new("== Two"), 1)
        .flat_map(|f| f.elements)
        .collect::<Vec<_>>();
    assert!(matches!(
        blocks.first(),
        Some(Block::Section(Section { level: 2, .. }))
    ));
}

#[test]
fn list_run_is_one_flat_fragment() {
    let fragments = fragments("* a\ncontinued\n** b\n\n+\n----\ncode\n----\n\nafter");
    let first = fragments.first().map(|f| &f.elements);
    let kinds = first
        .into_iter()
        .flatten()
        .map(|b| match b {
            Block::ListElement(_) => "item",
            Block::BlankLine(_) => "blank",
            Block::ListContinuation(_) => "continuation",
            Block::DelimitedBlock(_) => "delimited",
            other => panic!("unexpected {other:?}"),
        })
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec!["item", "item", "blank", "continuation", "delimited", "blank"]
    );
    let Some(Block::ListElement(a)) = first.and_then(|e| e.first()) else {
        panic!("expected a list item");
    };
    let Some(Block::Paragraph(text)) = a.elements.first() else {
        panic!("expected item text");
    };
    assert_eq!(text.elements, vec![raw("a"), raw("continued")]);
    assert!(matches!(fragments.get(1).and_then(|f| f.elements.first()), Some(Block::Paragraph(_))));
}

#[test]
fn attributes_after_a_list_go_to_the_next_block() {
    let blocks = blocks("* a\n\n[source]\n----\ncode\n----");
    let Some(Block::DelimitedBlock(block)) = blocks.last() else {
        panic!("expected the listing block last");
    };
    assert_eq!(block.attributes.style(), Some("source"));
}

#[test]
fn table_block() {
    let Block::Table(table) = single("[cols=2]\n|===\n|a |b\n|c |d\n|===") else {
        panic!("expected a table");
    };
    assert_eq!(table.rows.len(), 2);
    assert!(table.header.is_none());
}

#[test]
fn malformed_attribute_line_is_an_error() {
    let fragments = fragments("[title=\"open]\ntext");
    assert!(matches!(
        fragments.first().and_then(|f| f.error.as_ref()),
        Some(Error::BlockAttributes(..))
    ));
}

#[test]
fn verbatim_lines_keep_trailing_whitespace() {
    let block = single("----\ncode   \n  \t\nend\t\n----");
    assert_eq!(
        delimited(&block).elements(),
        [raw("code   "), raw("  \t"), raw("end\t")]
    );
}

#[test]
fn paragraph_lines_drop_trailing_whitespace() {
    let Block::Paragraph(paragraph) = single("one   \r\ntwo\t") else {
        panic!("expected a paragraph");
    };
    assert_eq!(paragraph.elements, vec![raw("one"), raw("two")]);
}

#[test]
fn literal_paragraph_dedents_only_spaces_and_tabs() {
    let block = single("  \u{3000}wide\n  next");
    assert_eq!(delimited(&block).elements(), [raw("\u{3000}wide"), raw("next")]);
}
