use adoc_engine::{
    AttributeValue, Block, DelimitedContent, DelimiterKind, Document, InlineElement, List,
    ListElementKind, ListKind, NumberingStyle, Options, QuotedText, QuotedTextKind, Scanner,
    Assembler, parse, parse_str,
};
use pretty_assertions::assert_eq;

type Error = Box<dyn std::error::Error>;

fn string(text: &str) -> InlineElement {
    InlineElement::StringElement(text.to_string())
}

fn parse_default(source: &str) -> Result<Document, Error> {
    Ok(parse_str(source, &Options::default())?)
}

fn paragraph_text(block: Option<&Block>) -> Option<Vec<InlineElement>> {
    if let Some(Block::Paragraph(paragraph)) = block {
        Some(paragraph.elements.clone())
    } else {
        None
    }
}

fn only_list(document: &Document) -> Result<&List, Error> {
    match document.elements.as_slice() {
        [Block::List(list)] => Ok(list),
        other => Err(format!("expected a single list, got {other:?}").into()),
    }
}

#[test]
#[tracing_test::traced_test]
fn bold_paragraph() -> Result<(), Error> {
    let document = parse_default("*bold*")?;
    assert_eq!(
        paragraph_text(document.elements.first()),
        Some(vec![InlineElement::QuotedText(QuotedText {
            kind: QuotedTextKind::SingleQuoteBold,
            attributes: adoc_engine::Attributes::new(),
            elements: vec![string("bold")],
        })])
    );

    let json = serde_json::to_value(&document)?;
    assert_eq!(
        json.pointer("/elements/0/type").and_then(|value| value.as_str()),
        Some("paragraph")
    );
    assert_eq!(
        json.pointer("/elements/0/elements/0/value/kind")
            .and_then(|value| value.as_str()),
        Some("single_quote_bold")
    );
    Ok(())
}

#[test]
fn quote_block_with_attribution() -> Result<(), Error> {
    let document = parse_default("[quote, Jane, Title]\n____\nfoo\n____")?;
    let Some(Block::DelimitedBlock(quote)) = document.elements.first() else {
        return Err("expected a delimited block".into());
    };
    assert_eq!(quote.kind, DelimiterKind::Quote);
    assert_eq!(
        quote.attributes.get("quote_author"),
        Some(&AttributeValue::Inlines(vec![string("Jane")]))
    );
    assert_eq!(
        quote.attributes.get("quote_title"),
        Some(&AttributeValue::Inlines(vec![string("Title")]))
    );
    let DelimitedContent::Blocks(blocks) = &quote.content else {
        return Err("expected nested blocks".into());
    };
    assert_eq!(paragraph_text(blocks.first()), Some(vec![string("foo")]));
    assert_eq!(blocks.len(), 1);
    Ok(())
}

#[test]
fn nested_ordered_list_styles() -> Result<(), Error> {
    let document = parse_default(". a\n.. b\n. c")?;
    let list = only_list(&document)?;
    assert_eq!(list.kind, ListKind::Ordered);

    let styles = |list: &List| {
        list.elements
            .iter()
            .map(|element| match &element.kind {
                ListElementKind::Ordered { style, .. } => Some(*style),
                ListElementKind::Unordered { .. }
                | ListElementKind::Labeled { .. }
                | ListElementKind::Callout { .. } => None,
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(
        styles(list),
        vec![Some(NumberingStyle::Arabic), Some(NumberingStyle::Arabic)]
    );

    let [a, c] = list.elements.as_slice() else {
        return Err("expected two items".into());
    };
    assert_eq!(paragraph_text(a.elements.first()), Some(vec![string("a")]));
    assert_eq!(paragraph_text(c.elements.first()), Some(vec![string("c")]));
    let Some(Block::List(inner)) = a.elements.get(1) else {
        return Err("expected a nested list in the first item".into());
    };
    assert_eq!(styles(inner), vec![Some(NumberingStyle::LowerAlpha)]);
    assert_eq!(
        paragraph_text(inner.elements.first().and_then(|b| b.elements.first())),
        Some(vec![string("b")])
    );
    Ok(())
}

#[test]
fn listing_with_callout_list() -> Result<(), Error> {
    let document = parse_default("----\nimport <1>\n----\n<1> an import")?;
    let [Block::DelimitedBlock(listing), Block::List(callouts)] = document.elements.as_slice()
    else {
        return Err(format!("unexpected blocks {:?}", document.elements).into());
    };
    assert_eq!(listing.kind, DelimiterKind::Listing);
    assert_eq!(
        listing.elements(),
        [string("import "), InlineElement::Callout(1)]
    );

    assert_eq!(callouts.kind, ListKind::Callout);
    let [item] = callouts.elements.as_slice() else {
        return Err("expected one callout item".into());
    };
    assert_eq!(
        item.kind,
        ListElementKind::Callout {
            number: 1,
            matched: true
        }
    );
    assert_eq!(
        paragraph_text(item.elements.first()),
        Some(vec![string("an import")])
    );
    Ok(())
}

#[test]
fn image_path_uses_declared_attribute() -> Result<(), Error> {
    let document = parse_default(":dir: ./img\n\nimage::{dir}/foo.png[]")?;
    let Some(Block::ImageBlock(image)) = document.elements.first() else {
        return Err(format!("expected an image, got {:?}", document.elements).into());
    };
    assert_eq!(image.location.path, vec![string("./img/foo.png")]);
    assert_eq!(document.attributes.get_str("dir"), Some("./img"));
    Ok(())
}

#[test]
fn comments_are_scanned_but_dropped() -> Result<(), Error> {
    let source = "// hi\ntext\n// hi\nmore";
    let raw = Assembler::new(Scanner::new(source), 0)
        .flat_map(|fragment| fragment.elements)
        .collect::<Vec<_>>();
    assert!(matches!(raw.first(), Some(Block::SingleLineComment(_))));

    let document = parse_default(source)?;
    assert_eq!(document.elements.len(), 1);
    assert_eq!(
        paragraph_text(document.elements.first()),
        Some(vec![string("text\nmore")])
    );
    Ok(())
}

#[test]
fn reader_and_options() -> Result<(), Error> {
    let options = Options::builder()
        .with_filename("book.adoc")
        .with_attribute("imagesdir", "media")
        .with_level_offset(1)
        .build();
    let document = parse("== Part\n\nimage::a.png[Alt]\n".as_bytes(), &options)?;
    let Some(Block::Section(section)) = document.elements.first() else {
        return Err("expected a section".into());
    };
    assert_eq!(section.level, 2);
    let Some(Block::ImageBlock(image)) = section.elements.first() else {
        return Err("expected an image in the section".into());
    };
    assert_eq!(image.location.to_text(), "media/a.png");
    assert_eq!(image.attributes.get_str("image_alt"), Some("Alt"));

    let error = parse_str("[subs=\"+quotes,verbatim\"]\ntext", &options)
        .err()
        .ok_or("expected an error")?;
    assert_eq!(error.line(), Some(1));
    assert_eq!(
        error.to_string(),
        "cannot mix incremental and non-incremental substitutions: '+quotes,verbatim', position: book.adoc:1"
    );
    assert!(error.advice().is_some());
    Ok(())
}
