//! Nests the flat list runs produced by the assembler.
use crate::model::{
    Block, BulletStyle, DelimitedBlock, DelimitedContent, InlineElement, LabeledDelimiter, List,
    ListElement, ListElementKind, NumberingStyle, Span,
};

/// What makes two list items siblings: the same kind of marker with the
/// same shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ListKey {
    Unordered(BulletStyle, usize),
    Ordered {
        explicit: Option<NumberingStyle>,
        level: usize,
    },
    Labeled(LabeledDelimiter, usize),
    Callout,
}

impl ListKey {
    fn of(element: &ListElement) -> Self {
        match &element.kind {
            ListElementKind::Unordered { bullet, .. } => Self::Unordered(*bullet, element.level),
            ListElementKind::Ordered { style, implicit } => Self::Ordered {
                explicit: (!implicit).then_some(*style),
                level: element.level,
            },
            ListElementKind::Labeled { delimiter, .. } => Self::Labeled(*delimiter, element.level),
            ListElementKind::Callout { .. } => Self::Callout,
        }
    }
}

#[derive(Debug)]
struct Frame {
    key: ListKey,
    list: List,
}

/// Callout numbers seen in the most recent verbatim block.
#[derive(Debug, Default)]
pub(crate) struct CalloutTracker {
    numbers: Vec<u32>,
}

impl CalloutTracker {
    /// Remembers the callouts of `block` if it is a verbatim block.
    pub(crate) fn observe(&mut self, block: &Block) {
        if let Block::DelimitedBlock(DelimitedBlock {
            kind,
            content: DelimitedContent::Inline(lines),
            ..
        }) = block
            && kind.is_verbatim()
        {
            self.numbers = lines
                .iter()
                .filter_map(|line| {
                    if let InlineElement::RawLine(text) = line {
                        Some(text)
                    } else {
                        None
                    }
                })
                .flat_map(|text| callout_numbers(text))
                .collect();
        }
    }

    fn contains(&self, number: u32) -> bool {
        self.numbers.contains(&number)
    }
}

/// Every `<N>` in a line of verbatim text.
pub(crate) fn callout_numbers(text: &str) -> Vec<u32> {
    let mut numbers = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let after = rest.get(open + 1..).unwrap_or_default();
        let digits = after
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map_or(0, |(index, c)| index + c.len_utf8());
        if digits > 0
            && after.get(digits..).is_some_and(|tail| tail.starts_with('>'))
            && let Some(Ok(number)) = after.get(..digits).map(str::parse)
        {
            numbers.push(number);
        }
        rest = after;
    }
    numbers
}

/// Nests a flat list run. Fragments that do not start with a list item are
/// returned unchanged.
///
/// Items whose marker matches an open list become its siblings (closing any
/// lists nested deeper). Any other item opens a list inside the current item.
/// A block after a `+` continuation attaches to the current item when no
/// blank line precedes the `+`, to its parent after one blank line, and so
/// on up to the outermost item. Blocks that arrive without a continuation
/// (indented literal paragraphs) attach to the current item.
pub(crate) fn arrange(blocks: Vec<Block>, callouts: &mut CalloutTracker) -> Vec<Block> {
    if !matches!(blocks.first(), Some(Block::ListElement(_))) {
        for block in &blocks {
            callouts.observe(block);
        }
        return blocks;
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut output = Vec::new();
    let mut blanks = 0usize;
    let mut continuation: Option<usize> = None;

    for block in blocks {
        match block {
            Block::ListElement(element) => {
                continuation = None;
                blanks = 0;
                push_item(&mut stack, &mut output, element, callouts);
            }
            Block::BlankLine(_) => blanks += 1,
            Block::ListContinuation(_) => {
                continuation = Some(blanks);
                blanks = 0;
            }
            Block::List(list) => {
                // Already arranged: flatten it back into the run.
                for element in flatten(list) {
                    push_item(&mut stack, &mut output, element, callouts);
                }
            }
            block @ (Block::Paragraph(_)
            | Block::DelimitedBlock(_)
            | Block::Section(_)
            | Block::AttributeDeclaration(_)
            | Block::AttributeReset(_)
            | Block::ImageBlock(_)
            | Block::ThematicBreak(_)
            | Block::PageBreak(_)
            | Block::SingleLineComment(_)
            | Block::Table(_)) => {
                callouts.observe(&block);
                let depth = continuation.take().unwrap_or_default();
                attach(&mut stack, &mut output, depth, block);
                blanks = 0;
            }
        }
    }
    while let Some(frame) = stack.pop() {
        close(&mut stack, &mut output, frame);
    }
    output
}

fn push_item(
    stack: &mut Vec<Frame>,
    output: &mut Vec<Block>,
    mut element: ListElement,
    callouts: &CalloutTracker,
) {
    if let ListElementKind::Callout { number, matched } = &mut element.kind {
        *matched = callouts.contains(*number);
        if !*matched {
            tracing::warn!(
                number = *number,
                line = element.span.start,
                "callout list item has no matching callout in the preceding verbatim block"
            );
        }
    }

    let key = ListKey::of(&element);
    if stack.iter().any(|frame| frame.key == key) {
        while stack.last().is_some_and(|frame| frame.key != key) {
            if let Some(frame) = stack.pop() {
                close(stack, output, frame);
            }
        }
        if let Some(top) = stack.last_mut() {
            top.list.span.cover(element.span);
            top.list.elements.push(element);
        }
        return;
    }

    let attributes = std::mem::take(&mut element.attributes);
    tracing::trace!(?key, "opening list");
    stack.push(Frame {
        key,
        list: List {
            kind: element.kind.list_kind(),
            attributes,
            span: element.span,
            elements: vec![element],
        },
    });
}

/// Closes `frame`, moving its list into the current item of the frame
/// below it or into `output` when it is the outermost list.
fn close(stack: &mut [Frame], output: &mut Vec<Block>, mut frame: Frame) {
    if let Some(style) = frame.list.attributes.style().and_then(NumberingStyle::from_style) {
        for element in &mut frame.list.elements {
            if let ListElementKind::Ordered {
                style: element_style,
                ..
            } = &mut element.kind
            {
                *element_style = style;
            }
        }
    }
    let checklist = frame.list.elements.iter().any(|element| {
        matches!(
            element.kind,
            ListElementKind::Unordered {
                checked: Some(_),
                ..
            }
        )
    });
    if checklist && !frame.list.attributes.has_option("checklist") {
        frame.list.attributes.push_option("checklist");
    }

    let span = frame.list.span;
    let list = Block::List(frame.list);
    match stack.last_mut().and_then(|parent| {
        parent.list.span.cover(span);
        parent.list.elements.last_mut()
    }) {
        Some(item) => {
            item.span.cover(span);
            item.elements.push(list);
        }
        None => output.push(list),
    }
}

/// Attaches a block to the item `depth` levels above the current one.
fn attach(stack: &mut Vec<Frame>, output: &mut Vec<Block>, depth: usize, block: Block) {
    let keep = stack.len().saturating_sub(depth).max(1);
    while stack.len() > keep {
        if let Some(frame) = stack.pop() {
            close(stack, output, frame);
        }
    }
    let span = block.span();
    match stack.last_mut() {
        Some(frame) => {
            frame.list.span.cover(span);
            if let Some(item) = frame.list.elements.last_mut() {
                item.span.cover(span);
                item.elements.push(block);
            }
        }
        None => output.push(block),
    }
}

/// Undoes the nesting of `list`: every item, outer ones first, with the
/// list's own attributes back on its first item.
pub(crate) fn flatten(list: List) -> Vec<ListElement> {
    let mut elements = Vec::new();
    let mut attributes = Some(list.attributes);
    for mut element in list.elements {
        if let Some(attributes) = attributes.take() {
            let mut merged = attributes;
            merged.merge(std::mem::take(&mut element.attributes));
            element.attributes = merged;
        }
        let (nested, own): (Vec<_>, Vec<_>) = std::mem::take(&mut element.elements)
            .into_iter()
            .partition(|block| matches!(block, Block::List(_)));
        element.elements = own;
        element.span = own_span(&element);
        elements.push(element);
        for block in nested {
            if let Block::List(list) = block {
                elements.extend(flatten(list));
            }
        }
    }
    elements
}

fn own_span(element: &ListElement) -> Span {
    let mut span = Span::line(element.span.start);
    for block in &element.elements {
        span.cover(block.span());
    }
    span
}

/// Applies [`arrange`] to each fragment coming out of the assembler.
pub struct ListArranger<I> {
    fragments: I,
    callouts: CalloutTracker,
}

impl<I> ListArranger<I> {
    #[must_use]
    pub fn new(fragments: I) -> Self {
        Self {
            fragments,
            callouts: CalloutTracker::default(),
        }
    }
}

impl<I: Iterator<Item = crate::model::DocumentFragment>> Iterator for ListArranger<I> {
    type Item = crate::model::DocumentFragment;

    fn next(&mut self) -> Option<Self::Item> {
        let mut fragment = self.fragments.next()?;
        if fragment.error.is_none() {
            let elements = std::mem::take(&mut fragment.elements);
            fragment.elements = arrange(elements, &mut self.callouts);
        }
        Some(fragment)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{assembler::Assembler, model::ListKind, scanner::Scanner};

    fn arranged(source: &str) -> Vec<Block> {
        ListArranger::new(Assembler::new(Scanner::new(source), 0))
            .flat_map(|fragment| fragment.elements)
            .collect()
    }

    fn only_list(blocks: &[Block]) -> &List {
        match blocks {
            [Block::List(list)] => list,
            other => panic!("expected a single list, got {other:?}"),
        }
    }

    fn nested_lists(element: &ListElement) -> Vec<&List> {
        element
            .elements
            .iter()
            .filter_map(|block| {
                if let Block::List(list) = block {
                    Some(list)
                } else {
                    None
                }
            })
            .collect()
    }

    #[test]
    fn ordered_levels_nest_with_default_styles() {
        let blocks = arranged(". a\n.. b\n. c");
        let list = only_list(&blocks);
        assert_eq!(list.kind, ListKind::Ordered);
        assert_eq!(list.elements.len(), 2);
        let first = list.elements.first().map(nested_lists).unwrap_or_default();
        let [inner] = first.as_slice() else {
            panic!("expected one nested list");
        };
        assert_eq!(
            inner.elements.first().map(|e| e.kind.clone()),
            Some(ListElementKind::Ordered {
                style: NumberingStyle::LowerAlpha,
                implicit: true
            })
        );
    }

    #[test]
    fn returning_to_an_ancestor_marker_closes_nested_lists() {
        let blocks = arranged("* a\n** b\n*** c\n* d");
        let list = only_list(&blocks);
        assert_eq!(list.elements.len(), 2);
        let nested = list.elements.first().map(nested_lists).unwrap_or_default();
        assert_eq!(nested.len(), 1);
    }

    #[test]
    fn different_marker_kind_nests() {
        let blocks = arranged("* a\n. one\n. two\n* b");
        let list = only_list(&blocks);
        assert_eq!(list.kind, ListKind::Unordered);
        assert_eq!(list.elements.len(), 2);
        let nested = list.elements.first().map(nested_lists).unwrap_or_default();
        assert_eq!(nested.first().map(|l| l.elements.len()), Some(2));
    }

    #[test]
    fn continuation_attaches_to_current_item() {
        let blocks = arranged("* a\n** b\n+\nattached\n* c");
        let list = only_list(&blocks);
        let nested = list.elements.first().map(nested_lists).unwrap_or_default();
        let b = nested.first().and_then(|l| l.elements.first());
        assert_eq!(b.map(|e| e.elements.len()), Some(2));
    }

    #[test]
    fn blank_line_before_continuation_attaches_to_parent() {
        let blocks = arranged("* a\n** b\n\n+\nattached\n* c");
        let list = only_list(&blocks);
        let a = list.elements.first();
        // Own paragraph, nested list, attached paragraph.
        assert_eq!(a.map(|e| e.elements.len()), Some(3));
        assert!(matches!(
            a.and_then(|e| e.elements.last()),
            Some(Block::Paragraph(_))
        ));
    }

    #[test]
    fn list_style_attribute_overrides_numbering() {
        let blocks = arranged("[upperroman]\n. a\n. b");
        let list = only_list(&blocks);
        assert!(list.elements.iter().all(|e| matches!(
            e.kind,
            ListElementKind::Ordered {
                style: NumberingStyle::UpperRoman,
                ..
            }
        )));
        assert_eq!(list.attributes.style(), Some("upperroman"));
    }

    #[test]
    #[tracing_test::traced_test]
    fn callouts_match_the_preceding_listing() {
        let blocks = arranged("----\nimport <1>\n----\n<1> an import\n<2> dangling");
        let Some(Block::List(list)) = blocks.get(1) else {
            panic!("expected a callout list after the listing");
        };
        let matched = list
            .elements
            .iter()
            .map(|e| matches!(e.kind, ListElementKind::Callout { matched: true, .. }))
            .collect::<Vec<_>>();
        assert_eq!(matched, vec![true, false]);
        assert!(logs_contain("no matching callout"));
    }

    #[test]
    fn checklist_option() {
        let blocks = arranged("* [x] done\n* [ ] todo");
        assert!(only_list(&blocks).attributes.has_option("checklist"));
    }

    #[test]
    fn arranging_is_idempotent() {
        let blocks = arranged("* a\n** b\n. c\n* d\nterm:: def");
        let list = only_list(&blocks).clone();
        let flat = flatten(list.clone())
            .into_iter()
            .map(Block::ListElement)
            .collect::<Vec<_>>();
        let again = arrange(flat, &mut CalloutTracker::default());
        assert_eq!(again, vec![Block::List(list)]);
    }

    #[test]
    fn callout_numbers_in_text() {
        assert_eq!(callout_numbers("x <1> // <2> <a> <3"), vec![1, 2]);
    }
}
