//! Round trip of already-parsed inline content through plain text.
//!
//! Each substitution step re-parses its block as text. Elements produced by
//! an earlier step are swapped for `\u{91}n\u{92}` tokens on the way out and
//! put back from the table once the step is done. Sentinel characters that
//! occur in the text itself are swapped out the same way, so they can never
//! be read as a token.
use crate::{
    constants::{PLACEHOLDER_END, PLACEHOLDER_START},
    model::{InlineElement, merge_adjacent_strings, plain_text},
};

/// Elements taken out of the text, indexed by placeholder number. Restored
/// entries are taken out of the table.
pub(crate) type PlaceholderTable = Vec<Option<InlineElement>>;

/// Flattens `elements` to the text the next step parses.
///
/// Source lines are joined with a newline. Comments are dropped without
/// leaving an empty line behind.
pub(crate) fn serialise(elements: Vec<InlineElement>) -> (String, PlaceholderTable) {
    let mut text = String::new();
    let mut table = Vec::new();
    let mut pending_newline = false;
    for element in elements {
        match element {
            InlineElement::RawLine(line) => {
                if pending_newline {
                    text.push('\n');
                }
                push_text(&mut text, &mut table, &line);
                pending_newline = true;
            }
            InlineElement::SingleLineComment(_) => {}
            InlineElement::StringElement(content) => {
                push_text(&mut text, &mut table, &content);
                pending_newline = false;
            }
            other => {
                push_placeholder(&mut text, &mut table, other);
                pending_newline = false;
            }
        }
    }
    (text, table)
}

fn push_text(text: &mut String, table: &mut PlaceholderTable, content: &str) {
    if !content.contains([PLACEHOLDER_START, PLACEHOLDER_END]) {
        text.push_str(content);
        return;
    }
    for ch in content.chars() {
        if ch == PLACEHOLDER_START || ch == PLACEHOLDER_END {
            push_placeholder(text, table, InlineElement::StringElement(ch.to_string()));
        } else {
            text.push(ch);
        }
    }
}

fn push_placeholder(text: &mut String, table: &mut PlaceholderTable, element: InlineElement) {
    text.push(PLACEHOLDER_START);
    text.push_str(&table.len().to_string());
    text.push(PLACEHOLDER_END);
    table.push(Some(element));
}

/// Puts every placeholder in `elements` back, at any depth.
///
/// A placeholder without an entry goes back to its token text so nothing is
/// lost silently.
pub(crate) fn restore(
    elements: Vec<InlineElement>,
    table: &mut PlaceholderTable,
) -> Vec<InlineElement> {
    let restored = elements
        .into_iter()
        .map(|element| match element {
            InlineElement::ElementPlaceholder(index) => table
                .get_mut(index)
                .and_then(Option::take)
                .unwrap_or_else(|| {
                    tracing::warn!(index, "placeholder without a table entry");
                    InlineElement::StringElement(format!(
                        "{PLACEHOLDER_START}{index}{PLACEHOLDER_END}"
                    ))
                }),
            mut other => {
                other.for_each_nested_mut(&mut |nested| {
                    *nested = restore(std::mem::take(nested), table);
                });
                other
            }
        })
        .collect();
    merge_adjacent_strings(restored)
}

/// The unsubstituted text of a block, for plans with nothing to apply.
pub(crate) fn source_text(elements: &[InlineElement]) -> String {
    let mut text = String::new();
    let mut pending_newline = false;
    for element in elements {
        match element {
            InlineElement::RawLine(line) => {
                if pending_newline {
                    text.push('\n');
                }
                text.push_str(line);
                pending_newline = true;
            }
            InlineElement::SingleLineComment(_) => {}
            other => {
                text.push_str(&plain_text(std::slice::from_ref(other)));
                pending_newline = false;
            }
        }
    }
    text
}
