//! Input generators for the property tests
#![allow(clippy::expect_used)]
use proptest::prelude::*;

/// Any string at all, including control characters and the placeholder
/// sentinels.
pub fn any_document_string() -> impl Strategy<Value = String> {
    prop::string::string_regex("(.|\n){0,200}").expect("Failed to create any string strategy")
}

/// Chunks of `AsciiDoc` glued together in any order, valid or not.
pub fn structured_document() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("= Title\n:attr: value\n\n".to_string()),
            Just("== Section\n\n".to_string()),
            Just("=== Subsection\n\n".to_string()),
            Just("* item\n** nested\n".to_string()),
            Just(". one\n.. two\n".to_string()),
            Just("term:: definition\n".to_string()),
            Just("+\n".to_string()),
            Just("----\ncode <1>\n----\n<1> note\n".to_string()),
            Just("====\nexample\n====\n".to_string()),
            Just("****\n// aside\n////\nhidden\n////\n****\n".to_string()),
            Just("* item\n+\n// attached\n".to_string()),
            Just("[quote, Author]\n____\nquoted\n____\n".to_string()),
            Just("// comment\n".to_string()),
            Just("|===\n|a |b\n|===\n".to_string()),
            Just("image::{attr}/a.png[]\n".to_string()),
            Just("*bold* _italic_ `mono` #mark# ^sup^ ~sub~".to_string()),
            Just("{attr} {counter:c} {missing} pass:q[*x*] +{attr}+".to_string()),
            Just("<<ref,label>> link:https://example.org[site] footnote:[note]".to_string()),
            Just("\n\n".to_string()),
            prop::string::string_regex(r"[a-zA-Z0-9 .,!?*_`#+<>&{}\[\]\n-]{1,40}")
                .expect("Failed to create text chunk"),
        ],
        0..20,
    )
    .prop_map(|chunks| chunks.concat())
}

/// Plain words separated by single spaces: no markup, no replacements.
pub fn plain_words() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9]{1,8}( [a-zA-Z0-9]{1,8}){0,6}")
        .expect("Failed to create words strategy")
}

/// An attribute name as the scanner accepts it.
pub fn attribute_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,10}").expect("Failed to create name strategy")
}

/// Lines for the inside of a verbatim block: indentation, trailing and
/// blank-line whitespace and quote markers, but nothing special characters
/// or callouts would touch.
pub fn verbatim_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex("( {0,4}[a-z0-9*_`#]{1,6}( [a-z0-9*_`#]{1,6}){0,4})?[ \t]{0,2}")
            .expect("Failed to create verbatim line strategy"),
        1..8,
    )
}

/// Lines for a paragraph that only ever contains text lines.
pub fn paragraph_lines() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::string::string_regex("[a-z][a-z0-9*_<>&{} ]{0,20}[a-z0-9]")
            .expect("Failed to create paragraph line strategy"),
        1..5,
    )
}

/// A run of list items with random markers and depths.
pub fn list_run() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (
            prop_oneof![Just("*"), Just("-"), Just("."), Just("1.")],
            1usize..4,
            plain_words(),
        ),
        1..10,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .map(|(marker, depth, text)| {
                let marker = match marker {
                    "*" | "." => marker.repeat(depth),
                    other => other.to_string(),
                };
                format!("{marker} {text}\n")
            })
            .collect()
    })
}
