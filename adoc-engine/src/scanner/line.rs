use serde::Serialize;

use crate::model::{BulletStyle, DelimiterKind, LabeledDelimiter, NumberingStyle};

/// One classified source line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Line {
    /// 1-based number of the first source line.
    pub number: usize,
    /// Last source line folded into this one (attribute continuations).
    pub end: usize,
    pub kind: LineKind,
    /// The line without its terminator. Folded attribute continuations keep
    /// their source lines joined by `\n`.
    pub raw: String,
}

impl Line {
    /// The line without trailing whitespace, for everything but verbatim
    /// content.
    #[must_use]
    pub fn text(&self) -> &str {
        self.raw.trim_end()
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self.kind, LineKind::Blank)
    }

    #[must_use]
    pub fn is_indented(&self) -> bool {
        self.raw.starts_with([' ', '\t'])
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineKind {
    Blank,
    Raw,
    Delimiter {
        delimiter_kind: DelimiterKind,
        delimiter: String,
        language: Option<String>,
    },
    Comment {
        content: String,
    },
    AttributeDeclaration {
        name: String,
        value: String,
    },
    AttributeReset {
        name: String,
    },
    BlockAttributes {
        content: String,
    },
    Title {
        title: String,
    },
    Section {
        level: usize,
        title: String,
    },
    ListItem {
        marker: ListMarker,
        body: String,
    },
    Continuation,
    ImageBlock {
        target: String,
        attributes: String,
    },
    ThematicBreak,
    PageBreak,
}

impl LineKind {
    /// Short name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blank => "blank line",
            Self::Raw => "text",
            Self::Delimiter { .. } => "block delimiter",
            Self::Comment { .. } => "comment",
            Self::AttributeDeclaration { .. } => "attribute declaration",
            Self::AttributeReset { .. } => "attribute reset",
            Self::BlockAttributes { .. } => "block attributes",
            Self::Title { .. } => "block title",
            Self::Section { .. } => "section title",
            Self::ListItem { .. } => "list item",
            Self::Continuation => "list continuation",
            Self::ImageBlock { .. } => "block image",
            Self::ThematicBreak => "thematic break",
            Self::PageBreak => "page break",
        }
    }
}

/// The marker that opened a list item line.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "list", rename_all = "snake_case")]
pub enum ListMarker {
    Unordered {
        bullet: BulletStyle,
        level: usize,
        checked: Option<bool>,
    },
    Ordered {
        /// `None` for `.`-style markers.
        style: Option<NumberingStyle>,
        level: usize,
    },
    Labeled {
        term: String,
        level: usize,
        delimiter: LabeledDelimiter,
    },
    Callout {
        number: u32,
    },
}

peg::parser! {
    /// Context-free classification of a single line, tried in priority order.
    pub(crate) grammar line_parser() for str {
        pub(crate) rule line() -> LineKind
            = blank()
            / delimiter()
            / comment()
            / attribute_reset()
            / attribute_declaration()
            / block_attributes()
            / title()
            / section()
            / thematic_break()
            / page_break()
            / list_item()
            / continuation()
            / image_block()
            / raw()

        rule blank() -> LineKind
            = ws()* ![_] { LineKind::Blank }

        rule delimiter() -> LineKind
            = d:$("/"*<4,>) ![_] { delimited(DelimiterKind::Comment, d) }
            / d:$("-"*<4,>) ![_] { delimited(DelimiterKind::Listing, d) }
            / d:$("="*<4,>) ![_] { delimited(DelimiterKind::Example, d) }
            / d:$("*"*<4,>) ![_] { delimited(DelimiterKind::Sidebar, d) }
            / d:$("_"*<4,>) ![_] { delimited(DelimiterKind::Quote, d) }
            / d:$("+"*<4,>) ![_] { delimited(DelimiterKind::Passthrough, d) }
            / d:$("."*<4,>) ![_] { delimited(DelimiterKind::Literal, d) }
            / d:$("|" "="*<3,>) ![_] { delimited(DelimiterKind::Table, d) }
            / d:$("--") ![_] { delimited(DelimiterKind::Open, d) }
            / d:$("```") language:$(['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '+' | '-']+)? ![_] {
                LineKind::Delimiter {
                    delimiter_kind: DelimiterKind::Fenced,
                    delimiter: d.to_string(),
                    language: language.map(ToString::to_string),
                }
            }

        rule comment() -> LineKind
            = "//" content:$([_]*) { LineKind::Comment { content: content.trim().to_string() } }

        rule attribute_reset() -> LineKind
            = ":!" name:attribute_name() ":" ![_] { LineKind::AttributeReset { name: name.to_string() } }
            / ":" name:attribute_name() "!:" ![_] { LineKind::AttributeReset { name: name.to_string() } }

        rule attribute_declaration() -> LineKind
            = ":" name:attribute_name() ":" value:(ws()+ v:$([_]*) { v })? ![_] {
                LineKind::AttributeDeclaration {
                    name: name.to_string(),
                    value: value.unwrap_or_default().to_string(),
                }
            }

        rule attribute_name() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '0'..='9' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_' | '-']*)

        rule block_attributes() -> LineKind
            = "[" content:$((!("]" ![_]) [_])*) "]" ![_] {
                LineKind::BlockAttributes { content: content.to_string() }
            }

        rule title() -> LineKind
            = "." !['.' | ' ' | '\t'] title:$([_]+) { LineKind::Title { title: title.to_string() } }

        rule section() -> LineKind
            = marker:$("="*<1,6>) ws()+ title:$([_]+) {
                LineKind::Section { level: marker.len() - 1, title: title.trim().to_string() }
            }

        rule thematic_break() -> LineKind
            = ("'''" "'"* / "***" / "---" / "___" / "* * *" / "- - -" / "_ _ _") ![_] { LineKind::ThematicBreak }

        rule page_break() -> LineKind
            = "<<<" ![_] { LineKind::PageBreak }

        rule list_item() -> LineKind
            = ws()* item:(unordered() / ordered() / callout() / labeled()) {
                let (marker, body) = item;
                LineKind::ListItem { marker, body: body.to_string() }
            }

        rule unordered() -> (ListMarker, &'input str)
            = bullets:$("*"*<1,5>) ws()+ checked:checkbox()? body:$([_]+) {
                (ListMarker::Unordered { bullet: BulletStyle::Asterisk, level: bullets.len(), checked }, body)
            }
            / "-" ws()+ checked:checkbox()? body:$([_]+) {
                (ListMarker::Unordered { bullet: BulletStyle::Dash, level: 1, checked }, body)
            }

        rule checkbox() -> bool
            = "[" mark:$([' ' | 'x' | 'X' | '*']) "]" ws()+ { mark != " " }

        rule ordered() -> (ListMarker, &'input str)
            = dots:$("."*<1,5>) ws()+ body:$([_]+) {
                (ListMarker::Ordered { style: None, level: dots.len() }, body)
            }
            / style:explicit_number() ws()+ body:$([_]+) {
                (ListMarker::Ordered { style: Some(style), level: 1 }, body)
            }

        rule explicit_number() -> NumberingStyle
            = ['0'..='9']+ "." { NumberingStyle::Arabic }
            / ['i' | 'v' | 'x' | 'l' | 'c' | 'd' | 'm']+ ")" { NumberingStyle::LowerRoman }
            / ['I' | 'V' | 'X' | 'L' | 'C' | 'D' | 'M']+ ")" { NumberingStyle::UpperRoman }
            / ['a'..='z'] "." { NumberingStyle::LowerAlpha }
            / ['A'..='Z'] "." { NumberingStyle::UpperAlpha }

        rule callout() -> (ListMarker, &'input str)
            = "<" number:$(['0'..='9']+) ">" ws()+ body:$([_]+) {?
                let number = number.parse().map_err(|_| "callout number")?;
                Ok((ListMarker::Callout { number }, body))
            }

        rule labeled() -> (ListMarker, &'input str)
            = term:$(!ws() (!labeled_delimiter() [_])+) delimiter:labeled_delimiter() body:(ws()+ b:$([_]*) { b })? ![_] {
                let (level, delimiter) = delimiter;
                (ListMarker::Labeled { term: term.trim_end().to_string(), level, delimiter }, body.unwrap_or_default())
            }

        rule labeled_delimiter() -> (usize, LabeledDelimiter)
            = colons:$(":"*<2,4>) !":" &(ws() / ![_]) { (colons.len() - 1, LabeledDelimiter::Colons) }
            / ";;" &(ws() / ![_]) { (1, LabeledDelimiter::Semicolons) }

        rule continuation() -> LineKind
            = "+" ![_] { LineKind::Continuation }

        rule image_block() -> LineKind
            = "image::" target:$([^'[' | ' ' | '\t']+) "[" attributes:$((!("]" ![_]) [_])*) "]" ![_] {
                LineKind::ImageBlock { target: target.to_string(), attributes: attributes.to_string() }
            }

        rule raw() -> LineKind
            = [_]* { LineKind::Raw }

        rule ws() = [' ' | '\t']
    }
}

fn delimited(delimiter_kind: DelimiterKind, delimiter: &str) -> LineKind {
    LineKind::Delimiter {
        delimiter_kind,
        delimiter: delimiter.to_string(),
        language: None,
    }
}

/// Classifies one line of source, ignoring trailing whitespace.
#[must_use]
pub fn classify(text: &str) -> LineKind {
    line_parser::line(text.trim_end()).unwrap_or(LineKind::Raw)
}
