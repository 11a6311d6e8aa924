use serde::Serialize;

use crate::model::{Attributes, Block, InlineElement, Span};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Unordered,
    Ordered,
    Labeled,
    Callout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BulletStyle {
    Asterisk,
    Dash,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingStyle {
    Arabic,
    LowerAlpha,
    LowerRoman,
    UpperAlpha,
    UpperRoman,
}

impl NumberingStyle {
    /// Default style for an implicitly numbered (`.`, `..`, ...) item.
    #[must_use]
    pub fn for_level(level: usize) -> Self {
        match level.saturating_sub(1) % 5 {
            0 => Self::Arabic,
            1 => Self::LowerAlpha,
            2 => Self::LowerRoman,
            3 => Self::UpperAlpha,
            _ => Self::UpperRoman,
        }
    }

    /// Style named by a block style such as `[loweralpha]`.
    #[must_use]
    pub fn from_style(style: &str) -> Option<Self> {
        match style {
            "arabic" => Some(Self::Arabic),
            "loweralpha" => Some(Self::LowerAlpha),
            "lowerroman" => Some(Self::LowerRoman),
            "upperalpha" => Some(Self::UpperAlpha),
            "upperroman" => Some(Self::UpperRoman),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabeledDelimiter {
    Colons,
    Semicolons,
}

/// Per-kind data carried by a [`ListElement`].
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListElementKind {
    Unordered {
        bullet: BulletStyle,
        #[serde(skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    Ordered {
        style: NumberingStyle,
        /// `true` for `.`-style markers whose style follows the nesting depth.
        implicit: bool,
    },
    Labeled {
        term: Vec<InlineElement>,
        delimiter: LabeledDelimiter,
    },
    Callout {
        number: u32,
        /// `false` when no preceding verbatim block carries this callout.
        matched: bool,
    },
}

impl ListElementKind {
    #[must_use]
    pub fn list_kind(&self) -> ListKind {
        match self {
            Self::Unordered { .. } => ListKind::Unordered,
            Self::Ordered { .. } => ListKind::Ordered,
            Self::Labeled { .. } => ListKind::Labeled,
            Self::Callout { .. } => ListKind::Callout,
        }
    }
}

/// A list item.
///
/// Coming out of the assembler an element is flat: `level` is derived from
/// the marker shape and `elements` holds the item's own paragraph. The list
/// arranger moves nested lists and attached blocks into `elements`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListElement {
    #[serde(flatten)]
    pub kind: ListElementKind,
    pub level: usize,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub elements: Vec<Block>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct List {
    pub kind: ListKind,
    #[serde(skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub elements: Vec<ListElement>,
    pub span: Span,
}

/// The `+` line joining the next block to a list item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListContinuation {
    pub span: Span,
}
