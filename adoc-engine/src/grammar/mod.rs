pub(crate) mod attributes;
pub(crate) mod inline;

pub(crate) use attributes::{AttributeListContext, parse_attribute_list};
pub(crate) use inline::InlineParserState;
