// Character-replacement attributes every document starts with.
//
// A reference to one of these that the author has not overridden is kept as
// a `PredefinedAttribute` element so renderers can emit the character (or
// entity) that suits their output format.

const PREDEFINED_ATTRIBUTES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("apos", "'"),
    ("asterisk", "*"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("blank", ""),
    ("brvbar", "\u{a6}"),
    ("caret", "^"),
    ("cpp", "C++"),
    ("deg", "\u{b0}"),
    ("empty", ""),
    ("endsb", "]"),
    ("gt", ">"),
    ("ldquo", "\u{201c}"),
    ("lsquo", "\u{2018}"),
    ("lt", "<"),
    ("nbsp", "\u{a0}"),
    ("plus", "+"),
    ("pp", "++"),
    ("quot", "\""),
    ("rdquo", "\u{201d}"),
    ("rsquo", "\u{2019}"),
    ("sp", " "),
    ("startsb", "["),
    ("tilde", "~"),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("vbar", "|"),
    ("wj", "\u{2060}"),
    ("zwsp", "\u{200b}"),
];

#[must_use]
pub fn is_predefined_attribute(name: &str) -> bool {
    PREDEFINED_ATTRIBUTES.iter().any(|(key, _)| *key == name)
}

/// The text a predefined attribute stands for.
#[must_use]
pub fn predefined_attribute_value(name: &str) -> Option<&'static str> {
    PREDEFINED_ATTRIBUTES
        .iter()
        .find_map(|(key, value)| (*key == name).then_some(*value))
}

/// Prefix of generated section ids, unless `idprefix` is set.
pub const DEFAULT_ID_PREFIX: &str = "_";

/// Word separator in generated section ids, unless `idseparator` is set.
pub const DEFAULT_ID_SEPARATOR: &str = "_";

/// Admonition labels accepted as a paragraph prefix (`NOTE: text`) or style.
pub const ADMONITION_STYLES: &[&str] = &["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"];

/// Sentinels wrapped around placeholder ids while a substitution step
/// re-parses serialised content. Both sit in the C1 control range; source
/// text holding them has them swapped for placeholders too.
pub const PLACEHOLDER_START: char = '\u{91}';
pub const PLACEHOLDER_END: char = '\u{92}';
