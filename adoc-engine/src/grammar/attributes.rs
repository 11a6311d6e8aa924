use crate::model::{
    Attributes, RESERVED_NAMED_ATTRIBUTE_ID, RESERVED_NAMED_ATTRIBUTE_IMAGE_ALT,
    RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT, RESERVED_NAMED_ATTRIBUTE_LANGUAGE,
    RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR, RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE,
    RESERVED_NAMED_ATTRIBUTE_REFTEXT, RESERVED_NAMED_ATTRIBUTE_STYLE,
};

/// Where an attribute list was written. Decides what positional entries
/// mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttributeListContext {
    /// A `[...]` line above a block. The first entry is the style shorthand.
    Block,
    /// `image::target[...]` and `image:target[...]`.
    Image,
    /// `link:target[...]` and URL macros.
    Link,
    /// Any other macro: positions keep their number.
    Macro,
}

#[derive(Debug, PartialEq)]
enum Entry {
    Positional(String),
    Named(String, String),
}

#[derive(Debug, PartialEq)]
enum Shorthand {
    Id(String),
    Role(String),
    Option(String),
}

peg::parser! {
    grammar attribute_list() for str {
        // [[id]] or [[id, reftext]], seen here without the outer brackets.
        pub(crate) rule anchor() -> (String, Option<String>)
            = "[" id:id() reftext:("," ws()* r:$([^']']*) { r.trim() })? "]" ![_] {
                (id.to_string(), reftext.filter(|r| !r.is_empty()).map(ToString::to_string))
            }

        pub(crate) rule entries() -> Vec<Entry>
            = ws()* entries:(entry() ** ("," ws()*)) ![_] { entries }

        rule entry() -> Entry
            = name:attribute_name() ws()* "=" ws()* value:value() { Entry::Named(name.to_string(), value) }
            / value:value() { Entry::Positional(value) }

        // An unquoted value never holds a double quote, so an unterminated
        // quoted value leaves input behind and the list fails to parse.
        rule value() -> String
            = v:quoted() ws()* { v }
            / !['"' | '\''] v:$([^',' | '"']*) { v.trim().to_string() }

        rule quoted() -> String
            = "\"" v:$(("\\\"" / [^'"'])*) "\"" { v.replace("\\\"", "\"") }
            / "'" v:$(("\\'" / [^'\''])*) "'" { v.replace("\\'", "'") }

        // The style is followed by any number of adjacent shorthands:
        //
        // # - ID
        // . - role
        // % - option
        pub(crate) rule shorthand() -> (Option<String>, Vec<Shorthand>)
            = style:$([^'#' | '.' | '%']*) parts:shorthand_part()* ![_] {
                let style = style.trim();
                ((!style.is_empty()).then(|| style.to_string()), parts)
            }

        rule shorthand_part() -> Shorthand
            = "#" id:id() { Shorthand::Id(id.to_string()) }
            / "." role:$([^'#' | '.' | '%']+) { Shorthand::Role(role.trim().to_string()) }
            / "%" option:$([^'#' | '.' | '%']+) { Shorthand::Option(option.trim().to_string()) }

        rule attribute_name() -> &'input str
            = $(['A'..='Z' | 'a'..='z' | '0'..='9' | '_'] ['A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_']*)

        rule id() -> &'input str
            = $(['A'..='Z' | 'a'..='z' | '_'] ['A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-']*)

        rule ws() = [' ' | '\t']
    }
}

/// Parses the content between the brackets of an attribute list.
///
/// Named entries are stored under their name (`role` and `opts` split into
/// the `roles` and `options` lists), positional ones under their 1-based
/// position unless the `context` or the block style gives them a name.
///
/// # Errors
///
/// Returns the offending content when the list is malformed, for example an
/// unterminated quoted value.
pub(crate) fn parse_attribute_list(
    content: &str,
    context: AttributeListContext,
) -> Result<Attributes, String> {
    let content = content.trim();
    let mut attributes = Attributes::new();
    if content.is_empty() {
        return Ok(attributes);
    }
    if context == AttributeListContext::Block
        && let Ok((id, reftext)) = attribute_list::anchor(content)
    {
        attributes.insert(RESERVED_NAMED_ATTRIBUTE_ID, id);
        if let Some(reftext) = reftext {
            attributes.insert(RESERVED_NAMED_ATTRIBUTE_REFTEXT, reftext);
        }
        return Ok(attributes);
    }

    let entries = attribute_list::entries(content).map_err(|error| {
        tracing::debug!(%error, content, "malformed attribute list");
        content.to_string()
    })?;
    let mut position = 0usize;
    for entry in entries {
        match entry {
            Entry::Named(name, value) => insert_named(&mut attributes, &name, value),
            Entry::Positional(value) => {
                position += 1;
                if position == 1 && context == AttributeListContext::Block {
                    apply_shorthand(&mut attributes, &value);
                } else if !value.is_empty() {
                    attributes.insert(position.to_string(), value);
                }
            }
        }
    }
    name_positionals(&mut attributes, context);
    Ok(attributes)
}

fn insert_named(attributes: &mut Attributes, name: &str, value: String) {
    match name {
        "role" | "roles" => {
            for role in value.split_whitespace() {
                attributes.push_role(role);
            }
        }
        "opts" | "options" => {
            for option in value.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                attributes.push_option(option);
            }
        }
        _ => {
            attributes.insert(name, value);
        }
    }
}

fn apply_shorthand(attributes: &mut Attributes, value: &str) {
    if value.is_empty() {
        return;
    }
    let Ok((style, parts)) = attribute_list::shorthand(value) else {
        attributes.insert(RESERVED_NAMED_ATTRIBUTE_STYLE, value);
        return;
    };
    if let Some(style) = style {
        attributes.insert(RESERVED_NAMED_ATTRIBUTE_STYLE, style);
    }
    for part in parts {
        match part {
            Shorthand::Id(id) => {
                attributes.insert(RESERVED_NAMED_ATTRIBUTE_ID, id);
            }
            Shorthand::Role(role) => attributes.push_role(role),
            Shorthand::Option(option) => attributes.push_option(option),
        }
    }
}

fn name_positionals(attributes: &mut Attributes, context: AttributeListContext) {
    let names: &[(&str, &str)] = match context {
        AttributeListContext::Block => match attributes.style().unwrap_or_default() {
            "quote" | "verse" => &[
                ("2", RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR),
                ("3", RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE),
            ],
            "source" => &[("2", RESERVED_NAMED_ATTRIBUTE_LANGUAGE)],
            _ => &[],
        },
        AttributeListContext::Image => &[
            ("1", RESERVED_NAMED_ATTRIBUTE_IMAGE_ALT),
            ("2", "width"),
            ("3", "height"),
        ],
        AttributeListContext::Link => &[("1", RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT)],
        AttributeListContext::Macro => &[],
    };
    for (position, name) in names {
        if let Some(value) = attributes.remove(position)
            && !attributes.contains_key(name)
        {
            attributes.insert(*name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn block(content: &str) -> Attributes {
        parse_attribute_list(content, AttributeListContext::Block).unwrap_or_default()
    }

    #[test]
    fn quote_positionals_are_named() {
        let attributes = block("quote, Jane, Title");
        assert_eq!(attributes.style(), Some("quote"));
        assert_eq!(attributes.get_str("quote_author"), Some("Jane"));
        assert_eq!(attributes.get_str("quote_title"), Some("Title"));
        assert!(!attributes.contains_key("2"));
    }

    #[test]
    fn source_language() {
        let attributes = block("source,rust");
        assert_eq!(attributes.get_str("language"), Some("rust"));
    }

    #[test]
    fn shorthand_sets_style_id_roles_and_options() {
        let attributes = block("sidebar#intro.lead.dark%collapsible");
        assert_eq!(attributes.style(), Some("sidebar"));
        assert_eq!(attributes.id(), Some("intro"));
        assert_eq!(attributes.roles(), ["lead".to_string(), "dark".to_string()]);
        assert!(attributes.has_option("collapsible"));
    }

    #[test]
    fn shorthand_without_style() {
        let attributes = block(".role");
        assert_eq!(attributes.style(), None);
        assert_eq!(attributes.roles(), ["role".to_string()]);
    }

    #[test]
    fn named_values_and_quotes() {
        let attributes = block(r#"NOTE, title="A, B", role="x y", opts="a,b""#);
        assert_eq!(attributes.style(), Some("NOTE"));
        assert_eq!(attributes.get_str("title"), Some("A, B"));
        assert_eq!(attributes.roles(), ["x".to_string(), "y".to_string()]);
        assert_eq!(attributes.options(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn anchor_with_reftext() {
        let attributes = block("[install, Installation]");
        assert_eq!(attributes.id(), Some("install"));
        assert_eq!(attributes.get_str("reftext"), Some("Installation"));
    }

    #[test]
    fn positional_after_empty_style() {
        let attributes = block(",second");
        assert_eq!(attributes.style(), None);
        assert_eq!(attributes.get_str("2"), Some("second"));
    }

    #[test]
    fn image_positionals() {
        let attributes =
            parse_attribute_list("Alt text, 200, 100", AttributeListContext::Image)
                .unwrap_or_default();
        assert_eq!(attributes.get_str("image_alt"), Some("Alt text"));
        assert_eq!(attributes.get_str("width"), Some("200"));
        assert_eq!(attributes.get_str("height"), Some("100"));
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        assert_eq!(
            parse_attribute_list(r#"title="oops"#, AttributeListContext::Block),
            Err(r#"title="oops"#.to_string())
        );
    }

    #[rstest::rstest]
    #[case(r#"quote, "Jane"#)]
    #[case(r#"source, rust, title="Main"#)]
    #[case(r#"role="a b"#)]
    fn unbalanced_double_quotes_are_errors(#[case] content: &str) {
        assert_eq!(
            parse_attribute_list(content, AttributeListContext::Block),
            Err(content.to_string())
        );
    }

    #[test]
    fn apostrophes_inside_unquoted_values() {
        let attributes = block("quote, Jane's, Jane's Book");
        assert_eq!(attributes.get_str("quote_author"), Some("Jane's"));
        assert_eq!(attributes.get_str("quote_title"), Some("Jane's Book"));
    }

    #[test]
    fn empty_list() {
        assert!(block("").is_empty());
    }
}
