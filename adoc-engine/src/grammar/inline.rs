//! Inline grammar used by every substitution step.
//!
//! A single entry point recognises all inline constructs; which of them are
//! active is decided by the [`SubstitutionKinds`] carried in the parser state,
//! so one grammar serves every substitution group. Content already parsed by
//! an earlier step arrives as a placeholder and is handed back untouched.
use std::cell::Cell;

use crate::{
    constants::{PLACEHOLDER_END, PLACEHOLDER_START, is_predefined_attribute},
    grammar::attributes::{AttributeListContext, parse_attribute_list},
    model::{
        AttributeValue, Attributes, ConcealedIndexTerm, CounterSubstitution, CrossReference,
        Footnote, Icon, InlineAnchor, InlineElement, InlineImage, InlineLink, InlinePassthrough,
        Location, PassthroughKind, QuotedText, QuotedTextKind, RESERVED_NAMED_ATTRIBUTE_IMAGESDIR,
        RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT, RESERVED_NAMED_ATTRIBUTE_STYLE,
        SubstitutionGroup, SubstitutionKind, SubstitutionKinds, merge_adjacent_strings,
    },
};

/// Per-invocation state consulted by the inline grammar.
///
/// Nothing here is global: every substitution step builds its own state and
/// nested content (quoted text, link labels, footnotes) is parsed with a
/// child state sharing the same flag.
#[derive(Debug)]
pub(crate) struct InlineParserState<'a> {
    /// The text being parsed. Boundary checks look behind the current
    /// position in it.
    pub(crate) input: &'a str,
    pub(crate) enabled: SubstitutionKinds,
    /// Attributes known at this point of the document.
    pub(crate) attributes: &'a Attributes,
    /// Quoted text kinds that may not open at this nesting depth.
    pub(crate) excluded: &'static [QuotedTextKind],
    /// Set whenever an attribute or counter reference is recognised.
    pub(crate) attribute_references: &'a Cell<bool>,
}

impl<'a> InlineParserState<'a> {
    pub(crate) fn new(
        input: &'a str,
        enabled: SubstitutionKinds,
        attributes: &'a Attributes,
        attribute_references: &'a Cell<bool>,
    ) -> Self {
        Self {
            input,
            enabled,
            attributes,
            excluded: &[],
            attribute_references,
        }
    }

    /// Parses `self.input` into inline elements.
    ///
    /// # Errors
    ///
    /// The grammar falls back to plain text for anything it does not
    /// recognise, so an error here means the grammar itself is broken.
    pub(crate) fn parse(
        &self,
    ) -> Result<Vec<InlineElement>, peg::error::ParseError<peg::str::LineCol>> {
        inline_parser::inlines(self.input, self)
    }

    fn child<'c>(
        &'c self,
        input: &'c str,
        enabled: SubstitutionKinds,
        excluded: &'static [QuotedTextKind],
    ) -> InlineParserState<'c> {
        InlineParserState {
            input,
            enabled,
            attributes: self.attributes,
            excluded,
            attribute_references: self.attribute_references,
        }
    }

    /// Parses content nested inside another construct with the same kinds
    /// enabled.
    fn nested(&self, content: &str, excluded: &'static [QuotedTextKind]) -> Vec<InlineElement> {
        let child = self.child(content, self.enabled, excluded);
        child.parse().unwrap_or_else(|error| {
            tracing::debug!(%error, content, "nested inline content kept as text");
            vec![InlineElement::StringElement(content.to_string())]
        })
    }

    /// Parses a link or image target. Only attribute references are
    /// recognised inside it.
    fn target(&self, target: &str) -> Location {
        let enabled = self
            .enabled
            .intersection(SubstitutionKinds::of(&[SubstitutionKind::Attributes]));
        let child = self.child(target, enabled, &[]);
        let path = child
            .parse()
            .unwrap_or_else(|_| vec![InlineElement::StringElement(target.to_string())]);
        Location::from_elements(path)
    }

    /// Passthrough content: placeholders are recognised so nothing parsed
    /// earlier leaks as text, everything else stays literal.
    fn literal(&self, content: &str) -> Vec<InlineElement> {
        let child = self.child(content, SubstitutionKinds::empty(), &[]);
        child
            .parse()
            .unwrap_or_else(|_| vec![InlineElement::StringElement(content.to_string())])
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn preceding_char(input: &str, offset: usize) -> Option<char> {
    input.get(..offset).and_then(|before| before.chars().next_back())
}

fn following_char(input: &str, offset: usize) -> Option<char> {
    input.get(offset..).and_then(|after| after.chars().next())
}

/// A constrained marker opens at the start of the input or after anything
/// that is neither a word character nor one of `;`, `:` and `}`.
fn can_open_constrained(input: &str, offset: usize) -> bool {
    preceding_char(input, offset)
        .is_none_or(|c| !(is_word_char(c) || matches!(c, ';' | ':' | '}')))
}

fn is_space_or_end(c: Option<char>) -> bool {
    c.is_none_or(char::is_whitespace)
}

fn quoted(
    state: &InlineParserState<'_>,
    kind: QuotedTextKind,
    attributes: Option<Attributes>,
    content: &str,
) -> Result<InlineElement, &'static str> {
    if state.excluded.contains(&kind) {
        return Err("quoted text kind not allowed here");
    }
    if content.trim().is_empty() {
        return Err("empty quoted text");
    }
    let mut attributes = attributes.unwrap_or_default();
    // A bare word before the marker is a role.
    if let Some(style) = attributes
        .remove(RESERVED_NAMED_ATTRIBUTE_STYLE)
        .as_ref()
        .and_then(AttributeValue::as_text)
    {
        attributes.push_role(style);
    }
    Ok(InlineElement::QuotedText(QuotedText {
        kind,
        attributes,
        elements: state.nested(content, kind.nested_exclusions()),
    }))
}

fn passthrough(
    kind: PassthroughKind,
    substitutions: Vec<SubstitutionGroup>,
    elements: Vec<InlineElement>,
) -> InlineElement {
    InlineElement::InlinePassthrough(InlinePassthrough {
        kind,
        substitutions,
        elements,
    })
}

fn link(state: &InlineParserState<'_>, target: &str, text: Option<&str>) -> InlineElement {
    let location = state.target(target);
    let mut attributes = Attributes::new();
    if let Some(text) = text.map(str::trim).filter(|text| !text.is_empty()) {
        if text.contains('=') {
            attributes = parse_attribute_list(text, AttributeListContext::Link).unwrap_or_else(
                |_| {
                    let mut attributes = Attributes::new();
                    attributes.insert(RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT, text);
                    attributes
                },
            );
        } else {
            attributes.insert(RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT, text);
        }
        if let Some(label) = attributes.get_str(RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT) {
            let label = state.nested(label, &[]);
            attributes.insert(
                RESERVED_NAMED_ATTRIBUTE_INLINE_LINK_TEXT,
                AttributeValue::Inlines(label),
            );
        }
    }
    InlineElement::InlineLink(InlineLink {
        location,
        attributes,
    })
}

fn image(state: &InlineParserState<'_>, target: &str, attributes: &str) -> InlineElement {
    let mut location = state.target(target);
    if let Some(dir) = state.attributes.get_str(RESERVED_NAMED_ATTRIBUTE_IMAGESDIR) {
        location.prefix_with(dir);
    }
    let attributes =
        parse_attribute_list(attributes, AttributeListContext::Image).unwrap_or_default();
    InlineElement::InlineImage(InlineImage {
        location,
        attributes,
    })
}

fn concealed_index_term(terms: &str) -> InlineElement {
    let mut terms = terms.split(',').map(|term| term.trim().to_string());
    InlineElement::ConcealedIndexTerm(ConcealedIndexTerm {
        term1: terms.next().unwrap_or_default(),
        term2: terms.next().filter(|term| !term.is_empty()),
        term3: terms.next().filter(|term| !term.is_empty()),
    })
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

peg::parser! {
    pub(crate) grammar inline_parser(state: &InlineParserState<'_>) for str {
        pub(crate) rule inlines() -> Vec<InlineElement>
            = elements:element()* { merge_adjacent_strings(elements) }

        // Order matters: the first alternative that matches at a position
        // wins, so escapes come before what they escape and the plain text
        // fallbacks come last.
        rule element() -> InlineElement
            = placeholder()
            / escaped()
            / passthrough()
            / callout()
            / inline_macro()
            / attribute_reference()
            / quoted_text()
            / replacement()
            / special_character()
            / line_break()
            / text()

        rule enabled(kind: SubstitutionKind)
            = {? if state.enabled.contains(kind) { Ok(()) } else { Err("substitution disabled") } }

        rule placeholder() -> InlineElement
            = [c if c == PLACEHOLDER_START] n:$(['0'..='9']+) [c if c == PLACEHOLDER_END] {?
                n.parse().map(InlineElement::ElementPlaceholder).map_err(|_| "placeholder index")
            }

        /// The last backslash before a marker is consumed and the marker is
        /// kept as text. Any other backslashes stay.
        rule escaped() -> InlineElement
            = slashes:$("\\"+) marker:escapable() {
                let mut text = "\\".repeat(slashes.len().saturating_sub(1));
                text.push_str(marker);
                InlineElement::StringElement(text)
            }

        rule escapable() -> &'input str
            = enabled(SubstitutionKind::Quotes) m:$("**" / "__" / "``" / "##" / ['*' | '_' | '`' | '#' | '^' | '~']) { m }
            / enabled(SubstitutionKind::Attributes) m:$("{") { m }
            / enabled(SubstitutionKind::InlinePassthrough) m:$("+++" / "++" / "+" / "pass:") { m }
            / enabled(SubstitutionKind::Macros) m:$("<<" / "(((" / "((" / "[[" / macro_name() ":" / url_scheme()) { m }

        rule macro_name()
            = "link" / "image" / "kbd" / "btn" / "icon" / "footnote" / "xref" / "anchor" / "indexterm2" / "indexterm"

        rule url_scheme()
            = "https://" / "http://" / "ftp://" / "irc://" / "mailto:"

        // Passthroughs

        rule passthrough() -> InlineElement
            = enabled(SubstitutionKind::InlinePassthrough)
              p:(triple_plus() / double_plus() / pass_macro() / single_plus()) { p }

        rule triple_plus() -> InlineElement
            = "+++" content:$((!"+++" [_])*) "+++" {
                passthrough(PassthroughKind::TriplePlus, Vec::new(), state.literal(content))
            }

        rule double_plus() -> InlineElement
            = "++" content:$((!"++" [_])+) "++" {
                passthrough(PassthroughKind::DoublePlus, Vec::new(), state.literal(content))
            }

        rule pass_macro() -> InlineElement
            = "pass:" subs:$(['a'..='z' | '_' | ',']*) "[" content:bracket_content() "]" {
                let substitutions = subs
                    .split(',')
                    .filter(|name| !name.is_empty())
                    .filter_map(|name| {
                        let group = SubstitutionGroup::from_name(name);
                        if group.is_none() {
                            tracing::debug!(name, "ignoring unknown pass macro substitution");
                        }
                        group
                    })
                    .collect();
                passthrough(PassthroughKind::Macro, substitutions, state.literal(&content))
            }

        rule single_plus() -> InlineElement
            = start:position!() "+" content:$(![' ' | '\t' | '\n'] (!"+" [_])+) "+" !word() {?
                if !can_open_constrained(state.input, start) || content.ends_with(char::is_whitespace) {
                    return Err("single plus passthrough boundary");
                }
                Ok(passthrough(PassthroughKind::SinglePlus, Vec::new(), state.literal(content)))
            }

        // Callouts only count at the end of a line, possibly followed by
        // more callouts.
        rule callout() -> InlineElement
            = enabled(SubstitutionKind::Callouts) n:callout_marker() &(ws()* (callout_marker() / eol())) { InlineElement::Callout(n) }

        rule callout_marker() -> u32
            = "<" n:$(['0'..='9']+) ">" {? n.parse().map_err(|_| "callout number") }

        // Macros

        rule inline_macro() -> InlineElement
            = enabled(SubstitutionKind::Macros)
              m:(cross_reference()
                / link_macro()
                / url()
                / image_macro()
                / kbd_macro()
                / btn_macro()
                / icon_macro()
                / footnote_macro()
                / concealed_index_term()
                / index_term()
                / inline_anchor()) { m }

        rule cross_reference() -> InlineElement
            = "<<" id:xref_id() label:("," l:$((!">>" [^'\n'])*) { l })? ">>" {
                InlineElement::CrossReference(CrossReference {
                    id: id.to_string(),
                    label: label.and_then(non_empty).map(|label| state.nested(&label, &[])),
                })
            }
            / "xref:" id:xref_id() "[" label:bracket_content() "]" {
                InlineElement::CrossReference(CrossReference {
                    id: id.to_string(),
                    label: non_empty(&label).map(|label| state.nested(&label, &[])),
                })
            }

        rule xref_id() -> &'input str
            = $([^',' | '<' | '>' | '[' | ']' | ' ' | '\t' | '\n']+)

        rule link_macro() -> InlineElement
            = "link:" target:macro_target() "[" text:bracket_content() "]" {
                link(state, target, Some(&text))
            }

        rule url() -> InlineElement
            = start:position!() target:$(url_scheme() url_path()) text:("[" t:bracket_content() "]" { t })? {?
                if preceding_char(state.input, start).is_some_and(|c| c == '/' || is_word_char(c)) {
                    return Err("url inside a word");
                }
                Ok(link(state, target, text.as_deref()))
            }

        // Trailing punctuation belongs to the sentence, not the URL.
        rule url_path()
            = (!(['.' | ',' | ';' | ':' | '!' | '?' | ')' | '\''] (ws() / eol())) url_char())+

        rule url_char()
            = [c if !c.is_whitespace() && !matches!(c, '[' | ']' | '<' | '>' | '"') && c != PLACEHOLDER_START && c != PLACEHOLDER_END]

        rule image_macro() -> InlineElement
            = "image:" !":" target:macro_target() "[" attributes:bracket_content() "]" {
                image(state, target, &attributes)
            }

        rule kbd_macro() -> InlineElement
            = "kbd:[" keys:bracket_content() "]" {
                let separator = if keys.contains(',') { ',' } else { '+' };
                InlineElement::Keyboard(
                    keys.split(separator)
                        .map(str::trim)
                        .filter(|key| !key.is_empty())
                        .map(ToString::to_string)
                        .collect(),
                )
            }

        rule btn_macro() -> InlineElement
            = "btn:[" label:bracket_content() "]" { InlineElement::Button(label.trim().to_string()) }

        rule icon_macro() -> InlineElement
            = "icon:" name:macro_target() "[" attributes:bracket_content() "]" {
                InlineElement::Icon(Icon {
                    name: name.to_string(),
                    attributes: parse_attribute_list(&attributes, AttributeListContext::Macro).unwrap_or_default(),
                })
            }

        // The number is assigned once the footnote is registered with the
        // processing context.
        rule footnote_macro() -> InlineElement
            = "footnote:" id:$(id_char()*) "[" text:bracket_content() "]" {
                let elements = if text.trim().is_empty() {
                    Vec::new()
                } else {
                    state.nested(text.trim(), &[])
                };
                InlineElement::Footnote(Footnote {
                    id: non_empty(id),
                    number: 0,
                    elements,
                })
            }

        rule concealed_index_term() -> InlineElement
            = "(((" terms:$((!")))" [^'\n'])+) ")))" { concealed_index_term(terms) }
            / "indexterm:[" terms:bracket_content() "]" { concealed_index_term(&terms) }

        rule index_term() -> InlineElement
            = "((" term:$((!"))" [^'\n'])+) "))" { InlineElement::IndexTerm(state.nested(term, &[])) }
            / "indexterm2:[" term:bracket_content() "]" { InlineElement::IndexTerm(state.nested(&term, &[])) }

        rule inline_anchor() -> InlineElement
            = "[[" id:anchor_id() reftext:("," ws()* r:$([^']' | '\n']+) { r })? "]]" {
                InlineElement::InlineAnchor(InlineAnchor {
                    id: id.to_string(),
                    reftext: reftext.and_then(non_empty),
                })
            }
            / "anchor:" id:anchor_id() "[" reftext:bracket_content() "]" {
                InlineElement::InlineAnchor(InlineAnchor {
                    id: id.to_string(),
                    reftext: non_empty(&reftext),
                })
            }

        rule anchor_id() -> &'input str
            = $(['A'..='Z' | 'a'..='z' | '_' | ':'] id_char()*)

        rule id_char()
            = ['A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' | '.' | ':']

        rule macro_target() -> &'input str
            = $([^'[' | ' ' | '\t' | '\n']+)

        // `\]` keeps a closing bracket inside the content.
        rule bracket_content() -> String
            = content:$(("\\]" / [^']'])*) { content.replace("\\]", "]") }

        // Attribute references

        rule attribute_reference() -> InlineElement
            = enabled(SubstitutionKind::Attributes) "{" r:(counter() / named_reference()) "}" { r }

        rule counter() -> InlineElement
            = hidden:("counter2:" { true } / "counter:" { false }) name:attribute_name()
              value:(":" v:$([^'}' | '\n']+) { v })? {
                state.attribute_references.set(true);
                InlineElement::CounterSubstitution(CounterSubstitution {
                    name: name.to_string(),
                    value: value.map(ToString::to_string),
                    hidden,
                })
            }

        // Predefined character attributes resolve to themselves unless the
        // document overrides them.
        rule named_reference() -> InlineElement
            = name:attribute_name() {
                if is_predefined_attribute(name) && !state.attributes.contains_key(name) {
                    InlineElement::PredefinedAttribute(name.to_string())
                } else {
                    state.attribute_references.set(true);
                    InlineElement::AttributeSubstitution(name.to_string())
                }
            }

        rule attribute_name() -> &'input str
            = $(['A'..='Z' | 'a'..='z' | '0'..='9' | '_'] ['A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-']*)

        // Quoted text

        rule quoted_text() -> InlineElement
            = enabled(SubstitutionKind::Quotes)
              q:(curved_quote()
                / unconstrained(<"**">, QuotedTextKind::DoubleQuoteBold)
                / unconstrained(<"__">, QuotedTextKind::DoubleQuoteItalic)
                / unconstrained(<"``">, QuotedTextKind::DoubleQuoteMonospace)
                / unconstrained(<"##">, QuotedTextKind::DoubleQuoteMarked)
                / constrained(<"*">, QuotedTextKind::SingleQuoteBold)
                / constrained(<"_">, QuotedTextKind::SingleQuoteItalic)
                / constrained(<"`">, QuotedTextKind::SingleQuoteMonospace)
                / constrained(<"#">, QuotedTextKind::SingleQuoteMarked)
                / unspaced(<"^">, QuotedTextKind::SingleQuoteSuperscript)
                / unspaced(<"~">, QuotedTextKind::SingleQuoteSubscript)) { q }

        rule curved_quote() -> InlineElement
            = "\"`" content:$((!"`\"" [_])+) "`\"" {? quoted(state, QuotedTextKind::CurvedDoubleQuote, None, content) }
            / "'`" content:$((!"`'" [_])+) "`'" {? quoted(state, QuotedTextKind::CurvedSingleQuote, None, content) }

        rule unconstrained(marker: rule<()>, kind: QuotedTextKind) -> InlineElement
            = attributes:shorthand_attributes()? marker() content:$((!marker() [_])+) marker() {?
                quoted(state, kind, attributes, content)
            }

        // The content runs to the first closing marker that follows a
        // non-space character and is not followed by a word character.
        rule constrained(marker: rule<()>, kind: QuotedTextKind) -> InlineElement
            = start:position!() attributes:shorthand_attributes()? marker() !space()
              content:$((!(!space() [_] marker() !word()) [_])* !space() [_])
              marker() !word() {?
                if !can_open_constrained(state.input, start) {
                    return Err("constrained quote boundary");
                }
                quoted(state, kind, attributes, content)
            }

        rule unspaced(marker: rule<()>, kind: QuotedTextKind) -> InlineElement
            = attributes:shorthand_attributes()? marker() content:$((!marker() !space() [_])+) marker() {?
                quoted(state, kind, attributes, content)
            }

        rule shorthand_attributes() -> Attributes
            = "[" content:$([^'[' | ']' | '\n']+) "]" {?
                parse_attribute_list(content, AttributeListContext::Block).map_err(|_| "shorthand attributes")
            }

        // Replacements

        rule replacement() -> InlineElement
            = enabled(SubstitutionKind::Replacements) r:(symbol() / entity() / dash() / apostrophe()) { r }

        rule symbol() -> InlineElement
            = s:$("(C)" / "(R)" / "(TM)" / "..." / "->" / "=>" / "<-" / "<=" / "`'") {
                InlineElement::Symbol(s.to_string())
            }

        rule entity() -> InlineElement
            = e:$("&" (['A'..='Z' | 'a'..='z'] ['A'..='Z' | 'a'..='z' | '0'..='9']* / "#" ['x' | 'X'] ['0'..='9' | 'a'..='f' | 'A'..='F']+ / "#" ['0'..='9']+) ";") {
                InlineElement::Symbol(e.to_string())
            }

        // An em dash sits between two words or stands alone between spaces.
        rule dash() -> InlineElement
            = start:position!() "--" end:position!() !"-" {?
                let before = preceding_char(state.input, start);
                let after = following_char(state.input, end);
                let between_words = before.is_some_and(is_word_char) && after.is_some_and(is_word_char);
                if between_words || (is_space_or_end(before) && is_space_or_end(after)) {
                    Ok(InlineElement::Symbol("--".to_string()))
                } else {
                    Err("dash")
                }
            }

        rule apostrophe() -> InlineElement
            = start:position!() "'" &word() {?
                if preceding_char(state.input, start).is_some_and(is_word_char) {
                    Ok(InlineElement::Symbol("'".to_string()))
                } else {
                    Err("apostrophe")
                }
            }

        rule special_character() -> InlineElement
            = enabled(SubstitutionKind::SpecialCharacters) c:$(['<' | '>' | '&']) {
                InlineElement::SpecialCharacter(c.to_string())
            }

        rule line_break() -> InlineElement
            = enabled(SubstitutionKind::PostReplacements) " +" &eol() { InlineElement::LineBreak }

        rule text() -> InlineElement
            = t:$([c if c.is_alphanumeric()]+) { InlineElement::StringElement(t.to_string()) }
            / t:$([_]) { InlineElement::StringElement(t.to_string()) }

        rule word() = [c if is_word_char(c)]

        rule space() = [' ' | '\t' | '\n']

        rule ws() = [' ' | '\t']

        rule eol() = "\n" / ![_]
    }
}
