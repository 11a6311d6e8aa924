//! Inline substitution: turns the raw lines of each block into inline
//! structure, one substitution step at a time.
//!
//! Every step serialises the block's current inline content (already-parsed
//! elements become placeholders), re-parses it with the kinds the step
//! enables and puts the placeholders back. When a step meets attribute
//! references, it runs in two phases so the referenced values go through
//! the remaining kinds exactly once.
use std::cell::Cell;

use crate::{
    Error,
    error::Detail,
    grammar::InlineParserState,
    model::{
        AttributeDeclaration, AttributeReset, AttributeValue, Attributes, Block, DelimitedBlock,
        DelimitedContent, DelimiterKind, DocumentFragment, ImageBlock, InlineElement, List,
        ListElement, ListElementKind, Location, PlanError, RESERVED_NAMED_ATTRIBUTE_ID,
        RESERVED_NAMED_ATTRIBUTE_IMAGESDIR, RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR,
        RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE, RESERVED_NAMED_ATTRIBUTE_SUBS,
        RESERVED_NAMED_ATTRIBUTE_TITLE, Section, SubstitutionGroup, SubstitutionKind,
        SubstitutionKinds, SubstitutionPlan, SubstitutionStep, Table, merge_adjacent_strings,
        plain_text,
    },
};

mod context;
mod placeholder;


pub use context::ProcessingContext;

/// Attributes whose values are parsed into inline content rather than kept
/// as text.
const INLINE_ATTRIBUTES: &[&str] = &[
    RESERVED_NAMED_ATTRIBUTE_TITLE,
    RESERVED_NAMED_ATTRIBUTE_QUOTE_AUTHOR,
    RESERVED_NAMED_ATTRIBUTE_QUOTE_TITLE,
];

/// Kinds handled in the first phase of a step that met attribute
/// references.
const REFERENCE_PHASE: &[SubstitutionKind] = &[
    SubstitutionKind::InlinePassthrough,
    SubstitutionKind::Attributes,
];

/// The last pipeline stage: substitutes every block it receives.
///
/// The engine owns the [`ProcessingContext`] of the parse. Declarations are
/// applied to it as their fragments go by, so blocks only see attributes
/// declared above them.
pub struct SubstitutionEngine<I> {
    fragments: I,
    context: ProcessingContext,
}

impl<I> SubstitutionEngine<I> {
    #[must_use]
    pub fn new(fragments: I, attributes: Attributes) -> Self {
        Self {
            fragments,
            context: ProcessingContext::new(attributes),
        }
    }

    #[must_use]
    pub fn context(&self) -> &ProcessingContext {
        &self.context
    }

    /// Hands the context over once every fragment has been pulled.
    #[must_use]
    pub fn into_context(self) -> ProcessingContext {
        self.context
    }

    #[tracing::instrument(skip_all, fields(line = fragment.line_offset))]
    fn process(&mut self, mut fragment: DocumentFragment) -> DocumentFragment {
        if fragment.error.is_some() {
            return fragment;
        }
        for block in &mut fragment.elements {
            if let Err(error) = self.substitute_block(block) {
                tracing::debug!(%error, "substitution failed");
                fragment.error = Some(error);
                break;
            }
        }
        fragment
    }

    #[tracing::instrument(level = "trace", skip_all, fields(line = block.span().start))]
    fn substitute_block(&mut self, block: &mut Block) -> Result<(), Error> {
        let line = block.span().start;
        match block {
            Block::Paragraph(paragraph) => {
                self.substitute_attributes(&mut paragraph.attributes, line)?;
                let plan = plan_for(SubstitutionGroup::Normal, &paragraph.attributes, line)?;
                paragraph.elements =
                    self.substitute(std::mem::take(&mut paragraph.elements), &plan, line)?;
            }
            Block::DelimitedBlock(delimited) => self.substitute_delimited(delimited, line)?,
            Block::Section(section) => self.substitute_section(section, line)?,
            Block::AttributeDeclaration(AttributeDeclaration { name, value, .. }) => {
                *value = self.resolve_text(value, line)?;
                tracing::debug!(%name, %value, "attribute declared");
                self.context.attributes.insert(name.clone(), value.clone());
            }
            Block::AttributeReset(AttributeReset { name, .. }) => {
                tracing::debug!(%name, "attribute reset");
                self.context.attributes.remove(name);
            }
            Block::ImageBlock(image) => self.substitute_image(image, line)?,
            Block::ThematicBreak(page_or_thematic) | Block::PageBreak(page_or_thematic) => {
                self.substitute_attributes(&mut page_or_thematic.attributes, line)?;
            }
            Block::List(list) => self.substitute_list(list, line)?,
            Block::ListElement(element) => self.substitute_list_element(element, line)?,
            Block::Table(table) => self.substitute_table(table, line)?,
            Block::SingleLineComment(_) | Block::BlankLine(_) | Block::ListContinuation(_) => {}
        }
        Ok(())
    }

    fn substitute_delimited(
        &mut self,
        block: &mut DelimitedBlock,
        line: usize,
    ) -> Result<(), Error> {
        if block.kind == DelimiterKind::Comment {
            return Ok(());
        }
        self.substitute_attributes(&mut block.attributes, line)?;
        match &mut block.content {
            DelimitedContent::Blocks(blocks) => {
                for child in blocks {
                    self.substitute_block(child)?;
                }
            }
            DelimitedContent::Inline(elements) => {
                let plan = plan_for(default_group(block.kind, line)?, &block.attributes, line)?;
                *elements = self.substitute(std::mem::take(elements), &plan, line)?;
            }
        }
        Ok(())
    }

    fn substitute_section(&mut self, section: &mut Section, line: usize) -> Result<(), Error> {
        self.substitute_attributes(&mut section.attributes, line)?;
        let plan = plan_for(SubstitutionGroup::Header, &section.attributes, line)?;
        section.title = self.substitute(std::mem::take(&mut section.title), &plan, line)?;

        let id = if let Some(id) = section.attributes.id() {
            Some(id.to_string())
        } else if section.level > 0 {
            let id = self.context.generate_id(&section.title);
            section
                .attributes
                .insert(RESERVED_NAMED_ATTRIBUTE_ID, id.clone());
            Some(id)
        } else {
            None
        };
        if let Some(id) = id {
            tracing::trace!(id, "section registered");
            self.context
                .element_references
                .insert(id, section.title.clone());
        }

        for child in &mut section.elements {
            self.substitute_block(child)?;
        }
        Ok(())
    }

    /// Resolves the image path. `imagesdir` is prefixed to relative paths
    /// even when the path already starts with a reference to it.
    fn substitute_image(&mut self, image: &mut ImageBlock, line: usize) -> Result<(), Error> {
        self.substitute_attributes(&mut image.attributes, line)?;
        let plan = SubstitutionPlan::from_group(SubstitutionGroup::Attributes);
        let path = self.substitute(std::mem::take(&mut image.location.path), &plan, line)?;
        let mut location = Location::from_elements(path);
        if let Some(dir) = self
            .context
            .attributes
            .get(RESERVED_NAMED_ATTRIBUTE_IMAGESDIR)
            .and_then(AttributeValue::as_text)
        {
            location.prefix_with(&dir);
        }
        image.location = location;
        Ok(())
    }

    fn substitute_list(&mut self, list: &mut List, line: usize) -> Result<(), Error> {
        self.substitute_attributes(&mut list.attributes, line)?;
        for element in &mut list.elements {
            let line = element.span.start.max(line);
            self.substitute_list_element(element, line)?;
        }
        Ok(())
    }

    fn substitute_list_element(
        &mut self,
        element: &mut ListElement,
        line: usize,
    ) -> Result<(), Error> {
        self.substitute_attributes(&mut element.attributes, line)?;
        if let ListElementKind::Labeled { term, .. } = &mut element.kind {
            let plan = SubstitutionPlan::from_group(SubstitutionGroup::Normal);
            *term = self.substitute(std::mem::take(term), &plan, line)?;
        }
        for child in &mut element.elements {
            self.substitute_block(child)?;
        }
        Ok(())
    }

    fn substitute_table(&mut self, table: &mut Table, line: usize) -> Result<(), Error> {
        self.substitute_attributes(&mut table.attributes, line)?;
        let plan = plan_for(SubstitutionGroup::Normal, &table.attributes, line)?;
        for row in table.header.iter_mut().chain(table.rows.iter_mut()) {
            for cell in &mut row.cells {
                cell.elements = self.substitute(std::mem::take(&mut cell.elements), &plan, line)?;
            }
        }
        Ok(())
    }

    /// Substitutes attribute references in a block's own attributes.
    ///
    /// Titles and quote attributions become inline content. List values
    /// (roles and options) stay lists.
    fn substitute_attributes(
        &mut self,
        attributes: &mut Attributes,
        line: usize,
    ) -> Result<(), Error> {
        if attributes.is_empty() {
            return Ok(());
        }
        let element_attributes = SubstitutionPlan::from_group(SubstitutionGroup::ElementAttributes);
        for (name, value) in attributes.iter_mut() {
            if name == RESERVED_NAMED_ATTRIBUTE_SUBS {
                continue;
            }
            match value {
                AttributeValue::String(text) if INLINE_ATTRIBUTES.contains(&name.as_str()) => {
                    let elements = vec![InlineElement::RawLine(std::mem::take(text))];
                    *value = AttributeValue::Inlines(self.substitute(
                        elements,
                        &element_attributes,
                        line,
                    )?);
                }
                AttributeValue::String(text) => *text = self.resolve_text(text, line)?,
                AttributeValue::List(items) => {
                    for item in items {
                        *item = self.resolve_text(item, line)?;
                    }
                }
                AttributeValue::Integer(_) | AttributeValue::Bool(_) | AttributeValue::Inlines(_) => {}
            }
        }
        if let Some(id) = attributes.id()
            && let Some(AttributeValue::Inlines(title)) = attributes.get(RESERVED_NAMED_ATTRIBUTE_TITLE)
        {
            self.context
                .element_references
                .insert(id, title.clone());
        }
        Ok(())
    }

    /// Text of `text` once attribute references (and passthroughs) are
    /// resolved.
    fn resolve_text(&mut self, text: &str, line: usize) -> Result<String, Error> {
        if !text.contains(['{', '+', ':']) {
            return Ok(text.to_string());
        }
        let plan = SubstitutionPlan::from_group(SubstitutionGroup::Attributes);
        let elements = self.substitute(
            vec![InlineElement::StringElement(text.to_string())],
            &plan,
            line,
        )?;
        Ok(plain_text(&elements))
    }

    /// Runs `plan` over `elements` and registers the footnotes it produced.
    fn substitute(
        &mut self,
        elements: Vec<InlineElement>,
        plan: &SubstitutionPlan,
        line: usize,
    ) -> Result<Vec<InlineElement>, Error> {
        let mut elements = self.run_steps(elements, &plan.steps, line)?;
        self.register_footnotes(&mut elements);
        Ok(elements)
    }

    fn run_steps(
        &mut self,
        elements: Vec<InlineElement>,
        steps: &[SubstitutionStep],
        line: usize,
    ) -> Result<Vec<InlineElement>, Error> {
        if steps.iter().all(|step| step.kinds.is_empty()) {
            return Ok(vec![InlineElement::StringElement(placeholder::source_text(
                &elements,
            ))]);
        }
        let mut elements = elements;
        for step in steps.iter().filter(|step| !step.kinds.is_empty()) {
            tracing::trace!(group = step.group.name(), kinds = ?step.kinds, "substitution step");
            elements = self.apply_step(elements, step.kinds, line)?;
        }
        self.apply_passthrough_substitutions(&mut elements, line)?;
        Ok(elements)
    }

    fn apply_step(
        &mut self,
        elements: Vec<InlineElement>,
        kinds: SubstitutionKinds,
        line: usize,
    ) -> Result<Vec<InlineElement>, Error> {
        let (text, mut table) = placeholder::serialise(elements);
        let references = Cell::new(false);
        let mut parsed = self.parse(&text, kinds, &references, line)?;
        if references.get() {
            parsed = self.apply_in_phases(&text, kinds, line)?;
        }
        Ok(placeholder::restore(parsed, &mut table))
    }

    /// Resolves references first, then parses the result with the kinds
    /// that are left.
    fn apply_in_phases(
        &mut self,
        text: &str,
        kinds: SubstitutionKinds,
        line: usize,
    ) -> Result<Vec<InlineElement>, Error> {
        let first = kinds.intersection(SubstitutionKinds::of(REFERENCE_PHASE));
        let elements = self.parse(text, first, &Cell::new(false), line)?;
        let elements = self.resolve_references(elements, line)?;

        let rest = kinds.difference(first);
        if rest.is_empty() {
            return Ok(elements);
        }
        let (text, mut table) = placeholder::serialise(elements);
        let parsed = self.parse(&text, rest, &Cell::new(false), line)?;
        Ok(placeholder::restore(parsed, &mut table))
    }

    fn resolve_references(
        &mut self,
        elements: Vec<InlineElement>,
        line: usize,
    ) -> Result<Vec<InlineElement>, Error> {
        let mut resolved = Vec::with_capacity(elements.len());
        for element in elements {
            resolved.push(match element {
                InlineElement::AttributeSubstitution(name) => {
                    InlineElement::StringElement(self.context.attribute_text(&name))
                }
                InlineElement::CounterSubstitution(counter) => {
                    let value =
                        self.context
                            .counters
                            .step(&counter.name, counter.value.as_deref(), line)?;
                    self.context
                        .attributes
                        .insert(counter.name, value.clone());
                    InlineElement::StringElement(if counter.hidden {
                        String::new()
                    } else {
                        value
                    })
                }
                other => other,
            });
        }
        Ok(merge_adjacent_strings(resolved))
    }

    /// Applies the substitutions named by `pass:<subs>[]` to the passthrough
    /// content, once.
    fn apply_passthrough_substitutions(
        &mut self,
        elements: &mut [InlineElement],
        line: usize,
    ) -> Result<(), Error> {
        for element in elements {
            if let InlineElement::InlinePassthrough(passthrough) = element
                && !passthrough.substitutions.is_empty()
            {
                let steps = passthrough
                    .substitutions
                    .iter()
                    .copied()
                    .map(SubstitutionStep::from)
                    .collect::<Vec<_>>();
                passthrough.elements =
                    self.run_steps(std::mem::take(&mut passthrough.elements), &steps, line)?;
                continue;
            }
            let mut result = Ok(());
            element.for_each_nested_mut(&mut |nested| {
                if result.is_ok() {
                    result = self.apply_passthrough_substitutions(nested, line);
                }
            });
            result?;
        }
        Ok(())
    }

    fn register_footnotes(&mut self, elements: &mut [InlineElement]) {
        for element in elements {
            if let InlineElement::Footnote(footnote) = element {
                self.context.footnotes.register(footnote);
            } else {
                element.for_each_nested_mut(&mut |nested| self.register_footnotes(nested));
            }
        }
    }

    fn parse(
        &self,
        text: &str,
        kinds: SubstitutionKinds,
        references: &Cell<bool>,
        line: usize,
    ) -> Result<Vec<InlineElement>, Error> {
        InlineParserState::new(text, kinds, &self.context.attributes, references)
            .parse()
            .map_err(|error| Error::InlineParse(Detail::at(line), error))
    }
}

impl<I: Iterator<Item = DocumentFragment>> Iterator for SubstitutionEngine<I> {
    type Item = DocumentFragment;

    fn next(&mut self) -> Option<Self::Item> {
        let fragment = self.fragments.next()?;
        Some(self.process(fragment))
    }
}

/// The group a delimited block's inline content goes through without a
/// `subs` attribute.
fn default_group(kind: DelimiterKind, line: usize) -> Result<SubstitutionGroup, Error> {
    match kind {
        DelimiterKind::Listing | DelimiterKind::Fenced | DelimiterKind::Literal => {
            Ok(SubstitutionGroup::Verbatim)
        }
        DelimiterKind::Example
        | DelimiterKind::Quote
        | DelimiterKind::Verse
        | DelimiterKind::MarkdownQuote => Ok(SubstitutionGroup::Normal),
        DelimiterKind::Passthrough => Ok(SubstitutionGroup::None),
        DelimiterKind::Sidebar
        | DelimiterKind::Open
        | DelimiterKind::Comment
        | DelimiterKind::Table => Err(Error::UnsupportedElement(
            Detail::at(line),
            format!("{} block", kind.name()),
        )),
    }
}

fn plan_for(
    default: SubstitutionGroup,
    attributes: &Attributes,
    line: usize,
) -> Result<SubstitutionPlan, Error> {
    SubstitutionPlan::resolve(default, attributes.get_str(RESERVED_NAMED_ATTRIBUTE_SUBS)).map_err(
        |error| match error {
            PlanError::Unsupported(name) => Error::UnsupportedSubstitution(Detail::at(line), name),
            PlanError::Mixed(subs) => Error::MixedSubstitutions(Detail::at(line), subs),
        },
    )
}
