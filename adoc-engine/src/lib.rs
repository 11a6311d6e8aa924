//! `AsciiDoc` document processing.
//!
//! A source goes through a chain of lazy stages, each an iterator over
//! [`DocumentFragment`]s:
//!
//! [`Scanner`] → [`Assembler`] → [`ListArranger`] → [`Splitter`] →
//! [`SubstitutionEngine`]
//!
//! The scanner classifies lines, the assembler groups them into blocks, the
//! arranger nests list items, the splitter hands every block on alone and the
//! substitution engine turns raw lines into inline structure. [`parse_str`]
//! drives the chain and builds the [`Document`].
//!
//! ```
//! use adoc_engine::{Block, InlineElement, Options, QuotedTextKind, parse_str};
//!
//! let document = parse_str("*bold*", &Options::default())?;
//! assert!(matches!(
//!     document.elements.as_slice(),
//!     [Block::Paragraph(paragraph)] if matches!(
//!         paragraph.elements.as_slice(),
//!         [InlineElement::QuotedText(quoted)] if quoted.kind == QuotedTextKind::SingleQuoteBold
//!     )
//! ));
//! # Ok::<(), adoc_engine::Error>(())
//! ```
mod arranger;
mod assembler;
mod constants;
mod document;
mod error;
mod grammar;
pub mod model;
mod options;
mod reader;
mod scanner;
mod splitter;
mod substitution;

#[cfg(test)]
mod proptests;

pub use arranger::ListArranger;
pub use assembler::Assembler;
pub use document::{parse, parse_documents, parse_str};
pub use error::{Detail, Error};
pub use model::*;
pub use options::{Options, OptionsBuilder};
pub use reader::{decode, read_source};
pub use scanner::{Line, LineKind, ListMarker, Scanner};
pub use splitter::Splitter;
pub use substitution::{ProcessingContext, SubstitutionEngine};
