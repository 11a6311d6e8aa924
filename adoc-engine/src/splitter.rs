//! Hands every block on in its own fragment.
use std::collections::VecDeque;

use crate::model::DocumentFragment;

/// Splits multi-block fragments into single-block ones.
///
/// Each split fragment takes its block's first line as offset. Errored
/// fragments pass through untouched and empty ones are dropped.
pub struct Splitter<I> {
    fragments: I,
    ready: VecDeque<DocumentFragment>,
}

impl<I> Splitter<I> {
    #[must_use]
    pub fn new(fragments: I) -> Self {
        Self {
            fragments,
            ready: VecDeque::new(),
        }
    }
}

impl<I: Iterator<Item = DocumentFragment>> Iterator for Splitter<I> {
    type Item = DocumentFragment;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(fragment) = self.ready.pop_front() {
                return Some(fragment);
            }
            let fragment = self.fragments.next()?;
            if fragment.error.is_some() {
                return Some(fragment);
            }
            self.ready
                .extend(fragment.elements.into_iter().map(DocumentFragment::single));
        }
    }
}
