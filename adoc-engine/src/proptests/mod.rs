//! Property-based tests for the pipeline
//!
//! These check properties that must hold for any input, next to the
//! example-based tests of each stage.

mod generators;
mod invariants;
