//! A semantic-tableau theorem prover.
//!
//! Validity of an argument is decided by asserting the premises true and
//! the goal false in the root of a truth-assignment tree, then alternating
//! deterministic decomposition with case splits until every branch closes
//! (valid) or some branch saturates consistently (invalid, with the branch
//! as a counter-model).

pub mod decl;
pub mod inference;
pub mod parser;
pub mod prover;
pub mod sentence;
pub mod sort;
pub mod truth;

use decl::Declarations;
use sentence::Sentences;
use sort::Sorts;

pub use prover::{prove, Prover, Verdict, Witness};

/// Everything sentence construction needs: the sort hierarchy, the
/// declaration table and the interning store. A plain owned value with no
/// global state, so tests get a fresh one each.
#[derive(Clone, Debug, Default)]
pub struct Context {
    pub sorts: Sorts,
    pub decls: Declarations,
    pub sentences: Sentences,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }
}
