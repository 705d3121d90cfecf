use crate::sentence::{Sentence, SentenceId, Sentences};
use crate::sort::Sorts;
use crate::truth::{Assignment, NodeId, TruthTree};
use core::hash::BuildHasherDefault;
use indexmap::IndexSet;
use rustc_hash::FxHasher;
use std::cmp::Ordering;

type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Result of reasoning about one decided sentence inside one tableau node.
#[derive(Clone, Debug)]
pub enum Inference {
    Decomposition(Decomposition),
    Branch(Branch),
}

/// A batch of logically forced facts, to be merged into exactly the node
/// that produced it.
#[derive(Clone, Debug)]
pub struct Decomposition {
    pub parent: NodeId,
    pub origin: SentenceId,
    pub inference_num: usize,
    pub justification_num: usize,
    pub facts: Assignment,
}

/// Mutually exclusive alternatives, to be grafted as children of every open
/// leaf beneath the originating node.
#[derive(Clone, Debug)]
pub struct Branch {
    pub parent: NodeId,
    pub origin: SentenceId,
    pub origin_size: usize,
    pub inference_num: usize,
    pub justification_num: usize,
    pub alternatives: Vec<Assignment>,
}

// Inverted so that a max-heap pops the smallest branch first: fewer
// alternatives, then smaller origin, then earlier inference.
impl Ord for Branch {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .alternatives
            .len()
            .cmp(&self.alternatives.len())
            .then_with(|| other.origin_size.cmp(&self.origin_size))
            .then_with(|| other.inference_num.cmp(&self.inference_num))
    }
}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Branch {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Branch {}

/// Applies the reasoning rule of `origin` inside `node`.
///
/// Fires only when `origin` already has a visible truth value; returns
/// `None` otherwise, and for terminal kinds. The justification is the
/// inference that established the origin's value.
pub fn reason(
    sentences: &mut Sentences,
    sorts: &Sorts,
    tree: &TruthTree,
    node: NodeId,
    origin: SentenceId,
    inference_num: usize,
) -> Option<Inference> {
    let mapping = tree.mapping(node, origin)?;
    let value = mapping.value;
    let justification_num = mapping.inference;

    let decomposition = |facts: Assignment| {
        Some(Inference::Decomposition(Decomposition {
            parent: node,
            origin,
            inference_num,
            justification_num,
            facts,
        }))
    };
    let branch = |alternatives: Vec<Assignment>, sentences: &Sentences| {
        Some(Inference::Branch(Branch {
            parent: node,
            origin,
            origin_size: sentences.size(origin),
            inference_num,
            justification_num,
            alternatives,
        }))
    };

    use Sentence::*;
    match sentences.get(origin).clone() {
        Atom(_) | Variable(_) | Constant(_) | Function(..) | Predicate(..) => None,
        Not(p) => {
            let mut facts = Assignment::new();
            facts.set(p, !value, inference_num);
            decomposition(facts)
        }
        And(args) => {
            if value {
                let mut facts = Assignment::new();
                for &arg in &args {
                    facts.set_true(arg, inference_num);
                }
                decomposition(facts)
            } else {
                let alternatives = args
                    .iter()
                    .map(|&arg| {
                        let mut alt = Assignment::new();
                        alt.set_false(arg, inference_num);
                        alt
                    })
                    .collect();
                branch(alternatives, sentences)
            }
        }
        Or(args) => {
            if value {
                let alternatives = args
                    .iter()
                    .map(|&arg| {
                        let mut alt = Assignment::new();
                        alt.set_true(arg, inference_num);
                        alt
                    })
                    .collect();
                branch(alternatives, sentences)
            } else {
                let mut facts = Assignment::new();
                for &arg in &args {
                    facts.set_false(arg, inference_num);
                }
                decomposition(facts)
            }
        }
        Implies(p, q) => {
            if value {
                let mut left = Assignment::new();
                left.set_false(p, inference_num);
                let mut right = Assignment::new();
                right.set_true(q, inference_num);
                branch(vec![left, right], sentences)
            } else {
                let mut facts = Assignment::new();
                facts.set_true(p, inference_num);
                facts.set_false(q, inference_num);
                decomposition(facts)
            }
        }
        Iff(p, q) => {
            let (first, second) = if value {
                ((true, true), (false, false))
            } else {
                ((true, false), (false, true))
            };
            let mut left = Assignment::new();
            left.set(p, first.0, inference_num);
            left.set(q, first.1, inference_num);
            let mut right = Assignment::new();
            right.set(p, second.0, inference_num);
            right.set(q, second.1, inference_num);
            branch(vec![left, right], sentences)
        }
        ForAll(var, body) => {
            let mut facts = Assignment::new();
            if value {
                // instantiate over every constant the branch knows about
                for c in fitting_constants(sentences, sorts, tree, node, var) {
                    let instance = sentences.instantiate(body, var, c, sorts);
                    facts.set_true(instance, inference_num);
                }
            } else {
                // a counterwitness must be a brand new constant
                let c = sentences.fresh_constant(sentences.sort(var), sorts);
                let instance = sentences.instantiate(body, var, c, sorts);
                facts.set_false(instance, inference_num);
            }
            decomposition(facts)
        }
        Exists(var, body) => {
            let mut facts = Assignment::new();
            if value {
                let c = sentences.fresh_constant(sentences.sort(var), sorts);
                let instance = sentences.instantiate(body, var, c, sorts);
                facts.set_true(instance, inference_num);
            } else {
                for c in fitting_constants(sentences, sorts, tree, node, var) {
                    let instance = sentences.instantiate(body, var, c, sorts);
                    facts.set_false(instance, inference_num);
                }
            }
            decomposition(facts)
        }
    }
}

/// The constants visible from `node` whose sort fits the binder `var`; a
/// fresh one when the branch has none, so the domain is never empty.
fn fitting_constants(
    sentences: &mut Sentences,
    sorts: &Sorts,
    tree: &TruthTree,
    node: NodeId,
    var: SentenceId,
) -> Vec<SentenceId> {
    let var_sort = sentences.sort(var);
    let mut all = FxIndexSet::default();
    for s in tree.sentences_upward(node) {
        sentences.constants_of(s, &mut all);
    }
    let fitting: Vec<_> = all
        .into_iter()
        .filter(|&c| sorts.is_subsort(sentences.sort(c), var_sort))
        .collect();
    if fitting.is_empty() {
        vec![sentences.fresh_constant(var_sort, sorts)]
    } else {
        fitting
    }
}
