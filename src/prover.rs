use crate::inference::{reason, Branch, Inference};
use crate::sentence::{Sentence, SentenceId, Sentences};
use crate::sort::Sorts;
use crate::truth::{Assignment, NodeId, TruthTree, ROOT};
use crate::Context;
use itertools::Itertools;
use log::{debug, trace};
use std::collections::BinaryHeap;

/// Outcome of a proof attempt.
#[derive(Clone, Debug)]
pub enum Verdict {
    /// Every way of making the premises true and the goal false closes.
    Valid,
    /// Some branch saturated consistently; it is a counter-model.
    Invalid(Witness),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// The flattened assignment of a saturated open branch.
#[derive(Clone, Debug)]
pub struct Witness {
    facts: Vec<(SentenceId, bool)>,
}

impl Witness {
    pub fn value(&self, s: SentenceId) -> Option<bool> {
        self.facts
            .iter()
            .find(|&&(fact, _)| fact == s)
            .map(|&(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SentenceId, bool)> + '_ {
        self.facts.iter().copied()
    }

    pub fn display(&self, sentences: &Sentences) -> String {
        self.facts
            .iter()
            .map(|&(s, value)| format!("{} = {}", sentences.display(s), value))
            .join("\n")
    }
}

/// The search driver: decomposes to a fixpoint, then expands one pending
/// case split at a time, pruning closed branches as it goes.
pub struct Prover<'a> {
    sentences: &'a mut Sentences,
    sorts: &'a Sorts,
    tree: TruthTree,
    open_branches: Vec<NodeId>,
    branch_queue: BinaryHeap<Branch>,
    inference_count: usize,
}

/// Determines whether `goal` follows from `premises`.
pub fn prove(ctx: &mut Context, premises: &[SentenceId], goal: SentenceId) -> Verdict {
    Prover::new(&mut ctx.sentences, &ctx.sorts, premises, goal).run()
}

impl<'a> Prover<'a> {
    /// Seeds the root with the premises asserted true and the goal asserted
    /// false.
    pub fn new(
        sentences: &'a mut Sentences,
        sorts: &'a Sorts,
        premises: &[SentenceId],
        goal: SentenceId,
    ) -> Self {
        let mut tree = TruthTree::new();
        for &premise in premises {
            tree.set_true(ROOT, premise, 0);
        }
        tree.set_false(ROOT, goal, 0);
        debug!(
            "seeded root with {} premises and the negated goal {}",
            premises.len(),
            sentences.display(goal)
        );
        Self {
            sentences,
            sorts,
            tree,
            open_branches: vec![ROOT],
            branch_queue: BinaryHeap::new(),
            inference_count: 1,
        }
    }

    pub fn run(&mut self) -> Verdict {
        while !self.reasoning_completed() {
            // always decompose everything before branching
            let mut updated = true;
            while !self.open_branches.is_empty() && updated {
                self.close_branches();
                updated = false;
                for leaf in self.open_branches.clone() {
                    if self.reason_over(leaf) {
                        updated = true;
                    }
                }
            }
            self.close_branches();

            // expand the single cheapest pending case split, then loop back
            if !self.open_branches.is_empty() && !self.branch_queue.is_empty() {
                self.add_branches();
            }
        }

        if self.is_consistent() {
            let leaf = self.open_branches[0];
            debug!("saturated with open branches, argument is not valid");
            Verdict::Invalid(Witness {
                facts: self.tree.flatten(leaf),
            })
        } else {
            debug!("every branch closed, argument is valid");
            Verdict::Valid
        }
    }

    pub fn tree(&self) -> &TruthTree {
        &self.tree
    }

    pub fn render(&self) -> String {
        self.tree.render(self.sentences)
    }

    /// All open branches are saturated, or none remain.
    fn reasoning_completed(&self) -> bool {
        self.open_branches.is_empty()
            || (self.branch_queue.is_empty()
                && self
                    .open_branches
                    .iter()
                    .all(|&b| self.tree.is_fully_decomposed(b, self.sentences)))
    }

    fn is_consistent(&self) -> bool {
        !self.open_branches.is_empty()
            && self
                .open_branches
                .iter()
                .all(|&b| self.tree.is_consistent(b))
    }

    /// One decomposition pass over `leaf`. Deterministic consequences are
    /// batched and merged into the leaf; case splits go to the queue.
    /// Returns whether the leaf gained facts.
    fn reason_over(&mut self, leaf: NodeId) -> bool {
        let mut plain = vec![];
        let mut quantified = vec![];
        for s in self.tree.sentences_upward(leaf) {
            if self.sentences.get(s).is_terminal() || self.tree.is_decomposed(leaf, s) {
                continue;
            }
            if self.sentences.get(s).is_quantifier() {
                quantified.push(s);
            } else {
                plain.push(s);
            }
        }
        // existentials before universals, fewer atoms first; one quantifier
        // per pass so universals see the constants earlier steps introduced
        quantified.sort_by_key(|&s| {
            (
                matches!(self.sentences.get(s), Sentence::ForAll(..)),
                self.sentences.atom_count(s),
            )
        });
        plain.extend(quantified.first().copied());

        let mut discoveries = Assignment::new();
        for s in plain {
            let num = self.inference_count;
            match reason(self.sentences, self.sorts, &self.tree, leaf, s, num) {
                Some(Inference::Decomposition(d)) => {
                    self.inference_count += 1;
                    trace!(
                        "decomposed {} into {} facts",
                        self.sentences.display(s),
                        d.facts.len()
                    );
                    discoveries.extend(&d.facts);
                    self.tree.mark_decomposed(leaf, s);
                }
                Some(Inference::Branch(b)) => {
                    self.inference_count += 1;
                    trace!(
                        "queued a {}-way split on {}",
                        b.alternatives.len(),
                        self.sentences.display(s)
                    );
                    self.branch_queue.push(b);
                    self.tree.mark_decomposed(leaf, s);
                }
                None => {}
            }
        }
        if discoveries.is_empty() {
            return false;
        }
        self.tree.merge(leaf, &discoveries);
        true
    }

    /// Pops the cheapest pending split and grafts its alternatives onto
    /// every open leaf beneath its origin, pruning children that close.
    fn add_branches(&mut self) {
        let Some(branch) = self.branch_queue.pop() else {
            return;
        };
        self.tree.mark_decomposed(branch.parent, branch.origin);
        debug!(
            "branching {} ways on {}",
            branch.alternatives.len(),
            self.sentences.display(branch.origin)
        );
        let open = std::mem::take(&mut self.open_branches);
        for leaf in open {
            if !self.tree.is_beneath(leaf, branch.parent) {
                self.open_branches.push(leaf);
                continue;
            }
            for alternative in &branch.alternatives {
                let child = self.tree.add_child(leaf, alternative.clone());
                if self.tree.is_consistent(child) {
                    self.open_branches.push(child);
                } else {
                    trace!("pruned a closed alternative");
                }
            }
        }
        self.close_branches();
    }

    fn close_branches(&mut self) {
        let tree = &self.tree;
        self.open_branches.retain(|&b| tree.is_consistent(b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use insta::assert_snapshot;
    use maplit::hashmap;
    use std::collections::HashMap;

    fn prove_strings(premises: &[&str], goal: &str) -> Verdict {
        let mut ctx = Context::new();
        let premises: Vec<_> = premises
            .iter()
            .map(|s| parse(s, &mut ctx, false).unwrap())
            .collect();
        let goal = parse(goal, &mut ctx, false).unwrap();
        prove(&mut ctx, &premises, goal)
    }

    #[test]
    fn test_modus_ponens_is_valid() {
        assert!(prove_strings(&["P", "(implies P Q)"], "Q").is_valid());
    }

    #[test]
    fn test_disjunction_does_not_entail_disjunct() {
        let mut ctx = Context::new();
        let premise = parse("(or A B)", &mut ctx, false).unwrap();
        let goal = parse("A", &mut ctx, false).unwrap();
        let b = parse("B", &mut ctx, false).unwrap();
        let Verdict::Invalid(witness) = prove(&mut ctx, &[premise], goal) else {
            panic!("expected an invalid argument");
        };
        assert_eq!(
            witness.iter().collect::<HashMap<_, _>>(),
            hashmap! {premise => true, goal => false, b => true}
        );
    }

    #[test]
    fn test_excluded_middle_is_valid() {
        assert!(prove_strings(&[], "(or P (not P))").is_valid());
    }

    #[test]
    fn test_conjunction_entails_conjunct() {
        assert!(prove_strings(&["(and P Q)"], "P").is_valid());
    }

    #[test]
    fn test_modus_tollens_is_valid() {
        assert!(prove_strings(&["(implies P Q)", "(not Q)"], "(not P)").is_valid());
    }

    #[test]
    fn test_iff_reflexivity_is_valid() {
        assert!(prove_strings(&[], "(iff P P)").is_valid());
    }

    #[test]
    fn test_iff_decomposes_both_ways() {
        assert!(prove_strings(&["(iff P Q)", "P"], "Q").is_valid());
        assert!(prove_strings(&["(iff P Q)", "(not P)"], "(not Q)").is_valid());
    }

    #[test]
    fn test_atom_does_not_entail_other_atom() {
        let mut ctx = Context::new();
        let p = parse("P", &mut ctx, false).unwrap();
        let q = parse("Q", &mut ctx, false).unwrap();
        let Verdict::Invalid(witness) = prove(&mut ctx, &[p], q) else {
            panic!("expected an invalid argument");
        };
        assert_eq!(witness.value(p), Some(true));
        assert_eq!(witness.value(q), Some(false));
    }

    #[test]
    fn test_premise_contradicting_goal_directly() {
        // premises {P}, goal P: the root closes at seeding time
        assert!(prove_strings(&["P"], "P").is_valid());
    }

    #[test]
    fn test_universal_syllogism_is_valid() {
        assert!(prove_strings(
            &["(forall x (implies (Man x) (Mortal x)))", "(Man socrates)"],
            "(Mortal socrates)"
        )
        .is_valid());
    }

    #[test]
    fn test_existential_does_not_entail_universal() {
        let mut ctx = Context::new();
        let premise = parse("(exists x (P x))", &mut ctx, false).unwrap();
        let goal = parse("(forall x (P x))", &mut ctx, false).unwrap();
        let Verdict::Invalid(witness) = prove(&mut ctx, &[premise], goal) else {
            panic!("expected an invalid argument");
        };
        // the witness holds P for the existential's constant and refutes it
        // for the universal's counterwitness
        let p_c0 = ctx.sentences.lookup("(P c0)").unwrap();
        let p_c1 = ctx.sentences.lookup("(P c1)").unwrap();
        assert_eq!(witness.value(p_c0), Some(true));
        assert_eq!(witness.value(p_c1), Some(false));
    }

    #[test]
    fn test_universal_entails_instance() {
        assert!(prove_strings(&["(forall x (P x))", "(Q a)"], "(P a)").is_valid());
    }

    #[test]
    fn test_nested_splits() {
        assert!(prove_strings(
            &["(or A B)", "(implies A C)", "(implies B C)"],
            "C"
        )
        .is_valid());
        assert!(!prove_strings(&["(or A B)", "(implies A C)"], "C").is_valid());
    }

    #[test]
    fn test_closed_tableau_render() {
        let mut ctx = Context::new();
        let premise = parse("(and P Q)", &mut ctx, false).unwrap();
        let goal = parse("P", &mut ctx, false).unwrap();
        let mut prover = Prover::new(&mut ctx.sentences, &ctx.sorts, &[premise], goal);
        assert!(prover.run().is_valid());
        assert_snapshot!(prover.render(), @r"
        (P ∧ Q) = true [0]
        P = false [0]
        ✗ closed
        ");
    }

    #[test]
    fn test_open_tableau_render() {
        let mut ctx = Context::new();
        let premise = parse("(or A B)", &mut ctx, false).unwrap();
        let goal = parse("A", &mut ctx, false).unwrap();
        let mut prover = Prover::new(&mut ctx.sentences, &ctx.sorts, &[premise], goal);
        assert!(!prover.run().is_valid());
        assert_snapshot!(prover.render(), @r"
        (A ∨ B) = true [0]
        A = false [0]
          A = true [1]
          ✗ closed
          B = true [1]
        ");
    }
}
