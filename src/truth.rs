use crate::sentence::{SentenceId, Sentences};
use core::hash::BuildHasherDefault;
use indexmap::IndexMap;
use rustc_hash::{FxHashSet, FxHasher};

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

pub type NodeId = usize;

/// The root node of every [`TruthTree`].
pub const ROOT: NodeId = 0;

/// A truth value recorded for a sentence, with the inference that set it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Mapping {
    pub value: bool,
    pub inference: usize,
}

/// A standalone batch of truth-value facts: the result set of a
/// decomposition, one alternative of a branch, or the mapping held by a
/// tree node. Setting a sentence to both values latches the batch
/// inconsistent; it never becomes consistent again.
#[derive(Clone, Debug)]
pub struct Assignment {
    map: FxIndexMap<SentenceId, Mapping>,
    consistent: bool,
}

impl Default for Assignment {
    fn default() -> Self {
        Self {
            map: FxIndexMap::default(),
            consistent: true,
        }
    }
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_true(&mut self, s: SentenceId, inference: usize) {
        self.set(s, true, inference);
    }

    pub fn set_false(&mut self, s: SentenceId, inference: usize) {
        self.set(s, false, inference);
    }

    pub fn set(&mut self, s: SentenceId, value: bool, inference: usize) {
        match self.map.get(&s) {
            Some(mapping) if mapping.value != value => self.consistent = false,
            Some(_) => {}
            None => {
                self.map.insert(s, Mapping { value, inference });
            }
        }
    }

    /// Adds every fact of `other`, keeping existing justifications.
    pub fn extend(&mut self, other: &Assignment) {
        if !other.consistent {
            self.consistent = false;
        }
        for (&s, mapping) in &other.map {
            self.set(s, mapping.value, mapping.inference);
        }
    }

    pub fn get(&self, s: SentenceId) -> Option<Mapping> {
        self.map.get(&s).copied()
    }

    pub fn is_consistent(&self) -> bool {
        self.consistent
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SentenceId, Mapping)> + '_ {
        self.map.iter().map(|(&s, &m)| (s, m))
    }
}

#[derive(Clone, Debug)]
struct TruthNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    assignment: Assignment,
    decomposed: FxHashSet<SentenceId>,
    closed: bool,
}

/// The tableau: an arena of partial truth assignments linked into a tree.
///
/// Mappings of ancestors are visible to descendants via upward lookup, and
/// a node created as a child is never retroactively affected by growth
/// elsewhere in the tree: facts are only ever merged into leaves.
#[derive(Clone, Debug)]
pub struct TruthTree {
    nodes: Vec<TruthNode>,
}

impl Default for TruthTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TruthTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![TruthNode {
                parent: None,
                children: vec![],
                assignment: Assignment::default(),
                decomposed: FxHashSet::default(),
                closed: false,
            }],
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node].children
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records `s = true` at `node`; if the opposite value is visible from
    /// here the node closes instead.
    pub fn set_true(&mut self, node: NodeId, s: SentenceId, inference: usize) {
        self.set(node, s, true, inference);
    }

    /// Records `s = false` at `node`; if the opposite value is visible from
    /// here the node closes instead.
    pub fn set_false(&mut self, node: NodeId, s: SentenceId, inference: usize) {
        self.set(node, s, false, inference);
    }

    fn set(&mut self, node: NodeId, s: SentenceId, value: bool, inference: usize) {
        if self.models(node, s) == Some(!value) {
            self.nodes[node].closed = true;
            return;
        }
        self.nodes[node].assignment.set(s, value, inference);
    }

    /// Whether `s` has a value anywhere from `node` up to the root.
    pub fn is_mapped(&self, node: NodeId, s: SentenceId) -> bool {
        self.models(node, s).is_some()
    }

    /// The value of `s` visible from `node`, if any.
    pub fn models(&self, node: NodeId, s: SentenceId) -> Option<bool> {
        self.mapping(node, s).map(|m| m.value)
    }

    /// The nearest mapping of `s` visible from `node`, if any.
    pub fn mapping(&self, node: NodeId, s: SentenceId) -> Option<Mapping> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(m) = self.nodes[n].assignment.get(s) {
                return Some(m);
            }
            current = self.nodes[n].parent;
        }
        None
    }

    /// Merges a decomposition's fact batch into `node`, atomically: if the
    /// batch is inconsistent, or any fact contradicts a visible mapping,
    /// the node closes and nothing is applied.
    pub fn merge(&mut self, node: NodeId, batch: &Assignment) -> bool {
        if !batch.is_consistent() {
            self.nodes[node].closed = true;
            return false;
        }
        for (s, mapping) in batch.iter() {
            if self.models(node, s) == Some(!mapping.value) {
                self.nodes[node].closed = true;
                return false;
            }
        }
        for (s, mapping) in batch.iter() {
            if self.models(node, s).is_none() {
                self.nodes[node]
                    .assignment
                    .set(s, mapping.value, mapping.inference);
            }
        }
        true
    }

    /// Grafts `assignment` as a new child of `node`. The child is closed on
    /// arrival if its facts are contradictory in themselves or against what
    /// is visible from its parent.
    pub fn add_child(&mut self, node: NodeId, assignment: Assignment) -> NodeId {
        let mut closed = !assignment.is_consistent();
        if !closed {
            closed = assignment
                .iter()
                .any(|(s, m)| self.models(node, s) == Some(!m.value));
        }
        let child = self.nodes.len();
        self.nodes.push(TruthNode {
            parent: Some(node),
            children: vec![],
            assignment,
            decomposed: FxHashSet::default(),
            closed,
        });
        self.nodes[node].children.push(child);
        child
    }

    /// No contradiction from `node` up to the root.
    pub fn is_consistent(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.nodes[n].closed {
                return false;
            }
            current = self.nodes[n].parent;
        }
        true
    }

    pub fn mark_decomposed(&mut self, node: NodeId, s: SentenceId) {
        self.nodes[node].decomposed.insert(s);
    }

    /// Whether `s` was decomposed at `node` or any ancestor.
    pub fn is_decomposed(&self, node: NodeId, s: SentenceId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.nodes[n].decomposed.contains(&s) {
                return true;
            }
            current = self.nodes[n].parent;
        }
        false
    }

    /// Whether every visible mapped sentence that admits a reasoning rule
    /// has been decomposed here.
    pub fn is_fully_decomposed(&self, node: NodeId, sentences: &Sentences) -> bool {
        self.sentences_upward(node)
            .into_iter()
            .all(|s| sentences.get(s).is_terminal() || self.is_decomposed(node, s))
    }

    /// All directly mapped sentences from the root down to `node`,
    /// ancestors first, deduplicated.
    pub fn sentences_upward(&self, node: NodeId) -> Vec<SentenceId> {
        let mut chain = vec![];
        let mut current = Some(node);
        while let Some(n) = current {
            chain.push(n);
            current = self.nodes[n].parent;
        }
        let mut seen = FxHashSet::default();
        let mut result = vec![];
        for &n in chain.iter().rev() {
            for (s, _) in self.nodes[n].assignment.iter() {
                if seen.insert(s) {
                    result.push(s);
                }
            }
        }
        result
    }

    /// The open frontier beneath `node`: descendants with no children
    /// (`node` itself if it has none).
    pub fn leaves(&self, node: NodeId) -> Vec<NodeId> {
        if self.nodes[node].children.is_empty() {
            return vec![node];
        }
        self.nodes[node]
            .children
            .iter()
            .flat_map(|&c| self.leaves(c))
            .collect()
    }

    /// Reflexive: is `node` in the subtree rooted at `ancestor`?
    pub fn is_beneath(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n].parent;
        }
        false
    }

    /// The assignment visible from `node` flattened into one list, root
    /// facts first; the nearest-to-root mapping of a sentence wins.
    pub fn flatten(&self, node: NodeId) -> Vec<(SentenceId, bool)> {
        let mut chain = vec![];
        let mut current = Some(node);
        while let Some(n) = current {
            chain.push(n);
            current = self.nodes[n].parent;
        }
        let mut seen = FxHashSet::default();
        let mut result = vec![];
        for &n in chain.iter().rev() {
            for (s, m) in self.nodes[n].assignment.iter() {
                if seen.insert(s) {
                    result.push((s, m.value));
                }
            }
        }
        result
    }

    /// Read-only rendering of the whole tree, one line per recorded fact,
    /// children indented beneath their parents.
    pub fn render(&self, sentences: &Sentences) -> String {
        let mut lines = vec![];
        self.render_node(ROOT, 0, sentences, &mut lines);
        lines.join("\n")
    }

    fn render_node(
        &self,
        node: NodeId,
        depth: usize,
        sentences: &Sentences,
        lines: &mut Vec<String>,
    ) {
        let indent = "  ".repeat(depth);
        for (s, m) in self.nodes[node].assignment.iter() {
            lines.push(format!(
                "{indent}{} = {} [{}]",
                sentences.display(s),
                m.value,
                m.inference
            ));
        }
        if self.nodes[node].closed {
            lines.push(format!("{indent}✗ closed"));
        }
        for &child in &self.nodes[node].children {
            self.render_node(child, depth + 1, sentences, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;

    #[test]
    fn test_assignment_latches_inconsistency() {
        let mut a = Assignment::new();
        a.set_true(0, 0);
        assert!(a.is_consistent());
        a.set_true(0, 1);
        assert!(a.is_consistent());
        a.set_false(0, 2);
        assert!(!a.is_consistent());
        a.set_false(0, 3);
        assert!(!a.is_consistent());
        // the original mapping and justification survive
        assert_eq!(
            a.get(0),
            Some(Mapping {
                value: true,
                inference: 0
            })
        );
    }

    #[test]
    fn test_upward_lookup() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 7, 0);
        let mut child = Assignment::new();
        child.set_false(9, 1);
        let c = tree.add_child(ROOT, child);
        assert_eq!(tree.models(c, 7), Some(true));
        assert_eq!(tree.models(c, 9), Some(false));
        assert_eq!(tree.models(ROOT, 9), None);
        assert!(tree.is_mapped(c, 7));
        assert!(!tree.is_mapped(ROOT, 9));
    }

    #[test]
    fn test_conflicting_set_closes_node() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 3, 0);
        assert!(tree.is_consistent(ROOT));
        tree.set_false(ROOT, 3, 1);
        assert!(!tree.is_consistent(ROOT));
        // the original mapping is untouched
        assert_eq!(tree.models(ROOT, 3), Some(true));
    }

    #[test]
    fn test_child_conflicting_with_ancestor_closes() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 3, 0);
        let mut alt = Assignment::new();
        alt.set_false(3, 1);
        let c = tree.add_child(ROOT, alt);
        assert!(!tree.is_consistent(c));
        assert!(tree.is_consistent(ROOT));
    }

    #[test]
    fn test_merge_is_atomic() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 1, 0);
        let mut batch = Assignment::new();
        batch.set_true(2, 1);
        batch.set_false(1, 1);
        assert!(!tree.merge(ROOT, &batch));
        assert!(!tree.is_consistent(ROOT));
        // nothing from the rejected batch was applied
        assert_eq!(tree.models(ROOT, 2), None);
    }

    #[test]
    fn test_merge_applies_new_facts_only() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 1, 0);
        let mut batch = Assignment::new();
        batch.set_true(1, 5);
        batch.set_true(2, 5);
        assert!(tree.merge(ROOT, &batch));
        assert_eq!(
            tree.mapping(ROOT, 1),
            Some(Mapping {
                value: true,
                inference: 0
            })
        );
        assert_eq!(
            tree.mapping(ROOT, 2),
            Some(Mapping {
                value: true,
                inference: 5
            })
        );
    }

    #[test]
    fn test_consistency_is_monotone() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 1, 0);
        tree.set_false(ROOT, 1, 1);
        assert!(!tree.is_consistent(ROOT));
        // further facts cannot reopen the node
        tree.set_true(ROOT, 2, 2);
        assert!(!tree.is_consistent(ROOT));
        let batch = Assignment::new();
        tree.merge(ROOT, &batch);
        assert!(!tree.is_consistent(ROOT));
    }

    #[test]
    fn test_leaves_and_is_beneath() {
        let mut tree = TruthTree::new();
        let a = tree.add_child(ROOT, Assignment::new());
        let b = tree.add_child(ROOT, Assignment::new());
        let aa = tree.add_child(a, Assignment::new());
        assert_eq!(tree.leaves(ROOT), vec![aa, b]);
        assert_eq!(tree.leaves(b), vec![b]);
        assert!(tree.is_beneath(aa, ROOT));
        assert!(tree.is_beneath(aa, a));
        assert!(!tree.is_beneath(aa, b));
        assert!(tree.is_beneath(b, b));
    }

    #[test]
    fn test_sentences_upward_ancestors_first() {
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, 5, 0);
        let mut alt = Assignment::new();
        alt.set_true(6, 1);
        alt.set_true(5, 1);
        let c = tree.add_child(ROOT, alt);
        assert_eq!(tree.sentences_upward(c), vec![5, 6]);
        assert_eq!(tree.flatten(c), vec![(5, true), (6, true)]);
    }

    #[test]
    fn test_decomposed_is_visible_downward() {
        let mut tree = TruthTree::new();
        tree.mark_decomposed(ROOT, 4);
        let c = tree.add_child(ROOT, Assignment::new());
        assert!(tree.is_decomposed(c, 4));
        assert!(!tree.is_decomposed(c, 5));
    }

    #[test]
    fn test_fully_decomposed() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let and = ctx.and(vec![p, q]).unwrap();
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, and, 0);
        tree.set_true(ROOT, p, 0);
        assert!(!tree.is_fully_decomposed(ROOT, &ctx.sentences));
        tree.mark_decomposed(ROOT, and);
        assert!(tree.is_fully_decomposed(ROOT, &ctx.sentences));
    }

    #[test]
    fn test_render() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, p, 0);
        let mut alt = Assignment::new();
        alt.set_false(q, 1);
        tree.add_child(ROOT, alt);
        let mut bad = Assignment::new();
        bad.set_false(p, 1);
        tree.add_child(ROOT, bad);
        assert_eq!(
            tree.render(&ctx.sentences),
            "P = true [0]\n  Q = false [1]\n  P = false [1]\n  ✗ closed"
        );
    }
}
