use crate::sort::{SortId, Sorts, BOOLEAN, OBJECT};
use crate::truth::{NodeId, TruthTree};
use crate::Context;
use core::hash::BuildHasherDefault;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use rustc_hash::FxHasher;
use thiserror::Error;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

pub type SentenceId = usize;

/// One node of the interned sentence graph. Children are ids into the same
/// [`Sentences`] store, so structurally identical subsentences are shared
/// and equality anywhere in the crate is id equality.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Sentence {
    Atom(String),
    Variable(String),
    Constant(String),
    Function(String, Vec<SentenceId>),
    Predicate(String, Vec<SentenceId>),
    Not(SentenceId),
    And(Vec<SentenceId>),
    Or(Vec<SentenceId>),
    Implies(SentenceId, SentenceId),
    Iff(SentenceId, SentenceId),
    ForAll(SentenceId, SentenceId),
    Exists(SentenceId, SentenceId),
}

/// Truth value of a sentence under a partial assignment.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    True,
    False,
    Unknown,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SentenceError {
    #[error("{name} expects {expected} arguments, got {found}")]
    Arity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("argument {position} of {name} must be a {expected}, got a {found}")]
    ArgumentSort {
        name: String,
        position: usize,
        expected: String,
        found: String,
    },
    #[error("{found} is not a Boolean sentence")]
    NotBoolean { found: String },
    #[error("{0} does not return Boolean, it cannot be used as a predicate")]
    NotAPredicate(String),
    #[error("{found} cannot bind a quantifier")]
    NotAVariable { found: String },
}

impl Value {
    pub fn negate(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }
}

impl From<Option<bool>> for Value {
    fn from(b: Option<bool>) -> Self {
        b.map_or(Self::Unknown, Self::from)
    }
}

impl Sentence {
    pub fn children(&self) -> Vec<SentenceId> {
        use Sentence::*;
        match self {
            Atom(_) | Variable(_) | Constant(_) => vec![],
            Function(_, args) | Predicate(_, args) | And(args) | Or(args) => args.clone(),
            Not(p) => vec![*p],
            Implies(p, q) | Iff(p, q) | ForAll(p, q) | Exists(p, q) => vec![*p, *q],
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Sentence::Atom(_) | Sentence::Predicate(..))
    }

    pub fn is_quantifier(&self) -> bool {
        matches!(self, Sentence::ForAll(..) | Sentence::Exists(..))
    }

    /// Kinds no reasoning rule ever applies to.
    pub fn is_terminal(&self) -> bool {
        use Sentence::*;
        matches!(
            self,
            Atom(_) | Variable(_) | Constant(_) | Function(..) | Predicate(..)
        )
    }

    fn keyword(&self) -> &str {
        use Sentence::*;
        match self {
            Atom(n) | Variable(n) | Constant(n) | Function(n, _) | Predicate(n, _) => n,
            Not(_) => "not",
            And(_) => "and",
            Or(_) => "or",
            Implies(..) => "implies",
            Iff(..) => "iff",
            ForAll(..) => "forall",
            Exists(..) => "exists",
        }
    }
}

#[derive(Clone, Debug)]
struct SentenceInfo {
    sentence: Sentence,
    sort: SortId,
    display: String,
    annotated: String,
    size: usize,
    atom_count: usize,
    quantifier_count: usize,
}

/// Interning store for sentences, keyed by canonical s-expression text.
///
/// The id of a sentence is its insertion index; interning the same canonical
/// text always returns the same id, and records are immutable once inserted.
/// Display forms and the derived counts are computed once at insertion.
#[derive(Clone, Debug, Default)]
pub struct Sentences {
    store: FxIndexMap<String, SentenceInfo>,
    fresh: usize,
}

impl Sentences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SentenceId) -> &Sentence {
        &self.store[id].sentence
    }

    pub fn sort(&self, id: SentenceId) -> SortId {
        self.store[id].sort
    }

    /// The canonical s-expression form, also the interning key.
    pub fn sexpr(&self, id: SentenceId) -> &str {
        let (key, _) = self.store.get_index(id).unwrap_or_else(|| {
            unreachable!("sentence ids are only handed out by this store")
        });
        key
    }

    /// The infix human-readable form.
    pub fn display(&self, id: SentenceId) -> &str {
        &self.store[id].display
    }

    /// The sort-annotated diagnostic form.
    pub fn annotated(&self, id: SentenceId) -> &str {
        &self.store[id].annotated
    }

    pub fn size(&self, id: SentenceId) -> usize {
        self.store[id].size
    }

    pub fn atom_count(&self, id: SentenceId) -> usize {
        self.store[id].atom_count
    }

    pub fn quantifier_count(&self, id: SentenceId) -> usize {
        self.store[id].quantifier_count
    }

    pub fn lookup(&self, sexpr: &str) -> Option<SentenceId> {
        self.store.get_index_of(sexpr)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub(crate) fn intern_node(
        &mut self,
        sentence: Sentence,
        sort: SortId,
        sorts: &Sorts,
    ) -> SentenceId {
        let key = self.canonical(&sentence, sort, sorts);
        if let Some(id) = self.store.get_index_of(&key) {
            return id;
        }
        let info = self.build_info(sentence, sort, sorts);
        self.store.insert_full(key, info).0
    }

    fn canonical(&self, sentence: &Sentence, sort: SortId, sorts: &Sorts) -> String {
        use Sentence::*;
        match sentence {
            Atom(name) => name.clone(),
            // the sort is part of a term name's identity
            Variable(name) | Constant(name) => {
                if sort == OBJECT {
                    name.clone()
                } else {
                    format!("{name}:{}", sorts.name(sort))
                }
            }
            Function(_, args) | Predicate(_, args) if args.is_empty() => {
                sentence.keyword().into()
            }
            _ => format!(
                "({} {})",
                sentence.keyword(),
                sentence
                    .children()
                    .iter()
                    .map(|&c| self.sexpr(c))
                    .join(" ")
            ),
        }
    }

    fn build_info(&self, sentence: Sentence, sort: SortId, sorts: &Sorts) -> SentenceInfo {
        use Sentence::*;
        let display = match &sentence {
            Atom(n) | Variable(n) | Constant(n) => n.clone(),
            Function(n, args) | Predicate(n, args) => {
                if args.is_empty() {
                    n.clone()
                } else {
                    format!("{n}({})", args.iter().map(|&a| self.display(a)).join(","))
                }
            }
            Not(p) => format!("¬{}", self.display(*p)),
            And(args) => {
                format!("({})", args.iter().map(|&a| self.display(a)).join(" ∧ "))
            }
            Or(args) => {
                format!("({})", args.iter().map(|&a| self.display(a)).join(" ∨ "))
            }
            Implies(p, q) => format!("({} → {})", self.display(*p), self.display(*q)),
            Iff(p, q) => format!("({} ↔ {})", self.display(*p), self.display(*q)),
            ForAll(v, p) => format!("∀{}{}", self.display(*v), self.display(*p)),
            Exists(v, p) => format!("∃{}{}", self.display(*v), self.display(*p)),
        };
        let children = sentence.children();
        let annotated = if children.is_empty() {
            format!("{}:{}", sorts.name(sort), sentence.keyword())
        } else {
            format!(
                "({}:{} {})",
                sorts.name(sort),
                sentence.keyword(),
                children.iter().map(|&c| self.annotated(c)).join(" ")
            )
        };
        let size = children.iter().map(|&c| self.size(c)).sum::<usize>() + children.len();
        let atom_count = children.iter().map(|&c| self.atom_count(c)).sum::<usize>()
            + usize::from(sentence.is_atomic());
        let quantifier_count = children
            .iter()
            .map(|&c| self.quantifier_count(c))
            .sum::<usize>()
            + usize::from(sentence.is_quantifier());
        SentenceInfo {
            sentence,
            sort,
            display,
            annotated,
            size,
            atom_count,
            quantifier_count,
        }
    }

    /// Three-valued evaluation of `id` against the assignment visible from
    /// `node`. Connectives deliberately mirror the reference semantics: And,
    /// Or and Iff first consult their own direct mapping and report
    /// `Unknown` whenever any argument is undetermined, even if another
    /// argument would already decide the result; Implies reads the direct
    /// mappings of its two sides and never consults its own.
    pub fn evaluate(&self, id: SentenceId, tree: &TruthTree, node: NodeId) -> Value {
        use Sentence::*;
        match &self.store[id].sentence {
            Atom(_) | Variable(_) | Constant(_) | Function(..) | Predicate(..)
            | ForAll(..) | Exists(..) => tree.models(node, id).into(),
            Not(p) => self.evaluate(*p, tree, node).negate(),
            And(args) => {
                if let Some(v) = tree.models(node, id) {
                    return v.into();
                }
                let mut all_true = true;
                for &arg in args {
                    match self.evaluate(arg, tree, node) {
                        Value::Unknown => return Value::Unknown,
                        Value::False => all_true = false,
                        Value::True => {}
                    }
                }
                all_true.into()
            }
            Or(args) => {
                if let Some(v) = tree.models(node, id) {
                    return v.into();
                }
                let mut any_true = false;
                for &arg in args {
                    match self.evaluate(arg, tree, node) {
                        Value::Unknown => return Value::Unknown,
                        Value::True => any_true = true,
                        Value::False => {}
                    }
                }
                any_true.into()
            }
            Implies(p, q) => match (tree.models(node, *p), tree.models(node, *q)) {
                (Some(p), Some(q)) => (!(p && !q)).into(),
                _ => Value::Unknown,
            },
            Iff(p, q) => {
                if let Some(v) = tree.models(node, id) {
                    return v.into();
                }
                match (self.evaluate(*p, tree, node), self.evaluate(*q, tree, node)) {
                    (Value::Unknown, _) | (_, Value::Unknown) => Value::Unknown,
                    (a, b) => (a == b).into(),
                }
            }
        }
    }

    /// Rebuilds `id` with every free occurrence of `var` replaced by `term`,
    /// re-interned. Occurrences shadowed by an inner binder are left alone.
    pub fn instantiate(
        &mut self,
        id: SentenceId,
        var: SentenceId,
        term: SentenceId,
        sorts: &Sorts,
    ) -> SentenceId {
        if id == var {
            return term;
        }
        use Sentence::*;
        let info = &self.store[id];
        let (sentence, sort) = (info.sentence.clone(), info.sort);
        match sentence {
            Atom(_) | Variable(_) | Constant(_) => id,
            Function(name, args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.instantiate(a, var, term, sorts))
                    .collect();
                self.intern_node(Function(name, args), sort, sorts)
            }
            Predicate(name, args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.instantiate(a, var, term, sorts))
                    .collect();
                self.intern_node(Predicate(name, args), sort, sorts)
            }
            Not(p) => {
                let p = self.instantiate(p, var, term, sorts);
                self.intern_node(Not(p), sort, sorts)
            }
            And(args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.instantiate(a, var, term, sorts))
                    .collect();
                self.intern_node(And(args), sort, sorts)
            }
            Or(args) => {
                let args = args
                    .into_iter()
                    .map(|a| self.instantiate(a, var, term, sorts))
                    .collect();
                self.intern_node(Or(args), sort, sorts)
            }
            Implies(p, q) => {
                let p = self.instantiate(p, var, term, sorts);
                let q = self.instantiate(q, var, term, sorts);
                self.intern_node(Implies(p, q), sort, sorts)
            }
            Iff(p, q) => {
                let p = self.instantiate(p, var, term, sorts);
                let q = self.instantiate(q, var, term, sorts);
                self.intern_node(Iff(p, q), sort, sorts)
            }
            ForAll(v, _) | Exists(v, _) if v == var => id,
            ForAll(v, p) => {
                let p = self.instantiate(p, var, term, sorts);
                self.intern_node(ForAll(v, p), sort, sorts)
            }
            Exists(v, p) => {
                let p = self.instantiate(p, var, term, sorts);
                self.intern_node(Exists(v, p), sort, sorts)
            }
        }
    }

    /// Collects the constants occurring in `id`, in first-encounter order.
    pub fn constants_of(&self, id: SentenceId, out: &mut FxIndexSet<SentenceId>) {
        match &self.store[id].sentence {
            Sentence::Constant(_) => {
                out.insert(id);
            }
            Sentence::Atom(_) | Sentence::Variable(_) => {}
            other => {
                for c in other.children() {
                    self.constants_of(c, out);
                }
            }
        }
    }

    /// A constant named `c0, c1, …`, skipping names already in use.
    pub(crate) fn fresh_constant(&mut self, sort: SortId, sorts: &Sorts) -> SentenceId {
        loop {
            let name = format!("c{}", self.fresh);
            self.fresh += 1;
            if !self.store.values().any(|info| info.sentence.keyword() == name) {
                return self.intern_node(Sentence::Constant(name), sort, sorts);
            }
        }
    }
}

impl Context {
    pub fn atom(&mut self, name: &str) -> SentenceId {
        self.sentences
            .intern_node(Sentence::Atom(name.into()), BOOLEAN, &self.sorts)
    }

    pub fn variable(&mut self, name: &str, sort: SortId) -> SentenceId {
        self.sentences
            .intern_node(Sentence::Variable(name.into()), sort, &self.sorts)
    }

    pub fn constant(&mut self, name: &str, sort: SortId) -> SentenceId {
        self.sentences
            .intern_node(Sentence::Constant(name.into()), sort, &self.sorts)
    }

    /// Applies the function `name`, declaring it on first use with
    /// `Object`-sorted arguments and return.
    pub fn function(
        &mut self,
        name: &str,
        args: Vec<SentenceId>,
    ) -> Result<SentenceId, SentenceError> {
        let decl = self
            .decls
            .get_or_declare(name, OBJECT, vec![OBJECT; args.len()])
            .clone();
        self.check_application(name, &decl, &args)?;
        Ok(self
            .sentences
            .intern_node(Sentence::Function(name.into(), args), decl.ret, &self.sorts))
    }

    /// Applies the predicate `name`, declaring it on first use with
    /// `Object`-sorted arguments and a `Boolean` return.
    pub fn predicate(
        &mut self,
        name: &str,
        args: Vec<SentenceId>,
    ) -> Result<SentenceId, SentenceError> {
        let decl = self
            .decls
            .get_or_declare(name, BOOLEAN, vec![OBJECT; args.len()])
            .clone();
        if decl.ret != BOOLEAN {
            return Err(SentenceError::NotAPredicate(name.into()));
        }
        self.check_application(name, &decl, &args)?;
        Ok(self
            .sentences
            .intern_node(Sentence::Predicate(name.into(), args), BOOLEAN, &self.sorts))
    }

    pub fn not(&mut self, p: SentenceId) -> Result<SentenceId, SentenceError> {
        self.check_boolean(p)?;
        Ok(self
            .sentences
            .intern_node(Sentence::Not(p), BOOLEAN, &self.sorts))
    }

    pub fn and(&mut self, args: Vec<SentenceId>) -> Result<SentenceId, SentenceError> {
        for &arg in &args {
            self.check_boolean(arg)?;
        }
        Ok(self
            .sentences
            .intern_node(Sentence::And(args), BOOLEAN, &self.sorts))
    }

    pub fn or(&mut self, args: Vec<SentenceId>) -> Result<SentenceId, SentenceError> {
        for &arg in &args {
            self.check_boolean(arg)?;
        }
        Ok(self
            .sentences
            .intern_node(Sentence::Or(args), BOOLEAN, &self.sorts))
    }

    pub fn implies(
        &mut self,
        p: SentenceId,
        q: SentenceId,
    ) -> Result<SentenceId, SentenceError> {
        self.check_boolean(p)?;
        self.check_boolean(q)?;
        Ok(self
            .sentences
            .intern_node(Sentence::Implies(p, q), BOOLEAN, &self.sorts))
    }

    pub fn iff(&mut self, p: SentenceId, q: SentenceId) -> Result<SentenceId, SentenceError> {
        self.check_boolean(p)?;
        self.check_boolean(q)?;
        Ok(self
            .sentences
            .intern_node(Sentence::Iff(p, q), BOOLEAN, &self.sorts))
    }

    pub fn forall(
        &mut self,
        var: SentenceId,
        body: SentenceId,
    ) -> Result<SentenceId, SentenceError> {
        self.check_binder(var)?;
        self.check_boolean(body)?;
        Ok(self
            .sentences
            .intern_node(Sentence::ForAll(var, body), BOOLEAN, &self.sorts))
    }

    pub fn exists(
        &mut self,
        var: SentenceId,
        body: SentenceId,
    ) -> Result<SentenceId, SentenceError> {
        self.check_binder(var)?;
        self.check_boolean(body)?;
        Ok(self
            .sentences
            .intern_node(Sentence::Exists(var, body), BOOLEAN, &self.sorts))
    }

    fn check_application(
        &self,
        name: &str,
        decl: &crate::decl::Declaration,
        args: &[SentenceId],
    ) -> Result<(), SentenceError> {
        if decl.arity() != args.len() {
            return Err(SentenceError::Arity {
                name: name.into(),
                expected: decl.arity(),
                found: args.len(),
            });
        }
        for (position, (&arg, &expected)) in args.iter().zip(&decl.args).enumerate() {
            let found = self.sentences.sort(arg);
            if !self.sorts.is_subsort(found, expected) {
                return Err(SentenceError::ArgumentSort {
                    name: name.into(),
                    position,
                    expected: self.sorts.name(expected).into(),
                    found: self.sorts.name(found).into(),
                });
            }
        }
        Ok(())
    }

    fn check_boolean(&self, s: SentenceId) -> Result<(), SentenceError> {
        if self.sentences.sort(s) != BOOLEAN {
            return Err(SentenceError::NotBoolean {
                found: self.sentences.display(s).into(),
            });
        }
        Ok(())
    }

    fn check_binder(&self, var: SentenceId) -> Result<(), SentenceError> {
        if !matches!(self.sentences.get(var), Sentence::Variable(_)) {
            return Err(SentenceError::NotAVariable {
                found: self.sentences.display(var).into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::truth::{TruthTree, ROOT};

    #[test]
    fn test_interning_is_idempotent() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let pq = ctx.and(vec![p, q]).unwrap();
        assert_eq!(ctx.atom("P"), p);
        assert_eq!(ctx.and(vec![p, q]).unwrap(), pq);
        assert_ne!(p, q);
        assert_ne!(ctx.and(vec![q, p]).unwrap(), pq);
    }

    #[test]
    fn test_canonical_and_display_forms() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let np = ctx.not(p).unwrap();
        let or = ctx.or(vec![np, q]).unwrap();
        assert_eq!(ctx.sentences.sexpr(or), "(or (not P) Q)");
        assert_eq!(ctx.sentences.display(or), "(¬P ∨ Q)");
        assert_eq!(ctx.sentences.annotated(p), "Boolean:P");
        assert_eq!(
            ctx.sentences.annotated(or),
            "(Boolean:or (Boolean:not Boolean:P) Boolean:Q)"
        );
    }

    #[test]
    fn test_sorted_terms_do_not_alias() {
        let mut ctx = Context::new();
        let animal = ctx.sorts.get_or_create("Animal", None).unwrap();
        let a = ctx.constant("rex", animal);
        let b = ctx.constant("rex", crate::sort::OBJECT);
        assert_ne!(a, b);
        assert_eq!(ctx.sentences.sexpr(a), "rex:Animal");
        assert_eq!(ctx.sentences.sexpr(b), "rex");
    }

    #[test]
    fn test_memoized_counts() {
        let mut ctx = Context::new();
        let x = ctx.variable("x", OBJECT);
        let man = ctx.predicate("Man", vec![x]).unwrap();
        let mortal = ctx.predicate("Mortal", vec![x]).unwrap();
        let imp = ctx.implies(man, mortal).unwrap();
        let all = ctx.forall(x, imp).unwrap();
        assert_eq!(ctx.sentences.atom_count(all), 2);
        assert_eq!(ctx.sentences.quantifier_count(all), 1);
        // size: each predicate is 1, the implication adds 2, the binder 2
        assert_eq!(ctx.sentences.size(imp), 4);
        assert_eq!(ctx.sentences.size(all), 6);
    }

    #[test]
    fn test_sort_checking() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let c = ctx.constant("c", OBJECT);
        assert!(matches!(
            ctx.and(vec![p, c]),
            Err(SentenceError::NotBoolean { .. })
        ));
        assert!(matches!(
            ctx.forall(p, p),
            Err(SentenceError::NotAVariable { .. })
        ));
        ctx.decls.declare("R", BOOLEAN, vec![OBJECT]).unwrap();
        assert!(matches!(
            ctx.predicate("R", vec![c, c]),
            Err(SentenceError::Arity { .. })
        ));
    }

    #[test]
    fn test_argument_sort_checking() {
        let mut ctx = Context::new();
        let animal = ctx.sorts.get_or_create("Animal", None).unwrap();
        let plant = ctx.sorts.get_or_create("Plant", None).unwrap();
        let dog = ctx.sorts.get_or_create("Dog", Some(animal)).unwrap();
        ctx.decls.declare("Barks", BOOLEAN, vec![animal]).unwrap();
        let rex = ctx.constant("rex", dog);
        let fern = ctx.constant("fern", plant);
        assert!(ctx.predicate("Barks", vec![rex]).is_ok());
        assert!(matches!(
            ctx.predicate("Barks", vec![fern]),
            Err(SentenceError::ArgumentSort { .. })
        ));
    }

    #[test]
    fn test_evaluate_atoms_and_not() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let np = ctx.not(p).unwrap();
        let mut tree = TruthTree::new();
        assert_eq!(ctx.sentences.evaluate(p, &tree, ROOT), Value::Unknown);
        tree.set_true(ROOT, p, 0);
        assert_eq!(ctx.sentences.evaluate(p, &tree, ROOT), Value::True);
        assert_eq!(ctx.sentences.evaluate(np, &tree, ROOT), Value::False);
        assert_eq!(ctx.sentences.evaluate(q, &tree, ROOT), Value::Unknown);
    }

    #[test]
    fn test_evaluate_unknown_wins_over_decided_arguments() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let and = ctx.and(vec![p, q]).unwrap();
        let or = ctx.or(vec![p, q]).unwrap();
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, p, 0);
        // Q is unmapped, so both connectives stay undetermined even though
        // P alone already decides the disjunction
        assert_eq!(ctx.sentences.evaluate(and, &tree, ROOT), Value::Unknown);
        assert_eq!(ctx.sentences.evaluate(or, &tree, ROOT), Value::Unknown);
    }

    #[test]
    fn test_evaluate_prefers_direct_mapping() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let and = ctx.and(vec![p, q]).unwrap();
        let mut tree = TruthTree::new();
        tree.set_false(ROOT, and, 0);
        assert_eq!(ctx.sentences.evaluate(and, &tree, ROOT), Value::False);
    }

    #[test]
    fn test_evaluate_connective_tables() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let and = ctx.and(vec![p, q]).unwrap();
        let or = ctx.or(vec![p, q]).unwrap();
        let imp = ctx.implies(p, q).unwrap();
        let iff = ctx.iff(p, q).unwrap();
        let mut tree = TruthTree::new();
        tree.set_true(ROOT, p, 0);
        tree.set_false(ROOT, q, 0);
        assert_eq!(ctx.sentences.evaluate(and, &tree, ROOT), Value::False);
        assert_eq!(ctx.sentences.evaluate(or, &tree, ROOT), Value::True);
        assert_eq!(ctx.sentences.evaluate(imp, &tree, ROOT), Value::False);
        assert_eq!(ctx.sentences.evaluate(iff, &tree, ROOT), Value::False);
    }

    #[test]
    fn test_implies_reads_mappings_not_subevaluations() {
        let mut ctx = Context::new();
        let p = ctx.atom("P");
        let q = ctx.atom("Q");
        let np = ctx.not(p).unwrap();
        let imp = ctx.implies(np, q).unwrap();
        let mut tree = TruthTree::new();
        tree.set_false(ROOT, p, 0);
        tree.set_true(ROOT, q, 0);
        // ¬P evaluates to true but is not itself mapped, so the conditional
        // stays undetermined
        assert_eq!(ctx.sentences.evaluate(np, &tree, ROOT), Value::True);
        assert_eq!(ctx.sentences.evaluate(imp, &tree, ROOT), Value::Unknown);
    }

    #[test]
    fn test_instantiate() {
        let mut ctx = Context::new();
        let x = ctx.variable("x", OBJECT);
        let man = ctx.predicate("Man", vec![x]).unwrap();
        let mortal = ctx.predicate("Mortal", vec![x]).unwrap();
        let imp = ctx.implies(man, mortal).unwrap();
        let socrates = ctx.constant("socrates", OBJECT);
        let sorts = ctx.sorts.clone();
        let inst = ctx.sentences.instantiate(imp, x, socrates, &sorts);
        assert_eq!(
            ctx.sentences.sexpr(inst),
            "(implies (Man socrates) (Mortal socrates))"
        );
        // instantiating twice re-interns to the same id
        let again = ctx.sentences.instantiate(imp, x, socrates, &sorts);
        assert_eq!(inst, again);
    }

    #[test]
    fn test_instantiate_respects_shadowing() {
        let mut ctx = Context::new();
        let x = ctx.variable("x", OBJECT);
        let px = ctx.predicate("P", vec![x]).unwrap();
        let inner = ctx.exists(x, px).unwrap();
        let qx = ctx.predicate("Q", vec![x]).unwrap();
        let body = ctx.and(vec![qx, inner]).unwrap();
        let c = ctx.constant("c", OBJECT);
        let sorts = ctx.sorts.clone();
        let inst = ctx.sentences.instantiate(body, x, c, &sorts);
        assert_eq!(ctx.sentences.sexpr(inst), "(and (Q c) (exists x (P x)))");
    }

    #[test]
    fn test_constants_and_fresh_constants() {
        let mut ctx = Context::new();
        let a = ctx.constant("a", OBJECT);
        let b = ctx.constant("b", OBJECT);
        let p = ctx.predicate("P", vec![a, b]).unwrap();
        let mut out = IndexSet::default();
        ctx.sentences.constants_of(p, &mut out);
        assert_eq!(out.into_iter().collect::<Vec<_>>(), vec![a, b]);

        let c0 = ctx.constant("c0", OBJECT);
        let sorts = ctx.sorts.clone();
        let fresh = ctx.sentences.fresh_constant(OBJECT, &sorts);
        assert_ne!(fresh, c0);
        assert_eq!(ctx.sentences.sexpr(fresh), "c1");
    }
}
