use crate::sort::SortId;
use core::hash::BuildHasherDefault;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use thiserror::Error;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum DeclError {
    #[error("{0} is already declared")]
    Redeclaration(String),
}

/// Signature of a declared function or predicate.
///
/// A constant is a nullary function; a predicate is a function returning
/// [`BOOLEAN`](crate::sort::BOOLEAN).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Declaration {
    pub ret: SortId,
    pub args: Vec<SortId>,
}

impl Declaration {
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Table of function and predicate signatures, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Declarations {
    store: FxIndexMap<String, Declaration>,
}

impl Declarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a signature for `name`. Re-declaring an existing name
    /// fails and leaves the prior declaration untouched.
    pub fn declare(
        &mut self,
        name: &str,
        ret: SortId,
        args: Vec<SortId>,
    ) -> Result<(), DeclError> {
        if self.store.contains_key(name) {
            return Err(DeclError::Redeclaration(name.into()));
        }
        self.store.insert(name.into(), Declaration { ret, args });
        Ok(())
    }

    /// Returns the declaration for `name`, registering the given signature
    /// first if the name is new.
    pub fn get_or_declare(
        &mut self,
        name: &str,
        ret: SortId,
        args: Vec<SortId>,
    ) -> &Declaration {
        self.store
            .entry(name.into())
            .or_insert(Declaration { ret, args })
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.store.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
