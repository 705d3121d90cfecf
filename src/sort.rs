use core::hash::BuildHasherDefault;
use indexmap::IndexMap;
use rustc_hash::FxHasher;
use thiserror::Error;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

pub type SortId = usize;

/// The universal root sort; every other sort sits somewhere below it.
pub const OBJECT: SortId = 0;
/// The sort of sentences; connectives accept only `Boolean`-sorted arguments.
pub const BOOLEAN: SortId = 1;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum SortError {
    #[error("sort {name} is already registered under {existing}, cannot re-register it under {requested}")]
    Redefinition {
        name: String,
        existing: String,
        requested: String,
    },
}

#[derive(Clone, Debug)]
struct SortInfo {
    supersort: Option<SortId>,
    subsorts: Vec<SortId>,
}

/// Registry of the sort hierarchy: a tree of names rooted at [`OBJECT`].
///
/// A name, once registered, is permanently bound to its supersort.
#[derive(Clone, Debug)]
pub struct Sorts {
    store: FxIndexMap<String, SortInfo>,
}

impl Default for Sorts {
    fn default() -> Self {
        let mut store = FxIndexMap::default();
        store.insert(
            "Object".into(),
            SortInfo {
                supersort: None,
                subsorts: vec![BOOLEAN],
            },
        );
        store.insert(
            "Boolean".into(),
            SortInfo {
                supersort: Some(OBJECT),
                subsorts: vec![],
            },
        );
        Self { store }
    }
}

impl Sorts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sort registered under `name`, creating it if necessary.
    ///
    /// With `supersort` given, an existing name must already sit under that
    /// exact supersort; otherwise the call fails without touching the
    /// registry. Without one, an existing name is returned as-is and a new
    /// name is registered under [`OBJECT`].
    pub fn get_or_create(
        &mut self,
        name: &str,
        supersort: Option<SortId>,
    ) -> Result<SortId, SortError> {
        if let Some((id, _, info)) = self.store.get_full(name) {
            return match supersort {
                Some(requested) if info.supersort != Some(requested) => {
                    Err(SortError::Redefinition {
                        name: name.into(),
                        existing: info
                            .supersort
                            .map_or("no supersort".into(), |s| self.name(s).into()),
                        requested: self.name(requested).into(),
                    })
                }
                _ => Ok(id),
            };
        }
        let supersort = supersort.unwrap_or(OBJECT);
        let (id, _) = self.store.insert_full(
            name.into(),
            SortInfo {
                supersort: Some(supersort),
                subsorts: vec![],
            },
        );
        self.store[supersort].subsorts.push(id);
        Ok(id)
    }

    pub fn get(&self, name: &str) -> Option<SortId> {
        self.store.get_index_of(name)
    }

    pub fn name(&self, id: SortId) -> &str {
        let (name, _) = self.store.get_index(id).unwrap_or_else(|| {
            unreachable!("sort ids are only handed out by this registry")
        });
        name
    }

    pub fn supersort(&self, id: SortId) -> Option<SortId> {
        self.store[id].supersort
    }

    /// Reflexive-transitive: does `a` sit at or below `b`?
    pub fn is_subsort(&self, a: SortId, b: SortId) -> bool {
        let mut current = Some(a);
        while let Some(id) = current {
            if id == b {
                return true;
            }
            current = self.store[id].supersort;
        }
        false
    }

    /// Reflexive-transitive: does `a` sit at or above `b`?
    pub fn is_supersort(&self, a: SortId, b: SortId) -> bool {
        self.is_subsort(b, a)
    }

    pub fn subsorts(&self, id: SortId) -> &[SortId] {
        &self.store[id].subsorts
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
