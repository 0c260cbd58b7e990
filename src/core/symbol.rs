//! Symbol interning.
//!
//! Every distinct name is stored once in a global slot map; expressions carry an
//! [`InternedSymbol`] whose equality and hashing use the slot key only.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, RwLock};

use rustc_hash::FxHashMap;
use slotmap::{DefaultKey, Key, SlotMap};

/// An interned symbol name: O(1) equality, cheap clones.
#[derive(Clone)]
pub struct InternedSymbol {
    key: DefaultKey,
    name: Arc<str>,
}

impl InternedSymbol {
    /// Intern `name`, returning the existing entry when it was seen before.
    pub fn new(name: &str) -> Self {
        intern(name)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Stable numeric id of the interned entry.
    #[inline]
    pub fn id(&self) -> u64 {
        self.key.data().as_ffi()
    }
}

impl PartialEq for InternedSymbol {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for InternedSymbol {}

impl Hash for InternedSymbol {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl PartialOrd for InternedSymbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// Ordered by name so canonical forms do not depend on interning order.
impl Ord for InternedSymbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.key == other.key {
            return std::cmp::Ordering::Equal;
        }
        self.name.cmp(&other.name)
    }
}

impl fmt::Debug for InternedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Display for InternedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

struct SymbolRegistry {
    by_name: FxHashMap<Arc<str>, DefaultKey>,
    by_key: SlotMap<DefaultKey, Arc<str>>,
}

static REGISTRY: LazyLock<RwLock<SymbolRegistry>> = LazyLock::new(|| {
    RwLock::new(SymbolRegistry {
        by_name: FxHashMap::default(),
        by_key: SlotMap::with_key(),
    })
});

fn intern(name: &str) -> InternedSymbol {
    {
        let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
        if let Some(&key) = registry.by_name.get(name) {
            return InternedSymbol {
                key,
                name: Arc::clone(&registry.by_key[key]),
            };
        }
    }

    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    // Another thread may have inserted it between the two locks
    if let Some(&key) = registry.by_name.get(name) {
        return InternedSymbol {
            key,
            name: Arc::clone(&registry.by_key[key]),
        };
    }
    let shared: Arc<str> = Arc::from(name);
    let key = registry.by_key.insert(Arc::clone(&shared));
    registry.by_name.insert(Arc::clone(&shared), key);
    InternedSymbol { key, name: shared }
}

/// Number of distinct names interned so far.
pub fn symbol_count() -> usize {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .by_key
        .len()
}
