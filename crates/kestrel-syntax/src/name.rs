//! Interned identifiers.
//!
//! Every identifier in the tree is stored once in an [`Interner`] and handed
//! around as a [`Name`]. Consumers such as the symbol table keep only the
//! handle; the bytes stay owned by the interner for as long as it lives.

use std::fmt;

use string_interner::{DefaultSymbol, StringInterner, Symbol as _};

/// A handle to an interned identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(DefaultSymbol);

impl Name {
    /// The dense index of this name inside its interner.
    pub fn index(self) -> usize {
        self.0.to_usize()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.index())
    }
}

/// Owner of all identifier bytes used by a tree.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: StringInterner,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `text`, returning the existing handle if it was seen before.
    pub fn intern(&mut self, text: &str) -> Name {
        Name(self.strings.get_or_intern(text))
    }

    /// Look up the handle of `text` without interning it.
    pub fn get(&self, text: &str) -> Option<Name> {
        self.strings.get(text).map(Name)
    }

    /// The text behind `name`.
    ///
    /// Names from a different interner resolve to `"<unknown>"`.
    pub fn lookup(&self, name: Name) -> &str {
        self.strings.resolve(name.0).unwrap_or("<unknown>")
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
