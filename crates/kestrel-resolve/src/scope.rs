//! Scope kinds layered over the symbol table's single rollback primitive.
//!
//! Opening a scope yields a [`ScopeMarker`] tagged with its kind; ending it
//! dispatches once on that tag. Default scopes are the block scopes opened
//! and closed on the hot path and end with a plain [`SymbolTable::scope_end`].
//! Global, module and file scopes end with
//! [`SymbolTable::drop_all_scopes_from`], which also discards any nested
//! scope that was left open inside them. Each marker records how many
//! scopes enclose it, so an enclosing scope that starts at the same entry
//! survives.

use std::fmt;

use crate::symbol_table::{SymbolTable, TableMarker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Builtins; lives as long as the resolver.
    Global,
    /// Everything a module declares, plus the exports it imports.
    Module,
    /// One file's declarations; the unit of invalidation.
    File,
    /// Blocks and function bodies.
    Default,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ScopeKind::Global => "global",
            ScopeKind::Module => "module",
            ScopeKind::File => "file",
            ScopeKind::Default => "default",
        };
        f.write_str(kind)
    }
}

/// Where a scope begins in the symbol table, and what kind it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeMarker {
    pub kind: ScopeKind,
    /// Entry count when the scope opened.
    pub index: usize,
    /// Number of scopes enclosing this one.
    pub depth: usize,
}

impl ScopeMarker {
    pub fn table_marker(&self) -> TableMarker {
        TableMarker { index: self.index, depth: self.depth }
    }
}

impl SymbolTable {
    /// Open a scope of `kind`.
    pub fn start(&mut self, kind: ScopeKind) -> ScopeMarker {
        let TableMarker { index, depth } = match kind {
            ScopeKind::Default => {
                let marker = TableMarker { index: self.len(), depth: self.scope_depth() };
                self.scope_start();
                marker
            }
            _ => self.scope_start_indexed(),
        };
        ScopeMarker { kind, index, depth }
    }

    /// Close the scope opened as `marker`.
    pub fn end(&mut self, marker: ScopeMarker) {
        match marker.kind {
            ScopeKind::Default => self.scope_end(),
            ScopeKind::Global | ScopeKind::Module | ScopeKind::File => {
                self.drop_all_scopes_from(marker.table_marker())
            }
        }
    }

    pub fn global_scope_start(&mut self) -> ScopeMarker {
        self.start(ScopeKind::Global)
    }

    pub fn module_scope_start(&mut self) -> ScopeMarker {
        self.start(ScopeKind::Module)
    }

    pub fn module_scope_end(&mut self, marker: ScopeMarker) {
        debug_assert_eq!(marker.kind, ScopeKind::Module);
        self.end(marker);
    }

    pub fn file_scope_start(&mut self) -> ScopeMarker {
        self.start(ScopeKind::File)
    }

    pub fn file_scope_end(&mut self, marker: ScopeMarker) {
        debug_assert_eq!(marker.kind, ScopeKind::File);
        self.end(marker);
    }
}
