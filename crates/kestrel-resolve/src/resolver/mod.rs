//! Resolver orchestration.
//!
//! The resolver drives the symbol table through three passes per file:
//! top-level declaration, signature linking and body linking. All files of
//! a module are top-level declared before any of them is linked, so forward
//! references across files resolve.
//!
//! ## Table layout
//!
//! ```text
//! [ builtins | module: imported exports | file 1 | file 2 | ... | overlay ]
//!   global     ^ module marker            ^ file markers           ^ private items
//! ```
//!
//! Internal and public top-level items live in their file's region.
//! Private items are declared into an overlay scope opened on top of the
//! table while their own file is linked, and dropped right after, so no
//! other file ever sees them. Invalidating a file truncates the table at
//! its marker, which also removes every file declared after it.

mod declare;
mod file;
mod link;

use fxhash::FxHashMap;
use kestrel_syntax::{Access, FileId, Interner, ModuleId, Name, Node, NodeArena, NodeId, NodeKind};

use crate::config::{ConfigError, ResolverConfig};
use crate::instantiation::InstantiationContainer;
use crate::scope::ScopeMarker;
use crate::symbol_table::SymbolTable;
use crate::types::{Instantiation, Signature, Ty};

pub use file::FilePhase;

/// Read-only access to the tree being resolved.
#[derive(Clone, Copy)]
pub struct Ast<'a> {
    pub arena: &'a NodeArena,
    pub interner: &'a Interner,
}

impl<'a> Ast<'a> {
    pub fn new(arena: &'a NodeArena, interner: &'a Interner) -> Self {
        Self { arena, interner }
    }

    pub fn text(&self, name: Name) -> &'a str {
        self.interner.lookup(name)
    }
}

/// Returned by [`Resolver::module_scope_start`]; hand it back to
/// [`Resolver::module_scope_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ModuleMarker {
    pub module: ModuleId,
    pub scope: ScopeMarker,
}

/// A public declaration other modules may import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Export {
    pub name: Name,
    pub node: NodeId,
    pub file: FileId,
}

#[derive(Debug)]
struct OpenModule {
    id: ModuleId,
    scope: ScopeMarker,
    /// First entry declared by the module itself; earlier entries are
    /// builtins and imports, which the module may shadow freely.
    decl_start: usize,
    /// Top-level declared files, in table order.
    files: Vec<FileId>,
}

/// The resolution state of one source file.
#[derive(Debug, Clone)]
struct FileState {
    module: ModuleId,
    phase: FilePhase,
    /// Start of the file's region while its module is open.
    marker: Option<ScopeMarker>,
    /// Private top-level items, declared into the overlay while linking.
    privates: Vec<NodeId>,
    /// Generic declarations of this file.
    generics: Vec<NodeId>,
    /// Linkage names this file owns.
    linkage: Vec<String>,
    /// Nodes with a recorded reference, signature or instantiation.
    recorded: Vec<NodeId>,
}

impl FileState {
    fn new(module: ModuleId) -> Self {
        Self {
            module,
            phase: FilePhase::NotDeclared,
            marker: None,
            privates: Vec::new(),
            generics: Vec::new(),
            linkage: Vec::new(),
            recorded: Vec::new(),
        }
    }
}

/// Binds names to declarations, one module and file at a time.
///
/// A resolver is single-threaded: it is `Send`, but every call mutates
/// shared tables, so callers serialise access.
#[derive(Debug)]
pub struct Resolver {
    config: ResolverConfig,
    table: SymbolTable,
    builtins: Vec<(Name, NodeId)>,
    open_module: Option<OpenModule>,
    files: FxHashMap<FileId, FileState>,
    exports: FxHashMap<ModuleId, Vec<Export>>,
    /// Linkage name -> owning declaration, across all modules.
    linkage: FxHashMap<String, NodeId>,
    /// Identifier or call -> the declaration it refers to.
    references: FxHashMap<NodeId, NodeId>,
    signatures: FxHashMap<NodeId, Signature>,
    instantiations: InstantiationContainer<Vec<Ty>>,
    /// Call -> the instantiation it requested.
    call_instantiations: FxHashMap<NodeId, Instantiation>,
    current_file: Option<FileId>,
}

impl Resolver {
    /// Create a resolver and declare the configured builtin types.
    ///
    /// Builtin nodes are allocated in `arena` under [`FileId::BUILTIN`].
    pub fn new(
        arena: &mut NodeArena,
        interner: &mut Interner,
        config: ResolverConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut table = SymbolTable::from_config(&config);
        table.global_scope_start();
        let builtins: Vec<_> = config
            .builtin_types
            .iter()
            .map(|ty| {
                let name = interner.intern(ty);
                let node = arena.alloc(Node::new(
                    Some(name),
                    Access::Public,
                    FileId::BUILTIN,
                    (0usize, 0usize).into(),
                    NodeKind::Builtin,
                ));
                (name, node)
            })
            .collect();
        for &(name, node) in &builtins {
            table.declare(name, node);
        }
        log::debug!(
            "resolver ready with {} builtins, {} buckets",
            builtins.len(),
            table.capacity()
        );

        Ok(Self {
            config,
            table,
            builtins,
            open_module: None,
            files: FxHashMap::default(),
            exports: FxHashMap::default(),
            linkage: FxHashMap::default(),
            references: FxHashMap::default(),
            signatures: FxHashMap::default(),
            instantiations: InstantiationContainer::new(),
            call_instantiations: FxHashMap::default(),
            current_file: None,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn instantiations(&self) -> &InstantiationContainer<Vec<Ty>> {
        &self.instantiations
    }

    /// The builtin type declarations, in configuration order.
    pub fn builtins(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.builtins.iter().map(|&(_, node)| node)
    }

    /// The file whose phase is running or ran last.
    pub fn current_file(&self) -> Option<FileId> {
        self.current_file
    }

    pub fn current_module(&self) -> Option<ModuleId> {
        self.open_module.as_ref().map(|open| open.id)
    }

    /// The declaration `name` currently resolves to.
    ///
    /// Between phases this sees builtins, imports and the non-private
    /// declarations of the open module; during linking it also sees the
    /// linked file's private declarations and locals.
    pub fn find(&self, name: Name) -> Option<NodeId> {
        self.table.resolve(name)
    }

    /// Every function `name` may refer to, newest first.
    ///
    /// Stops at the first binding that is not a function: a variable or
    /// type hides the functions it shadows.
    pub fn find_overloads(&self, ast: Ast<'_>, name: Name) -> Vec<NodeId> {
        let mut overloads = Vec::new();
        for node in self.table.resolve_all(name) {
            match ast.arena.get(node) {
                Some(decl) if decl.is_function() => overloads.push(node),
                Some(_) => break,
                None => {
                    log::warn!("skipping stale overload candidate {node:?} of `{}`", ast.text(name))
                }
            }
        }
        overloads
    }

    /// The declaration an identifier or call was bound to.
    pub fn reference(&self, node: NodeId) -> Option<NodeId> {
        self.references.get(&node).copied()
    }

    /// The resolved signature of a function, struct or typed variable.
    pub fn signature(&self, node: NodeId) -> Option<&Signature> {
        self.signatures.get(&node)
    }

    /// The instantiation a call with explicit type arguments requested.
    pub fn instantiation_of(&self, call: NodeId) -> Option<&Instantiation> {
        self.call_instantiations.get(&call)
    }

    /// Public declarations of `module`.
    pub fn exports(&self, module: ModuleId) -> &[Export] {
        self.exports.get(&module).map(Vec::as_slice).unwrap_or_default()
    }

    /// The declaration owning `linkage_name`, if any.
    pub fn linkage_owner(&self, linkage_name: &str) -> Option<NodeId> {
        self.linkage.get(linkage_name).copied()
    }

    /// Open `module` and import the exports of `dependencies`.
    ///
    /// Reopening a module forgets everything resolved for it before.
    ///
    /// # Panics
    ///
    /// When another module is still open.
    pub fn module_scope_start(
        &mut self,
        module: ModuleId,
        dependencies: &[ModuleId],
    ) -> ModuleMarker {
        if let Some(open) = &self.open_module {
            panic!("cannot open {module} while {} is still open", open.id);
        }
        if self.files.values().any(|state| state.module == module) {
            self.forget_module(module);
        }

        let scope = self.table.module_scope_start();
        let mut imported = 0;
        for dep in dependencies {
            for export in self.exports.get(dep).into_iter().flatten() {
                self.table.declare(export.name, export.node);
                imported += 1;
            }
        }
        log::debug!(
            "opened {module}: imported {imported} symbols from {} modules",
            dependencies.len()
        );

        self.open_module = Some(OpenModule {
            id: module,
            scope,
            decl_start: self.table.len(),
            files: Vec::new(),
        });
        ModuleMarker { module, scope }
    }

    /// Close the open module, dropping its symbols.
    ///
    /// Exports, linkage names, recorded references and instantiations are
    /// kept; [`Resolver::forget_module`] drops them.
    ///
    /// # Panics
    ///
    /// When `marker` does not belong to the open module.
    pub fn module_scope_end(&mut self, marker: ModuleMarker) {
        let open = match self.open_module.take() {
            Some(open) if open.id == marker.module && open.scope == marker.scope => open,
            other => panic!(
                "module marker for {} does not match the open module {other:?}",
                marker.module
            ),
        };
        self.table.module_scope_end(open.scope);
        for file in &open.files {
            if let Some(state) = self.files.get_mut(file) {
                state.marker = None;
            }
        }
        self.current_file = None;
        log::debug!("closed {} with {} files", open.id, open.files.len());
    }

    /// Drop everything resolved for a closed module.
    ///
    /// # Panics
    ///
    /// When `module` is open.
    pub fn forget_module(&mut self, module: ModuleId) {
        assert!(
            self.current_module() != Some(module),
            "cannot forget {module} while it is open"
        );
        let files: Vec<FileId> = self
            .files
            .iter()
            .filter(|(_, state)| state.module == module)
            .map(|(&file, _)| file)
            .collect();
        for file in &files {
            self.release_file(*file);
            self.files.remove(file);
        }
        self.exports.remove(&module);
        log::debug!("forgot {module} and its {} files", files.len());
    }

    /// Drop all modules and files, keeping only the builtins.
    pub fn clear(&mut self) {
        self.table.clear();
        self.table.global_scope_start();
        for &(name, node) in &self.builtins {
            self.table.declare(name, node);
        }
        self.open_module = None;
        self.files.clear();
        self.exports.clear();
        self.linkage.clear();
        self.references.clear();
        self.signatures.clear();
        self.instantiations.clear();
        self.call_instantiations.clear();
        self.current_file = None;
    }

    fn set_current_file(&mut self, file: FileId) {
        self.current_file = Some(file);
        self.instantiations.set_current_file(file);
    }

    fn decl_start(&self) -> usize {
        self.open_module.as_ref().map_or(self.table.len(), |open| open.decl_start)
    }
}
