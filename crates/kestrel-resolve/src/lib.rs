//! Symbol resolution for the Kestrel compiler.
//!
//! This crate binds identifiers to declarations and keeps that binding
//! state incrementally up to date as files are edited:
//!
//! - [`SymbolTable`]: an open-addressing table whose scopes roll back in
//!   time proportional to what they declared
//! - [`ScopeKind`] and [`ScopeMarker`]: global, module, file and block scopes
//! - [`InstantiationContainer`]: generic instantiations tracked per
//!   declaration and per file, removable per file
//! - [`Resolver`]: the per-file declare / link-signatures / link-bodies
//!   passes, with duplicate, overload and linkage-name checks
//!
//! Errors are collected through a [`Diagnoser`] rather than returned, so
//! one pass reports as many problems as it can. Broken internal invariants
//! (unbalanced scopes, out-of-order phases, desynchronised instantiation
//! lists) panic.
//!
//! ```
//! use kestrel_resolve::{Ast, Diagnostic, NoInstantiator, Resolver, ResolverConfig};
//! use kestrel_syntax::{Access, FileId, Interner, ModuleId, NodeArena, TreeBuilder};
//!
//! let mut arena = NodeArena::new();
//! let mut interner = Interner::new();
//! let mut resolver = Resolver::new(&mut arena, &mut interner, ResolverConfig::default()).unwrap();
//!
//! let mut builder = TreeBuilder::new(&mut arena, &mut interner, FileId(0), ModuleId(0));
//! let int = builder.ty("int", vec![]);
//! let x = builder.param("x", int);
//! let body = builder.ident("x");
//! let body = builder.block(vec![body]);
//! let id = builder.function("id", Access::Public, vec![], vec![x], None, Some(body));
//! builder.item(id);
//! let file = builder.finish();
//!
//! let mut diagnostics: Vec<Diagnostic> = Vec::new();
//! let module = resolver.module_scope_start(ModuleId(0), &[]);
//! let ast = Ast::new(&arena, &interner);
//! resolver.declare_and_link_file(ast, &file, &mut NoInstantiator, &mut diagnostics);
//! resolver.module_scope_end(module);
//! assert!(diagnostics.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod instantiation;
pub mod resolver;
pub mod scope;
pub mod symbol_table;
pub mod types;

pub use config::{ConfigError, ResolverConfig};
pub use error::{Diagnoser, Diagnostic, DiagnosticCounter, Report, ResolutionError, ResolverWarning};
pub use instantiation::{
    swap_remove_instantiation, DeclInstantiations, FileRegistry, GenericInstantiator,
    InstantiationContainer, NoInstantiator, RegistryEntry, RegistrySlot,
};
pub use resolver::{Ast, Export, FilePhase, ModuleMarker, Resolver};
pub use scope::{ScopeKind, ScopeMarker};
pub use symbol_table::{ShadowChain, Shadowed, SymbolTable, TableMarker};
pub use types::{erased_signature, linkage_name, Instantiation, Signature, Ty};
