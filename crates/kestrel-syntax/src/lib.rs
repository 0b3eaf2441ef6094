//! The syntax layer of the Kestrel compiler as seen by name resolution.
//!
//! This crate provides:
//! - [`NodeArena`] and [`NodeId`]: generational storage for tree nodes
//! - [`Interner`] and [`Name`]: interned identifiers
//! - [`Node`], [`NodeKind`], [`TypeRef`]: the opaque node graph
//! - [`SourceFile`], [`FileId`], [`ModuleId`]: file and module identity
//! - [`TreeBuilder`]: programmatic construction of files
//!
//! ## Ownership
//!
//! The arena and the interner own every node and every identifier byte.
//! Downstream tables hold only `NodeId` and `Name` handles, so a file's
//! nodes must be removed from the arena only after every table entry that
//! refers to them has been torn down.

pub mod arena;
pub mod ast;
pub mod builder;
pub mod error;
pub mod file;
pub mod ids;
pub mod name;

pub use arena::{NodeArena, NodeId};
pub use ast::{Access, Node, NodeKind, TypeRef};
pub use builder::TreeBuilder;
pub use error::SyntaxError;
pub use file::SourceFile;
pub use ids::{FileId, ModuleId};
pub use name::{Interner, Name};

/// Remove every node reachable from the items of `file` from `arena`.
///
/// Used by drivers when a file is edited: the old tree is discarded after
/// resolution state for it has been invalidated.
pub fn remove_file_nodes(arena: &mut NodeArena, file: &SourceFile) -> usize {
    let mut pending = file.items.clone();
    let mut removed = 0;
    while let Some(id) = pending.pop() {
        let Some(node) = arena.remove(id) else {
            continue;
        };
        removed += 1;
        match node.kind {
            NodeKind::Function { generics, params, body, .. } => {
                pending.extend(generics);
                pending.extend(params);
                pending.extend(body);
            }
            NodeKind::Struct { generics, fields } => {
                pending.extend(generics);
                pending.extend(fields);
            }
            NodeKind::Variable { init, .. } => pending.extend(init),
            NodeKind::Block { stmts } => pending.extend(stmts),
            NodeKind::Call { args, .. } => pending.extend(args),
            NodeKind::Builtin
            | NodeKind::GenericParam
            | NodeKind::Param { .. }
            | NodeKind::Ident
            | NodeKind::Literal => {}
        }
    }
    log::debug!("removed {} nodes of {}", removed, file.id);
    removed
}
