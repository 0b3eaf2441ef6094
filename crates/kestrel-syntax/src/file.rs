use crate::arena::NodeId;
use crate::ids::{FileId, ModuleId};

/// A parsed source file: its identity, owning module and top-level items.
///
/// The nodes themselves live in a [`NodeArena`](crate::NodeArena); a file
/// only lists the handles of its top-level declarations in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub id: FileId,
    pub module: ModuleId,
    pub items: Vec<NodeId>,
}

impl SourceFile {
    pub fn new(id: FileId, module: ModuleId) -> Self {
        Self { id, module, items: Vec::new() }
    }
}
