//! Generic instantiations, tracked per declaration and per file.
//!
//! Each generic declaration owns three parallel lists: the type-argument
//! tuples it was instantiated with, the handles of the implementations the
//! instantiator produced for them, and where in the file registries each
//! instantiation was recorded. The file registry lists, per file, every
//! instantiation that file relies on: the ones it caused and the ones it
//! reused after another file caused them. Invalidating a file walks its
//! registry backwards and releases the file's use of each instantiation.
//! Once no file uses an instantiation it is swap-removed, and the registry
//! entries of whichever instantiation got moved into the hole are
//! rewritten.

use fxhash::FxHashMap;
use kestrel_syntax::{FileId, NodeId};

use crate::types::Ty;

/// Produces implementations for concrete instantiations of generics.
///
/// Returning `None` means no implementation exists; nothing is registered.
pub trait GenericInstantiator {
    fn instantiate(&mut self, generic: NodeId, args: &[Ty]) -> Option<NodeId>;
}

impl<F> GenericInstantiator for F
where
    F: FnMut(NodeId, &[Ty]) -> Option<NodeId>,
{
    fn instantiate(&mut self, generic: NodeId, args: &[Ty]) -> Option<NodeId> {
        self(generic, args)
    }
}

/// An instantiator that never produces implementations.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstantiator;

impl GenericInstantiator for NoInstantiator {
    fn instantiate(&mut self, _generic: NodeId, _args: &[Ty]) -> Option<NodeId> {
        None
    }
}

/// One instantiation recorded in a file's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub decl: NodeId,
    /// Position in the declaration's instantiation lists.
    pub type_index: usize,
}

/// Where an instantiation's [`RegistryEntry`] lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrySlot {
    pub file: FileId,
    pub position: usize,
}

/// Per-file registries; `None` marks an entry whose declaration was dropped.
pub type FileRegistry = FxHashMap<FileId, Vec<Option<RegistryEntry>>>;

/// The instantiations of one generic declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclInstantiations<T> {
    pub types: Vec<T>,
    pub impls: Vec<NodeId>,
    /// Per instantiation, the registry entry of every file using it; the
    /// file that caused it comes first.
    pub registry_positions: Vec<Vec<RegistrySlot>>,
}

impl<T> Default for DeclInstantiations<T> {
    fn default() -> Self {
        Self { types: Vec::new(), impls: Vec::new(), registry_positions: Vec::new() }
    }
}

impl<T> DeclInstantiations<T> {
    pub fn len(&self) -> usize {
        self.assert_parallel();
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn assert_parallel(&self) {
        assert!(
            self.types.len() == self.impls.len()
                && self.types.len() == self.registry_positions.len(),
            "instantiation lists out of sync: {} types, {} impls, {} registry slots",
            self.types.len(),
            self.impls.len(),
            self.registry_positions.len()
        );
    }
}

/// Remove instantiation `index` of `decl` by moving the last one into its
/// place, then repoint the moved instantiation's registry entries. Entries
/// still naming the removed instantiation are the caller's to drop.
///
/// # Panics
///
/// When the lists are out of sync, `index` is out of bounds, or one of the
/// moved instantiation's registry entries does not describe it.
pub fn swap_remove_instantiation<T>(
    decl: NodeId,
    insts: &mut DeclInstantiations<T>,
    registries: &mut FileRegistry,
    index: usize,
) {
    insts.assert_parallel();
    assert!(index < insts.types.len(), "instantiation {index} of {decl:?} does not exist");
    let last = insts.types.len() - 1;
    if index != last {
        insts.types.swap(index, last);
        insts.impls.swap(index, last);
        insts.registry_positions.swap(index, last);

        for &slot in &insts.registry_positions[index] {
            let entry = registries
                .get_mut(&slot.file)
                .and_then(|registry| registry.get_mut(slot.position))
                .and_then(Option::as_mut);
            match entry {
                Some(entry) => {
                    assert!(
                        entry.decl == decl && entry.type_index == last,
                        "registry entry {slot:?} does not describe instantiation {last} of {decl:?}"
                    );
                    entry.type_index = index;
                }
                None => {
                    panic!("instantiation {last} of {decl:?} has no registry entry at {slot:?}")
                }
            }
        }
    }
    insts.types.pop();
    insts.impls.pop();
    insts.registry_positions.pop();
}

#[derive(Debug, Clone)]
pub struct InstantiationContainer<T> {
    decls: FxHashMap<NodeId, DeclInstantiations<T>>,
    registry: FileRegistry,
    current_file: Option<FileId>,
}

impl<T> Default for InstantiationContainer<T> {
    fn default() -> Self {
        Self { decls: FxHashMap::default(), registry: FxHashMap::default(), current_file: None }
    }
}

impl<T> InstantiationContainer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute subsequent registrations to `file`.
    pub fn set_current_file(&mut self, file: FileId) {
        self.current_file = Some(file);
    }

    pub fn current_file(&self) -> Option<FileId> {
        self.current_file
    }

    /// Record that `decl` was instantiated with `types`, implemented by
    /// `impl_node`, and return the instantiation's index.
    ///
    /// The container does not compare `types` against existing
    /// instantiations; callers check [`Self::instantiation_types_for`] first.
    ///
    /// # Panics
    ///
    /// When no current file is set.
    pub fn register_instantiation(&mut self, decl: NodeId, types: T, impl_node: NodeId) -> usize {
        let Some(file) = self.current_file else {
            panic!("instantiation of {decl:?} registered without a current file");
        };
        let index = self.instantiation_count(decl);
        let entry = RegistryEntry { decl, type_index: index };
        let slot = record_entry(&mut self.registry, file, entry);
        let insts = self.decls.entry(decl).or_default();
        insts.types.push(types);
        insts.impls.push(impl_node);
        insts.registry_positions.push(vec![slot]);
        index
    }

    /// Record that the current file relies on instantiation `index` of
    /// `decl` as well, keeping it alive until every file using it is
    /// invalidated. Returns `false` when the file already uses it.
    ///
    /// # Panics
    ///
    /// When no current file is set or the instantiation does not exist.
    pub fn add_use(&mut self, decl: NodeId, index: usize) -> bool {
        let Some(file) = self.current_file else {
            panic!("use of {decl:?} recorded without a current file");
        };
        let slots = self.decls.get(&decl).and_then(|insts| insts.registry_positions.get(index));
        let Some(slots) = slots else {
            panic!("instantiation {index} of {decl:?} does not exist");
        };
        if slots.iter().any(|slot| slot.file == file) {
            return false;
        }
        let entry = RegistryEntry { decl, type_index: index };
        let slot = record_entry(&mut self.registry, file, entry);
        if let Some(insts) = self.decls.get_mut(&decl) {
            insts.registry_positions[index].push(slot);
        }
        true
    }

    /// Files using instantiation `index` of `decl`, starting with the one
    /// that caused it.
    pub fn instantiation_users(
        &self,
        decl: NodeId,
        index: usize,
    ) -> impl Iterator<Item = FileId> + '_ {
        self.decls
            .get(&decl)
            .and_then(|insts| insts.registry_positions.get(index))
            .into_iter()
            .flatten()
            .map(|slot| slot.file)
    }

    pub fn instantiation_types_for(&self, decl: NodeId) -> &[T] {
        self.decls.get(&decl).map(|insts| insts.types.as_slice()).unwrap_or_default()
    }

    pub fn instantiation_impls_for(&self, decl: NodeId) -> &[NodeId] {
        self.decls.get(&decl).map(|insts| insts.impls.as_slice()).unwrap_or_default()
    }

    pub fn instantiation_count(&self, decl: NodeId) -> usize {
        self.decls.get(&decl).map_or(0, DeclInstantiations::len)
    }

    /// Declarations with at least one instantiation.
    pub fn decls(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.decls.keys().copied()
    }

    /// Number of registry entries recorded for `file`, tombstones included.
    pub fn registry_len(&self, file: FileId) -> usize {
        self.registry.get(&file).map_or(0, Vec::len)
    }

    /// Drop every instantiation of `decl`.
    pub fn remove_instantiations_for_decl(&mut self, decl: NodeId) {
        let Some(insts) = self.decls.remove(&decl) else {
            return;
        };
        insts.assert_parallel();
        for slot in insts.registry_positions.into_iter().flatten() {
            let registry = self.registry.get_mut(&slot.file);
            if let Some(entry) = registry.and_then(|registry| registry.get_mut(slot.position)) {
                *entry = None;
            }
        }
    }

    /// Release every instantiation `file` uses, dropping the ones no other
    /// file uses. Unknown files are ignored.
    ///
    /// # Panics
    ///
    /// When a registry entry of `file` is not recorded on the instantiation
    /// it names.
    pub fn remove_instantiations_for_file(&mut self, file: FileId) {
        let Some(len) = self.registry.get(&file).map(Vec::len) else {
            return;
        };
        let (mut removed, mut shared) = (0, 0);
        for position in (0..len).rev() {
            let entry = self.registry.get_mut(&file).and_then(Vec::pop).flatten();
            let Some(entry) = entry else {
                continue;
            };
            let Some(insts) = self.decls.get_mut(&entry.decl) else {
                continue;
            };
            let slot = RegistrySlot { file, position };
            let slots = &mut insts.registry_positions[entry.type_index];
            let Some(at) = slots.iter().position(|&known| known == slot) else {
                panic!(
                    "registry entry {slot:?} is not recorded on instantiation {} of {:?}",
                    entry.type_index, entry.decl
                );
            };
            slots.remove(at);
            if !slots.is_empty() {
                shared += 1;
                continue;
            }
            swap_remove_instantiation(entry.decl, insts, &mut self.registry, entry.type_index);
            if insts.is_empty() {
                self.decls.remove(&entry.decl);
            }
            removed += 1;
        }
        self.registry.remove(&file);
        log::debug!("removed {removed} instantiations of {file}, {shared} more are still in use");
    }

    pub fn clear(&mut self) {
        self.decls.clear();
        self.registry.clear();
        self.current_file = None;
    }
}

fn record_entry(registry: &mut FileRegistry, file: FileId, entry: RegistryEntry) -> RegistrySlot {
    let entries = registry.entry(file).or_default();
    entries.push(Some(entry));
    RegistrySlot { file, position: entries.len() - 1 }
}
