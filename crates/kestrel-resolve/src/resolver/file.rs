//! Per-file phases and incremental invalidation.

use std::fmt;

use kestrel_syntax::{Access, FileId, SourceFile};

use super::link::Linker;
use super::{Ast, Export, FileState, Resolver};
use crate::error::Diagnoser;
use crate::instantiation::GenericInstantiator;
use crate::scope::ScopeMarker;

/// How far resolution of a file has progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FilePhase {
    #[default]
    NotDeclared,
    TopLevelDeclared,
    SignatureLinked,
    BodyLinked,
}

impl fmt::Display for FilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            FilePhase::NotDeclared => "not declared",
            FilePhase::TopLevelDeclared => "top-level declared",
            FilePhase::SignatureLinked => "signature linked",
            FilePhase::BodyLinked => "body linked",
        };
        f.write_str(phase)
    }
}

impl Resolver {
    pub fn phase(&self, file: FileId) -> FilePhase {
        self.files.get(&file).map_or(FilePhase::NotDeclared, |state| state.phase)
    }

    /// Declare the internal and public top-level items of `file` and record
    /// its private ones for linking.
    ///
    /// # Panics
    ///
    /// When the file's module is not open or the file was already declared.
    pub fn tld_declare_file(&mut self, ast: Ast<'_>, file: &SourceFile, diag: &mut dyn Diagnoser) {
        let Some(open) = self.open_module.as_mut().filter(|open| open.id == file.module) else {
            panic!("{} belongs to {}, which is not the open module", file.id, file.module);
        };
        open.files.push(file.id);
        let state = self.files.entry(file.id).or_insert_with(|| FileState::new(file.module));
        assert_eq!(
            state.phase,
            FilePhase::NotDeclared,
            "{} is already declared; invalidate it first",
            file.id
        );
        *state = FileState::new(file.module);
        self.set_current_file(file.id);
        let marker = self.table.file_scope_start();

        let mut privates = Vec::new();
        let mut generics = Vec::new();
        for &item in &file.items {
            let Some(node) = ast.arena.get(item) else {
                log::warn!("skipping stale top-level item {item:?} of {}", file.id);
                continue;
            };
            if !node.generics().is_empty() {
                generics.push(item);
            }
            match node.access {
                Access::Private => privates.push(item),
                Access::Internal => self.declare_top_level(ast, item, diag, true),
                Access::Public => {
                    self.declare_top_level(ast, item, diag, true);
                    if let Some(name) = node.name {
                        let export = Export { name, node: item, file: file.id };
                        self.exports.entry(file.module).or_default().push(export);
                    }
                }
            }
        }

        if let Some(state) = self.files.get_mut(&file.id) {
            state.marker = Some(marker);
            state.privates = privates;
            state.generics = generics;
            state.phase = FilePhase::TopLevelDeclared;
        }
        log::debug!(
            "{}: declared {} top-level items",
            file.id,
            self.table.len() - marker.index
        );
    }

    /// Resolve the parameter, return, field and variable types of `file`.
    ///
    /// # Panics
    ///
    /// When the file is not top-level declared or its module was closed.
    pub fn link_signature_file(
        &mut self,
        ast: Ast<'_>,
        file: &SourceFile,
        instantiator: &mut dyn GenericInstantiator,
        diag: &mut dyn Diagnoser,
    ) {
        self.expect_phase(file.id, FilePhase::TopLevelDeclared);
        let overlay = self.open_private_overlay(ast, file.id, diag, true);
        let mut linker = Linker::new(self, ast, file.id, instantiator, diag);
        for &item in &file.items {
            linker.link_item_signature(item);
        }
        self.table.file_scope_end(overlay);
        self.set_phase(file.id, FilePhase::SignatureLinked);
        log::debug!("{}: signatures linked", file.id);
    }

    /// Resolve every reference in the bodies and initialisers of `file`.
    ///
    /// # Panics
    ///
    /// When the file's signatures are not linked or its module was closed.
    pub fn link_file(
        &mut self,
        ast: Ast<'_>,
        file: &SourceFile,
        instantiator: &mut dyn GenericInstantiator,
        diag: &mut dyn Diagnoser,
    ) {
        self.expect_phase(file.id, FilePhase::SignatureLinked);
        let overlay = self.open_private_overlay(ast, file.id, diag, false);
        let mut linker = Linker::new(self, ast, file.id, instantiator, diag);
        for &item in &file.items {
            linker.link_item_body(item);
        }
        self.table.file_scope_end(overlay);
        self.set_phase(file.id, FilePhase::BodyLinked);
        log::debug!("{}: bodies linked", file.id);
    }

    /// Run all three phases for `file`.
    ///
    /// Files that reference each other must all be top-level declared
    /// before either is linked; this is for files that stand alone.
    pub fn declare_and_link_file(
        &mut self,
        ast: Ast<'_>,
        file: &SourceFile,
        instantiator: &mut dyn GenericInstantiator,
        diag: &mut dyn Diagnoser,
    ) {
        self.tld_declare_file(ast, file, diag);
        self.link_signature_file(ast, file, instantiator, diag);
        self.link_file(ast, file, instantiator, diag);
    }

    /// Forget the links of `file` so its signatures and bodies can be
    /// linked again, keeping its top-level declarations.
    ///
    /// Used to re-link a file after a file it depends on changed.
    pub fn unlink_file(&mut self, file: FileId) {
        let Some(state) = self.files.get_mut(&file) else {
            return;
        };
        if state.phase <= FilePhase::TopLevelDeclared {
            return;
        }
        for node in state.recorded.drain(..) {
            self.references.remove(&node);
            self.signatures.remove(&node);
            self.call_instantiations.remove(&node);
        }
        state.phase = FilePhase::TopLevelDeclared;
        self.instantiations.remove_instantiations_for_file(file);
        log::debug!("{file}: links dropped");
    }

    /// Discard everything resolved for `file` ahead of re-declaring it.
    ///
    /// Removes the file's instantiations, linkage names, exports and
    /// recorded links, and truncates the symbol table at the file's marker.
    /// Files of the same module declared after it lose their declarations
    /// too. Returns every file that must be top-level declared again, in
    /// declaration order, starting with `file`; empty for unknown files.
    pub fn invalidate_file(&mut self, file: FileId) -> Vec<FileId> {
        let Some(state) = self.files.get(&file) else {
            return Vec::new();
        };
        let (module, marker) = (state.module, state.marker);

        let mut reset = vec![file];
        if let (Some(open), Some(marker)) = (self.open_module.as_mut(), marker) {
            if open.id == module {
                if let Some(position) = open.files.iter().position(|&f| f == file) {
                    reset = open.files.split_off(position);
                }
                self.table.drop_all_scopes_from(marker.table_marker());
            }
        }
        for &file in &reset {
            self.release_file(file);
        }
        if self.current_file.is_some_and(|current| reset.contains(&current)) {
            self.current_file = None;
        }
        log::debug!("invalidated {file}; {} files need re-declaration", reset.len());
        reset
    }

    /// Drop the instantiations, linkage names, exports and links owned by
    /// `file`, leaving it `NotDeclared`.
    pub(super) fn release_file(&mut self, file: FileId) {
        let Some(state) = self.files.get_mut(&file) else {
            return;
        };
        self.instantiations.remove_instantiations_for_file(file);
        for generic in state.generics.drain(..) {
            self.instantiations.remove_instantiations_for_decl(generic);
        }
        for name in state.linkage.drain(..) {
            self.linkage.remove(&name);
        }
        for node in state.recorded.drain(..) {
            self.references.remove(&node);
            self.signatures.remove(&node);
            self.call_instantiations.remove(&node);
        }
        if let Some(exports) = self.exports.get_mut(&state.module) {
            exports.retain(|export| export.file != file);
        }
        state.privates.clear();
        state.marker = None;
        state.phase = FilePhase::NotDeclared;
    }

    /// Open the File scope holding the private items of `file` while it is
    /// linked. Duplicates among them are reported when `report` is set.
    fn open_private_overlay(
        &mut self,
        ast: Ast<'_>,
        file: FileId,
        diag: &mut dyn Diagnoser,
        report: bool,
    ) -> ScopeMarker {
        self.set_current_file(file);
        let overlay = self.table.file_scope_start();
        let privates =
            self.files.get(&file).map(|state| state.privates.clone()).unwrap_or_default();
        for item in privates {
            self.declare_top_level(ast, item, diag, report);
        }
        overlay
    }

    fn expect_phase(&self, file: FileId, expected: FilePhase) {
        let Some(state) = self.files.get(&file) else {
            panic!("{file} was never declared");
        };
        assert_eq!(state.phase, expected, "{file} is {}, expected {expected}", state.phase);
        assert!(
            state.marker.is_some(),
            "{file} cannot be linked after its module was closed"
        );
    }

    fn set_phase(&mut self, file: FileId, phase: FilePhase) {
        if let Some(state) = self.files.get_mut(&file) {
            state.phase = phase;
        }
    }
}
