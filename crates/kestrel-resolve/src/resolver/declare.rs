//! Top-level declaration: duplicate, overload and linkage policy.

use std::collections::hash_map::Entry;

use kestrel_syntax::{Node, NodeId, NodeKind, TypeRef};

use super::{Ast, Resolver};
use crate::error::{Diagnoser, Diagnostic, ResolutionError};
use crate::types::{erased_signature, linkage_name};

impl Resolver {
    /// Declare a top-level item, shadowing whatever was visible.
    ///
    /// With `report` set, a clash with an earlier declaration of the open
    /// module is reported unless both are functions with different
    /// parameter types; a declaration that did not clash then claims its
    /// linkage name. Builtins and imports may be shadowed silently.
    pub(super) fn declare_top_level(
        &mut self,
        ast: Ast<'_>,
        id: NodeId,
        diag: &mut dyn Diagnoser,
        report: bool,
    ) {
        let Some(node) = ast.arena.get(id) else {
            log::warn!("cannot declare stale node {id:?}");
            return;
        };
        let Some(name) = node.name else {
            return;
        };
        if self.table.declare_quiet(name, id).is_none() || !report {
            if report {
                self.claim_linkage_name(ast, id, node, diag);
            }
            return;
        }

        let decl_start = self.decl_start();
        let conflict = self
            .table
            .bindings(name)
            .skip(1)
            .take_while(|previous| previous.index >= decl_start)
            .filter_map(|previous| ast.arena.get(previous.node).map(|prev| (previous.node, prev)))
            .find(|(_, prev)| !is_overload(node, prev, ast));

        match conflict {
            Some((previous, prev)) => {
                log::debug!("duplicate `{}`: {id:?} clashes with {previous:?}", ast.text(name));
                diag.report(Diagnostic::error(
                    ResolutionError::DuplicateDefinition {
                        name: ast.text(name).to_string(),
                        span: node.span,
                        previous_span: prev.span,
                    },
                    Some(id),
                ));
            }
            None => self.claim_linkage_name(ast, id, node, diag),
        }
    }

    /// Register the linkage name of a function or variable, reporting a
    /// collision with another declaration that already owns it.
    fn claim_linkage_name(
        &mut self,
        ast: Ast<'_>,
        id: NodeId,
        node: &Node,
        diag: &mut dyn Diagnoser,
    ) {
        let Some(linkage) = self.linkage_name_of(ast, node) else {
            return;
        };
        match self.linkage.entry(linkage) {
            Entry::Occupied(entry) if *entry.get() == id => {}
            Entry::Occupied(entry) => {
                let previous_span = ast.arena.get(*entry.get()).map_or(node.span, |prev| prev.span);
                diag.report(Diagnostic::error(
                    ResolutionError::LinkageNameCollision {
                        linkage_name: entry.key().clone(),
                        span: node.span,
                        previous_span,
                    },
                    Some(id),
                ));
            }
            Entry::Vacant(entry) => {
                if let Some(state) = self.files.get_mut(&node.file) {
                    state.linkage.push(entry.key().clone());
                }
                entry.insert(id);
            }
        }
    }

    /// The link-level name of a top-level function or variable.
    pub(super) fn linkage_name_of(&self, ast: Ast<'_>, node: &Node) -> Option<String> {
        let name = ast.text(node.name?);
        let module = self.files.get(&node.file)?.module;
        let erased = match &node.kind {
            NodeKind::Function { params, .. } => {
                Some(erased_signature(&param_types(params, ast), ast.interner))
            }
            NodeKind::Variable { .. } => None,
            _ => return None,
        };
        Some(linkage_name(node.access, module, node.file, name, erased.as_deref()))
    }
}

/// Whether `node` may coexist with the earlier declaration `prev`: both
/// are functions and their parameter types differ.
fn is_overload(node: &Node, prev: &Node, ast: Ast<'_>) -> bool {
    if !node.is_function() || !prev.is_function() {
        return false;
    }
    let (ours, theirs) = (param_types(node.params(), ast), param_types(prev.params(), ast));
    ours.len() != theirs.len() || ours.iter().zip(&theirs).any(|(a, b)| !a.same_shape(b))
}

/// The declared types of parameter nodes, skipping stale handles.
fn param_types<'a>(params: &[NodeId], ast: Ast<'a>) -> Vec<&'a TypeRef> {
    params
        .iter()
        .filter_map(|&param| match &ast.arena.get(param)?.kind {
            NodeKind::Param { ty } => Some(ty),
            _ => None,
        })
        .collect()
}
