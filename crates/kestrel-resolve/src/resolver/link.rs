//! Signature and body linking.

use kestrel_syntax::{FileId, Name, Node, NodeId, NodeKind, TypeRef};
use miette::SourceSpan;

use super::{Ast, Resolver};
use crate::error::{Diagnoser, Diagnostic, ResolutionError, ResolverWarning};
use crate::instantiation::GenericInstantiator;
use crate::types::{Instantiation, Signature, Ty};

/// Links one file: walks its items with the resolver and both
/// collaborators at hand.
pub(super) struct Linker<'r, 'a> {
    resolver: &'r mut Resolver,
    ast: Ast<'a>,
    file: FileId,
    instantiator: &'r mut dyn GenericInstantiator,
    diag: &'r mut dyn Diagnoser,
}

impl<'r, 'a> Linker<'r, 'a> {
    pub(super) fn new(
        resolver: &'r mut Resolver,
        ast: Ast<'a>,
        file: FileId,
        instantiator: &'r mut dyn GenericInstantiator,
        diag: &'r mut dyn Diagnoser,
    ) -> Self {
        Self { resolver, ast, file, instantiator, diag }
    }

    pub(super) fn link_item_signature(&mut self, item: NodeId) {
        let Some(node) = self.ast.arena.get(item) else {
            log::warn!("skipping stale item {item:?} of {}", self.file);
            return;
        };
        self.link_signature(item, node);
    }

    pub(super) fn link_item_body(&mut self, item: NodeId) {
        let Some(node) = self.ast.arena.get(item) else {
            log::warn!("skipping stale item {item:?} of {}", self.file);
            return;
        };
        match &node.kind {
            NodeKind::Function { .. } => self.link_function_body(node),
            NodeKind::Variable { init: Some(init), .. } => self.link_node(*init),
            _ => {}
        }
    }

    /// Resolve the types a declaration mentions outside its body.
    fn link_signature(&mut self, id: NodeId, node: &'a Node) {
        let signature = match &node.kind {
            NodeKind::Function { generics, params, ret, .. } => {
                self.resolver.table.scope_start();
                self.declare_generics(generics);
                let params = params.iter().map(|&param| self.param_type(param)).collect();
                let ret = ret.as_ref().map(|ret| self.resolve_type(ret));
                self.resolver.table.scope_end();
                Signature { params, ret }
            }
            NodeKind::Struct { generics, fields } => {
                self.resolver.table.scope_start();
                self.declare_generics(generics);
                let params = fields.iter().map(|&field| self.param_type(field)).collect();
                self.resolver.table.scope_end();
                Signature { params, ret: None }
            }
            NodeKind::Variable { ty: Some(ty), .. } => {
                Signature { params: Vec::new(), ret: Some(self.resolve_type(ty)) }
            }
            _ => return,
        };
        self.resolver.signatures.insert(id, signature);
        self.record(id);
    }

    fn declare_generics(&mut self, generics: &[NodeId]) {
        for &generic in generics {
            if let Some(name) = self.ast.arena.get(generic).and_then(|node| node.name) {
                self.resolver.table.declare(name, generic);
            }
        }
    }

    fn param_type(&mut self, param: NodeId) -> Ty {
        match self.ast.arena.get(param).map(|node| &node.kind) {
            Some(NodeKind::Param { ty }) => self.resolve_type(ty),
            _ => Ty::Error,
        }
    }

    /// A function body is one Default scope holding the generics and
    /// parameters; the body block nests inside it.
    fn link_function_body(&mut self, node: &'a Node) {
        let NodeKind::Function { generics, params, body: Some(body), .. } = &node.kind else {
            return;
        };
        self.resolver.table.scope_start();
        self.declare_generics(generics);
        for &param in params {
            if let Some(name) = self.ast.arena.get(param).and_then(|param| param.name) {
                self.resolver.table.declare(name, param);
            }
        }
        self.link_node(*body);
        self.resolver.table.scope_end();
    }

    fn link_node(&mut self, id: NodeId) {
        let Some(node) = self.ast.arena.get(id) else {
            log::warn!("skipping stale node {id:?} of {}", self.file);
            return;
        };
        match &node.kind {
            NodeKind::Block { stmts } => {
                self.resolver.table.scope_start();
                for &stmt in stmts {
                    self.link_node(stmt);
                }
                self.resolver.table.scope_end();
            }
            NodeKind::Variable { ty, init } => {
                if let Some(init) = init {
                    self.link_node(*init);
                }
                if ty.is_some() {
                    self.link_signature(id, node);
                }
                self.declare_local(id, node);
            }
            NodeKind::Function { .. } => {
                self.declare_local(id, node);
                self.link_signature(id, node);
                self.link_function_body(node);
            }
            NodeKind::Struct { .. } => {
                self.declare_local(id, node);
                self.link_signature(id, node);
            }
            NodeKind::Ident => {
                if let Some(name) = node.name {
                    if let Some(decl) = self.lookup(name, node.span, Some(id)) {
                        self.resolver.references.insert(id, decl);
                        self.record(id);
                    }
                }
            }
            NodeKind::Call { callee, generic_args, args } => {
                for &arg in args {
                    self.link_node(arg);
                }
                self.link_call(id, node, *callee, generic_args, args.len());
            }
            NodeKind::Builtin
            | NodeKind::GenericParam
            | NodeKind::Param { .. }
            | NodeKind::Literal => {}
        }
    }

    fn declare_local(&mut self, id: NodeId, node: &'a Node) {
        let Some(name) = node.name else {
            return;
        };
        let shadowed = self.resolver.table.declare_quiet(name, id);
        if !self.resolver.config.warn_on_shadowing {
            return;
        }
        if let Some(original) = shadowed.and_then(|shadowed| self.ast.arena.get(shadowed.node)) {
            self.diag.report(Diagnostic::warning(
                ResolverWarning::ShadowedVariable {
                    name: self.ast.text(name).to_string(),
                    original_span: original.span,
                    shadow_span: node.span,
                },
                Some(id),
            ));
        }
    }

    /// Bind a call to the newest visible overload taking `arity` arguments.
    fn link_call(
        &mut self,
        id: NodeId,
        node: &'a Node,
        callee: Name,
        generic_args: &'a [TypeRef],
        arity: usize,
    ) {
        let candidates = self.resolver.find_overloads(self.ast, callee);
        if candidates.is_empty() {
            // Not a function: a callable value, or nothing at all.
            if let Some(decl) = self.lookup(callee, node.span, Some(id)) {
                self.resolver.references.insert(id, decl);
                self.record(id);
            }
            return;
        }

        let arena = self.ast.arena;
        let chosen = candidates
            .iter()
            .copied()
            .find(|&candidate| arena.get(candidate).is_some_and(|f| f.params().len() == arity));
        let Some(function) = chosen else {
            self.diag.report(Diagnostic::error(
                ResolutionError::NoMatchingOverload {
                    name: self.ast.text(callee).to_string(),
                    found: arity,
                    candidates: candidates.len(),
                    span: node.span,
                },
                Some(id),
            ));
            return;
        };
        self.resolver.references.insert(id, function);
        self.record(id);

        if generic_args.is_empty() {
            return;
        }
        let args: Vec<Ty> = generic_args.iter().map(|arg| self.resolve_type(arg)).collect();
        let expected = arena.get(function).map_or(0, |f| f.generics().len());
        if expected != args.len() {
            self.report_arity(callee, expected, args.len(), node.span, Some(id));
            return;
        }
        if self.instantiate(function, &args) {
            self.resolver
                .call_instantiations
                .insert(id, Instantiation { generic: function, args });
        }
    }

    /// Bind a type reference, instantiating generic structs it applies.
    fn resolve_type(&mut self, ty: &TypeRef) -> Ty {
        let Some(decl) = self.lookup(ty.name, ty.span, None) else {
            return Ty::Error;
        };
        let Some(node) = self.ast.arena.get(decl) else {
            return Ty::Error;
        };
        if !node.is_type() {
            self.diag.report(Diagnostic::error(
                ResolutionError::NotAType {
                    name: self.ast.text(ty.name).to_string(),
                    kind: node.kind_name().to_string(),
                    span: ty.span,
                },
                None,
            ));
            return Ty::Error;
        }

        let args: Vec<Ty> = ty.args.iter().map(|arg| self.resolve_type(arg)).collect();
        let expected = node.generics().len();
        if expected != args.len() {
            self.report_arity(ty.name, expected, args.len(), ty.span, None);
            return Ty::Error;
        }
        if !args.is_empty() {
            self.instantiate(decl, &args);
        }
        Ty::Named { decl, args }
    }

    /// Make sure `generic` has an instantiation for `args`. Returns whether
    /// one exists afterwards.
    ///
    /// Arguments that failed to resolve or that mention generic parameters
    /// are not concrete, so nothing is instantiated for them.
    fn instantiate(&mut self, generic: NodeId, args: &[Ty]) -> bool {
        if !args.iter().all(|arg| self.is_concrete(arg)) {
            return false;
        }
        let instantiations = &mut self.resolver.instantiations;
        let existing = instantiations.instantiation_types_for(generic);
        if let Some(index) = existing.iter().position(|known| known == args) {
            if instantiations.add_use(generic, index) {
                log::trace!("{} reuses {generic:?} #{index}", self.file);
            }
            return true;
        }
        match self.instantiator.instantiate(generic, args) {
            Some(implementation) => {
                let index =
                    instantiations.register_instantiation(generic, args.to_vec(), implementation);
                log::trace!("instantiated {generic:?} #{index} for {}", self.file);
                true
            }
            None => false,
        }
    }

    fn is_concrete(&self, ty: &Ty) -> bool {
        match ty {
            Ty::Error => false,
            Ty::Named { decl, args } => {
                let generic_param = self
                    .ast
                    .arena
                    .get(*decl)
                    .map_or(true, |node| matches!(node.kind, NodeKind::GenericParam));
                !generic_param && args.iter().all(|arg| self.is_concrete(arg))
            }
        }
    }

    /// Resolve `name` for a reference at `span`, reporting misses.
    fn lookup(&mut self, name: Name, span: SourceSpan, site: Option<NodeId>) -> Option<NodeId> {
        match self.resolver.find(name) {
            Some(decl) if self.ast.arena.contains(decl) => Some(decl),
            Some(decl) => {
                log::warn!("`{}` resolves to stale node {decl:?}", self.ast.text(name));
                self.diag.report(Diagnostic::error(
                    ResolutionError::StaleSymbol { name: self.ast.text(name).to_string(), span },
                    site,
                ));
                None
            }
            None => {
                let help = self.private_hint(name);
                self.diag.report(Diagnostic::error(
                    ResolutionError::NameNotFound {
                        name: self.ast.text(name).to_string(),
                        span,
                        help,
                    },
                    site,
                ));
                None
            }
        }
    }

    /// Point at a private declaration of another file of the module, if
    /// that is what the missing name refers to.
    fn private_hint(&self, name: Name) -> Option<String> {
        let module = self.resolver.files.get(&self.file)?.module;
        self.resolver
            .files
            .iter()
            .filter(|&(&file, state)| file != self.file && state.module == module)
            .filter(|(_, state)| {
                state.privates.iter().any(|&item| {
                    self.ast.arena.get(item).is_some_and(|node| node.name == Some(name))
                })
            })
            .map(|(&file, _)| file)
            .min()
            .map(|file| format!("`{}` is private to {file}", self.ast.text(name)))
    }

    fn report_arity(
        &mut self,
        name: Name,
        expected: usize,
        found: usize,
        span: SourceSpan,
        site: Option<NodeId>,
    ) {
        self.diag.report(Diagnostic::error(
            ResolutionError::GenericArityMismatch {
                name: self.ast.text(name).to_string(),
                expected,
                found,
                span,
            },
            site,
        ));
    }

    fn record(&mut self, node: NodeId) {
        if let Some(state) = self.resolver.files.get_mut(&self.file) {
            state.recorded.push(node);
        }
    }
}
