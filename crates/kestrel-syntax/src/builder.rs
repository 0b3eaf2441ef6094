//! Programmatic construction of source files.
//!
//! `TreeBuilder` allocates nodes straight into a [`NodeArena`], handing out
//! monotonically increasing spans so diagnostics stay distinguishable. It is
//! what drivers and tests use in place of the parser.

use miette::SourceSpan;

use crate::arena::{NodeArena, NodeId};
use crate::ast::{Access, Node, NodeKind, TypeRef};
use crate::file::SourceFile;
use crate::ids::{FileId, ModuleId};
use crate::name::Interner;

/// Builds the nodes of one source file.
pub struct TreeBuilder<'a> {
    arena: &'a mut NodeArena,
    interner: &'a mut Interner,
    file: SourceFile,
    offset: usize,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        arena: &'a mut NodeArena,
        interner: &'a mut Interner,
        file: FileId,
        module: ModuleId,
    ) -> Self {
        Self { arena, interner, file: SourceFile::new(file, module), offset: 0 }
    }

    fn span(&mut self, len: usize) -> SourceSpan {
        let span = SourceSpan::from((self.offset, len.max(1)));
        self.offset += len.max(1) + 1;
        span
    }

    fn named(&mut self, name: &str, access: Access, kind: NodeKind) -> NodeId {
        let span = self.span(name.len());
        let name = self.interner.intern(name);
        self.arena.alloc(Node::new(Some(name), access, self.file.id, span, kind))
    }

    fn anonymous(&mut self, kind: NodeKind) -> NodeId {
        let span = self.span(1);
        self.arena.alloc(Node::new(None, Access::Private, self.file.id, span, kind))
    }

    /// A type reference `name<args>`.
    pub fn ty(&mut self, name: &str, args: Vec<TypeRef>) -> TypeRef {
        let span = self.span(name.len());
        TypeRef::new(self.interner.intern(name), args, span)
    }

    pub fn generic(&mut self, name: &str) -> NodeId {
        self.named(name, Access::Private, NodeKind::GenericParam)
    }

    /// A function parameter or struct field.
    pub fn param(&mut self, name: &str, ty: TypeRef) -> NodeId {
        self.named(name, Access::Private, NodeKind::Param { ty })
    }

    pub fn function(
        &mut self,
        name: &str,
        access: Access,
        generics: Vec<NodeId>,
        params: Vec<NodeId>,
        ret: Option<TypeRef>,
        body: Option<NodeId>,
    ) -> NodeId {
        self.named(name, access, NodeKind::Function { generics, params, ret, body })
    }

    pub fn structure(
        &mut self,
        name: &str,
        access: Access,
        generics: Vec<NodeId>,
        fields: Vec<NodeId>,
    ) -> NodeId {
        self.named(name, access, NodeKind::Struct { generics, fields })
    }

    /// A variable; top-level when added with [`TreeBuilder::item`], a local
    /// `let` when placed inside a block.
    pub fn variable(
        &mut self,
        name: &str,
        access: Access,
        ty: Option<TypeRef>,
        init: Option<NodeId>,
    ) -> NodeId {
        self.named(name, access, NodeKind::Variable { ty, init })
    }

    pub fn block(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.anonymous(NodeKind::Block { stmts })
    }

    pub fn ident(&mut self, name: &str) -> NodeId {
        self.named(name, Access::Private, NodeKind::Ident)
    }

    pub fn call(&mut self, callee: &str, generic_args: Vec<TypeRef>, args: Vec<NodeId>) -> NodeId {
        let callee_name = self.interner.intern(callee);
        let kind = NodeKind::Call { callee: callee_name, generic_args, args };
        self.named(callee, Access::Private, kind)
    }

    pub fn literal(&mut self) -> NodeId {
        self.anonymous(NodeKind::Literal)
    }

    /// Append `node` to the file's top-level items.
    pub fn item(&mut self, node: NodeId) -> &mut Self {
        self.file.items.push(node);
        self
    }

    pub fn finish(self) -> SourceFile {
        self.file
    }
}
