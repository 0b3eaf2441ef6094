//! The opaque node graph consumed by name resolution.
//!
//! Only what resolution needs is modelled: every node has an optional name,
//! an access specifier, the file it was parsed from and a span. The
//! [`NodeKind`] carries just enough structure to walk declarations, blocks
//! and references.

use miette::SourceSpan;

use crate::arena::NodeId;
use crate::ids::FileId;
use crate::name::Name;

/// Access specifier written on a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// Visible only inside the declaring file.
    #[default]
    Private,
    /// Visible to every file of the declaring module.
    Internal,
    /// Visible to every file and exported to dependent modules.
    Public,
}

/// A syntactic reference to a type, e.g. `List<int>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: Name,
    pub args: Vec<TypeRef>,
    pub span: SourceSpan,
}

impl TypeRef {
    pub fn new(name: Name, args: Vec<TypeRef>, span: SourceSpan) -> Self {
        Self { name, args, span }
    }

    /// Structural equality ignoring spans.
    pub fn same_shape(&self, other: &TypeRef) -> bool {
        self.name == other.name
            && self.args.len() == other.args.len()
            && self.args.iter().zip(&other.args).all(|(a, b)| a.same_shape(b))
    }
}

/// The kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A primitive type provided by the compiler.
    Builtin,
    /// A function declaration. `params` are [`NodeKind::Param`] nodes and
    /// `generics` are [`NodeKind::GenericParam`] nodes.
    Function {
        generics: Vec<NodeId>,
        params: Vec<NodeId>,
        ret: Option<TypeRef>,
        body: Option<NodeId>,
    },
    /// A global or local variable (`let`).
    Variable {
        ty: Option<TypeRef>,
        init: Option<NodeId>,
    },
    /// A struct type declaration; `fields` are [`NodeKind::Param`] nodes.
    Struct {
        generics: Vec<NodeId>,
        fields: Vec<NodeId>,
    },
    /// A generic type parameter.
    GenericParam,
    /// A function parameter or struct field.
    Param { ty: TypeRef },
    /// A `{ ... }` block.
    Block { stmts: Vec<NodeId> },
    /// An identifier expression referring to a value.
    Ident,
    /// A call `callee<generic_args>(args)`.
    Call {
        callee: Name,
        generic_args: Vec<TypeRef>,
        args: Vec<NodeId>,
    },
    /// A literal value; carries nothing resolution cares about.
    Literal,
}

/// A node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// The declared or referenced name, `None` for anonymous nodes.
    pub name: Option<Name>,
    pub access: Access,
    /// The file this node was parsed from.
    pub file: FileId,
    pub span: SourceSpan,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(
        name: Option<Name>,
        access: Access,
        file: FileId,
        span: SourceSpan,
        kind: NodeKind,
    ) -> Self {
        Self { name, access, file, span, kind }
    }

    pub fn is_function(&self) -> bool {
        matches!(self.kind, NodeKind::Function { .. })
    }

    /// Whether this node can be named in a type position.
    pub fn is_type(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Builtin | NodeKind::Struct { .. } | NodeKind::GenericParam
        )
    }

    /// Generic parameters of a function or struct; empty for everything else.
    pub fn generics(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Function { generics, .. } | NodeKind::Struct { generics, .. } => generics,
            _ => &[],
        }
    }

    /// Parameters of a function; empty for everything else.
    pub fn params(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Function { params, .. } => params,
            _ => &[],
        }
    }

    /// A short description of the node kind, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Builtin => "builtin type",
            NodeKind::Function { .. } => "function",
            NodeKind::Variable { .. } => "variable",
            NodeKind::Struct { .. } => "struct",
            NodeKind::GenericParam => "generic parameter",
            NodeKind::Param { .. } => "parameter",
            NodeKind::Block { .. } => "block",
            NodeKind::Ident => "identifier",
            NodeKind::Call { .. } => "call",
            NodeKind::Literal => "literal",
        }
    }
}
