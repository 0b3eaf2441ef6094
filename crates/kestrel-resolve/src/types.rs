//! Resolved types, signatures and linkage names.

use kestrel_syntax::{Access, FileId, Interner, ModuleId, NodeArena, NodeId, TypeRef};

/// A type reference bound to its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    /// A builtin, struct or generic parameter applied to type arguments.
    Named { decl: NodeId, args: Vec<Ty> },
    /// The reference could not be resolved; a diagnostic was reported.
    Error,
}

impl Ty {
    pub fn named(decl: NodeId) -> Self {
        Ty::Named { decl, args: Vec::new() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    /// Whether this type or any of its arguments failed to resolve.
    pub fn contains_error(&self) -> bool {
        match self {
            Ty::Named { args, .. } => args.iter().any(Ty::contains_error),
            Ty::Error => true,
        }
    }

    /// Render as source text, e.g. `List<int>`.
    pub fn display(&self, arena: &NodeArena, interner: &Interner) -> String {
        let mut out = String::new();
        self.write(arena, interner, &mut out);
        out
    }

    fn write(&self, arena: &NodeArena, interner: &Interner, out: &mut String) {
        match self {
            Ty::Error => out.push_str("{error}"),
            Ty::Named { decl, args } => {
                let name = arena
                    .get(*decl)
                    .and_then(|node| node.name)
                    .map_or("{stale}", |name| interner.lookup(name));
                out.push_str(name);
                if !args.is_empty() {
                    out.push('<');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        arg.write(arena, interner, out);
                    }
                    out.push('>');
                }
            }
        }
    }
}

/// The resolved signature of a declaration.
///
/// Functions fill `params` and `ret`; structs list their field types in
/// `params`; variables carry their declared type in `ret`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<Ty>,
    pub ret: Option<Ty>,
}

/// A concrete instantiation requested at a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instantiation {
    pub generic: NodeId,
    pub args: Vec<Ty>,
}

/// Parameter types reduced to their head names, comma separated.
///
/// Type arguments are erased, so `f(List<int>)` and `f(List<string>)`
/// share an erased signature.
pub fn erased_signature(params: &[&TypeRef], interner: &Interner) -> String {
    let mut out = String::new();
    for (i, ty) in params.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(interner.lookup(ty.name));
    }
    out
}

/// The link-level name of a declaration.
///
/// Public names are global; internal names are qualified by their module,
/// private names by their module and file. `erased` is `None` for
/// variables.
pub fn linkage_name(
    access: Access,
    module: ModuleId,
    file: FileId,
    name: &str,
    erased: Option<&str>,
) -> String {
    let prefix = match access {
        Access::Public => String::new(),
        Access::Internal => format!("{module}::"),
        Access::Private => format!("{module}::{file}::"),
    };
    match erased {
        Some(erased) => format!("{prefix}{name}({erased})"),
        None => format!("{prefix}{name}"),
    }
}
