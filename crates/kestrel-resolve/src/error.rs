use std::fmt;

use kestrel_syntax::NodeId;
use miette::{Diagnostic as MietteDiagnostic, Severity, SourceSpan};
use thiserror::Error;

/// Recoverable errors found during name resolution.
///
/// None of these stop resolution: they are handed to the [`Diagnoser`] and
/// the resolver carries on with the best binding it has.
#[derive(Debug, Error, MietteDiagnostic, Clone, Hash, PartialEq, Eq)]
pub enum ResolutionError {
    /// A referenced name is not visible from the reference site.
    #[error("Name not found: Could not find `{name}` in the current scope")]
    #[diagnostic(code(kestrel_resolve::name_not_found))]
    NameNotFound {
        /// The name that could not be found.
        name: String,
        #[label("referenced here")]
        span: SourceSpan,
        #[help]
        /// Optional hint, e.g. that a private declaration of another file exists.
        help: Option<String>,
    },

    /// The same name is declared twice where the second declaration is neither
    /// a valid overload nor allowed to shadow.
    #[error("Duplicate definition: `{name}` is defined multiple times")]
    #[diagnostic(code(kestrel_resolve::duplicate_definition))]
    DuplicateDefinition {
        name: String,
        #[label("current definition here")]
        span: SourceSpan,
        #[label("previously defined here")]
        previous_span: SourceSpan,
    },

    /// Two declarations map to the same link-level name, even though they may
    /// be distinguishable in source.
    #[error("Linkage name collision: `{linkage_name}` is already taken")]
    #[diagnostic(
        code(kestrel_resolve::linkage_collision),
        help("overloads must differ in more than their type arguments")
    )]
    LinkageNameCollision {
        linkage_name: String,
        #[label("this declaration")]
        span: SourceSpan,
        #[label("collides with this one")]
        previous_span: SourceSpan,
    },

    /// A call names an overload set but no candidate accepts the argument count.
    #[error("No matching overload: no `{name}` takes {found} argument(s)")]
    #[diagnostic(code(kestrel_resolve::no_matching_overload))]
    NoMatchingOverload {
        name: String,
        /// Number of arguments at the call site.
        found: usize,
        /// Number of candidates that were considered.
        candidates: usize,
        #[label("called here")]
        span: SourceSpan,
    },

    /// A name used in a type position resolves to something that is not a type.
    #[error("Not a type: `{name}` is a {kind}")]
    #[diagnostic(code(kestrel_resolve::not_a_type))]
    NotAType {
        name: String,
        kind: String,
        #[label("used as a type here")]
        span: SourceSpan,
    },

    /// Wrong number of generic arguments for a type or function.
    #[error("Generic arity mismatch: `{name}` takes {expected} type argument(s), found {found}")]
    #[diagnostic(code(kestrel_resolve::generic_arity_mismatch))]
    GenericArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        #[label("instantiated here")]
        span: SourceSpan,
    },

    /// A symbol refers to a node that no longer exists in the tree.
    #[error("Stale symbol: `{name}` refers to a declaration that was removed")]
    #[diagnostic(
        code(kestrel_resolve::stale_symbol),
        help("the declaring file was edited without being invalidated first")
    )]
    StaleSymbol {
        name: String,
        #[label("referenced here")]
        span: SourceSpan,
    },
}

/// Non-fatal warnings detected during name resolution.
#[derive(Debug, Error, MietteDiagnostic, Clone, Hash, PartialEq, Eq)]
pub enum ResolverWarning {
    /// A local declaration shadows a binding of an enclosing scope.
    #[error("Shadowed variable: `{name}` shadows a previous definition")]
    #[diagnostic(code(kestrel_resolve::shadowed_variable))]
    ShadowedVariable {
        name: String,
        #[label("original definition")]
        original_span: SourceSpan,
        #[label("shadowing definition")]
        shadow_span: SourceSpan,
    },
}

/// Either kind of report carried by a [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Error(ResolutionError),
    Warning(ResolverWarning),
}

impl Report {
    fn as_diagnostic(&self) -> &dyn MietteDiagnostic {
        match self {
            Report::Error(err) => err,
            Report::Warning(warning) => warning,
        }
    }
}

/// A report together with the node it is about and its severity.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub report: Report,
    /// The offending node, when the report is about a specific node.
    pub node: Option<NodeId>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(error: ResolutionError, node: Option<NodeId>) -> Self {
        Self { report: Report::Error(error), node, severity: Severity::Error }
    }

    pub fn warning(warning: ResolverWarning, node: Option<NodeId>) -> Self {
        Self { report: Report::Warning(warning), node, severity: Severity::Warning }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// The diagnostic code, e.g. `kestrel_resolve::name_not_found`.
    pub fn code(&self) -> String {
        self.report.as_diagnostic().code().map(|code| code.to_string()).unwrap_or_default()
    }

    /// One-line rendering: severity, code and message.
    pub fn summary(&self) -> String {
        format!("{:?} [{}] {}", self.severity, self.code(), self)
    }

    /// View as a miette diagnostic, for rendering with a report handler.
    pub fn as_miette(&self) -> &dyn MietteDiagnostic {
        self.report.as_diagnostic()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.report {
            Report::Error(err) => fmt::Display::fmt(err, f),
            Report::Warning(warning) => fmt::Display::fmt(warning, f),
        }
    }
}

/// Sink for diagnostics produced during resolution.
///
/// The resolver never formats or displays anything itself; the embedding
/// compiler decides how reports are rendered.
pub trait Diagnoser {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl Diagnoser for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Counts errors and warnings without keeping them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiagnosticCounter {
    pub errors: usize,
    pub warnings: usize,
}

impl Diagnoser for DiagnosticCounter {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.errors += 1;
        } else {
            self.warnings += 1;
        }
    }
}
