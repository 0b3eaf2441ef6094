//! Shared harness: an arena, an interner and a resolver wired together.

use kestrel_resolve::{Ast, Diagnostic, GenericInstantiator, Resolver, ResolverConfig, Ty};
use kestrel_syntax::{FileId, Interner, ModuleId, Name, NodeArena, NodeId, SourceFile, TreeBuilder};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Records every instantiation request and answers with the generic itself
/// as the implementation handle.
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<(NodeId, Vec<Ty>)>,
}

impl GenericInstantiator for Recorder {
    fn instantiate(&mut self, generic: NodeId, args: &[Ty]) -> Option<NodeId> {
        self.calls.push((generic, args.to_vec()));
        Some(generic)
    }
}

pub struct Workspace {
    pub arena: NodeArena,
    pub interner: Interner,
    pub resolver: Resolver,
    pub instantiator: Recorder,
    pub diagnostics: Vec<Diagnostic>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        init_logging();
        let mut arena = NodeArena::new();
        let mut interner = Interner::new();
        let resolver = Resolver::new(&mut arena, &mut interner, config).unwrap();
        Self {
            arena,
            interner,
            resolver,
            instantiator: Recorder::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn builder(&mut self, file: u32, module: u32) -> TreeBuilder<'_> {
        TreeBuilder::new(&mut self.arena, &mut self.interner, FileId(file), ModuleId(module))
    }

    pub fn name(&mut self, text: &str) -> Name {
        self.interner.intern(text)
    }

    pub fn ast(&self) -> Ast<'_> {
        Ast::new(&self.arena, &self.interner)
    }

    pub fn tld(&mut self, file: &SourceFile) {
        let ast = Ast::new(&self.arena, &self.interner);
        self.resolver.tld_declare_file(ast, file, &mut self.diagnostics);
    }

    pub fn link(&mut self, file: &SourceFile) {
        let ast = Ast::new(&self.arena, &self.interner);
        self.resolver.link_signature_file(ast, file, &mut self.instantiator, &mut self.diagnostics);
        self.resolver.link_file(ast, file, &mut self.instantiator, &mut self.diagnostics);
    }

    /// Declare every file, then link every file.
    pub fn resolve(&mut self, files: &[&SourceFile]) {
        for file in files {
            self.tld(file);
        }
        for file in files {
            self.link(file);
        }
    }

    /// Find the binding of `text` the way a driver would between phases.
    pub fn find(&mut self, text: &str) -> Option<NodeId> {
        let name = self.name(text);
        self.resolver.find(name)
    }

    /// Diagnostic codes, in report order.
    pub fn codes(&self) -> Vec<String> {
        self.diagnostics.iter().map(Diagnostic::code).collect()
    }

    /// Number of diagnostics with `code`.
    pub fn count(&self, code: &str) -> usize {
        self.diagnostics.iter().filter(|diagnostic| diagnostic.code() == code).count()
    }

    pub fn summaries(&self) -> String {
        self.diagnostics.iter().map(Diagnostic::summary).collect::<Vec<_>>().join("\n")
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
