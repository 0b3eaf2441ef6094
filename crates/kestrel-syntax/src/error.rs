use thiserror::Error;
use miette::Diagnostic;

use crate::arena::NodeId;

/// Errors raised by the syntax layer when a consumer holds a handle that
/// no longer describes a live node.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SyntaxError {
    /// The slot behind the handle was freed, possibly reused by another node.
    #[error("Stale node handle {id:?}: the node was removed from the arena")]
    #[diagnostic(
        code(kestrel_syntax::stale_node),
        help("the owning file was probably edited; re-run resolution for it")
    )]
    StaleNode {
        /// The handle that failed to resolve.
        id: NodeId,
    },
}
