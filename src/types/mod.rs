// Shared domain types, used by both the engine layer and the view layer.
// Neither layer depends on the other; both import from this module.

pub mod change;
pub mod filter;
pub mod run;

pub use change::*;
pub use filter::*;
pub use run::{RunKind, RunRecord, RunStatus, UnknownLabel};
