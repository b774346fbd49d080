mod actor;
mod selection;
mod types;

#[cfg(test)]
pub use actor::testing;
pub use actor::{
    run_batch, BatchAction, BatchEvent, BatchSummary, ConsoleReporter, FailurePolicy,
    ProgressReporter,
};
pub use selection::Selection;
pub use types::{MediaItem, MediaKind, MediaResource};
