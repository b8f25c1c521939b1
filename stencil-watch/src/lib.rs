//! File watcher: turns filesystem events under a project root into render,
//! delete and rename calls on the project's templates.

mod error;
pub mod paths;
mod runtime;

pub use error::WatchError;
pub use runtime::{classify, handle_event, run, start_blocking, EventSummary, SourceEvent};
