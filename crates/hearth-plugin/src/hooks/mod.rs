//! Hook system: implementer discovery, dispatch, and result merging.

pub mod dispatcher;
pub mod merge;

pub use dispatcher::{HookDispatcher, HookOrder};
pub use merge::ResultMerger;
