//! Command implementations for the `kmr` tool.
//!
//! Each command is a small configuration struct with builder-style setters
//! and a `run` method. The binary only parses flags and calls into these.

pub mod count;
pub mod filter;
pub mod has;
pub mod keys;
pub mod merge;
pub mod view;

pub use count::CountCommand;
pub use filter::{FilterCommand, FilterStats};
pub use has::HasCommand;
pub use keys::KeysCommand;
pub use merge::MergeCommand;
pub use view::ViewCommand;
