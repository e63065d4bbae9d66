//! Command implementations
//!
//! Each command is a module with an execute function that takes parsed CLI args
//! and executes the operation against the database.

pub mod container;
pub mod db;
pub mod ids;
pub mod moderate;
pub mod post;
pub mod select;

pub use container::execute as container;
pub use db::execute as db;
pub use moderate::{delete_comments, delete_items, move_items};
pub use post::{comments, items};
pub use select::execute as select;

/// How results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputMode {
    /// Only print results
    pub quiet: bool,
    /// Print results as JSON
    pub json: bool,
}
