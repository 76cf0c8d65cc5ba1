//! Routing module
//!
//! - Pattern compilation with `:name` placeholders
//! - Insertion-ordered route table with a literal fast path
//! - Route sources (lists, trigger manifest directories)

mod pattern;
mod source;
mod table;

pub use pattern::Pattern;
pub use source::{RouteSource, RouteSpec, TriggerDirectory};
pub use table::{RouteMatch, RouteTable, DEFAULT_FALLBACK_HANDLER};
