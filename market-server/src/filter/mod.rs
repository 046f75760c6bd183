//! Scope-aware filter construction

mod compiler;
mod predicate;

pub use compiler::{FilterCompiler, UserFilters, amount_field, search_fields};
pub use predicate::{Bound, Predicate};
