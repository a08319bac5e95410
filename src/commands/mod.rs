//! Command vocabulary: token-set matcher and the ordered command table

pub mod matcher;
mod table;

pub use matcher::{contains_any, matches, normalize};
pub use table::{Action, Binding, CATCH_ALL, CommandTable, Match};
