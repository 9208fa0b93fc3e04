//! jkevac CLI library.
//!
//! Terminal styling, output formatting and the terminal map surface used by
//! the `jkevac` binary.

pub mod output;
pub mod surface;
pub mod terminal;
