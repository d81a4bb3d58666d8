//! A shell for a collection of music bands kept in a min-id priority heap,
//! persisted to a line-oriented text file and scriptable from command files.

pub mod core;
pub mod output;
pub mod repl;
