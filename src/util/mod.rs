//! Small shared utilities.

pub mod atomic;
