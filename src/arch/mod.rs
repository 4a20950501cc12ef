//! Instructions the rest of the crate cannot express in plain Rust.

pub mod cortex_m;
