//! Library half of the `cvm` binary: command implementations and logging
//! setup, kept out of `main.rs` so they can be tested directly.

pub mod commands;
pub mod logging;
