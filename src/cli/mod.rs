//! # CLI Module
//!
//! Command-line access to a built-in demo page, handy for looking at how a
//! tree is laid out and what dispatching against it returns.
//!
//! ## Commands
//!
//! ### `tree`
//!
//! ```bash
//! dynform tree
//! ```
//!
//! Prints every node (accessor, label, grab and shared fields) followed by
//! the client init scripts.
//!
//! ### `dispatch`
//!
//! ```bash
//! dynform dispatch --handler demoPage.mainControl.greeting --field name=Ada
//! dynform dispatch --method POST --handler demoPage.mainControl.signup --field email=a@b.c
//! dynform dispatch --handler demoPage.mainControl.clock --handler demoPage.mainControl.broken
//! ```
//!
//! Prints the serialized response. Repeating `--handler` fans out.
//!
//! `--config <FILE>` loads a YAML dispatch configuration; logging follows the
//! `DYNFORM_LOG_*` variables.

mod commands;
mod demo;


pub use commands::{run_cli, run_command, Cli, Commands};
pub use demo::demo_page;
