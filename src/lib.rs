//! progwalk: interactive decision-tree sessions recommending study programmes
//!
//! Layers, innermost first:
//! - `domain`: the immutable decision tree and its builder
//! - `application`: per-session traversal state and the session manager
//! - `infrastructure`: tree providers and service wiring
//! - `cli`: the terminal entry point

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
