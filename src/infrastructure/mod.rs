//! Infrastructure layer: tree providers and DI container
//!
//! This layer performs the I/O around the core and wires up services.

pub mod di;
pub mod error;
pub mod provider;

pub use error::{InfraError, InfraResult};
pub use provider::{JsonTreeFile, StaticTree, TreeProvider};
