//! Application services
//!
//! Services orchestrate the traversal state machine for entry points.

pub mod session;

pub use session::SessionManager;
