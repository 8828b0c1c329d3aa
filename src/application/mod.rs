//! Application layer: per-session traversal state and session services
//!
//! This layer drives the immutable decision tree; it performs no I/O.

pub mod engine;
pub mod error;
pub mod history;
pub mod registry;
pub mod services;
pub mod unvisited;

pub use engine::{TraversalEngine, TraversalOptions, TraversalState, NO, PROBABLY, YES};
pub use error::{ApplicationError, ApplicationResult};
pub use history::HistoryTracker;
pub use registry::{AnswerChoice, CurrentQuestion, NodeId, NodeRegistry};
pub use services::SessionManager;
pub use unvisited::UnvisitedQueue;
