//! Collaborator Module
//!
//! Interfaces the custody core depends on, plus in-memory implementations.

pub mod memory;
pub mod traits;

// Re-exports for convenience
pub use memory::{MemoryEventLog, MemoryPodManager, TracingEventSink};
pub use traits::{EventSink, PodManager, PodMutation, StorageError, StorageResult};

#[cfg(test)]
pub use traits::{MockEventSink, MockPodManager};
