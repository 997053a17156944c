// # State Store Implementations
//
// This module provides implementations of the StateStore and
// PendingHostStore traits for different persistence strategies.

pub mod file;
pub mod memory;
pub mod pending;

pub use file::FileStateStore;
pub use memory::{MemoryPendingHostStore, MemoryStateStore};
pub use pending::FilePendingHostStore;
