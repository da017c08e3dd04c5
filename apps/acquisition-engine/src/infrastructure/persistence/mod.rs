//! Persistence Adapters
//!
//! Implementations of the upstream request/result store.

pub mod in_memory;

pub use in_memory::{InMemoryReservationStore, load_requests_file};
