//! Durable store implementations.

pub mod inmemory;

pub use inmemory::InMemoryGameRepository;
