//! Cache implementations.

pub mod inmemory;

pub use inmemory::{CachePublication, InMemoryGameCache};
