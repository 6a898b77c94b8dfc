//! In-memory implementations of the domain repositories.

pub mod game;

pub use game::InMemoryGameRepository;
