//! Utilities shared by the Rookery packages: logging bootstrap and time helpers.

pub mod logger;
pub mod time;
