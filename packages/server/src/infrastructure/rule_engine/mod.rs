//! Rule engine implementations.

pub mod chess;

pub use self::chess::ChessRuleEngine;
