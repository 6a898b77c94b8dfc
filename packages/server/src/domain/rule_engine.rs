//! Rule engine interface.
//!
//! The session layer never decides chess legality itself; it hands the current
//! position and the requested squares to a `RuleEngine` and trusts the verdict.

use serde::{Deserialize, Serialize};

use super::value_object::Square;

/// Metadata the engine reports for a legal move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub piece: String,
    pub captured: bool,
    pub promotion: Option<String>,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
    pub notation: String,
    /// Position after the move (FEN).
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveValidation {
    Legal(MoveOutcome),
    Illegal { reason: String },
}

#[cfg_attr(test, mockall::automock)]
pub trait RuleEngine: Send + Sync {
    fn validate_move(&self, position: &str, from: &Square, to: &Square) -> MoveValidation;
}
