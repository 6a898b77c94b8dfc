//! `RuleEngine` backed by the `chess` crate.
//!
//! Positions are FEN strings. Pawns reaching the last rank always promote to a
//! queen, since the move request only carries from/to squares.

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, File, Piece, Rank};

use crate::domain::{MoveOutcome, MoveValidation, RuleEngine, Square};

#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRuleEngine;

impl ChessRuleEngine {
    pub fn new() -> Self {
        Self
    }
}

fn to_board_square(square: &Square) -> chess::Square {
    let bytes = square.as_str().as_bytes();
    let file = File::from_index(usize::from(bytes[0] - b'a'));
    let rank = Rank::from_index(usize::from(bytes[1] - b'1'));
    chess::Square::make_square(rank, file)
}

fn piece_name(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "pawn",
        Piece::Knight => "knight",
        Piece::Bishop => "bishop",
        Piece::Rook => "rook",
        Piece::Queen => "queen",
        Piece::King => "king",
    }
}

fn piece_letter(piece: Piece) -> &'static str {
    match piece {
        Piece::Pawn => "",
        Piece::Knight => "N",
        Piece::Bishop => "B",
        Piece::Rook => "R",
        Piece::Queen => "Q",
        Piece::King => "K",
    }
}

fn color_name(color: chess::Color) -> &'static str {
    match color {
        chess::Color::White => "white",
        chess::Color::Black => "black",
    }
}

impl RuleEngine for ChessRuleEngine {
    fn validate_move(&self, position: &str, from: &Square, to: &Square) -> MoveValidation {
        let board = match Board::from_str(position) {
            Ok(board) => board,
            Err(e) => {
                tracing::error!("Rule engine received a corrupt position '{}': {:?}", position, e);
                return MoveValidation::Illegal {
                    reason: "position could not be parsed".to_string(),
                };
            }
        };

        let source = to_board_square(from);
        let dest = to_board_square(to);

        let Some(piece) = board.piece_on(source) else {
            return MoveValidation::Illegal {
                reason: format!("no piece on {}", from),
            };
        };
        if board.color_on(source) != Some(board.side_to_move()) {
            return MoveValidation::Illegal {
                reason: format!(
                    "piece on {} does not belong to {}",
                    from,
                    color_name(board.side_to_move())
                ),
            };
        }

        let last_rank = matches!(dest.get_rank(), Rank::First | Rank::Eighth);
        let promotion = (piece == Piece::Pawn && last_rank).then_some(Piece::Queen);
        let chess_move = ChessMove::new(source, dest, promotion);
        if !board.legal(chess_move) {
            return MoveValidation::Illegal {
                reason: format!("{}-{} is not legal in this position", from, to),
            };
        }

        // En passant lands on an empty square.
        let captured = board.piece_on(dest).is_some()
            || (piece == Piece::Pawn && source.get_file() != dest.get_file());
        let after = board.make_move_new(chess_move);
        let status = after.status();
        let is_checkmate = status == BoardStatus::Checkmate;
        let is_stalemate = status == BoardStatus::Stalemate;
        let is_check = after.checkers().popcnt() > 0;

        MoveValidation::Legal(MoveOutcome {
            piece: piece_name(piece).to_string(),
            captured,
            promotion: promotion.map(|p| piece_name(p).to_string()),
            is_check,
            is_checkmate,
            is_stalemate,
            notation: notation(piece, from, to, captured, promotion, is_check, is_checkmate),
            position: after.to_string(),
        })
    }
}

/// Long algebraic notation, e.g. `e2-e4`, `Ng1-f3`, `e7xd8=Q+`, `O-O`.
fn notation(
    piece: Piece,
    from: &Square,
    to: &Square,
    captured: bool,
    promotion: Option<Piece>,
    is_check: bool,
    is_checkmate: bool,
) -> String {
    let from_file = from.as_str().as_bytes()[0];
    let to_file = to.as_str().as_bytes()[0];

    let mut text = if piece == Piece::King && from_file.abs_diff(to_file) == 2 {
        if to_file > from_file {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        let separator = if captured { "x" } else { "-" };
        format!("{}{}{}{}", piece_letter(piece), from, separator, to)
    };

    if let Some(promoted) = promotion {
        text.push('=');
        text.push_str(piece_letter(promoted));
    }
    if is_checkmate {
        text.push('#');
    } else if is_check {
        text.push('+');
    }
    text
}
