//! FEN parsing, formatting and key normalization.
//!
//! Graph node identity is the *normalized key*: the first four FEN fields
//! (board, side to move, castling, en passant) with the halfmove and
//! fullmove counters stripped, so positions reached by different move orders
//! compare equal.

use cozy_chess::Board;

use crate::error::BoardError;
use crate::types::PieceColor;

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
///
/// Accepts full six-field FENs as well as normalized four-field keys; missing
/// counters are padded before parsing.
pub fn parse_fen(fen: &str) -> Result<Board, BoardError> {
    let fields: Vec<&str> = fen.split_whitespace().collect();
    let padded = match fields.len() {
        4 => format!("{} 0 1", fields.join(" ")),
        5 => format!("{} 1", fields.join(" ")),
        6 => fields.join(" "),
        _ => return Err(BoardError::InvalidFen(fen.to_string())),
    };
    padded
        .parse()
        .map_err(|_| BoardError::InvalidFen(fen.to_string()))
}

/// Format a Board as a full six-field FEN string.
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// Normalize a FEN into the key used for graph node identity.
pub fn normalize(fen: &str) -> Result<String, BoardError> {
    let board = parse_fen(fen)?;
    Ok(normalize_board(&board))
}

/// Normalized key of an already-parsed board.
pub fn normalize_board(board: &Board) -> String {
    let full = board.to_string();
    full.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Which color is to move at `fen`.
pub fn side_to_move(fen: &str) -> Result<PieceColor, BoardError> {
    Ok(parse_fen(fen)?.side_to_move().into())
}
