//! Legal-move enumeration and move application.
//!
//! [`MoveDetail`] is the project's move record: everything the repertoire and
//! analyzer layers need, captured at the moment the move is played. The LAN
//! form ("e2e4", "e7e8q") doubles as the move-code keying the graph edges.

use cozy_chess::{Board, Move, Piece};
use serde::{Deserialize, Serialize};

use crate::error::BoardError;
use crate::fen::{format_fen, parse_fen};
use crate::san::{find_san, format_san};
use crate::types::{
    file_char, format_square, parse_square, PieceColor, PieceKind,
};

/// A move described against the position it was played in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveDetail {
    pub color: PieceColor,
    pub from: String,
    pub to: String,
    pub piece: PieceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<PieceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
    pub san: String,
    pub lan: String,
    /// Full FEN before the move.
    pub before: String,
    /// Full FEN after the move.
    pub after: String,
}

/// A move supplied by a caller, in either notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveInput {
    San(String),
    Lan(String),
}

impl MoveInput {
    pub fn as_str(&self) -> &str {
        match self {
            Self::San(s) | Self::Lan(s) => s,
        }
    }
}

impl std::fmt::Display for MoveInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enumerate every legal move from `fen`, fully described.
pub fn legal_moves(fen: &str) -> Result<Vec<MoveDetail>, BoardError> {
    let board = parse_fen(fen)?;
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    Ok(moves.into_iter().map(|mv| describe(&board, mv)).collect())
}

/// Apply a caller-supplied move to `fen`.
///
/// Fails with [`BoardError::IllegalMove`] when the move does not match any
/// legal move; nothing about the input is trusted beyond that match.
pub fn play(fen: &str, input: &MoveInput) -> Result<MoveDetail, BoardError> {
    let board = parse_fen(fen)?;
    let mv = match input {
        MoveInput::San(s) => find_san(&board, s),
        MoveInput::Lan(l) => resolve_lan(&board, l),
    }
    .ok_or_else(|| BoardError::IllegalMove {
        fen: fen.to_string(),
        mv: input.as_str().to_string(),
    })?;
    Ok(describe(&board, mv))
}

/// SAN rendering of a stored move-code, if it is still legal at `fen`.
pub fn san_for_lan(fen: &str, lan: &str) -> Option<String> {
    let board = parse_fen(fen).ok()?;
    let mv = resolve_lan(&board, lan)?;
    Some(format_san(&board, mv))
}

fn describe(board: &Board, mv: Move) -> MoveDetail {
    let color: PieceColor = board.side_to_move().into();
    let piece: PieceKind = board
        .piece_on(mv.from)
        .map(PieceKind::from)
        .unwrap_or(PieceKind::Pawn);

    let is_castle =
        piece == PieceKind::King && board.color_on(mv.to) == Some(board.side_to_move());
    let captured = if is_castle {
        None
    } else if let Some(p) = board.piece_on(mv.to) {
        Some(PieceKind::from(p))
    } else if piece == PieceKind::Pawn && mv.from.file() != mv.to.file() {
        // En passant: diagonal pawn move onto an empty square.
        Some(PieceKind::Pawn)
    } else {
        None
    };

    let san = format_san(board, mv);
    let lan = format_lan(board, mv);
    let before = format_fen(board);
    let mut next = board.clone();
    next.play_unchecked(mv);
    let after = format_fen(&next);

    // Report the king's standard destination for castling, matching the LAN.
    let to = if is_castle {
        let file = if file_char(mv.to.file()) > file_char(mv.from.file()) {
            cozy_chess::File::G
        } else {
            cozy_chess::File::C
        };
        format_square(cozy_chess::Square::new(file, mv.from.rank()))
    } else {
        format_square(mv.to)
    };

    MoveDetail {
        color,
        from: format_square(mv.from),
        to,
        piece,
        captured,
        promotion: mv.promotion.map(PieceKind::from),
        san,
        lan,
        before,
        after,
    }
}

/// Format a move as LAN in standard UCI style.
///
/// cozy-chess encodes castling as king-takes-own-rook (e1h1); the emitted
/// LAN uses the two-square king form (e1g1) so move-codes match what game
/// ingestion records.
fn format_lan(board: &Board, mv: Move) -> String {
    let is_castle = board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move());
    if is_castle {
        let to_file = if file_char(mv.to.file()) > file_char(mv.from.file()) {
            cozy_chess::File::G
        } else {
            cozy_chess::File::C
        };
        return format!(
            "{}{}{}",
            format_square(mv.from),
            file_char(to_file),
            crate::types::rank_char(mv.from.rank()),
        );
    }
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(PieceKind::from(promo).to_char_upper().to_ascii_lowercase());
    }
    s
}

/// Match a LAN string against the legal moves, accepting both the two-square
/// king form and the king-takes-rook form for castling.
fn resolve_lan(board: &Board, lan: &str) -> Option<Move> {
    let lan = lan.trim();
    if lan.len() < 4 || lan.len() > 5 {
        return None;
    }
    let from = parse_square(lan.get(0..2)?)?;
    let to = parse_square(lan.get(2..4)?)?;
    let promotion = match lan.len() {
        5 => Some(cozy_chess::Piece::from(PieceKind::from_char(
            lan.chars().nth(4)?,
        )?)),
        _ => None,
    };
    let wanted = Move {
        from,
        to,
        promotion,
    };

    let mut legal = Vec::new();
    board.generate_moves(|mvs| {
        legal.extend(mvs);
        false
    });
    if legal.contains(&wanted) {
        return Some(wanted);
    }

    // Two-square king form: map e1g1/e1c1 onto the rook-target encoding.
    if board.piece_on(from) == Some(Piece::King) && promotion.is_none() {
        let rook_file = match to.file() {
            cozy_chess::File::G => cozy_chess::File::H,
            cozy_chess::File::C => cozy_chess::File::A,
            _ => return None,
        };
        let converted = Move {
            from,
            to: cozy_chess::Square::new(rook_file, from.rank()),
            promotion: None,
        };
        if legal.contains(&converted) {
            return Some(converted);
        }
    }
    None
}
