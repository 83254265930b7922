//! Standard Algebraic Notation formatting and lookup.
//!
//! Lookup works by rendering every legal move and comparing canonical forms,
//! which keeps parsing and formatting from ever disagreeing.

use cozy_chess::{Board, GameStatus, Move, Piece};
use smallvec::SmallVec;

use crate::types::{file_char, format_square, rank_char, PieceKind};

/// Format a legal move as SAN, including castling, disambiguation,
/// en-passant captures, promotion and check/mate suffixes.
pub fn format_san(board: &Board, mv: Move) -> String {
    let Some(piece) = board.piece_on(mv.from) else {
        // Not a legal move for this board; render coordinates rather than panic.
        return format!("{}{}", format_square(mv.from), format_square(mv.to));
    };
    let stm = board.side_to_move();

    // cozy-chess encodes castling as king-takes-own-rook.
    let is_castle = piece == Piece::King && board.color_on(mv.to) == Some(stm);

    let mut san = if is_castle {
        if file_char(mv.to.file()) > file_char(mv.from.file()) {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        let mut s = String::new();
        let is_capture = board.piece_on(mv.to).is_some()
            || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        if piece == Piece::Pawn {
            if is_capture {
                s.push(file_char(mv.from.file()));
            }
        } else {
            s.push(PieceKind::from(piece).to_char_upper());
            disambiguate(board, mv, piece, &mut s);
        }

        if is_capture {
            s.push('x');
        }
        s.push_str(&format_square(mv.to));

        if let Some(promo) = mv.promotion {
            s.push('=');
            s.push(PieceKind::from(promo).to_char_upper());
        }
        s
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        san.push(if after.status() == GameStatus::Won {
            '#'
        } else {
            '+'
        });
    }
    san
}

/// Append the minimal from-square qualifier when another piece of the same
/// kind can reach the same target.
fn disambiguate(board: &Board, mv: Move, piece: Piece, out: &mut String) {
    let mut others: SmallVec<[Move; 4]> = SmallVec::new();
    board.generate_moves(|mvs| {
        for m in mvs {
            if m.to == mv.to && m.from != mv.from && board.piece_on(m.from) == Some(piece) {
                others.push(m);
            }
        }
        false
    });
    if others.is_empty() {
        return;
    }

    let file_unique = !others.iter().any(|o| o.from.file() == mv.from.file());
    let rank_unique = !others.iter().any(|o| o.from.rank() == mv.from.rank());
    if file_unique {
        out.push(file_char(mv.from.file()));
    } else if rank_unique {
        out.push(rank_char(mv.from.rank()));
    } else {
        out.push(file_char(mv.from.file()));
        out.push(rank_char(mv.from.rank()));
    }
}

/// Find the legal move matching a SAN string, tolerating suffix annotations
/// ("+", "#", "!", "?"), "0-0"-style castling and omitted promotion "=".
pub fn find_san(board: &Board, san: &str) -> Option<Move> {
    let want = canonical(san);
    if want.is_empty() {
        return None;
    }
    let mut found = None;
    board.generate_moves(|mvs| {
        for m in mvs {
            if canonical(&format_san(board, m)) == want {
                found = Some(m);
                return true;
            }
        }
        false
    });
    found
}

fn canonical(s: &str) -> String {
    s.trim()
        .trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'))
        .chars()
        .filter(|&c| c != '=')
        .map(|c| if c == '0' { 'O' } else { c })
        .collect()
}
