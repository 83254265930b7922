//! Project-owned piece and color types plus square/piece text helpers.

use serde::{Deserialize, Serialize};

/// Side of the board. Doubles as the repertoire orientation: the color the
/// book is recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceColor {
    White,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceColor {
    pub fn opposite(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }
}

impl PieceKind {
    /// Upper-case SAN letter; pawns have none and map to 'P' only here.
    pub fn to_char_upper(self) -> char {
        match self {
            Self::Pawn => 'P',
            Self::Knight => 'N',
            Self::Bishop => 'B',
            Self::Rook => 'R',
            Self::Queen => 'Q',
            Self::King => 'K',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'p' => Some(Self::Pawn),
            'n' => Some(Self::Knight),
            'b' => Some(Self::Bishop),
            'r' => Some(Self::Rook),
            'q' => Some(Self::Queen),
            'k' => Some(Self::King),
            _ => None,
        }
    }
}

impl From<cozy_chess::Color> for PieceColor {
    fn from(c: cozy_chess::Color) -> Self {
        match c {
            cozy_chess::Color::White => Self::White,
            cozy_chess::Color::Black => Self::Black,
        }
    }
}

impl From<PieceColor> for cozy_chess::Color {
    fn from(c: PieceColor) -> Self {
        match c {
            PieceColor::White => Self::White,
            PieceColor::Black => Self::Black,
        }
    }
}

impl From<cozy_chess::Piece> for PieceKind {
    fn from(p: cozy_chess::Piece) -> Self {
        match p {
            cozy_chess::Piece::Pawn => Self::Pawn,
            cozy_chess::Piece::Knight => Self::Knight,
            cozy_chess::Piece::Bishop => Self::Bishop,
            cozy_chess::Piece::Rook => Self::Rook,
            cozy_chess::Piece::Queen => Self::Queen,
            cozy_chess::Piece::King => Self::King,
        }
    }
}

impl From<PieceKind> for cozy_chess::Piece {
    fn from(p: PieceKind) -> Self {
        match p {
            PieceKind::Pawn => Self::Pawn,
            PieceKind::Knight => Self::Knight,
            PieceKind::Bishop => Self::Bishop,
            PieceKind::Rook => Self::Rook,
            PieceKind::Queen => Self::Queen,
            PieceKind::King => Self::King,
        }
    }
}

impl std::fmt::Display for PieceColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parse a square string like "e2".
pub fn parse_square(s: &str) -> Option<cozy_chess::Square> {
    let mut chars = s.chars();
    let file = parse_file(chars.next()?)?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(cozy_chess::Square::new(file, rank))
}

pub fn parse_file(c: char) -> Option<cozy_chess::File> {
    match c.to_ascii_lowercase() {
        'a' => Some(cozy_chess::File::A),
        'b' => Some(cozy_chess::File::B),
        'c' => Some(cozy_chess::File::C),
        'd' => Some(cozy_chess::File::D),
        'e' => Some(cozy_chess::File::E),
        'f' => Some(cozy_chess::File::F),
        'g' => Some(cozy_chess::File::G),
        'h' => Some(cozy_chess::File::H),
        _ => None,
    }
}

pub fn parse_rank(c: char) -> Option<cozy_chess::Rank> {
    match c {
        '1' => Some(cozy_chess::Rank::First),
        '2' => Some(cozy_chess::Rank::Second),
        '3' => Some(cozy_chess::Rank::Third),
        '4' => Some(cozy_chess::Rank::Fourth),
        '5' => Some(cozy_chess::Rank::Fifth),
        '6' => Some(cozy_chess::Rank::Sixth),
        '7' => Some(cozy_chess::Rank::Seventh),
        '8' => Some(cozy_chess::Rank::Eighth),
        _ => None,
    }
}

pub fn file_char(f: cozy_chess::File) -> char {
    match f {
        cozy_chess::File::A => 'a',
        cozy_chess::File::B => 'b',
        cozy_chess::File::C => 'c',
        cozy_chess::File::D => 'd',
        cozy_chess::File::E => 'e',
        cozy_chess::File::F => 'f',
        cozy_chess::File::G => 'g',
        cozy_chess::File::H => 'h',
    }
}

pub fn rank_char(r: cozy_chess::Rank) -> char {
    match r {
        cozy_chess::Rank::First => '1',
        cozy_chess::Rank::Second => '2',
        cozy_chess::Rank::Third => '3',
        cozy_chess::Rank::Fourth => '4',
        cozy_chess::Rank::Fifth => '5',
        cozy_chess::Rank::Sixth => '6',
        cozy_chess::Rank::Seventh => '7',
        cozy_chess::Rank::Eighth => '8',
    }
}

pub fn format_square(sq: cozy_chess::Square) -> String {
    format!("{}{}", file_char(sq.file()), rank_char(sq.rank()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cozy_chess::{File, Rank, Square};

    #[test]
    fn test_parse_square() {
        let sq = parse_square("e2").unwrap();
        assert_eq!(sq.file(), File::E);
        assert_eq!(sq.rank(), Rank::Second);
        assert!(parse_square("e9").is_none());
        assert!(parse_square("e22").is_none());
        assert!(parse_square("").is_none());
    }

    #[test]
    fn test_format_square() {
        assert_eq!(format_square(Square::new(File::E, Rank::Fourth)), "e4");
        assert_eq!(format_square(Square::new(File::A, Rank::First)), "a1");
    }

    #[test]
    fn test_color_serde_lowercase() {
        let json = serde_json::to_string(&PieceColor::White).unwrap();
        assert_eq!(json, "\"white\"");
        let back: PieceColor = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(back, PieceColor::Black);
    }

    #[test]
    fn test_piece_from_char() {
        assert_eq!(PieceKind::from_char('N'), Some(PieceKind::Knight));
        assert_eq!(PieceKind::from_char('q'), Some(PieceKind::Queen));
        assert_eq!(PieceKind::from_char('x'), None);
    }
}
