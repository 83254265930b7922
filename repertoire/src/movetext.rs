//! Variation-tree input and movetext rendering.
//!
//! Parsing PGN text is someone else's job; imports arrive as an
//! already-parsed tree of [`VariationNode`]s. A comment attaches to the
//! position reached immediately after the move it follows.

use board::PieceColor;
use serde::{Deserialize, Serialize};

/// One move in a parsed game tree. `variations` are alternative lines
/// replacing this move, each starting from the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationNode {
    pub san: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<Vec<VariationNode>>,
}

impl VariationNode {
    pub fn new(san: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            comment: None,
            variations: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_variation(mut self, line: Vec<VariationNode>) -> Self {
        self.variations.push(line);
        self
    }
}

/// What a bulk import wrote before finishing (or aborting — writes are
/// at-least-once and never rolled back).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub moves_added: u32,
    pub comments_added: u32,
}

/// Fullmove counter of a full FEN; normalized keys default to 1.
pub(crate) fn fullmove_number(fen: &str) -> u32 {
    fen.split_whitespace()
        .nth(5)
        .and_then(|f| f.parse().ok())
        .unwrap_or(1)
}

/// Accumulates movetext tokens with standard numbering: `1. d4 d5 2. c4`,
/// `1... c5` when the line starts on a Black move, and a number reprint
/// after every `{comment}`.
pub(crate) struct MovetextWriter {
    out: String,
    need_number: bool,
}

impl MovetextWriter {
    pub(crate) fn new() -> Self {
        Self {
            out: String::new(),
            need_number: true,
        }
    }

    pub(crate) fn push_move(&mut self, number: u32, color: PieceColor, san: &str) {
        if !self.out.is_empty() {
            self.out.push(' ');
        }
        match color {
            PieceColor::White => {
                self.out.push_str(&format!("{number}. "));
            }
            PieceColor::Black => {
                if self.need_number {
                    self.out.push_str(&format!("{number}... "));
                }
            }
        }
        self.out.push_str(san);
        self.need_number = false;
    }

    pub(crate) fn push_comment(&mut self, text: &str) {
        self.out.push_str(" {");
        self.out.push_str(text);
        self.out.push('}');
        self.need_number = true;
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}
