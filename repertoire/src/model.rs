//! Persisted record shapes.
//!
//! Everything here is the JSON contract with the backing store. Move maps
//! are `BTreeMap` so iteration and serialization order are deterministic.
//! Non-key position fields all default: a record lazily created by the first
//! edge upsert materializes with only one move map present.

use std::collections::BTreeMap;

use board::MoveDetail;
use serde::{Deserialize, Serialize};

/// A weak reference to another position: lookup key only, not ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookEdge {
    pub target_fen: String,
}

/// Which move map an edge lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// A move the owner intends to play from here.
    Book,
    /// A reply recorded from the other side.
    Opponent,
}

impl EdgeKind {
    pub(crate) fn path(self) -> &'static str {
        match self {
            Self::Book => "book_moves",
            Self::Opponent => "opponent_moves",
        }
    }
}

/// Which comment slot a note belongs to, relative to the viewing orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSlot {
    Player,
    Opponent,
}

impl CommentSlot {
    pub(crate) fn field(self) -> &'static str {
        match self {
            Self::Player => "comment_for_player",
            Self::Opponent => "comment_for_opponent",
        }
    }
}

/// A node of the repertoire graph, keyed by `(owner_id, fen)` where `fen` is
/// the normalized key. Never deleted, never auto-pruned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub owner_id: String,
    /// Normalized key: board, side to move, castling, en passant.
    pub fen: String,
    #[serde(default)]
    pub book_moves: BTreeMap<String, BookEdge>,
    #[serde(default)]
    pub opponent_moves: BTreeMap<String, BookEdge>,
    /// Spaced-repetition weight.
    #[serde(default)]
    pub anki_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_for_player: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment_for_opponent: Option<String>,
}

impl PositionRecord {
    pub fn moves(&self, kind: EdgeKind) -> &BTreeMap<String, BookEdge> {
        match kind {
            EdgeKind::Book => &self.book_moves,
            EdgeKind::Opponent => &self.opponent_moves,
        }
    }

    /// Invariants checked at the store edge beyond what serde enforces.
    pub(crate) fn validate(&self) -> Result<(), String> {
        for (code, edge) in self.book_moves.iter().chain(self.opponent_moves.iter()) {
            if code.is_empty() {
                return Err("empty move-code".to_string());
            }
            if edge.target_fen.is_empty() {
                return Err(format!("edge {code} has an empty target"));
            }
        }
        Ok(())
    }
}

/// An externally recorded game, immutable once stored except for the
/// attached report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub owner_id: String,
    pub game_id: String,
    pub game: GameData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<GameReport>,
}

/// Ordered moves plus ingestion metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    pub moves: Vec<MoveDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_control: Option<String>,
    /// Unix timestamp of when the game was played.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<u64>,
}

/// Per-move classification of a replayed game against the book.
///
/// `not_found` is computed during analysis but filtered out before the
/// report is persisted; it only survives long enough to anchor
/// `first_out_of_book`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveAssessment {
    Success,
    Failed {
        played: String,
        expected: Vec<String>,
    },
    OpponentMove,
    NotFound,
}

impl MoveAssessment {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Derived artifact cached on the game record; replaced only by explicit
/// invalidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReport {
    pub moves_report: Vec<MoveAssessment>,
    /// The original move at the first `failed` index, computed against the
    /// unfiltered per-move sequence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_error: Option<MoveDetail>,
    /// The original move at the first `not_found` index, same basis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_out_of_book: Option<MoveDetail>,
}
