//! Business operations over the position graph.
//!
//! One service instance per process, holding an injected store handle. All
//! move legality goes through the board crate; by the time anything reaches
//! the store it is a normalized key plus a LAN move-code.

use std::collections::HashSet;
use std::sync::Arc;

use board::{MoveDetail, MoveInput, PieceColor};
use rand::seq::IteratorRandom;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::RepertoireError;
use crate::kv::KeyValueStore;
use crate::model::{CommentSlot, EdgeKind, PositionRecord};
use crate::movetext::{fullmove_number, ImportSummary, MovetextWriter, VariationNode};
use crate::store::PositionStore;

pub struct RepertoireService<K: KeyValueStore> {
    positions: PositionStore<K>,
}

impl<K: KeyValueStore> Clone for RepertoireService<K> {
    fn clone(&self) -> Self {
        Self {
            positions: self.positions.clone(),
        }
    }
}

impl<K: KeyValueStore> RepertoireService<K> {
    pub fn new(kv: Arc<K>, config: StoreConfig) -> Self {
        Self {
            positions: PositionStore::new(kv, config),
        }
    }

    pub fn from_store(positions: PositionStore<K>) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &PositionStore<K> {
        &self.positions
    }

    /// Record a move at `fen`. The move is validated against the board;
    /// nothing is persisted when it is illegal. `is_opponent_move` selects
    /// which edge map it lands in.
    pub async fn add_move(
        &self,
        owner_id: &str,
        fen: &str,
        mv: &MoveInput,
        is_opponent_move: bool,
    ) -> Result<MoveDetail, RepertoireError> {
        let played = board::play(fen, mv)?;
        let target = board::normalize(&played.after)?;
        let kind = if is_opponent_move {
            EdgeKind::Opponent
        } else {
            EdgeKind::Book
        };
        self.positions
            .upsert_edge(owner_id, fen, &played.lan, kind, &target)
            .await?;
        debug!(owner = %owner_id, san = %played.san, lan = %played.lan, opponent = is_opponent_move, "move recorded");
        Ok(played)
    }

    pub async fn delete_move(
        &self,
        owner_id: &str,
        fen: &str,
        move_code: &str,
        is_opponent_move: bool,
    ) -> Result<(), RepertoireError> {
        let kind = if is_opponent_move {
            EdgeKind::Opponent
        } else {
            EdgeKind::Book
        };
        self.positions
            .delete_edge(owner_id, fen, move_code, kind)
            .await?;
        Ok(())
    }

    /// The stored position, if any.
    pub async fn position(
        &self,
        owner_id: &str,
        fen: &str,
    ) -> Result<Option<PositionRecord>, RepertoireError> {
        Ok(self.positions.get(owner_id, fen).await?)
    }

    /// A uniformly random recorded reply at `fen`, or `None` when the
    /// position is unknown or has no opponent moves.
    pub async fn random_opponent_move(
        &self,
        owner_id: &str,
        fen: &str,
    ) -> Result<Option<String>, RepertoireError> {
        let Some(pos) = self.positions.get(owner_id, fen).await? else {
            return Ok(None);
        };
        let mut rng = rand::thread_rng();
        Ok(pos.opponent_moves.keys().choose(&mut rng).cloned())
    }

    /// Attach a note to `fen`. Which slot it lands in depends on whether the
    /// side to move matches the viewing orientation.
    pub async fn add_comment(
        &self,
        owner_id: &str,
        fen: &str,
        orientation: PieceColor,
        text: &str,
    ) -> Result<(), RepertoireError> {
        let side = board::side_to_move(fen)?;
        let slot = if side == orientation {
            CommentSlot::Player
        } else {
            CommentSlot::Opponent
        };
        self.positions.set_comment(owner_id, fen, slot, text).await?;
        Ok(())
    }

    pub async fn set_anki_score(
        &self,
        owner_id: &str,
        fen: &str,
        score: i64,
    ) -> Result<(), RepertoireError> {
        self.positions.set_anki_score(owner_id, fen, score).await?;
        Ok(())
    }

    /// Walk a parsed variation tree and record every move along every
    /// branch; the mover's color relative to `orientation` decides book vs
    /// opponent. Traversal is an explicit work list, not recursion: a branch
    /// point pushes each variation with the FEN at the branch as its
    /// starting state, so order across branches is unspecified.
    ///
    /// One illegal move aborts the whole import. Edges already written stay
    /// written: this is an at-least-once, non-atomic bulk operation.
    pub async fn import_variation_tree(
        &self,
        owner_id: &str,
        orientation: PieceColor,
        start_fen: &str,
        tree: &[VariationNode],
    ) -> Result<ImportSummary, RepertoireError> {
        let start = canonical_fen(start_fen)?;
        let mut work: Vec<(String, &[VariationNode])> = vec![(start, tree)];
        let mut summary = ImportSummary::default();

        while let Some((mut fen, line)) = work.pop() {
            for node in line {
                for variation in &node.variations {
                    work.push((fen.clone(), variation.as_slice()));
                }
                let side = board::side_to_move(&fen)?;
                let is_opponent = side != orientation;
                let played = self
                    .add_move(owner_id, &fen, &MoveInput::San(node.san.clone()), is_opponent)
                    .await?;
                summary.moves_added += 1;

                if let Some(comment) = &node.comment {
                    self.add_comment(owner_id, &played.after, orientation, comment)
                        .await?;
                    summary.comments_added += 1;
                }
                fen = played.after;
            }
        }

        info!(owner = %owner_id, moves = summary.moves_added, comments = summary.comments_added, "variation tree imported");
        Ok(summary)
    }

    /// Reconstruct a linear movetext starting at `fen`: follow the stored
    /// graph (book moves on the orientation's turns, recorded replies on the
    /// other side's) until no continuation exists, or replay
    /// `explicit_moves` instead when given. Stored comments at reached
    /// positions are rendered in braces.
    pub async fn export_movetext(
        &self,
        owner_id: &str,
        fen: &str,
        orientation: PieceColor,
        explicit_moves: Option<&[MoveInput]>,
    ) -> Result<String, RepertoireError> {
        let mut current = canonical_fen(fen)?;
        let following_book = explicit_moves.is_none();
        let mut explicit = explicit_moves.map(|moves| moves.iter());
        // Transpositions can make the book graph cyclic.
        let mut visited: HashSet<String> = HashSet::new();
        let mut writer = MovetextWriter::new();

        loop {
            let key = board::normalize(&current)?;
            if following_book && !visited.insert(key.clone()) {
                break;
            }
            let input = match explicit.as_mut() {
                Some(iter) => iter.next().cloned(),
                None => self
                    .next_book_step(owner_id, &key, orientation)
                    .await?
                    .map(MoveInput::Lan),
            };
            let Some(input) = input else { break };

            let played = board::play(&current, &input)?;
            writer.push_move(fullmove_number(&current), played.color, &played.san);

            if let Some(after) = self.positions.get(owner_id, &played.after).await? {
                let side_after = board::side_to_move(&played.after)?;
                let comment = if side_after == orientation {
                    &after.comment_for_player
                } else {
                    &after.comment_for_opponent
                };
                if let Some(text) = comment {
                    writer.push_comment(text);
                }
            }
            current = played.after;
        }

        Ok(writer.finish())
    }

    async fn next_book_step(
        &self,
        owner_id: &str,
        key: &str,
        orientation: PieceColor,
    ) -> Result<Option<String>, RepertoireError> {
        let Some(pos) = self.positions.get(owner_id, key).await? else {
            return Ok(None);
        };
        let side = board::side_to_move(key)?;
        let map = if side == orientation {
            &pos.book_moves
        } else {
            &pos.opponent_moves
        };
        Ok(map.keys().next().cloned())
    }
}

fn canonical_fen(fen: &str) -> Result<String, RepertoireError> {
    let board = board::parse_fen(fen)?;
    Ok(board::format_fen(&board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use board::START_FEN;
    use std::time::Duration;

    const OWNER: &str = "alice";

    fn service() -> RepertoireService<MemoryKv> {
        RepertoireService::new(
            Arc::new(MemoryKv::new("owner_id", "fen")),
            StoreConfig::default().with_cache_ttl(Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn test_add_move_records_book_edge() {
        let svc = service();
        let played = svc
            .add_move(OWNER, START_FEN, &MoveInput::San("d4".into()), false)
            .await
            .unwrap();
        assert_eq!(played.lan, "d2d4");

        let pos = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        let edge = &pos.book_moves["d2d4"];
        assert_eq!(edge.target_fen, board::normalize(&played.after).unwrap());
        assert!(pos.opponent_moves.is_empty());
    }

    #[tokio::test]
    async fn test_add_move_twice_is_idempotent() {
        let svc = service();
        svc.add_move(OWNER, START_FEN, &MoveInput::San("d4".into()), false)
            .await
            .unwrap();
        let before = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        svc.add_move(OWNER, START_FEN, &MoveInput::San("d4".into()), false)
            .await
            .unwrap();
        let after = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_illegal_move_persists_nothing() {
        let svc = service();
        let err = svc
            .add_move(OWNER, START_FEN, &MoveInput::San("Qh5".into()), false)
            .await
            .unwrap_err();
        assert!(matches!(err, RepertoireError::InvalidMove { .. }));
        assert!(svc.position(OWNER, START_FEN).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_move() {
        let svc = service();
        svc.add_move(OWNER, START_FEN, &MoveInput::San("d4".into()), false)
            .await
            .unwrap();
        svc.delete_move(OWNER, START_FEN, "d2d4", false).await.unwrap();
        let pos = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        assert!(pos.book_moves.is_empty());
    }

    #[tokio::test]
    async fn test_random_opponent_move() {
        let svc = service();
        assert!(svc
            .random_opponent_move(OWNER, START_FEN)
            .await
            .unwrap()
            .is_none());

        svc.add_move(OWNER, START_FEN, &MoveInput::San("d4".into()), false)
            .await
            .unwrap();
        // Book-only position still has no opponent replies.
        assert!(svc
            .random_opponent_move(OWNER, START_FEN)
            .await
            .unwrap()
            .is_none());

        svc.add_move(OWNER, START_FEN, &MoveInput::San("e4".into()), true)
            .await
            .unwrap();
        svc.add_move(OWNER, START_FEN, &MoveInput::San("c4".into()), true)
            .await
            .unwrap();
        let picked = svc
            .random_opponent_move(OWNER, START_FEN)
            .await
            .unwrap()
            .unwrap();
        assert!(picked == "e2e4" || picked == "c2c4");
    }

    #[tokio::test]
    async fn test_add_comment_slot_selection() {
        let svc = service();
        // White to move, white orientation: the owner's own note.
        svc.add_comment(OWNER, START_FEN, PieceColor::White, "my plan")
            .await
            .unwrap();
        // White to move, black orientation: a note about the opponent's turn.
        svc.add_comment(OWNER, START_FEN, PieceColor::Black, "their options")
            .await
            .unwrap();

        let pos = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        assert_eq!(pos.comment_for_player.as_deref(), Some("my plan"));
        assert_eq!(pos.comment_for_opponent.as_deref(), Some("their options"));
    }

    #[tokio::test]
    async fn test_set_anki_score() {
        let svc = service();
        svc.set_anki_score(OWNER, START_FEN, 5).await.unwrap();
        let pos = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        assert_eq!(pos.anki_score, 5);
    }

    #[tokio::test]
    async fn test_import_walks_all_branches() {
        let svc = service();
        // 1. d4 d5 2. c4, with 1... Nf6 as a variation on d5.
        let tree = vec![
            VariationNode::new("d4"),
            VariationNode::new("d5").with_variation(vec![VariationNode::new("Nf6")]),
            VariationNode::new("c4").with_comment("the Queen's Gambit"),
        ];
        let summary = svc
            .import_variation_tree(OWNER, PieceColor::White, START_FEN, &tree)
            .await
            .unwrap();
        assert_eq!(summary.moves_added, 4);
        assert_eq!(summary.comments_added, 1);

        let start = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        assert!(start.book_moves.contains_key("d2d4"));

        let d4 = board::play(START_FEN, &MoveInput::San("d4".into())).unwrap();
        let after_d4 = svc.position(OWNER, &d4.after).await.unwrap().unwrap();
        // Both the mainline reply and the variation landed as opponent moves.
        assert!(after_d4.opponent_moves.contains_key("d7d5"));
        assert!(after_d4.opponent_moves.contains_key("g8f6"));

        let d5 = board::play(&d4.after, &MoveInput::San("d5".into())).unwrap();
        let c4 = board::play(&d5.after, &MoveInput::San("c4".into())).unwrap();
        let after_c4 = svc.position(OWNER, &c4.after).await.unwrap().unwrap();
        // Black to move after 2. c4; for a white orientation the note lands
        // in the opponent slot.
        assert_eq!(
            after_c4.comment_for_opponent.as_deref(),
            Some("the Queen's Gambit")
        );
    }

    #[tokio::test]
    async fn test_import_aborts_without_rollback() {
        let svc = service();
        let tree = vec![VariationNode::new("d4"), VariationNode::new("Ke2")];
        let err = svc
            .import_variation_tree(OWNER, PieceColor::White, START_FEN, &tree)
            .await
            .unwrap_err();
        assert!(matches!(err, RepertoireError::InvalidMove { .. }));

        // The first edge stays: at-least-once, no rollback.
        let start = svc.position(OWNER, START_FEN).await.unwrap().unwrap();
        assert!(start.book_moves.contains_key("d2d4"));
    }

    #[tokio::test]
    async fn test_export_follows_the_graph() {
        let svc = service();
        let tree = vec![
            VariationNode::new("d4"),
            VariationNode::new("d5"),
            VariationNode::new("c4").with_comment("the Queen's Gambit"),
        ];
        svc.import_variation_tree(OWNER, PieceColor::White, START_FEN, &tree)
            .await
            .unwrap();

        let text = svc
            .export_movetext(OWNER, START_FEN, PieceColor::White, None)
            .await
            .unwrap();
        assert_eq!(text, "1. d4 d5 2. c4 {the Queen's Gambit}");
    }

    #[tokio::test]
    async fn test_export_explicit_moves() {
        let svc = service();
        let moves = vec![
            MoveInput::San("e4".into()),
            MoveInput::San("c5".into()),
            MoveInput::San("Nf3".into()),
        ];
        let text = svc
            .export_movetext(OWNER, START_FEN, PieceColor::White, Some(&moves))
            .await
            .unwrap();
        assert_eq!(text, "1. e4 c5 2. Nf3");
    }

    #[tokio::test]
    async fn test_export_from_black_to_move_position() {
        let svc = service();
        let e4 = board::play(START_FEN, &MoveInput::San("e4".into())).unwrap();
        let moves = vec![MoveInput::San("c5".into()), MoveInput::San("Nf3".into())];
        let text = svc
            .export_movetext(OWNER, &e4.after, PieceColor::Black, Some(&moves))
            .await
            .unwrap();
        assert_eq!(text, "1... c5 2. Nf3");
    }

    #[tokio::test]
    async fn test_export_unknown_position_is_empty() {
        let svc = service();
        let text = svc
            .export_movetext(OWNER, START_FEN, PieceColor::White, None)
            .await
            .unwrap();
        assert_eq!(text, "");
    }
}
