//! Replays recorded games against the book and caches the verdict.
//!
//! Each of the tracked color's moves is classified against the stored
//! position it was played from; the other side's moves pass through as
//! `opponent_move`. Out-of-book positions are classified internally as
//! `not_found`, anchored into `first_out_of_book`, and then filtered out of
//! the persisted sequence.

use board::PieceColor;
use tracing::{debug, info};

use crate::error::RepertoireError;
use crate::kv::KeyValueStore;
use crate::model::{GameData, GameReport, MoveAssessment};
use crate::service::RepertoireService;
use crate::store::GameStore;

pub struct GameAnalyzer<K: KeyValueStore> {
    service: RepertoireService<K>,
    games: GameStore<K>,
}

impl<K: KeyValueStore> GameAnalyzer<K> {
    pub fn new(service: RepertoireService<K>, games: GameStore<K>) -> Self {
        Self { service, games }
    }

    pub fn games(&self) -> &GameStore<K> {
        &self.games
    }

    /// Classify every move of `game` against the stored book.
    pub async fn analyze(
        &self,
        owner_id: &str,
        game: &GameData,
        tracked: PieceColor,
    ) -> Result<GameReport, RepertoireError> {
        let mut assessments = Vec::with_capacity(game.moves.len());
        for mv in &game.moves {
            let assessment = if mv.color != tracked {
                MoveAssessment::OpponentMove
            } else {
                match self.service.position(owner_id, &mv.before).await? {
                    Some(pos) if !pos.book_moves.is_empty() => {
                        if pos.book_moves.contains_key(&mv.lan) {
                            MoveAssessment::Success
                        } else {
                            // Reconstruct each expected move independently
                            // from the position it applies to; a code that no
                            // longer resolves falls back to its LAN text.
                            let expected = pos
                                .book_moves
                                .keys()
                                .map(|code| {
                                    board::san_for_lan(&mv.before, code)
                                        .unwrap_or_else(|| code.clone())
                                })
                                .collect();
                            MoveAssessment::Failed {
                                played: mv.san.clone(),
                                expected,
                            }
                        }
                    }
                    _ => MoveAssessment::NotFound,
                }
            };
            assessments.push(assessment);
        }

        // Anchors are computed against the unfiltered sequence, so the index
        // to original-move mapping stays well defined; only then are the
        // internal not_found entries dropped.
        let first_error = assessments
            .iter()
            .position(MoveAssessment::is_failed)
            .map(|i| game.moves[i].clone());
        let first_out_of_book = assessments
            .iter()
            .position(MoveAssessment::is_not_found)
            .map(|i| game.moves[i].clone());
        let moves_report: Vec<MoveAssessment> = assessments
            .into_iter()
            .filter(|a| !a.is_not_found())
            .collect();

        Ok(GameReport {
            moves_report,
            first_error,
            first_out_of_book,
        })
    }

    /// The report for a stored game, computing and persisting it on first
    /// request. `None` when the game is unknown.
    pub async fn report_for_game(
        &self,
        owner_id: &str,
        game_id: &str,
        tracked: PieceColor,
    ) -> Result<Option<GameReport>, RepertoireError> {
        let Some(record) = self.games.get_game(owner_id, game_id).await? else {
            debug!(owner = %owner_id, game = %game_id, "no such game");
            return Ok(None);
        };
        if let Some(report) = record.report {
            debug!(owner = %owner_id, game = %game_id, "serving cached report");
            return Ok(Some(report));
        }

        let report = self.analyze(owner_id, &record.game, tracked).await?;
        self.games.set_report(owner_id, game_id, &report).await?;
        info!(
            owner = %owner_id,
            game = %game_id,
            plies = record.game.moves.len(),
            failures = report.moves_report.iter().filter(|a| a.is_failed()).count(),
            "game analyzed"
        );
        Ok(Some(report))
    }

    /// Drop a cached report. Does not recompute anything; the next
    /// [`Self::report_for_game`] call does.
    pub async fn clean_game_report(
        &self,
        owner_id: &str,
        game_id: &str,
    ) -> Result<(), RepertoireError> {
        self.games.clean_report(owner_id, game_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::kv::MemoryKv;
    use crate::model::GameRecord;
    use crate::movetext::VariationNode;
    use board::{MoveDetail, MoveInput, START_FEN};
    use std::sync::Arc;
    use std::time::Duration;

    const OWNER: &str = "alice";

    fn setup() -> (RepertoireService<MemoryKv>, GameAnalyzer<MemoryKv>) {
        let positions = Arc::new(MemoryKv::new("owner_id", "fen"));
        let games = Arc::new(MemoryKv::new("owner_id", "game_id"));
        let service = RepertoireService::new(
            positions,
            StoreConfig::default().with_cache_ttl(Duration::ZERO),
        );
        let analyzer = GameAnalyzer::new(service.clone(), GameStore::new(games));
        (service, analyzer)
    }

    /// Replay SAN moves from the start position into game-move records.
    fn replay(sans: &[&str]) -> Vec<MoveDetail> {
        let mut fen = START_FEN.to_string();
        let mut moves = Vec::with_capacity(sans.len());
        for san in sans {
            let played = board::play(&fen, &MoveInput::San((*san).into())).unwrap();
            fen = played.after.clone();
            moves.push(played);
        }
        moves
    }

    fn game_of(sans: &[&str]) -> GameData {
        GameData {
            moves: replay(sans),
            white: None,
            black: None,
            opening: None,
            time_control: None,
            played_at: None,
        }
    }

    async fn import(service: &RepertoireService<MemoryKv>, sans: &[&str]) {
        let tree: Vec<VariationNode> = sans.iter().map(|s| VariationNode::new(*s)).collect();
        service
            .import_variation_tree(OWNER, PieceColor::White, START_FEN, &tree)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_first_move_off_book_is_failed() {
        let (service, analyzer) = setup();
        service
            .add_move(OWNER, START_FEN, &MoveInput::San("d4".into()), false)
            .await
            .unwrap();

        let game = game_of(&["e4", "e5"]);
        let report = analyzer
            .analyze(OWNER, &game, PieceColor::White)
            .await
            .unwrap();

        assert_eq!(
            report.moves_report[0],
            MoveAssessment::Failed {
                played: "e4".into(),
                expected: vec!["d4".into()],
            }
        );
        assert_eq!(report.moves_report[1], MoveAssessment::OpponentMove);
        assert_eq!(report.first_error.as_ref().unwrap().san, "e4");
        assert!(report.first_out_of_book.is_none());
    }

    #[tokio::test]
    async fn test_fully_booked_game_has_no_failures() {
        let (service, analyzer) = setup();
        import(&service, &["d4", "d5", "c4"]).await;

        let game = game_of(&["d4", "d5", "c4"]);
        let report = analyzer
            .analyze(OWNER, &game, PieceColor::White)
            .await
            .unwrap();

        assert_eq!(
            report.moves_report,
            vec![
                MoveAssessment::Success,
                MoveAssessment::OpponentMove,
                MoveAssessment::Success,
            ]
        );
        assert!(report.first_error.is_none());
        assert!(report.first_out_of_book.is_none());
    }

    #[tokio::test]
    async fn test_not_found_filtered_but_anchored_prefilter() {
        let (service, analyzer) = setup();
        import(&service, &["d4", "d5", "c4"]).await;

        // 2. e4 deviates; 3. Nc3 is then played from an unknown position.
        let game = game_of(&["d4", "d5", "e4", "e5", "Nc3"]);
        let report = analyzer
            .analyze(OWNER, &game, PieceColor::White)
            .await
            .unwrap();

        // not_found entries are dropped from the persisted sequence...
        assert_eq!(report.moves_report.len(), 4);
        assert!(!report.moves_report.iter().any(|a| a.is_not_found()));
        // ...but both anchors were taken against the unfiltered sequence.
        assert_eq!(report.first_error.as_ref().unwrap().san, "e4");
        assert_eq!(report.first_out_of_book.as_ref().unwrap().san, "Nc3");
        match &report.moves_report[2] {
            MoveAssessment::Failed { played, expected } => {
                assert_eq!(played, "e4");
                assert_eq!(expected, &vec!["c4".to_string()]);
            }
            other => panic!("expected failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tracked_black_ignores_white_moves() {
        let (service, analyzer) = setup();
        // A black repertoire answering 1. d4 with 1... Nf6.
        let tree = vec![VariationNode::new("d4"), VariationNode::new("Nf6")];
        service
            .import_variation_tree(OWNER, PieceColor::Black, START_FEN, &tree)
            .await
            .unwrap();

        let game = game_of(&["d4", "Nf6"]);
        let report = analyzer
            .analyze(OWNER, &game, PieceColor::Black)
            .await
            .unwrap();
        assert_eq!(
            report.moves_report,
            vec![MoveAssessment::OpponentMove, MoveAssessment::Success]
        );
    }

    #[tokio::test]
    async fn test_report_cached_until_cleaned() {
        let (service, analyzer) = setup();
        import(&service, &["d4"]).await;

        let record = GameRecord {
            owner_id: OWNER.into(),
            game_id: "g1".into(),
            game: game_of(&["e4"]),
            report: None,
        };
        analyzer.games().put_game(&record).await.unwrap();

        let first = analyzer
            .report_for_game(OWNER, "g1", PieceColor::White)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.first_error.as_ref().unwrap().san, "e4");

        // Change the book so a recomputation would differ...
        service.delete_move(OWNER, START_FEN, "d2d4", false).await.unwrap();
        service
            .add_move(OWNER, START_FEN, &MoveInput::San("e4".into()), false)
            .await
            .unwrap();
        // ...the cached report is served untouched.
        let cached = analyzer
            .report_for_game(OWNER, "g1", PieceColor::White)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached, first);

        // Invalidation alone does not recompute.
        analyzer.clean_game_report(OWNER, "g1").await.unwrap();
        let stored = analyzer.games().get_game(OWNER, "g1").await.unwrap().unwrap();
        assert!(stored.report.is_none());

        // The next request recomputes and re-persists.
        let recomputed = analyzer
            .report_for_game(OWNER, "g1", PieceColor::White)
            .await
            .unwrap()
            .unwrap();
        assert!(recomputed.first_error.is_none());
        assert_eq!(recomputed.moves_report, vec![MoveAssessment::Success]);
    }

    #[tokio::test]
    async fn test_unknown_game_is_none() {
        let (_, analyzer) = setup();
        assert!(analyzer
            .report_for_game(OWNER, "missing", PieceColor::White)
            .await
            .unwrap()
            .is_none());
    }
}
