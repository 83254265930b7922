//! Batch transposition linker.
//!
//! Different move orders can reach the same normalized position; the
//! move-by-move records then miss the connecting opponent edges. This job
//! rebuilds them for one owner in two strict passes: index everything, then
//! link. Indexing must finish first because a transposition target may be
//! scanned after its source; a single streaming pass could miss it.
//!
//! Cost is O(positions x legal moves per position). This is an explicitly
//! user-triggered batch operation, never run automatically or incrementally.

use std::collections::HashMap;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::RepertoireError;
use crate::kv::KeyValueStore;
use crate::model::{EdgeKind, PositionRecord};
use crate::store::PositionStore;

/// Outcome counters. The three classification counters sum to the total
/// number of legal moves enumerated across all scanned positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    pub new_transposition: u32,
    pub already_registered: u32,
    pub leads_to_unknown_position: u32,
    pub position_scanned: u32,
}

pub struct TranspositionLinker<K: KeyValueStore> {
    positions: PositionStore<K>,
}

impl<K: KeyValueStore> TranspositionLinker<K> {
    pub fn new(positions: PositionStore<K>) -> Self {
        Self { positions }
    }

    pub async fn run(&self, owner_id: &str) -> Result<LinkReport, RepertoireError> {
        // Index pass: sequential full scan, single cursor.
        let mut index: HashMap<String, PositionRecord> = HashMap::new();
        let mut scan = self.positions.scan_all(owner_id);
        while let Some(page) = scan.next_page().await? {
            for record in page {
                index.insert(record.fen.clone(), record);
            }
        }
        let mut report = LinkReport {
            position_scanned: index.len() as u32,
            ..LinkReport::default()
        };
        debug!(owner = %owner_id, positions = index.len(), "index pass complete");

        // Link pass: every legal move from every indexed position, not just
        // the recorded ones.
        for position in index.values() {
            let mut pending: Vec<(String, String)> = Vec::new();
            for mv in board::legal_moves(&position.fen)? {
                if position.opponent_moves.contains_key(&mv.lan) {
                    report.already_registered += 1;
                    continue;
                }
                let target = board::normalize(&mv.after)?;
                match index.get(&target) {
                    // A known line from the owner's perspective, reached by
                    // a move order we never recorded: a transposition.
                    Some(known) if !known.book_moves.is_empty() => {
                        report.new_transposition += 1;
                        pending.push((mv.lan, target));
                    }
                    _ => report.leads_to_unknown_position += 1,
                }
            }
            if pending.is_empty() {
                continue;
            }
            // Each write targets its own (position, move-code) cell; dispatch
            // them together and await the batch.
            try_join_all(pending.iter().map(|(code, target)| {
                self.positions
                    .upsert_edge(owner_id, &position.fen, code, EdgeKind::Opponent, target)
            }))
            .await?;
            debug!(owner = %owner_id, fen = %position.fen, links = pending.len(), "transpositions linked");
        }

        info!(
            owner = %owner_id,
            new = report.new_transposition,
            known = report.already_registered,
            unknown = report.leads_to_unknown_position,
            scanned = report.position_scanned,
            "transposition scan complete"
        );
        Ok(report)
    }
}
