//! Personal opening-repertoire graph store.
//!
//! Positions form a graph keyed by normalized FEN; edges are the moves the
//! owner intends to play (`book_moves`) and the replies recorded from the
//! other side (`opponent_moves`). On top of the store sit the batch
//! transposition linker and the game analyzer.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod kv;
pub mod linker;
pub mod model;
pub mod movetext;
pub mod service;
pub mod store;

pub use analyzer::GameAnalyzer;
pub use config::StoreConfig;
pub use error::{KvError, RepertoireError, StoreError};
pub use kv::{ItemKey, KeyValueStore, MemoryKv, ScanCursor, ScanPage};
pub use linker::{LinkReport, TranspositionLinker};
pub use model::{
    BookEdge, CommentSlot, EdgeKind, GameData, GameRecord, GameReport, MoveAssessment,
    PositionRecord,
};
pub use movetext::{ImportSummary, VariationNode};
pub use service::RepertoireService;
pub use store::{GameStore, PositionScan, PositionStore};
