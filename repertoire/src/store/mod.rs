mod cache;
mod game_store;
mod position_store;

pub(crate) use cache::TtlCache;

pub use game_store::GameStore;
pub use position_store::{PositionScan, PositionStore};
