//! Board and move-engine wrapper for the repertoire graph.
//!
//! cozy-chess types are internal implementation details; everything crossing
//! this crate's boundary is a string (FEN, SAN, LAN) or a project-owned type.

pub mod error;
pub mod fen;
pub mod moves;
pub mod san;
pub mod types;

pub use error::BoardError;
pub use fen::{format_fen, normalize, parse_fen, side_to_move, START_FEN};
pub use moves::{legal_moves, play, san_for_lan, MoveDetail, MoveInput};
pub use san::{find_san, format_san};
pub use types::{PieceColor, PieceKind};
