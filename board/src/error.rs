use thiserror::Error;

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Invalid FEN: {0}")]
    InvalidFen(String),
    #[error("Illegal move {mv} in position {fen}")]
    IllegalMove { fen: String, mv: String },
}
