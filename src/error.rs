use thiserror::Error;

#[derive(Error, Debug)]
pub enum KingError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid character code: {0}")]
    InvalidCharacterCode(char),

    #[error("Invalid floor: {0}")]
    InvalidFloor(i64),

    #[error("Invalid board line: {0}")]
    InvalidBoardLine(String),

    #[error("Invalid turn header: {0}")]
    InvalidTurnHeader(String),

    #[error("Invalid phase code: {0}")]
    InvalidPhaseCode(String),

    #[error("Invalid player record: {0}")]
    InvalidPlayerRecord(String),

    #[error("Player {0} is not in the roster")]
    UnknownPlayer(i64),

    #[error("Hand needs {need} favorite characters, got {got}")]
    IncompleteHand { need: usize, got: usize },

    #[error("Invalid wire move: {0}")]
    InvalidWireMove(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type KingResult<T> = Result<T, KingError>;
