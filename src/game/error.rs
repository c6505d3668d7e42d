use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    InvalidCoord(String),
    IllegalMove(String),
    NotYourTurn(String),
    GameOver,
    RemoteMoveRejected(String),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::InvalidCoord(msg) => write!(f, "Invalid coordinate: {}", msg),
            GameError::IllegalMove(msg) => write!(f, "Illegal move: {}", msg),
            GameError::NotYourTurn(msg) => write!(f, "Not your turn: {}", msg),
            GameError::GameOver => write!(f, "The game is already over"),
            GameError::RemoteMoveRejected(msg) => write!(f, "Rejected remote move: {}", msg),
        }
    }
}

impl std::error::Error for GameError {}
