use serde::{Deserialize, Serialize};
use std::fmt;

/// A faction. Sides travel on the wire as `"DEFENDER"` / `"ATTACKER"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Defender,
    Attacker,
}

impl Side {
    /// Opposite side
    pub fn opposite(&self) -> Side {
        match self {
            Side::Defender => Side::Attacker,
            Side::Attacker => Side::Defender,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Defender => write!(f, "DEFENDER"),
            Side::Attacker => write!(f, "ATTACKER"),
        }
    }
}

/// Pieces have no identity beyond their kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Piece {
    King,
    Defender,
    Attacker,
}

impl Piece {
    /// The side that controls this piece
    pub fn side(&self) -> Side {
        match self {
            Piece::King | Piece::Defender => Side::Defender,
            Piece::Attacker => Side::Attacker,
        }
    }

    pub fn is_king(&self) -> bool {
        matches!(self, Piece::King)
    }

    pub fn symbol(&self) -> char {
        match self {
            Piece::King => 'K',
            Piece::Defender => 'D',
            Piece::Attacker => 'A',
        }
    }
}

impl fmt::Display for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
