use super::error::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side length of the square board.
pub const BOARD_SIZE: u8 = 9;

/// Orthogonal unit steps as (row delta, column delta): up, down, left, right.
pub const DIRECTIONS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// A board cell. On the wire a coordinate is the array `[row, col]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "[u8; 2]", try_from = "[u8; 2]")]
pub struct Coord {
    row: u8, // 0 = top
    col: u8, // 0 = left
}

impl Coord {
    pub fn new(row: u8, col: u8) -> Result<Self, GameError> {
        if row >= BOARD_SIZE {
            return Err(GameError::InvalidCoord(format!(
                "Row must be 0-{}, got {}",
                BOARD_SIZE - 1,
                row
            )));
        }
        if col >= BOARD_SIZE {
            return Err(GameError::InvalidCoord(format!(
                "Column must be 0-{}, got {}",
                BOARD_SIZE - 1,
                col
            )));
        }

        Ok(Self { row, col })
    }

    /// Create a coordinate without validation (for internal use when bounds are guaranteed)
    pub const fn new_unchecked(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> u8 {
        self.row
    }

    pub fn col(&self) -> u8 {
        self.col
    }

    /// The castle: the single center cell
    pub const fn center() -> Self {
        Self::new_unchecked(BOARD_SIZE / 2, BOARD_SIZE / 2)
    }

    pub fn is_castle(&self) -> bool {
        *self == Self::center()
    }

    /// The castle plus its four orthogonal neighbours
    pub fn is_throne(&self) -> bool {
        let center = Self::center();
        let dr = self.row.abs_diff(center.row);
        let dc = self.col.abs_diff(center.col);
        dr + dc <= 1
    }

    pub fn is_edge(&self) -> bool {
        self.row == 0 || self.col == 0 || self.row == BOARD_SIZE - 1 || self.col == BOARD_SIZE - 1
    }

    pub fn is_corner(&self) -> bool {
        let last = BOARD_SIZE - 1;
        (self.row == 0 || self.row == last) && (self.col == 0 || self.col == last)
    }

    /// Step `distance` cells in direction `(dr, dc)`, or `None` when that leaves the board
    pub fn step(&self, (dr, dc): (i8, i8), distance: u8) -> Option<Coord> {
        let row = self.row as i16 + dr as i16 * distance as i16;
        let col = self.col as i16 + dc as i16 * distance as i16;
        let size = BOARD_SIZE as i16;
        if (0..size).contains(&row) && (0..size).contains(&col) {
            Some(Coord::new_unchecked(row as u8, col as u8))
        } else {
            None
        }
    }

    /// Orthogonal neighbours that lie on the board
    pub fn neighbors(&self) -> impl Iterator<Item = Coord> + '_ {
        DIRECTIONS.iter().filter_map(move |&dir| self.step(dir, 1))
    }

    /// All cells, row by row
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..BOARD_SIZE).flat_map(|row| (0..BOARD_SIZE).map(move |col| Coord { row, col }))
    }
}

impl From<Coord> for [u8; 2] {
    fn from(coord: Coord) -> Self {
        [coord.row, coord.col]
    }
}

impl TryFrom<[u8; 2]> for Coord {
    type Error = GameError;

    fn try_from([row, col]: [u8; 2]) -> Result<Self, Self::Error> {
        Coord::new(row, col)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// Parses `row,col` or `row col`. Out-of-range values are rejected by [`Coord::new`].
impl FromStr for Coord {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(GameError::InvalidCoord(format!(
                "Expected 'row,col' (e.g. '4,2'), got '{}'",
                s
            )));
        }

        let parse = |part: &str| {
            part.parse::<u8>().map_err(|_| {
                GameError::InvalidCoord(format!("'{}' is not a number between 0 and 8", part))
            })
        };

        Coord::new(parse(parts[0])?, parse(parts[1])?)
    }
}
