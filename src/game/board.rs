use super::coord::{Coord, BOARD_SIZE, DIRECTIONS};
use super::piece::Piece;
use std::fmt;

const SIZE: usize = BOARD_SIZE as usize;

/// Outcome of one capture pass around a destination cell
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    /// Cells emptied by this pass, the King's cell included
    pub cells: Vec<Coord>,
    pub king_captured: bool,
}

/// A 9x9 grid holding at most one piece per cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    /// cells[row][col]; row 0 is the top of the board
    cells: [[Option<Piece>; SIZE]; SIZE],
}

impl Board {
    /// Create a board with the standard starting layout
    pub fn new() -> Self {
        let mut board = Self::empty();
        board.setup_starting_position();
        board
    }

    /// Create a board with no pieces (for building positions by hand)
    pub fn empty() -> Self {
        Self {
            cells: [[None; SIZE]; SIZE],
        }
    }

    pub fn get(&self, at: Coord) -> Option<Piece> {
        self.cells[at.row() as usize][at.col() as usize]
    }

    pub fn set(&mut self, at: Coord, piece: Option<Piece>) {
        self.cells[at.row() as usize][at.col() as usize] = piece;
    }

    /// Remove and return the piece at `at`
    pub fn take(&mut self, at: Coord) -> Option<Piece> {
        self.cells[at.row() as usize][at.col() as usize].take()
    }

    pub fn is_empty_at(&self, at: Coord) -> bool {
        self.get(at).is_none()
    }

    /// Occupied cells with their pieces, row by row
    pub fn pieces(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        Coord::all().filter_map(move |at| self.get(at).map(|piece| (at, piece)))
    }

    pub fn count(&self, kind: Piece) -> usize {
        self.pieces().filter(|(_, piece)| *piece == kind).count()
    }

    pub fn king_position(&self) -> Option<Coord> {
        self.pieces()
            .find(|(_, piece)| piece.is_king())
            .map(|(at, _)| at)
    }

    /// King in the centre, eight Defenders on the surrounding ring, and a T of four
    /// Attackers on each edge: the midpoint plus its free orthogonal neighbours.
    fn setup_starting_position(&mut self) {
        self.cells = [[None; SIZE]; SIZE];

        let center = Coord::center();
        self.set(center, Some(Piece::King));

        for dr in -1i8..=1 {
            for dc in -1i8..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                if let Some(at) = center.step((dr, dc), 1) {
                    self.set(at, Some(Piece::Defender));
                }
            }
        }

        let mid = BOARD_SIZE / 2;
        let last = BOARD_SIZE - 1;
        let edge_midpoints = [
            Coord::new_unchecked(0, mid),
            Coord::new_unchecked(last, mid),
            Coord::new_unchecked(mid, 0),
            Coord::new_unchecked(mid, last),
        ];

        for midpoint in edge_midpoints {
            let group: Vec<Coord> = std::iter::once(midpoint)
                .chain(midpoint.neighbors())
                .collect();
            for at in group {
                if self.is_empty_at(at) {
                    self.set(at, Some(Piece::Attacker));
                }
            }
        }
    }

    /// Destinations reachable from `from`: rook-like slides along the four orthogonal
    /// rays, stopping before the first occupied cell. Attackers never land on a corner.
    pub fn valid_moves(&self, from: Coord) -> Vec<Coord> {
        let piece = match self.get(from) {
            Some(piece) => piece,
            None => return Vec::new(),
        };

        let mut moves = Vec::new();
        for dir in DIRECTIONS {
            for distance in 1..BOARD_SIZE {
                let Some(to) = from.step(dir, distance) else {
                    break;
                };
                if !self.is_empty_at(to) {
                    break;
                }
                if piece == Piece::Attacker && to.is_corner() {
                    continue;
                }
                moves.push(to);
            }
        }
        moves
    }

    /// Resolve captures caused by the piece that just arrived on `at`.
    ///
    /// Each orthogonal neighbour holding an opposing piece is examined. An ordinary piece
    /// is removed when the cell beyond it holds a piece of the mover's side. The King is
    /// judged by [`Board::king_is_captured`] instead.
    pub fn resolve_captures(&mut self, at: Coord) -> Captures {
        let mut captures = Captures::default();
        let side = match self.get(at) {
            Some(piece) => piece.side(),
            None => return captures,
        };

        for dir in DIRECTIONS {
            let Some(target_at) = at.step(dir, 1) else {
                continue;
            };
            let Some(target) = self.get(target_at) else {
                continue;
            };
            if target.side() == side {
                continue;
            }

            if target.is_king() {
                if self.king_is_captured(target_at) {
                    self.set(target_at, None);
                    captures.cells.push(target_at);
                    captures.king_captured = true;
                }
                continue;
            }

            let flanked = target_at
                .step(dir, 1)
                .and_then(|beyond| self.get(beyond))
                .is_some_and(|flank| flank.side() == side);
            if flanked {
                self.set(target_at, None);
                captures.cells.push(target_at);
            }
        }
        captures
    }

    /// King-capture rule, selected by where the King stands:
    /// - castle: all four neighbours are Attackers
    /// - throne: at least three neighbours are Attackers or the empty castle
    /// - elsewhere: Attackers on two opposite sides
    pub fn king_is_captured(&self, king: Coord) -> bool {
        let is_attacker = |at: Coord| self.get(at) == Some(Piece::Attacker);

        if king.is_castle() {
            return king.neighbors().filter(|&at| is_attacker(at)).count() == 4;
        }

        if king.is_throne() {
            let hostile = king
                .neighbors()
                .filter(|&at| is_attacker(at) || (at.is_castle() && self.is_empty_at(at)))
                .count();
            return hostile >= 3;
        }

        [(1i8, 0i8), (0, 1)].iter().any(|&(dr, dc)| {
            let one = king.step((dr, dc), 1);
            let other = king.step((-dr, -dc), 1);
            matches!((one, other), (Some(a), Some(b)) if is_attacker(a) && is_attacker(b))
        })
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let symbol = self
                    .get(Coord::new_unchecked(row, col))
                    .map_or('.', |piece| piece.symbol());
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
