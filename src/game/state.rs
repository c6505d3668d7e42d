use super::board::Board;
use super::coord::Coord;
use super::error::GameError;
use super::moves::Move;
use super::piece::{Piece, Side};

/// What a successful move did. Callers decide whether to transmit `mv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEvent {
    pub mv: Move,
    pub piece: Piece,
    /// Cells emptied by captures, in the order they were resolved
    pub captured: Vec<Coord>,
    /// Set when this move ended the game
    pub winner: Option<Side>,
    /// Side to move after this one
    pub next_turn: Side,
}

impl MoveEvent {
    pub fn is_game_over(&self) -> bool {
        self.winner.is_some()
    }
}

/// Board plus turn and result tracking. The board is only mutated through moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    turn: Side,
    game_over: bool,
    winner: Option<Side>,
    /// Presentation hint only
    selected: Option<Coord>,
}

impl GameState {
    /// Standard layout, Defenders to move
    pub fn new() -> Self {
        Self::with_turn(Side::Defender)
    }

    /// Standard layout with a chosen opening side
    pub fn with_turn(turn: Side) -> Self {
        Self::from_board(Board::new(), turn)
    }

    /// Start from an arbitrary position
    pub fn from_board(board: Board, turn: Side) -> Self {
        let mut state = Self {
            board,
            turn,
            game_over: false,
            winner: None,
            selected: None,
        };
        state.evaluate_win();
        state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Side {
        self.turn
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    pub fn selected(&self) -> Option<Coord> {
        self.selected
    }

    pub fn select(&mut self, cell: Option<Coord>) {
        self.selected = cell;
    }

    pub fn valid_moves(&self, from: Coord) -> Vec<Coord> {
        self.board.valid_moves(from)
    }

    /// Legal destinations for the current selection
    pub fn selection_moves(&self) -> Vec<Coord> {
        self.selected
            .map(|cell| self.valid_moves(cell))
            .unwrap_or_default()
    }

    /// Apply a move if `to` is among `valid_moves(from)`.
    ///
    /// Returns `None` without touching the state otherwise. On success the piece is
    /// relocated, captures are resolved around `to`, the win conditions are evaluated and
    /// the turn flips.
    pub fn apply_move(&mut self, from: Coord, to: Coord) -> Option<MoveEvent> {
        if !self.valid_moves(from).contains(&to) {
            return None;
        }

        let piece = self.board.take(from)?;
        self.board.set(to, Some(piece));

        // An escaping King ends the game before any capture is considered
        let captured = if piece.is_king() && to.is_edge() {
            Vec::new()
        } else {
            let captures = self.board.resolve_captures(to);
            if captures.king_captured {
                self.game_over = true;
                self.winner = Some(Side::Attacker);
            }
            captures.cells
        };

        self.evaluate_win();
        self.turn = self.turn.opposite();

        Some(MoveEvent {
            mv: Move::new_unchecked(from, to),
            piece,
            captured,
            winner: self.winner,
            next_turn: self.turn,
        })
    }

    /// A move made by the local player: the game must be running and the piece must
    /// belong to the side to move.
    pub fn propose_move(&mut self, from: Coord, to: Coord) -> Result<MoveEvent, GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }

        let piece = self
            .board
            .get(from)
            .ok_or_else(|| GameError::IllegalMove(format!("No piece at {}", from)))?;

        if piece.side() != self.turn {
            return Err(GameError::NotYourTurn(format!(
                "{} is to move, {} belongs to {}",
                self.turn,
                from,
                piece.side()
            )));
        }

        self.apply_move(from, to)
            .ok_or_else(|| GameError::IllegalMove(format!("{} cannot reach {}", from, to)))
    }

    /// A move relayed from the opponent. Turn ownership is not checked since the relay
    /// does not enforce it, but the geometry is: a move this board cannot play is rejected
    /// and leaves the state untouched.
    pub fn receive_remote_move(&mut self, mv: Move) -> Result<MoveEvent, GameError> {
        if self.game_over {
            return Err(GameError::RemoteMoveRejected(format!(
                "{} arrived after the game ended",
                mv
            )));
        }

        self.apply_move(mv.from, mv.to).ok_or_else(|| {
            GameError::RemoteMoveRejected(format!("{} is not legal on this board", mv))
        })
    }

    /// King on an edge: Defenders win. No King left: Attackers win.
    fn evaluate_win(&mut self) {
        match self.board.king_position() {
            Some(king) if king.is_edge() => {
                self.game_over = true;
                self.winner = Some(Side::Defender);
            }
            Some(_) => {}
            None => {
                self.game_over = true;
                self.winner = Some(Side::Attacker);
            }
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
