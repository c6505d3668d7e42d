//! Presentation state for one match.
//!
//! The controller turns cell clicks into engine calls, gated by whose turn it is and which
//! pieces the local player controls, and folds relay messages into the game and the status
//! line. It never touches the network: a local move comes back as a [`ClickOutcome::Moved`]
//! for the caller to transmit, while moves applied from [`MatchController::handle_message`]
//! are never offered for transmission.

use crate::game::{Coord, GameError, GameState, Move, MoveEvent, Piece, Side};
use crate::messages::Message;
use tracing::{debug, warn};

/// Who the local player controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Pass-and-play: whoever's turn it is owns the pieces of that side
    Local,
    /// Fixed side assigned by the relay, unknown until `start`
    Online { side: Option<Side> },
}

/// What a click did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// A local move was played; send `event.mv` to the opponent when online
    Moved(MoveEvent),
    Selected(Coord),
    /// Selection dropped
    Cleared,
    /// Input is not accepted right now
    Ignored,
}

#[derive(Debug, Clone)]
pub struct MatchController {
    state: GameState,
    mode: Mode,
    my_name: String,
    opponent_name: Option<String>,
    waiting: bool,
    message: Option<String>,
}

impl MatchController {
    pub fn local() -> Self {
        Self {
            state: GameState::new(),
            mode: Mode::Local,
            my_name: "You".to_string(),
            opponent_name: Some("Friend".to_string()),
            waiting: false,
            message: Some("Local match: Defenders start".to_string()),
        }
    }

    /// Waits for the relay to pair us before accepting clicks
    pub fn online(my_name: impl Into<String>) -> Self {
        Self {
            state: GameState::new(),
            mode: Mode::Online { side: None },
            my_name: my_name.into(),
            opponent_name: None,
            waiting: true,
            message: None,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn opponent_name(&self) -> Option<&str> {
        self.opponent_name.as_deref()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Latest event text shown after the status line
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Whether clicks are accepted right now
    pub fn can_act(&self) -> bool {
        if self.state.is_game_over() || self.waiting {
            return false;
        }
        match self.mode {
            Mode::Local => true,
            Mode::Online { side } => side == Some(self.state.turn()),
        }
    }

    fn owns(&self, piece: Option<Piece>) -> bool {
        let Some(piece) = piece else {
            return false;
        };
        match self.mode {
            Mode::Local => piece.side() == self.state.turn(),
            Mode::Online { side } => side == Some(piece.side()),
        }
    }

    /// Handle a click on `cell`.
    ///
    /// With nothing selected, an owned piece becomes the selection. With a selection, a
    /// legal destination plays the move; any other cell re-selects or clears.
    pub fn click(&mut self, cell: Coord) -> ClickOutcome {
        if !self.can_act() {
            return ClickOutcome::Ignored;
        }

        if let Some(from) = self.state.selected() {
            let piece = self.state.board().get(from);
            if self.owns(piece) && self.state.valid_moves(from).contains(&cell) {
                match self.state.propose_move(from, cell) {
                    Ok(event) => {
                        self.state.select(None);
                        return ClickOutcome::Moved(event);
                    }
                    Err(e) => debug!("Move refused: {}", e),
                }
            }
        }

        if self.owns(self.state.board().get(cell)) {
            self.state.select(Some(cell));
            ClickOutcome::Selected(cell)
        } else {
            self.state.select(None);
            ClickOutcome::Cleared
        }
    }

    /// Fold one relay message into the match. Returns the event when it carried an
    /// opponent's move that was applied.
    pub fn handle_message(&mut self, message: Message) -> Option<MoveEvent> {
        match message {
            Message::Waiting { players } => {
                self.waiting = true;
                self.message = Some(format!(
                    "Waiting for opponent... ({})",
                    players.join(", ")
                ));
            }
            Message::Joined { name } => {
                self.waiting = true;
                self.message = Some(format!("{} joined. Waiting for opponent...", name));
            }
            Message::Start {
                your_side,
                current_player,
                opponent_name,
            } => {
                self.state = GameState::with_turn(current_player);
                self.mode = Mode::Online {
                    side: Some(your_side),
                };
                self.message = Some(format!(
                    "You are {}. Opponent: {}",
                    your_side, opponent_name
                ));
                self.opponent_name = Some(opponent_name);
                self.waiting = false;
            }
            Message::Move { from, to } => {
                let mv = Move::new_unchecked(from, to);
                return match self.state.receive_remote_move(mv) {
                    Ok(event) => {
                        self.state.select(None);
                        Some(event)
                    }
                    Err(e) => {
                        self.report_desync(e);
                        None
                    }
                };
            }
            Message::OpponentLeft { name } => {
                self.waiting = true;
                self.opponent_name = None;
                self.state.select(None);
                self.message = Some(format!("{} left. Waiting for opponent...", name));
            }
            Message::Error { msg } => {
                self.message = Some(format!("Error: {}", msg));
            }
            Message::Full => {
                self.message = Some("Room is full".to_string());
            }
            Message::Join { .. } => {
                debug!("Ignoring join sent to a client");
            }
        }
        None
    }

    fn report_desync(&mut self, error: GameError) {
        warn!("Opponent move rejected: {}", error);
        self.message = Some(format!("Out of sync: {}", error));
    }

    /// One-line summary: result, waiting roster or turn, then the latest event
    pub fn status_line(&self) -> String {
        let line = if let Some(winner) = self.state.winner().filter(|_| self.state.is_game_over())
        {
            match winner {
                Side::Defender => "Defenders Win!".to_string(),
                Side::Attacker => "Attackers Win!".to_string(),
            }
        } else if self.waiting {
            let opp = self
                .opponent_name
                .as_ref()
                .map(|name| format!(" vs {}", name))
                .unwrap_or_default();
            format!("Waiting for opponent ({}){}...", self.my_name, opp)
        } else {
            let turn = format!("Turn: {}", self.state.turn());
            match self.mode {
                Mode::Local => format!("Local Pass-and-Play | {}", turn),
                Mode::Online { side } => {
                    let mine = side
                        .map(|side| format!("You are {}", side))
                        .unwrap_or_default();
                    let vs = self
                        .opponent_name
                        .as_ref()
                        .map(|name| format!(" vs {}", name))
                        .unwrap_or_default();
                    format!("{} | {}{}", turn, mine, vs)
                }
            }
        };

        match &self.message {
            Some(message) => format!("{} | {}", line, message),
            None => line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: u8, col: u8) -> Coord {
        Coord::new_unchecked(row, col)
    }

    fn started(side: Side) -> MatchController {
        let mut controller = MatchController::online("Astrid");
        controller.handle_message(Message::Start {
            your_side: side,
            current_player: Side::Defender,
            opponent_name: "Bjorn".to_string(),
        });
        controller
    }

    #[test]
    fn test_local_select_then_move() {
        let mut controller = MatchController::local();
        // Attackers cannot be picked while Defenders are to move
        assert_eq!(controller.click(at(0, 4)), ClickOutcome::Cleared);
        assert_eq!(controller.click(at(3, 3)), ClickOutcome::Selected(at(3, 3)));

        let ClickOutcome::Moved(event) = controller.click(at(2, 3)) else {
            panic!("expected a move");
        };
        assert_eq!(event.next_turn, Side::Attacker);
        assert_eq!(controller.state().selected(), None);
        assert_eq!(controller.state().turn(), Side::Attacker);
    }

    #[test]
    fn test_illegal_destination_reselects_or_clears() {
        let mut controller = MatchController::local();
        controller.click(at(3, 3));
        assert_eq!(controller.click(at(3, 5)), ClickOutcome::Selected(at(3, 5)));
        assert_eq!(controller.click(at(8, 8)), ClickOutcome::Cleared);
        assert_eq!(controller.state().turn(), Side::Defender);
    }

    #[test]
    fn test_online_clicks_wait_for_start_and_turn() {
        let mut controller = MatchController::online("Astrid");
        assert_eq!(controller.click(at(3, 3)), ClickOutcome::Ignored);

        let mut attacker = started(Side::Attacker);
        assert_eq!(attacker.click(at(0, 4)), ClickOutcome::Ignored);

        let mut defender = started(Side::Defender);
        assert_eq!(defender.click(at(3, 3)), ClickOutcome::Selected(at(3, 3)));
    }

    #[test]
    fn test_remote_move_is_applied_but_not_offered_for_sending() {
        let mut controller = started(Side::Attacker);
        let event = controller
            .handle_message(Message::Move {
                from: at(3, 3),
                to: at(2, 3),
            })
            .unwrap();
        assert_eq!(event.next_turn, Side::Attacker);
        assert_eq!(controller.state().board().get(at(2, 3)), Some(Piece::Defender));
        assert!(controller.can_act());
    }

    #[test]
    fn test_rejected_remote_move_reports_desync() {
        let mut controller = started(Side::Attacker);
        let before = controller.state().clone();
        assert!(controller
            .handle_message(Message::Move {
                from: at(4, 4),
                to: at(0, 0),
            })
            .is_none());
        assert_eq!(controller.state(), &before);
        assert!(controller.status_line().contains("Out of sync"));
    }

    #[test]
    fn test_status_lines() {
        let local = MatchController::local();
        assert_eq!(
            local.status_line(),
            "Local Pass-and-Play | Turn: DEFENDER | Local match: Defenders start"
        );

        let mut online = MatchController::online("Astrid");
        assert_eq!(online.status_line(), "Waiting for opponent (Astrid)...");
        online.handle_message(Message::Waiting {
            players: vec!["Astrid".to_string()],
        });
        assert_eq!(
            online.status_line(),
            "Waiting for opponent (Astrid)... | Waiting for opponent... (Astrid)"
        );

        let mut online = started(Side::Attacker);
        assert_eq!(
            online.status_line(),
            "Turn: DEFENDER | You are ATTACKER vs Bjorn | You are ATTACKER. Opponent: Bjorn"
        );

        online.handle_message(Message::OpponentLeft {
            name: "Bjorn".to_string(),
        });
        assert!(online.is_waiting());
        assert_eq!(online.opponent_name(), None);
        assert_eq!(
            online.status_line(),
            "Waiting for opponent (Astrid)... | Bjorn left. Waiting for opponent..."
        );

        online.handle_message(Message::Full);
        assert!(online.status_line().ends_with("| Room is full"));
        online.handle_message(Message::new_error("bad join"));
        assert!(online.status_line().ends_with("| Error: bad join"));
    }
}
