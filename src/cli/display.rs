use crate::cli::controller::MatchController;
use crate::game::{Coord, GameState, BOARD_SIZE};
use std::io::{self, Write};

const LEGEND: &str =
    "K king  D defender  A attacker  + castle  # corner  * legal move  lowercase = selected";

/// Symbol for one cell given the current selection and its legal destinations
fn cell_symbol(state: &GameState, at: Coord, targets: &[Coord]) -> char {
    match state.board().get(at) {
        Some(piece) if state.selected() == Some(at) => piece.symbol().to_ascii_lowercase(),
        Some(piece) => piece.symbol(),
        None if targets.contains(&at) => '*',
        None if at.is_corner() => '#',
        None if at.is_castle() => '+',
        None => ' ',
    }
}

fn border(left: char, mid: char, right: char) -> String {
    let mut line = String::from("  ");
    line.push(left);
    for col in 0..BOARD_SIZE {
        line.push('─');
        line.push(if col + 1 < BOARD_SIZE { mid } else { right });
    }
    line
}

/// Board as a grid with row and column indices
pub fn render_board(state: &GameState) -> String {
    let targets = state.selection_moves();
    let mut lines = Vec::new();

    let header: String = (0..BOARD_SIZE).map(|col| format!(" {}", col)).collect();
    lines.push(format!("  {}", header));
    lines.push(border('┌', '┬', '┐'));

    for row in 0..BOARD_SIZE {
        let mut line = format!("{} │", row);
        for col in 0..BOARD_SIZE {
            line.push(cell_symbol(state, Coord::new_unchecked(row, col), &targets));
            line.push('│');
        }
        line.push_str(&format!(" {}", row));
        lines.push(line);

        if row + 1 < BOARD_SIZE {
            lines.push(border('├', '┼', '┤'));
        }
    }

    lines.push(border('└', '┴', '┘'));
    lines.push(format!("  {}", header));
    lines.join("\n")
}

/// Print the status line, the board and a short legend
pub fn display_match(controller: &MatchController) {
    println!();
    println!("{}", controller.status_line());
    println!("{}", render_board(controller.state()));
    println!("{}", LEGEND);
}

/// Input prompt shown below the board
pub fn prompt(controller: &MatchController) {
    if controller.can_act() {
        print!("cell (row,col) or 'quit'> ");
    } else {
        print!("'quit' to leave> ");
    }
    io::stdout().flush().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Board, Piece, Side};

    #[test]
    fn test_starting_board_rendering() {
        let rendered = render_board(&GameState::new());
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "   0 1 2 3 4 5 6 7 8");
        assert_eq!(lines[2], "0 │#│ │ │A│A│A│ │ │#│ 0");
        assert_eq!(lines[10], "4 │A│A│ │D│K│D│ │A│A│ 4");
    }

    #[test]
    fn test_selection_and_targets_are_marked() {
        let mut board = Board::empty();
        board.set(Coord::new_unchecked(4, 4), Some(Piece::King));
        board.set(Coord::new_unchecked(4, 2), Some(Piece::Attacker));
        let mut state = GameState::from_board(board, Side::Attacker);
        state.select(Some(Coord::new_unchecked(4, 2)));

        let rendered = render_board(&state);
        let row_four = rendered.lines().nth(10).unwrap();
        assert_eq!(row_four, "4 │*│*│a│*│K│ │ │ │ │ 4");
        // Attackers cannot reach corners, so those stay marked as corners
        assert!(rendered.lines().nth(2).unwrap().starts_with("0 │#│ │*│"));
    }
}
