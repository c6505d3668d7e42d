use crate::game::Coord;
use regex::Regex;

const ROOM_CODE_PATTERN: &str = r"^[0-9]{1,4}$";
const NICKNAME_PATTERN: &str = r"^[A-Za-z0-9_\- ]{1,16}$";
const CELL_PATTERN: &str = r"^([0-8])\s*[, ]\s*([0-8])$";

/// Rejected user input
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid room code '{0}': use 1 to 4 digits")]
    InvalidRoomCode(String),

    #[error("Invalid name '{0}': use 1 to 16 letters, digits, '_', '-' or spaces")]
    InvalidNickname(String),

    #[error("Invalid cell '{0}': use 'row,col' or 'row col' with values 0 to 8")]
    InvalidCell(String),

    #[error("Bad validation pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Room codes typed by a player: 1 to 4 digits, surrounding whitespace ignored
pub fn validate_room_code(input: &str) -> ValidationResult<String> {
    let trimmed = input.trim();
    if Regex::new(ROOM_CODE_PATTERN)?.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidRoomCode(input.to_string()))
    }
}

/// Display names: 1 to 16 of letters, digits, `_`, `-` and space after trimming
pub fn validate_nickname(input: &str) -> ValidationResult<String> {
    let trimmed = input.trim();
    if Regex::new(NICKNAME_PATTERN)?.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::InvalidNickname(input.to_string()))
    }
}

/// A board cell typed as `row,col` or `row col`. The pattern keeps stray input out;
/// the cell itself is built by `Coord`'s own parser.
pub fn parse_cell(input: &str) -> ValidationResult<Coord> {
    let trimmed = input.trim();
    if !Regex::new(CELL_PATTERN)?.is_match(trimmed) {
        return Err(ValidationError::InvalidCell(input.to_string()));
    }
    trimmed
        .parse::<Coord>()
        .map_err(|_| ValidationError::InvalidCell(input.to_string()))
}
