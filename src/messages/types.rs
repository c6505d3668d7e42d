use crate::game::{Coord, Move, Side};
use serde::{Deserialize, Deserializer, Serialize};

/// Name used when a `join` omits one
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Every message exchanged between session clients and the relay.
///
/// Encoded as one JSON object per line with a `"type"` tag, e.g.
/// `{"type":"move","from":[4,2],"to":[4,0]}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Join {
        #[serde(deserialize_with = "room_code")]
        room: String,
        #[serde(default = "default_player_name")]
        name: String,
    },
    Waiting {
        players: Vec<String>,
    },
    Joined {
        name: String,
    },
    Start {
        your_side: Side,
        current_player: Side,
        opponent_name: String,
    },
    Move {
        from: Coord,
        to: Coord,
    },
    OpponentLeft {
        name: String,
    },
    Error {
        msg: String,
    },
    Full,
}

impl Message {
    pub fn new_join(room: impl Into<String>, name: impl Into<String>) -> Self {
        Message::Join {
            room: room.into(),
            name: name.into(),
        }
    }

    pub fn new_move(mv: Move) -> Self {
        Message::Move {
            from: mv.from,
            to: mv.to,
        }
    }

    pub fn new_error(msg: impl Into<String>) -> Self {
        Message::Error { msg: msg.into() }
    }

    /// The move carried by a `move` message
    pub fn as_move(&self) -> Option<Move> {
        match self {
            Message::Move { from, to } => Some(Move::new_unchecked(*from, *to)),
            _ => None,
        }
    }

    /// Get the message type as it appears on the wire
    pub fn message_type(&self) -> &'static str {
        match self {
            Message::Join { .. } => "join",
            Message::Waiting { .. } => "waiting",
            Message::Joined { .. } => "joined",
            Message::Start { .. } => "start",
            Message::Move { .. } => "move",
            Message::OpponentLeft { .. } => "opponent_left",
            Message::Error { .. } => "error",
            Message::Full => "full",
        }
    }
}

impl From<Move> for Message {
    fn from(mv: Move) -> Self {
        Message::new_move(mv)
    }
}

fn default_player_name() -> String {
    DEFAULT_PLAYER_NAME.to_string()
}

/// Room codes are opaque strings, but clients may send them as JSON numbers.
fn room_code<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRoom {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawRoom::deserialize(deserializer)? {
        RawRoom::Text(text) => text,
        RawRoom::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_shape() {
        let msg = Message::new_join("1234", "Ragnar");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "join", "room": "1234", "name": "Ragnar"})
        );
        assert_eq!(msg.message_type(), "join");
    }

    #[test]
    fn test_join_accepts_numeric_room_and_missing_name() {
        let msg: Message = serde_json::from_str(r#"{"type":"join","room":42}"#).unwrap();
        assert_eq!(msg, Message::new_join("42", DEFAULT_PLAYER_NAME));
    }

    #[test]
    fn test_start_uses_uppercase_sides() {
        let msg = Message::Start {
            your_side: Side::Attacker,
            current_player: Side::Defender,
            opponent_name: "Bjorn".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "start",
                "your_side": "ATTACKER",
                "current_player": "DEFENDER",
                "opponent_name": "Bjorn"
            })
        );
    }

    #[test]
    fn test_full_has_no_fields() {
        assert_eq!(serde_json::to_string(&Message::Full).unwrap(), r#"{"type":"full"}"#);
        let msg: Message = serde_json::from_str(r#"{"type":"full"}"#).unwrap();
        assert_eq!(msg, Message::Full);
    }

    #[test]
    fn test_move_roundtrip_through_as_move() {
        let msg: Message =
            serde_json::from_str(r#"{"type":"move","from":[4,2],"to":[4,0]}"#).unwrap();
        let mv = msg.as_move().unwrap();
        assert_eq!(mv.from, Coord::new_unchecked(4, 2));
        assert_eq!(mv.to, Coord::new_unchecked(4, 0));
        assert_eq!(Message::from(mv), msg);
        assert!(Message::Full.as_move().is_none());
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"type":"chat","text":"hi"}"#).is_err());
        assert!(serde_json::from_str::<Message>(r#"{"type":"move","from":[9,9],"to":[0,0]}"#).is_err());
    }
}
