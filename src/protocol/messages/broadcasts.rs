//! Protocol-compliant serializable structures for the server-to-client messages.

use std::time::Duration;

/// Enum wrapping the various server-to-client messages introduced in the Protocol Version 1.
#[derive(Clone)]
pub enum ServerToClientMessage {
    PositionUpdate(PositionUpdateMessage),
    StatusInit(StatusInitMessage),
    StatusPlay(StatusPlayMessage),
    StatusBreak(StatusBreakMessage),
    StatusEnd(StatusEndMessage),
    Chat(ChatMessage),
    GameAborted(GameAbortedMessage),
    QueueRejected(QueueRejectedMessage),
}

impl ServerToClientMessage {
    pub fn aborted() -> ServerToClientMessage {
        ServerToClientMessage::GameAborted(GameAbortedMessage::new())
    }
}

impl From<ServerToClientMessage> for Vec<u8> {
    fn from(value: ServerToClientMessage) -> Self {
        match value {
            ServerToClientMessage::PositionUpdate(msg) => msg.into(),
            ServerToClientMessage::StatusInit(msg) => msg.into(),
            ServerToClientMessage::StatusPlay(msg) => msg.into(),
            ServerToClientMessage::StatusBreak(msg) => msg.into(),
            ServerToClientMessage::StatusEnd(msg) => msg.into(),
            ServerToClientMessage::Chat(msg) => msg.into(),
            ServerToClientMessage::GameAborted(msg) => msg.into(),
            ServerToClientMessage::QueueRejected(msg) => msg.into(),
        }
    }
}

/// Structure representing the Position Update Message as introduced in the Protocol Version 1.
#[derive(Copy, Clone)]
pub struct PositionUpdateMessage {
    msg_id: u8,
    l_pad_y: f64,
    r_pad_y: f64,
    ball_x: f64,
    ball_y: f64,
}

impl PositionUpdateMessage {
    pub fn new(l_pad_y: f64, r_pad_y: f64, ball_x: f64, ball_y: f64) -> PositionUpdateMessage {
        PositionUpdateMessage {
            msg_id: 0,
            l_pad_y,
            r_pad_y,
            ball_x,
            ball_y,
        }
    }
}

impl From<PositionUpdateMessage> for Vec<u8> {
    fn from(value: PositionUpdateMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(
                value.msg_id,
                value.l_pad_y,
                value.r_pad_y,
                value.ball_x,
                value.ball_y,
            ),
            &mut bytes,
        )
        .expect("Could not serialize a PositionUpdateMessage instance.");
        bytes
    }
}

impl From<PositionUpdateMessage> for ServerToClientMessage {
    fn from(value: PositionUpdateMessage) -> Self {
        ServerToClientMessage::PositionUpdate(value)
    }
}

/// Structure representing the Status Init Message as introduced in the Protocol Version 1.
#[derive(Clone)]
pub struct StatusInitMessage {
    msg_id: u8,
    countdown_ms: u64,
    left_id: String,
    right_id: String,
}

impl StatusInitMessage {
    pub fn new(countdown: Duration, left_id: &str, right_id: &str) -> StatusInitMessage {
        StatusInitMessage {
            msg_id: 1,
            countdown_ms: countdown.as_millis() as u64,
            left_id: String::from(left_id),
            right_id: String::from(right_id),
        }
    }
}

impl From<StatusInitMessage> for Vec<u8> {
    fn from(value: StatusInitMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(
                value.msg_id,
                value.countdown_ms,
                value.left_id,
                value.right_id,
            ),
            &mut bytes,
        )
        .expect("Could not serialize a StatusInitMessage instance.");
        bytes
    }
}

impl From<StatusInitMessage> for ServerToClientMessage {
    fn from(value: StatusInitMessage) -> Self {
        ServerToClientMessage::StatusInit(value)
    }
}

/// Structure representing the Status Play Message as introduced in the Protocol Version 1.
#[derive(Copy, Clone)]
pub struct StatusPlayMessage {
    msg_id: u8,
    left_score: u32,
    right_score: u32,
}

impl StatusPlayMessage {
    pub fn new(left_score: u32, right_score: u32) -> StatusPlayMessage {
        StatusPlayMessage {
            msg_id: 2,
            left_score,
            right_score,
        }
    }
}

impl From<StatusPlayMessage> for Vec<u8> {
    fn from(value: StatusPlayMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(value.msg_id, value.left_score, value.right_score),
            &mut bytes,
        )
        .expect("Could not serialize a StatusPlayMessage instance.");
        bytes
    }
}

impl From<StatusPlayMessage> for ServerToClientMessage {
    fn from(value: StatusPlayMessage) -> Self {
        ServerToClientMessage::StatusPlay(value)
    }
}

/// Structure representing the Status Break Message as introduced in the Protocol Version 1.
#[derive(Copy, Clone)]
pub struct StatusBreakMessage {
    msg_id: u8,
    countdown_ms: u64,
    left_score: u32,
    right_score: u32,
}

impl StatusBreakMessage {
    pub fn new(countdown: Duration, left_score: u32, right_score: u32) -> StatusBreakMessage {
        StatusBreakMessage {
            msg_id: 3,
            countdown_ms: countdown.as_millis() as u64,
            left_score,
            right_score,
        }
    }
}

impl From<StatusBreakMessage> for Vec<u8> {
    fn from(value: StatusBreakMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(
                value.msg_id,
                value.countdown_ms,
                value.left_score,
                value.right_score,
            ),
            &mut bytes,
        )
        .expect("Could not serialize a StatusBreakMessage instance.");
        bytes
    }
}

impl From<StatusBreakMessage> for ServerToClientMessage {
    fn from(value: StatusBreakMessage) -> Self {
        ServerToClientMessage::StatusBreak(value)
    }
}

/// Structure representing the Status End Message as introduced in the Protocol Version 1.
#[derive(Clone)]
pub struct StatusEndMessage {
    msg_id: u8,
    winner_id: String,
    left_score: u32,
    right_score: u32,
}

impl StatusEndMessage {
    pub fn new(winner_id: &str, left_score: u32, right_score: u32) -> StatusEndMessage {
        StatusEndMessage {
            msg_id: 4,
            winner_id: String::from(winner_id),
            left_score,
            right_score,
        }
    }
}

impl From<StatusEndMessage> for Vec<u8> {
    fn from(value: StatusEndMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(
            &(
                value.msg_id,
                value.winner_id,
                value.left_score,
                value.right_score,
            ),
            &mut bytes,
        )
        .expect("Could not serialize a StatusEndMessage instance.");
        bytes
    }
}

impl From<StatusEndMessage> for ServerToClientMessage {
    fn from(value: StatusEndMessage) -> Self {
        ServerToClientMessage::StatusEnd(value)
    }
}

/// Structure representing the Chat Message as introduced in the Protocol Version 1.
#[derive(Clone)]
pub struct ChatMessage {
    msg_id: u8,
    from: String,
    text: String,
}

impl ChatMessage {
    pub fn new(from: &str, text: &str) -> ChatMessage {
        ChatMessage {
            msg_id: 5,
            from: String::from(from),
            text: String::from(text),
        }
    }
}

impl From<ChatMessage> for Vec<u8> {
    fn from(value: ChatMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(&(value.msg_id, value.from, value.text), &mut bytes)
            .expect("Could not serialize a ChatMessage instance.");
        bytes
    }
}

impl From<ChatMessage> for ServerToClientMessage {
    fn from(value: ChatMessage) -> Self {
        ServerToClientMessage::Chat(value)
    }
}

/// Structure representing the Game Aborted Message as introduced in the Protocol Version 1.
#[derive(Copy, Clone)]
pub struct GameAbortedMessage {
    msg_id: u8,
}

impl GameAbortedMessage {
    pub fn new() -> GameAbortedMessage {
        GameAbortedMessage { msg_id: 6 }
    }
}

impl From<GameAbortedMessage> for Vec<u8> {
    fn from(value: GameAbortedMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(&(value.msg_id,), &mut bytes)
            .expect("Could not serialize a GameAbortedMessage instance.");
        bytes
    }
}

impl From<GameAbortedMessage> for ServerToClientMessage {
    fn from(value: GameAbortedMessage) -> Self {
        ServerToClientMessage::GameAborted(value)
    }
}

/// Structure representing the Queue Rejected Message as introduced in the Protocol Version 1.
#[derive(Copy, Clone)]
pub struct QueueRejectedMessage {
    msg_id: u8,
}

impl QueueRejectedMessage {
    pub fn new() -> QueueRejectedMessage {
        QueueRejectedMessage { msg_id: 7 }
    }
}

impl From<QueueRejectedMessage> for Vec<u8> {
    fn from(value: QueueRejectedMessage) -> Self {
        let mut bytes = Vec::new();
        ciborium::into_writer(&(value.msg_id,), &mut bytes)
            .expect("Could not serialize a QueueRejectedMessage instance.");
        bytes
    }
}

impl From<QueueRejectedMessage> for ServerToClientMessage {
    fn from(value: QueueRejectedMessage) -> Self {
        ServerToClientMessage::QueueRejected(value)
    }
}

#[cfg(test)]
mod tests {
    use ciborium::Value;

    use super::*;

    fn decode(bytes: Vec<u8>) -> Vec<Value> {
        match ciborium::from_reader(bytes.as_slice()) {
            Ok(Value::Array(items)) => items,
            other => panic!("expected a CBOR array, got {other:?}"),
        }
    }

    #[test]
    fn every_message_leads_with_its_own_id() {
        let cases: [(Vec<u8>, u8); 8] = [
            (PositionUpdateMessage::new(0.5, 0.5, 0.65, 0.5).into(), 0),
            (
                StatusInitMessage::new(Duration::from_secs(5), "ayo", "bee").into(),
                1,
            ),
            (StatusPlayMessage::new(0, 0).into(), 2),
            (
                StatusBreakMessage::new(Duration::from_secs(3), 1, 0).into(),
                3,
            ),
            (StatusEndMessage::new("ayo", 11, 4).into(), 4),
            (ChatMessage::new("ayo", "gg").into(), 5),
            (GameAbortedMessage::new().into(), 6),
            (QueueRejectedMessage::new().into(), 7),
        ];
        for (bytes, expected_id) in cases {
            let items = decode(bytes);
            assert_eq!(items[0], Value::Integer(expected_id.into()));
        }
    }

    #[test]
    fn position_update_carries_the_four_coordinates() {
        let items = decode(PositionUpdateMessage::new(0.1, 0.2, 0.3, 0.4).into());
        assert_eq!(items.len(), 5);
        assert_eq!(items[1], Value::Float(0.1));
        assert_eq!(items[2], Value::Float(0.2));
        assert_eq!(items[3], Value::Float(0.3));
        assert_eq!(items[4], Value::Float(0.4));
    }

    #[test]
    fn status_init_carries_countdown_and_identities() {
        let items = decode(StatusInitMessage::new(Duration::from_secs(5), "ayo", "bee").into());
        assert_eq!(items[1], Value::Integer(5000.into()));
        assert_eq!(items[2], Value::Text(String::from("ayo")));
        assert_eq!(items[3], Value::Text(String::from("bee")));
    }

    #[test]
    fn status_end_names_the_winner_and_the_final_score() {
        let items = decode(StatusEndMessage::new("bee", 7, 11).into());
        assert_eq!(items[1], Value::Text(String::from("bee")));
        assert_eq!(items[2], Value::Integer(7.into()));
        assert_eq!(items[3], Value::Integer(11.into()));
    }
}
