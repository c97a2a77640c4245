//! Deserialization of the in-session events sent by the client.

use ciborium::Value;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::Message;

use crate::game::PadMovement;

/// Errors encountered while receiving an event message from the client.
#[derive(thiserror::Error, Debug)]
pub enum ClientEventError {
    /// This error happens when a poll to a [`WebSocketStream`] returns an error.
    ///
    /// [`WebSocketStream`]: tokio_tungstenite::WebSocketStream
    #[error("Error at the websocket layer : {0}")]
    ConnectionError(#[from] tungstenite::Error),

    /// This error happens when a poll to a [`WebSocketStream`] returns [`None`], or that the
    /// connection has been closed.
    ///
    /// [`WebSocketStream`]: tokio_tungstenite::WebSocketStream
    #[error("Connection closed or lost")]
    ConnectionLost,

    /// This error happens when the deserialization of the binary data received failed.
    #[error("Parsing failed : {0:?}")]
    ParsingFailed(#[from] ciborium::de::Error<<&'static [u8] as ciborium_io::Read>::Error>),

    /// This error happens when the client sends any message type other than [`Message::Ping`] and
    /// [`Message::Binary`], or a well-formed CBOR value outside the protocol.
    #[error("Received a message violating the protocol")]
    ProtocolViolation,
}

/// An event sent by the client during its session, already validated.
#[derive(Debug, Eq, PartialEq)]
pub enum ClientEvent {
    Queue,
    Dequeue,
    Movement(PadMovement),
    InGameMessage(String),
}

/// Process the output of a poll on the given [`WebSocketStream`]. Handle [`ClientEventError`]s,
/// and - if it was not a ping - return the deserialized [`ClientEvent`].
///
/// [`WebSocketStream`]: tokio_tungstenite::WebSocketStream
pub fn parse_client_event(
    msg: Option<Result<Message, tungstenite::Error>>,
) -> Result<Option<ClientEvent>, ClientEventError> {
    match msg {
        Some(Ok(Message::Ping(_))) => Ok(None),
        Some(Ok(Message::Binary(b))) => decode_client_event(b.as_slice()).map(Some),
        Some(Ok(_)) => Err(ClientEventError::ProtocolViolation),
        Some(Err(tungstenite::Error::ConnectionClosed)) | None => {
            Err(ClientEventError::ConnectionLost)
        }
        Some(Err(e)) => Err(ClientEventError::ConnectionError(e)),
    }
}

/// Decode one event : a CBOR array leading with the event's id, followed by its payload.
fn decode_client_event(bytes: &[u8]) -> Result<ClientEvent, ClientEventError> {
    let value: Value = ciborium::from_reader(bytes)?;
    let Value::Array(items) = value else {
        return Err(ClientEventError::ProtocolViolation);
    };
    let mut items = items.into_iter();
    let Some(Value::Integer(event_id)) = items.next() else {
        return Err(ClientEventError::ProtocolViolation);
    };
    match (i8::try_from(event_id), items.next()) {
        (Ok(0), None) => Ok(ClientEvent::Queue),
        (Ok(1), None) => Ok(ClientEvent::Dequeue),
        (Ok(2), Some(Value::Integer(movement))) => match i8::try_from(movement) {
            Ok(-1) => Ok(ClientEvent::Movement(PadMovement::Up)),
            Ok(0) => Ok(ClientEvent::Movement(PadMovement::Still)),
            Ok(1) => Ok(ClientEvent::Movement(PadMovement::Down)),
            _ => Err(ClientEventError::ProtocolViolation),
        },
        (Ok(3), Some(Value::Text(text))) => Ok(ClientEvent::InGameMessage(text)),
        _ => Err(ClientEventError::ProtocolViolation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_of(value: Value) -> Option<Result<Message, tungstenite::Error>> {
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes).unwrap();
        Some(Ok(Message::Binary(bytes)))
    }

    fn event(items: Vec<Value>) -> Option<Result<Message, tungstenite::Error>> {
        binary_of(Value::Array(items))
    }

    #[test]
    fn pings_are_transparent() {
        let parsed = parse_client_event(Some(Ok(Message::Ping(Vec::new()))));
        assert!(matches!(parsed, Ok(None)));
    }

    #[test]
    fn bare_events_parse_from_their_id_alone() {
        assert_eq!(
            parse_client_event(event(vec![Value::Integer(0.into())])).unwrap(),
            Some(ClientEvent::Queue)
        );
        assert_eq!(
            parse_client_event(event(vec![Value::Integer(1.into())])).unwrap(),
            Some(ClientEvent::Dequeue)
        );
    }

    #[test]
    fn movement_events_map_onto_the_three_intents() {
        assert_eq!(
            parse_client_event(event(vec![Value::Integer(2.into()), Value::Integer((-1).into())])).unwrap(),
            Some(ClientEvent::Movement(PadMovement::Up))
        );
        assert_eq!(
            parse_client_event(event(vec![Value::Integer(2.into()), Value::Integer(0.into())])).unwrap(),
            Some(ClientEvent::Movement(PadMovement::Still))
        );
        assert_eq!(
            parse_client_event(event(vec![Value::Integer(2.into()), Value::Integer(1.into())])).unwrap(),
            Some(ClientEvent::Movement(PadMovement::Down))
        );
    }

    #[test]
    fn chat_events_carry_their_text() {
        assert_eq!(
            parse_client_event(event(vec![Value::Integer(3.into()), Value::Text(String::from("gg"))])).unwrap(),
            Some(ClientEvent::InGameMessage(String::from("gg")))
        );
    }

    #[test]
    fn malformed_events_are_protocol_violations() {
        // Out-of-range movement payload.
        assert!(matches!(
            parse_client_event(event(vec![Value::Integer(2.into()), Value::Integer(7.into())])),
            Err(ClientEventError::ProtocolViolation)
        ));
        // Unknown event id.
        assert!(matches!(
            parse_client_event(event(vec![Value::Integer(9.into())])),
            Err(ClientEventError::ProtocolViolation)
        ));
        // Not an array at all.
        assert!(matches!(
            parse_client_event(binary_of(Value::Integer(42.into()))),
            Err(ClientEventError::ProtocolViolation)
        ));
        // Wrong websocket message type.
        assert!(matches!(
            parse_client_event(Some(Ok(Message::Text(String::from("hi"))))),
            Err(ClientEventError::ProtocolViolation)
        ));
    }

    #[test]
    fn closed_connections_are_reported_as_lost() {
        assert!(matches!(
            parse_client_event(None),
            Err(ClientEventError::ConnectionLost)
        ));
        assert!(matches!(
            parse_client_event(Some(Err(tungstenite::Error::ConnectionClosed))),
            Err(ClientEventError::ConnectionLost)
        ));
    }
}
