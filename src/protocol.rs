//! Implementation of the client-server communication protocol.
//!
//! This module provides structures mapping the protocol messages, helper functions for messages
//! and an entrypoint function that runs the protocol on a given [`WebSocketStream`] connection :
//! [`execute_protocol_on_connection`].
//!
//! The structures are :
//! * Serializable : the per-kind messages wrapped in the enum [`ServerToClientMessage`].
//! * Deserializable : [`HelloMessage`], then the in-session [`ClientEvent`]s.
//!
//! A connection is served by a single task : it forwards the messages its match pushes on the
//! connection's channel, and routes the client's events to the [`match_making::MatchMaker`].

use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

pub use messages::broadcasts::{
    ChatMessage, GameAbortedMessage, PositionUpdateMessage, QueueRejectedMessage,
    ServerToClientMessage, StatusBreakMessage, StatusEndMessage, StatusInitMessage,
    StatusPlayMessage,
};
use messages::events::{parse_client_event, ClientEvent, ClientEventError};
use messages::hello::receive_hello_message;

use crate::match_making::{self, BroadcastSender};

pub mod constants;
mod messages;

/// The current maximum version of the protocol supported.
const SUPPORTED_PROTO_VERSION: u8 = 1;

/// Receives a [`HelloMessage`], and serves the client's session until their connection goes away.
///
/// [`HelloMessage`]: messages::hello::HelloMessage
pub async fn execute_protocol_on_connection<S, D>(
    mut websocket: WebSocketStream<S>,
    log_id: D,
    match_maker: Arc<match_making::MatchMaker>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Display,
{
    log::info!("{log_id}: Beginning to unroll the protocol with a client.");
    match receive_hello_message(&mut websocket).await {
        Ok(hello_message) => {
            if hello_message.proto_version == SUPPORTED_PROTO_VERSION {
                serve_client(websocket, hello_message.id, match_maker, &log_id).await;
            } else {
                log::info!(
                    "{log_id}: Received a request for protocol version {}, but is not supported.",
                    hello_message.proto_version
                );
            }
        }
        Err(e) => log::info!("{log_id}: Error while receiving a hello message : {e}."),
    }
    log::info!("{log_id}: Protocol done.");
}

/// Run the session of an identified client : push their match's messages out, feed their events
/// in. On any exit path, their disconnection is reported to match-making exactly once.
async fn serve_client<S, D>(
    mut websocket: WebSocketStream<S>,
    identity: String,
    match_maker: Arc<match_making::MatchMaker>,
    log_id: &D,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    D: Display,
{
    log::trace!("{log_id}: Serving the session of {identity}.");
    let (sender, mut receiver) = mpsc::unbounded_channel::<ServerToClientMessage>();
    loop {
        tokio::select! {
            outbound = receiver.recv() => {
                // The task holds a sender for the whole session, so recv() cannot yield None.
                let Some(message) = outbound else { break };
                if let Err(e) = websocket.send(Message::Binary(message.into())).await {
                    log::info!("{log_id}: Error while sending a message : {e}.");
                    break;
                }
            }
            incoming = websocket.next() => {
                match parse_client_event(incoming) {
                    Ok(None) => (),
                    Ok(Some(event)) => {
                        dispatch_client_event(event, &identity, &match_maker, &sender);
                    }
                    Err(ClientEventError::ConnectionLost) => {
                        log::trace!("{log_id}: Client connection closed.");
                        break;
                    }
                    Err(e) => {
                        log::info!("{log_id}: Error while receiving a client event : {e}.");
                        break;
                    }
                }
            }
        }
    }
    match_maker.disconnect(&identity, Instant::now());
    log::trace!("{log_id}: Session of {identity} over.");
}

/// Route one parsed [`ClientEvent`] to the right [`match_making::MatchMaker`] operation.
fn dispatch_client_event(
    event: ClientEvent,
    identity: &str,
    match_maker: &Arc<match_making::MatchMaker>,
    sender: &BroadcastSender,
) {
    match event {
        ClientEvent::Queue => {
            let queued = match_maker.queue(
                identity,
                sender.clone(),
                Instant::now(),
                &mut rand::thread_rng(),
            );
            if let Err(e) = queued {
                log::info!("Queue request refused : {e}.");
                let _ = sender.send(QueueRejectedMessage::new().into());
            }
        }
        ClientEvent::Dequeue => match_maker.dequeue(identity),
        ClientEvent::Movement(movement) => match_maker.movement(identity, movement),
        ClientEvent::InGameMessage(text) => match_maker.in_game_message(identity, &text),
    }
}
