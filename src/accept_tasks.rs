//! Acceptance of incoming connections and their dispatch to per-session tasks.

use std::future::Future;

use nix::sys::socket::{setsockopt, sockopt};
use rand::distributions::{Alphanumeric, DistString};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::WebSocketStream;

/// Number of consecutive accept failures at which the listener is considered broken.
const MAX_FAILURES: u32 = 3;

/// The fully upgraded stream a session runs on.
pub type SessionStream = WebSocketStream<TlsStream<TcpStream>>;

/// Acceptor of incoming connections, spawning one task per established websocket.
///
/// Failures to upgrade a single connection only cost that connection. Failures to accept at the
/// tcp level are counted, and [`MAX_FAILURES`] of them in a row take the whole listener down.
pub struct ConnectionAcceptor {
    listener: TcpListener,
    tls_acceptor: TlsAcceptor,
    consecutive_failures: u32,
}

impl ConnectionAcceptor {
    pub fn new(listener: TcpListener, tls_acceptor: TlsAcceptor) -> ConnectionAcceptor {
        ConnectionAcceptor {
            listener,
            tls_acceptor,
            consecutive_failures: 0,
        }
    }

    /// Accept the next connection, upgrade it to tls then websocket, and hand it to
    /// `make_session`, spawned on the given task set under a fresh connection id.
    pub async fn accept_into<F, T>(
        &mut self,
        task_set: &mut JoinSet<()>,
        make_session: T,
    ) -> Result<(), ()>
    where
        F: Future<Output = ()> + Send + 'static,
        T: FnOnce(SessionStream, String) -> F,
    {
        let id = Alphanumeric.sample_string(&mut rand::thread_rng(), 8);

        let stream = match tcp_accept_no_delay(&self.listener).await {
            Ok(stream) => stream,
            Err(e) => return self.count_accept_failure(&id, e),
        };
        self.consecutive_failures = 0;

        log::trace!("{id}: Accepted a TCP connection. Upgrading it to Tls then WSS...");
        match upgrade(stream, &self.tls_acceptor).await {
            Ok(websocket) => {
                log::info!("{id}: Websocket connection established. Spawning its session task.");
                task_set.spawn(make_session(websocket, id));
            }
            Err(e) => log::info!("{id}: Failed to upgrade the connection : {e}."),
        }
        Ok(())
    }

    fn count_accept_failure(&mut self, id: &str, e: std::io::Error) -> Result<(), ()> {
        self.consecutive_failures += 1;
        if self.consecutive_failures < MAX_FAILURES {
            log::warn!(
                "{id}: Accepting an incoming connection failed [{}/{MAX_FAILURES}] with error : {e}.",
                self.consecutive_failures
            );
            Ok(())
        } else {
            log::error!(
                "{id}: Accepting an incoming connection failed [{}/{MAX_FAILURES}] with error : {e}. \
                        Threshold hit, considering the listener broken.",
                self.consecutive_failures
            );
            Err(())
        }
    }
}

/// Accept a tcp connection from the listener, with Nagle's algorithm disabled on its socket.
async fn tcp_accept_no_delay(listener: &TcpListener) -> std::io::Result<TcpStream> {
    let (stream, _) = listener.accept().await?;
    setsockopt(&stream, sockopt::TcpNoDelay, &true)?;
    Ok(stream)
}

/// Run the tls then websocket handshakes on a raw tcp stream. The websocket configuration sets
/// small buffers : the protocol's messages all fit in a fraction of a frame.
async fn upgrade(
    stream: TcpStream,
    tls_acceptor: &TlsAcceptor,
) -> Result<SessionStream, Box<dyn std::error::Error>> {
    const NO_BUFFER: usize = 0;
    const KB_1: usize = 1 << 10;
    const KB_2: usize = 2 << 10;
    let tls_stream = tls_acceptor.accept(stream).await?;
    let ws_config = WebSocketConfig {
        write_buffer_size: NO_BUFFER,
        max_write_buffer_size: KB_1,
        max_message_size: Some(KB_2),
        max_frame_size: Some(KB_1),
        ..Default::default()
    };
    let websocket =
        tokio_tungstenite::accept_async_with_config(tls_stream, Some(ws_config)).await?;
    Ok(websocket)
}
