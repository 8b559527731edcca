//! Connection state machine.
//!
//! A [`Session`] owns an established connection. It sends the initial
//! payload, then handles inbound messages one at a time until the peer
//! hangs up, the peer sends `ERROR`, or the transport fails. The reason it
//! stopped is returned as a [`CloseReason`]; deciding what that means for
//! the process is left to the caller.

use crate::ClientError;
use beacon_core::{Message, MessageType, SessionState, WireCodec};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tokio_util::codec::Framed;

/// Why a session reached [`SessionState::Closed`].
#[derive(Debug)]
pub enum CloseReason {
    /// The peer ended the connection.
    PeerClosed,
    /// The peer sent an `ERROR` message and the connection was closed locally.
    ErrorMessage { status_code: i32 },
    /// The connection was never established.
    ConnectFailed(ClientError),
    /// The connection broke or the byte stream could not be decoded.
    Transport(ClientError),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed the connection"),
            CloseReason::ErrorMessage { status_code } => {
                write!(f, "peer sent ERROR with status code {status_code}")
            }
            CloseReason::ConnectFailed(e) => write!(f, "connect failed: {e}"),
            CloseReason::Transport(e) => write!(f, "transport failure: {e}"),
        }
    }
}

/// An active connection speaking the protocol through codec `C`.
pub struct Session<T, C> {
    framed: Framed<T, C>,
    payload: String,
    state: watch::Sender<SessionState>,
}

impl<T, C> Session<T, C>
where
    T: AsyncRead + AsyncWrite + Unpin,
    C: WireCodec,
{
    /// Wrap a connected transport. `payload` is sent as soon as
    /// [`run`](Self::run) starts.
    pub fn new(
        io: T,
        codec: C,
        payload: impl Into<String>,
        state: watch::Sender<SessionState>,
    ) -> Self {
        Self {
            framed: Framed::new(io, codec),
            payload: payload.into(),
            state,
        }
    }

    /// Drive the session to completion.
    ///
    /// The transport is shut down and dropped before this returns, whatever
    /// the reason.
    pub async fn run(mut self) -> CloseReason {
        self.state.send_replace(SessionState::Active);
        tracing::debug!(state = %SessionState::Active, "session state changed");

        let reason = self.drive().await;
        match &reason {
            CloseReason::PeerClosed => {
                tracing::info!("disconnected from server, shutting down");
            }
            CloseReason::ErrorMessage { .. } => {
                tracing::info!("closing connection after ERROR message");
            }
            CloseReason::ConnectFailed(e) | CloseReason::Transport(e) => {
                tracing::error!(error = %e, "connection lost");
            }
        }

        if let Err(e) = SinkExt::<Message>::close(&mut self.framed).await {
            tracing::debug!(error = %e, "error shutting down connection");
        }
        self.state.send_replace(SessionState::Closed);
        tracing::debug!(state = %SessionState::Closed, %reason, "session state changed");
        reason
    }

    async fn drive(&mut self) -> CloseReason {
        let initial = Message::data(self.payload.clone());
        if let Err(e) = self.framed.send(initial).await {
            return CloseReason::Transport(e.into());
        }
        tracing::info!(payload = %self.payload, "sent initial payload");

        loop {
            let msg = match self.framed.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => return CloseReason::Transport(e.into()),
                None => return CloseReason::PeerClosed,
            };

            if let Some(reason) = self.dispatch(msg).await {
                return reason;
            }
        }
    }

    /// React to one inbound message. Returns a reason when the session
    /// must stop.
    async fn dispatch(&mut self, msg: Message) -> Option<CloseReason> {
        let kind = match msg.message_type() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!(error = %e, payload = %msg.payload, "ignoring message");
                return None;
            }
        };

        tracing::info!(
            %kind,
            payload = %msg.payload,
            status = msg.status_code,
            "received from server"
        );

        match kind {
            MessageType::Ping => {
                if let Err(e) = self.framed.send(Message::pong()).await {
                    return Some(CloseReason::Transport(e.into()));
                }
                tracing::info!("sent PONG response to server");
                None
            }
            MessageType::Data => {
                tracing::info!("DATA message processed, keeping connection alive");
                None
            }
            MessageType::Pong => {
                tracing::debug!("unsolicited PONG ignored");
                None
            }
            MessageType::Error => {
                tracing::error!(
                    status_code = msg.status_code,
                    "received ERROR message from server"
                );
                Some(CloseReason::ErrorMessage {
                    status_code: msg.status_code,
                })
            }
        }
    }
}
