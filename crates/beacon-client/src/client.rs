//! Connection bootstrap.
//!
//! [`Client::start`] opens the socket, installs the configured codec and
//! runs a [`Session`] on a background task. The returned [`ClientHandle`]
//! is the only way to learn how the run ended.

use crate::{ClientConfig, ClientError, CloseReason, Session};
use beacon_core::{Codec, Endpoint, SessionState};
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};

/// Open a TCP connection to `endpoint`, failing after `timeout`.
pub async fn connect(endpoint: &Endpoint, timeout: Duration) -> Result<TcpStream, ClientError> {
    let addr = (endpoint.host(), endpoint.port());
    connect_within(endpoint, timeout, TcpStream::connect(addr)).await
}

/// Bound an in-flight connect attempt to `endpoint` by `timeout`.
async fn connect_within<F>(
    endpoint: &Endpoint,
    timeout: Duration,
    connecting: F,
) -> Result<TcpStream, ClientError>
where
    F: Future<Output = io::Result<TcpStream>>,
{
    let stream = match tokio::time::timeout(timeout, connecting).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => {
            return Err(ClientError::Connect {
                endpoint: endpoint.clone(),
                source,
            });
        }
        Err(_) => {
            return Err(ClientError::ConnectTimeout {
                endpoint: endpoint.clone(),
                timeout,
            });
        }
    };

    stream
        .set_nodelay(true)
        .map_err(|source| ClientError::Connect {
            endpoint: endpoint.clone(),
            source,
        })?;
    Ok(stream)
}

/// A single-connection protocol client.
#[derive(Debug, Clone)]
pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Connect and run the session in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self, payload: impl Into<String>) -> ClientHandle {
        let payload = payload.into();
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let reason = self.run(payload, state_tx).await;
            // the handle may already be gone; the outcome has been logged
            let _ = done_tx.send(reason);
        });

        ClientHandle {
            state: state_rx,
            done: done_rx,
        }
    }

    async fn run(self, payload: String, state: watch::Sender<SessionState>) -> CloseReason {
        let addr = (self.config.server.host().to_string(), self.config.server.port());
        self.run_with(payload, state, TcpStream::connect(addr)).await
    }

    async fn run_with<F>(
        self,
        payload: String,
        state: watch::Sender<SessionState>,
        connecting: F,
    ) -> CloseReason
    where
        F: Future<Output = io::Result<TcpStream>>,
    {
        let server = &self.config.server;
        tracing::info!(%server, codec = %self.config.codec, "connecting");

        let timeout = self.config.connect_timeout();
        let stream = match connect_within(server, timeout, connecting).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(%server, error = %e, "connection failed, is the server running?");
                state.send_replace(SessionState::Closed);
                return CloseReason::ConnectFailed(e);
            }
        };
        tracing::info!(%server, "connected to server");

        let codec = Codec::new(self.config.codec, self.config.max_frame_length);
        Session::new(stream, codec, payload, state).run().await
    }
}

/// Observer for a running client.
#[derive(Debug)]
pub struct ClientHandle {
    state: watch::Receiver<SessionState>,
    done: oneshot::Receiver<CloseReason>,
}

impl ClientHandle {
    /// Watch lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until the session reaches [`SessionState::Closed`].
    pub async fn closed(self) -> CloseReason {
        match self.done.await {
            Ok(reason) => reason,
            Err(_) => {
                tracing::error!("client task ended without an outcome");
                CloseReason::Transport(ClientError::Aborted)
            }
        }
    }
}
