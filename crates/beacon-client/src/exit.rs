//! Mapping from how a session ended to the process exit status.
//!
//! Handlers inside the session only report a [`CloseReason`]; turning that
//! into an exit status happens here, and only the binary acts on it.

use crate::CloseReason;
use serde::{Deserialize, Serialize};

/// Exit status for a run that ended normally.
pub const EXIT_SUCCESS: u8 = 0;

/// Exit status for a run that failed to connect or lost the transport.
pub const EXIT_FAILURE: u8 = 1;

/// How to treat a connection closed because the peer sent `ERROR`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Same as any other clean close: exit 0.
    #[default]
    Clean,
    /// Report the run as failed: exit 1.
    Failure,
}

/// The exit status for a session that ended with `reason`.
pub fn exit_code(reason: &CloseReason, policy: ErrorPolicy) -> u8 {
    match reason {
        CloseReason::PeerClosed => EXIT_SUCCESS,
        CloseReason::ErrorMessage { .. } => match policy {
            ErrorPolicy::Clean => EXIT_SUCCESS,
            ErrorPolicy::Failure => EXIT_FAILURE,
        },
        CloseReason::ConnectFailed(_) | CloseReason::Transport(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use beacon_core::{CodecError, Endpoint};
    use std::io;

    fn connect_failed() -> CloseReason {
        CloseReason::ConnectFailed(ClientError::Connect {
            endpoint: Endpoint::default(),
            source: io::ErrorKind::ConnectionRefused.into(),
        })
    }

    #[test]
    fn clean_close_succeeds() {
        for policy in [ErrorPolicy::Clean, ErrorPolicy::Failure] {
            assert_eq!(exit_code(&CloseReason::PeerClosed, policy), EXIT_SUCCESS);
        }
    }

    #[test]
    fn failures_always_exit_one() {
        let transport = CloseReason::Transport(ClientError::Codec(CodecError::FrameTooLarge {
            len: 10,
            max: 1,
        }));
        for policy in [ErrorPolicy::Clean, ErrorPolicy::Failure] {
            assert_eq!(exit_code(&connect_failed(), policy), EXIT_FAILURE);
            assert_eq!(exit_code(&transport, policy), EXIT_FAILURE);
            assert_eq!(
                exit_code(&CloseReason::Transport(ClientError::Aborted), policy),
                EXIT_FAILURE
            );
        }
    }

    #[test]
    fn error_message_follows_policy() {
        let reason = CloseReason::ErrorMessage { status_code: 42 };
        assert_eq!(exit_code(&reason, ErrorPolicy::Clean), EXIT_SUCCESS);
        assert_eq!(exit_code(&reason, ErrorPolicy::Failure), EXIT_FAILURE);
    }
}
