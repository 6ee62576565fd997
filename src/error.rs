//! Error taxonomy of the PulseAudio client.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::protocol::Command;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The local socket could not be opened.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad cookie at {path}: {reason}")]
    BadCookie { path: PathBuf, reason: String },

    #[error("server supports protocol version {server} but at least {required} is required")]
    VersionUnsupported { server: u32, required: u32 },

    #[error("request of {size} bytes exceeds the {max} byte frame limit")]
    RequestTooLarge { size: usize, max: usize },

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The server answered the request with an `Error` reply.
    #[error("PulseAudio error: {command:?} -> {}", PulseErrorCode(*code))]
    Pulse { command: Command, code: u32 },

    #[error("connection to the PulseAudio server is closed")]
    ConnectionClosed,

    /// A write failed while this request was being sent.
    #[error("couldn't send request: {0}")]
    Transport(String),

    #[error("request {command:?} timed out")]
    Timeout { command: Command },

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("the update channel was already handed out")]
    AlreadySubscribed,

    /// A named device the operation depends on is not present.
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },
}

impl Error {
    /// Whether the session is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Pulse { .. }
                | Error::Timeout { .. }
                | Error::AlreadySubscribed
                | Error::NotFound { .. }
        )
    }

    /// Raw server error code, if the server rejected the request.
    pub fn pulse_code(&self) -> Option<u32> {
        match self {
            Error::Pulse { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedFrame(msg.into())
    }

    pub(crate) fn violation(msg: impl Into<String>) -> Self {
        Error::ProtocolViolation(msg.into())
    }

    /// Copy of this error as delivered to every in-flight waiter when the
    /// session dies.
    pub(crate) fn for_waiter(&self) -> Self {
        match self {
            Error::MalformedFrame(m) => Error::MalformedFrame(m.clone()),
            Error::ProtocolViolation(m) => Error::ProtocolViolation(m.clone()),
            _ => Error::ConnectionClosed,
        }
    }
}

/// Display helper naming the documented PulseAudio error codes. The raw
/// number is always kept alongside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseErrorCode(pub u32);

impl PulseErrorCode {
    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "OK",
            1 => "Access denied",
            2 => "Unknown command",
            3 => "Invalid argument",
            4 => "Entity exists",
            5 => "No such entity",
            6 => "Connection refused",
            7 => "Protocol error",
            8 => "Timeout",
            9 => "No authentication key",
            10 => "Internal error",
            11 => "Connection terminated",
            12 => "Entity killed",
            13 => "Invalid server",
            14 => "Module initialization failed",
            15 => "Bad state",
            16 => "No data",
            17 => "Incompatible protocol version",
            18 => "Too large",
            19 => "Not supported",
            20 => "Unknown error code",
            21 => "No such extension",
            22 => "Obsolete functionality",
            23 => "Missing implementation",
            24 => "Client forked",
            25 => "Input/Output error",
            26 => "Device or resource busy",
            _ => "Unrecognized error",
        }
    }
}

impl fmt::Display for PulseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.description(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_errors_keep_the_client_usable() {
        let err = Error::Pulse {
            command: Command::SetDefaultSink,
            code: 5,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.pulse_code(), Some(5));
        assert_eq!(
            err.to_string(),
            "PulseAudio error: SetDefaultSink -> No such entity (code 5)"
        );
    }

    #[test]
    fn transport_faults_are_fatal() {
        assert!(Error::ConnectionClosed.is_fatal());
        assert!(Error::malformed("short read").is_fatal());
        assert!(!Error::Timeout { command: Command::GetServerInfo }.is_fatal());
    }

    #[test]
    fn waiters_see_closed_unless_the_stream_was_corrupt() {
        let io = Error::Transport("broken pipe".into());
        assert!(matches!(io.for_waiter(), Error::ConnectionClosed));
        let bad = Error::violation("unknown tag 9");
        assert!(matches!(bad.for_waiter(), Error::ProtocolViolation(_)));
    }

    #[test]
    fn unknown_codes_still_display() {
        assert_eq!(PulseErrorCode(99).to_string(), "Unrecognized error (code 99)");
    }
}
