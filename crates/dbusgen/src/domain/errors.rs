//! Domain-specific errors.

use std::path::PathBuf;

use thiserror::Error;

/// Fixed classification of a failed bus call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusErrorKind {
    NotConnected,
    NoReply,
    UnknownService,
    UnknownObject,
    UnknownInterface,
    AccessDenied,
    InvalidArguments,
    Disconnected,
    Other,
}

impl BusErrorKind {
    /// Human-readable description of the error class.
    pub fn describe(&self) -> &'static str {
        match self {
            BusErrorKind::NotConnected => "no connection to the session bus",
            BusErrorKind::NoReply => "the called method did not reply within the timeout",
            BusErrorKind::UnknownService => "the called service is not known",
            BusErrorKind::UnknownObject => {
                "the object path points to an object that does not exist"
            }
            BusErrorKind::UnknownInterface => "the interface is not known in this object",
            BusErrorKind::AccessDenied => {
                "the call tried to access a resource it is not allowed to"
            }
            BusErrorKind::InvalidArguments => "the arguments passed to this call are not valid",
            BusErrorKind::Disconnected => "the call was sent after the connection closed",
            BusErrorKind::Other => "an unclassified bus error",
        }
    }
}

/// A classified failure reported by the message bus.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("bus call failed ({name}): {message}")]
pub struct BusError {
    pub kind: BusErrorKind,
    /// Bus-supplied error name, e.g. `org.freedesktop.DBus.Error.ServiceUnknown`.
    pub name: String,
    /// Bus-supplied message string.
    pub message: String,
}

impl BusError {
    /// Multi-line report shown to the operator on a failed fetch.
    pub fn detail_report(&self) -> String {
        format!(
            "message: {}\nname:    {}\ndetail:  {}",
            self.message,
            self.name,
            self.kind.describe()
        )
    }
}

/// Failure to run the external binding generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to write {}: {source}", path.display())]
    WriteXml {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to launch generator '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("generator exited with status {status}: {diagnostics}")]
    Failed { status: i32, diagnostics: String },
}
