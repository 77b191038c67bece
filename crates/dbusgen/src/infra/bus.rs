//! Session bus integration.

use zbus::blocking::Connection;

use crate::domain::errors::{BusError, BusErrorKind};

/// Interface every introspectable object implements.
pub const INTROSPECTABLE: &str = "org.freedesktop.DBus.Introspectable";

/// Source of raw introspection documents.
///
/// The pipeline needs exactly one call, so the seam is a trait and tests can
/// substitute canned documents for a live bus.
pub trait Introspect {
    fn introspect(
        &self,
        service: &str,
        object_path: &str,
        interface: &str,
    ) -> Result<String, BusError>;
}

/// Blocking client issuing `Introspect` calls over the session bus.
pub struct BusClient {
    connection: Connection,
}

impl BusClient {
    /// Connect to the session bus.
    pub fn session() -> Result<Self, BusError> {
        let connection = Connection::session().map_err(|err| BusError {
            kind: BusErrorKind::NotConnected,
            name: String::new(),
            message: err.to_string(),
        })?;
        Ok(Self { connection })
    }
}

impl Introspect for BusClient {
    fn introspect(
        &self,
        service: &str,
        object_path: &str,
        interface: &str,
    ) -> Result<String, BusError> {
        let reply = self
            .connection
            .call_method(
                Some(service),
                object_path,
                Some(interface),
                "Introspect",
                &(),
            )
            .map_err(classify)?;
        reply.body().deserialize::<String>().map_err(classify)
    }
}

fn classify(err: zbus::Error) -> BusError {
    match err {
        zbus::Error::MethodError(name, message, _) => BusError {
            kind: kind_for_name(name.as_str()),
            name: name.to_string(),
            message: message.unwrap_or_default(),
        },
        other => BusError {
            kind: BusErrorKind::Other,
            name: String::new(),
            message: other.to_string(),
        },
    }
}

fn kind_for_name(name: &str) -> BusErrorKind {
    match name {
        "org.freedesktop.DBus.Error.ServiceUnknown" => BusErrorKind::UnknownService,
        "org.freedesktop.DBus.Error.UnknownObject" => BusErrorKind::UnknownObject,
        "org.freedesktop.DBus.Error.UnknownInterface" => BusErrorKind::UnknownInterface,
        "org.freedesktop.DBus.Error.NoReply"
        | "org.freedesktop.DBus.Error.Timeout"
        | "org.freedesktop.DBus.Error.TimedOut" => BusErrorKind::NoReply,
        "org.freedesktop.DBus.Error.AccessDenied" => BusErrorKind::AccessDenied,
        "org.freedesktop.DBus.Error.InvalidArgs" => BusErrorKind::InvalidArguments,
        "org.freedesktop.DBus.Error.Disconnected" => BusErrorKind::Disconnected,
        _ => BusErrorKind::Other,
    }
}
