use serde::{Deserialize, Deserializer, Serialize, Serializer};
use super::models::{ArbitraryJson, Response};
use crate::error::ServerError;

/// Events received from the remote service over the data channel.
///
/// Only the events this client reacts to are typed; the rest are kept as raw JSON.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Error {
        event_id: Option<String>,
        error: ServerError,
    },
    SessionCreated {
        event_id: Option<String>,
        session: ArbitraryJson,
    },
    SessionUpdated {
        event_id: Option<String>,
        session: ArbitraryJson,
    },
    ResponseDone {
        event_id: Option<String>,
        response: Response,
    },
    Unknown(ArbitraryJson),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
enum ServerEventRepr {
    #[serde(rename = "error")]
    Error {
        event_id: Option<String>,
        error: ServerError,
    },
    #[serde(rename = "session.created")]
    SessionCreated {
        event_id: Option<String>,
        session: ArbitraryJson,
    },
    #[serde(rename = "session.updated")]
    SessionUpdated {
        event_id: Option<String>,
        session: ArbitraryJson,
    },
    #[serde(rename = "response.done")]
    ResponseDone {
        event_id: Option<String>,
        response: Response,
    },
}

impl From<ServerEventRepr> for ServerEvent {
    fn from(repr: ServerEventRepr) -> Self {
        match repr {
            ServerEventRepr::Error { event_id, error } => Self::Error { event_id, error },
            ServerEventRepr::SessionCreated { event_id, session } => Self::SessionCreated { event_id, session },
            ServerEventRepr::SessionUpdated { event_id, session } => Self::SessionUpdated { event_id, session },
            ServerEventRepr::ResponseDone { event_id, response } => Self::ResponseDone { event_id, response },
        }
    }
}

impl Serialize for ServerEvent {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let repr = match self {
            Self::Unknown(value) => return value.serialize(serializer),
            Self::Error { event_id, error } => ServerEventRepr::Error { event_id: event_id.clone(), error: error.clone() },
            Self::SessionCreated { event_id, session } => ServerEventRepr::SessionCreated { event_id: event_id.clone(), session: session.clone() },
            Self::SessionUpdated { event_id, session } => ServerEventRepr::SessionUpdated { event_id: event_id.clone(), session: session.clone() },
            Self::ResponseDone { event_id, response } => ServerEventRepr::ResponseDone { event_id: event_id.clone(), response: response.clone() },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServerEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = ArbitraryJson::deserialize(deserializer)?;
        match ServerEventRepr::deserialize(value.clone()) {
            Ok(repr) => Ok(repr.into()),
            Err(err) => {
                tracing::trace!("Keeping server event as raw JSON: {err}");
                Ok(Self::Unknown(value))
            }
        }
    }
}

impl ServerEvent {
    /// Wire name of the event type.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Error { .. } => "error",
            Self::SessionCreated { .. } => "session.created",
            Self::SessionUpdated { .. } => "session.updated",
            Self::ResponseDone { .. } => "response.done",
            Self::Unknown(value) => value.get("type").and_then(|v| v.as_str()).unwrap_or("unknown"),
        }
    }
}
