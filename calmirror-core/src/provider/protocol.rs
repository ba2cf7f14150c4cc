//! JSON protocol spoken with provider binaries over stdin/stdout.
//!
//! One request line in, one response line out. Each command type carries
//! its response type so calls are checked at compile time.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::calendar::CalendarEntry;
use crate::event::Event;
use crate::provider::{EventDelta, EventPage};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListCalendars,
    ListEventsDelta,
    ListEventsPage,
    GetEvent,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

/// Request sent from calmirror to the provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Machine-readable failure reasons a provider may attach to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The sync token was rejected (HTTP 410 on Google Calendar).
    SyncTokenExpired,
    NotFound,
}

/// Response sent from provider to calmirror.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
    },
}

pub type Params = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCalendars {
    #[serde(flatten)]
    pub provider_config: Params,
}

impl ProviderCommand for ListCalendars {
    type Response = Vec<CalendarEntry>;
    fn command() -> Command {
        Command::ListCalendars
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListEventsDelta {
    #[serde(flatten)]
    pub provider_config: Params,
    pub calendar_id: String,
    pub sync_token: String,
}

impl ProviderCommand for ListEventsDelta {
    type Response = EventDelta;
    fn command() -> Command {
        Command::ListEventsDelta
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListEventsPage {
    #[serde(flatten)]
    pub provider_config: Params,
    pub calendar_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ProviderCommand for ListEventsPage {
    type Response = EventPage;
    fn command() -> Command {
        Command::ListEventsPage
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetEvent {
    #[serde(flatten)]
    pub provider_config: Params,
    pub calendar_id: String,
    pub event_id: String,
}

impl ProviderCommand for GetEvent {
    type Response = Event;
    fn command() -> Command {
        Command::GetEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    #[serde(flatten)]
    pub provider_config: Params,
    pub calendar_id: String,
    pub event: Event,
}

impl ProviderCommand for CreateEvent {
    type Response = Event;
    fn command() -> Command {
        Command::CreateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(flatten)]
    pub provider_config: Params,
    pub calendar_id: String,
    pub event_id: String,
    pub event: Event,
}

impl ProviderCommand for UpdateEvent {
    type Response = Event;
    fn command() -> Command {
        Command::UpdateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(flatten)]
    pub provider_config: Params,
    pub calendar_id: String,
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}
