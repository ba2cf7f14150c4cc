//! Provider backed by an external binary.
//!
//! Each call spawns `calmirror-provider-<name>` (looked up on `PATH`),
//! writes one JSON request line to its stdin and reads one JSON response
//! from its stdout. The binary owns its own credentials; calmirror only
//! forwards the `[provider_config]` table from its config file.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;

use crate::calendar::CalendarEntry;
use crate::error::{MirrorError, MirrorResult};
use crate::event::Event;
use crate::provider::protocol::{
    Command, CreateEvent, DeleteEvent, ErrorCode, GetEvent, ListCalendars, ListEventsDelta,
    ListEventsPage, Params, ProviderCommand, Request, Response, UpdateEvent,
};
use crate::provider::{CalendarProvider, EventDelta, EventPage};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Which call failed, so error codes can be mapped to the right error.
struct CallContext<'a> {
    calendar_id: Option<&'a str>,
    event_id: Option<&'a str>,
}

#[derive(Clone)]
pub struct SubprocessProvider {
    name: String,
    config: Params,
}

impl SubprocessProvider {
    pub fn new(name: &str, config: Params) -> Self {
        SubprocessProvider {
            name: name.to_string(),
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn binary_path(&self) -> MirrorResult<std::path::PathBuf> {
        let binary_name = format!("calmirror-provider-{}", self.name);
        which::which(&binary_name).map_err(|_| MirrorError::ProviderNotInstalled(binary_name))
    }

    async fn call<C: ProviderCommand>(
        &self,
        cmd: C,
        context: CallContext<'_>,
    ) -> MirrorResult<C::Response> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(C::command(), cmd, context))
            .await
            .map_err(|_| MirrorError::ProviderTimeout(PROVIDER_TIMEOUT.as_secs()))?
    }

    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
        context: CallContext<'_>,
    ) -> MirrorResult<R> {
        let params = serde_json::to_value(params)?;
        let request_json = serde_json::to_string(&Request { command, params })?;

        let binary_path = self.binary_path()?;
        debug!(provider = %self.name, ?command, "calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MirrorError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MirrorError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(MirrorError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(MirrorError::Provider("Provider returned no response".into()));
        }

        let response: Response<R> = serde_json::from_str(response_str.trim())
            .map_err(|e| MirrorError::Provider(format!("Failed to parse response: {}", e)))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error { error, code } => Err(map_error(error, code, context)),
        }
    }
}

fn map_error(error: String, code: Option<ErrorCode>, context: CallContext<'_>) -> MirrorError {
    match (code, context.calendar_id, context.event_id) {
        (Some(ErrorCode::SyncTokenExpired), Some(calendar_id), _) => {
            MirrorError::SyncTokenExpired(calendar_id.to_string())
        }
        (Some(ErrorCode::NotFound), Some(calendar_id), Some(event_id)) => {
            MirrorError::EventNotFound {
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
            }
        }
        (Some(ErrorCode::NotFound), Some(calendar_id), None) => {
            MirrorError::CalendarNotFound(calendar_id.to_string())
        }
        _ => MirrorError::Provider(error),
    }
}

#[async_trait]
impl CalendarProvider for SubprocessProvider {
    async fn list_calendars(&self) -> MirrorResult<Vec<CalendarEntry>> {
        self.call(
            ListCalendars {
                provider_config: self.config.clone(),
            },
            CallContext {
                calendar_id: None,
                event_id: None,
            },
        )
        .await
    }

    async fn list_events_delta(
        &self,
        calendar_id: &str,
        sync_token: &str,
    ) -> MirrorResult<EventDelta> {
        self.call(
            ListEventsDelta {
                provider_config: self.config.clone(),
                calendar_id: calendar_id.to_string(),
                sync_token: sync_token.to_string(),
            },
            CallContext {
                calendar_id: Some(calendar_id),
                event_id: None,
            },
        )
        .await
    }

    async fn list_events_page(
        &self,
        calendar_id: &str,
        page_token: Option<&str>,
    ) -> MirrorResult<EventPage> {
        self.call(
            ListEventsPage {
                provider_config: self.config.clone(),
                calendar_id: calendar_id.to_string(),
                page_token: page_token.map(String::from),
            },
            CallContext {
                calendar_id: Some(calendar_id),
                event_id: None,
            },
        )
        .await
    }

    async fn get_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<Event> {
        self.call(
            GetEvent {
                provider_config: self.config.clone(),
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
            },
            CallContext {
                calendar_id: Some(calendar_id),
                event_id: Some(event_id),
            },
        )
        .await
    }

    async fn create_event(&self, calendar_id: &str, event: &Event) -> MirrorResult<Event> {
        self.call(
            CreateEvent {
                provider_config: self.config.clone(),
                calendar_id: calendar_id.to_string(),
                event: event.clone(),
            },
            CallContext {
                calendar_id: Some(calendar_id),
                event_id: None,
            },
        )
        .await
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &Event,
    ) -> MirrorResult<Event> {
        self.call(
            UpdateEvent {
                provider_config: self.config.clone(),
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
                event: event.clone(),
            },
            CallContext {
                calendar_id: Some(calendar_id),
                event_id: Some(event_id),
            },
        )
        .await
    }

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> MirrorResult<()> {
        self.call(
            DeleteEvent {
                provider_config: self.config.clone(),
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
            },
            CallContext {
                calendar_id: Some(calendar_id),
                event_id: Some(event_id),
            },
        )
        .await
    }
}
