use crate::stream::{Outbox, SendOutcome};
use deck_core::{Command, CommandKind, DeckError, Settings, Target};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::warn;

/// Handle for sending commands back to the controller. Cheap to clone; every
/// callback receives one by reference.
#[derive(Debug, Clone)]
pub struct CommandSender {
    outbox: Outbox,
    plugin_uuid: String,
}

#[derive(Serialize)]
struct UrlPayload<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    message: &'a str,
}

#[derive(Serialize)]
struct TitlePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<u32>,
}

#[derive(Serialize)]
struct ImagePayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    target: Target,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<u32>,
}

#[derive(Serialize)]
struct StatePayload {
    state: u32,
}

#[derive(Serialize)]
struct ProfilePayload<'a> {
    profile: &'a str,
}

impl CommandSender {
    pub fn new(outbox: Outbox, plugin_uuid: impl Into<String>) -> Self {
        Self {
            outbox,
            plugin_uuid: plugin_uuid.into(),
        }
    }

    /// Serialises `command` and queues it. An unserialisable command is
    /// returned as an error and nothing is queued.
    pub fn submit<P: Serialize>(
        &self,
        command: &Command<'_, P>,
    ) -> Result<oneshot::Receiver<SendOutcome>, DeckError> {
        let text = command.encode()?;
        Ok(self.outbox.send(command.event.as_str(), text))
    }

    /// Builds and queues a generic command. Failures are logged, never raised.
    pub fn send_event<P: Serialize>(
        &self,
        kind: CommandKind,
        action: Option<&str>,
        context: Option<&str>,
        payload: Option<P>,
    ) {
        let command = Command {
            action,
            context,
            payload,
            ..Command::new(kind)
        };
        self.send_command(&command);
    }

    fn send_command<P: Serialize>(&self, command: &Command<'_, P>) {
        match command.encode() {
            Ok(text) => self.outbox.push(command.event.as_str(), text),
            Err(err) => warn!(event = "deck_command_rejected", error = %err),
        }
    }

    pub fn set_settings(&self, context: &str, settings: &Settings) {
        self.send_event(CommandKind::SetSettings, None, Some(context), Some(settings));
    }

    pub fn get_settings(&self, context: &str) {
        self.send_event(CommandKind::GetSettings, None, Some(context), None::<Value>);
    }

    pub fn set_global_settings(&self, settings: &Settings) {
        self.send_event(
            CommandKind::SetGlobalSettings,
            None,
            Some(self.plugin_uuid.as_str()),
            Some(settings),
        );
    }

    pub fn get_global_settings(&self) {
        self.send_event(
            CommandKind::GetGlobalSettings,
            None,
            Some(self.plugin_uuid.as_str()),
            None::<Value>,
        );
    }

    pub fn open_url(&self, url: &str) {
        self.send_event(CommandKind::OpenUrl, None, None, Some(UrlPayload { url }));
    }

    pub fn log_message(&self, message: &str) {
        self.send_event(
            CommandKind::LogMessage,
            None,
            None,
            Some(MessagePayload { message }),
        );
    }

    /// `None` restores the title configured by the user.
    pub fn set_title(
        &self,
        context: &str,
        title: Option<&str>,
        target: Target,
        state: Option<u32>,
    ) {
        self.send_event(
            CommandKind::SetTitle,
            None,
            Some(context),
            Some(TitlePayload {
                title,
                target,
                state,
            }),
        );
    }

    /// `image` is a data URI or SVG string; `None` restores the manifest image.
    pub fn set_image(
        &self,
        context: &str,
        image: Option<&str>,
        target: Target,
        state: Option<u32>,
    ) {
        self.send_event(
            CommandKind::SetImage,
            None,
            Some(context),
            Some(ImagePayload {
                image,
                target,
                state,
            }),
        );
    }

    pub fn show_alert(&self, context: &str) {
        self.send_event(CommandKind::ShowAlert, None, Some(context), None::<Value>);
    }

    pub fn show_ok(&self, context: &str) {
        self.send_event(CommandKind::ShowOk, None, Some(context), None::<Value>);
    }

    pub fn set_state(&self, context: &str, state: u32) {
        self.send_event(
            CommandKind::SetState,
            None,
            Some(context),
            Some(StatePayload { state }),
        );
    }

    pub fn switch_to_profile(&self, device: &str, profile: &str) {
        let command = Command {
            context: Some(self.plugin_uuid.as_str()),
            device: Some(device),
            payload: Some(ProfilePayload { profile }),
            ..Command::new(CommandKind::SwitchToProfile)
        };
        self.send_command(&command);
    }

    pub fn send_to_property_inspector<P: Serialize>(
        &self,
        action: &str,
        context: &str,
        payload: P,
    ) {
        self.send_event(
            CommandKind::SendToPropertyInspector,
            Some(action),
            Some(context),
            Some(payload),
        );
    }
}
