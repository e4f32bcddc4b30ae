use crate::error::DeckError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommandKind {
    SetSettings,
    GetSettings,
    SetGlobalSettings,
    GetGlobalSettings,
    #[serde(rename = "openUrl")]
    OpenUrl,
    LogMessage,
    SetTitle,
    SetImage,
    ShowAlert,
    #[serde(rename = "showOk")]
    ShowOk,
    SetState,
    SwitchToProfile,
    SendToPropertyInspector,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::SetSettings => "setSettings",
            CommandKind::GetSettings => "getSettings",
            CommandKind::SetGlobalSettings => "setGlobalSettings",
            CommandKind::GetGlobalSettings => "getGlobalSettings",
            CommandKind::OpenUrl => "openUrl",
            CommandKind::LogMessage => "logMessage",
            CommandKind::SetTitle => "setTitle",
            CommandKind::SetImage => "setImage",
            CommandKind::ShowAlert => "showAlert",
            CommandKind::ShowOk => "showOk",
            CommandKind::SetState => "setState",
            CommandKind::SwitchToProfile => "switchToProfile",
            CommandKind::SendToPropertyInspector => "sendToPropertyInspector",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which surface a title or image update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    #[default]
    Both,
    Hardware,
    Software,
}

impl Target {
    pub fn code(&self) -> u8 {
        match self {
            Target::Both => 0,
            Target::Hardware => 1,
            Target::Software => 2,
        }
    }
}

impl Serialize for Target {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

/// Generic outbound envelope. Optional fields are omitted from the wire.
#[derive(Debug, Clone, Serialize)]
pub struct Command<'a, P> {
    pub event: CommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
}

impl<'a, P: Serialize> Command<'a, P> {
    pub fn new(event: CommandKind) -> Self {
        Self {
            event,
            action: None,
            context: None,
            device: None,
            payload: None,
        }
    }

    pub fn encode(&self) -> Result<String, DeckError> {
        serde_json::to_string(self).map_err(|err| DeckError::UnserializableCommand {
            event: self.event.to_string(),
            reason: err.to_string(),
        })
    }
}

/// The one-time handshake sent right after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub event: String,
    pub uuid: String,
}

impl Registration {
    pub fn new(event: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            uuid: uuid.into(),
        }
    }

    pub fn encode(&self) -> Result<String, DeckError> {
        serde_json::to_string(self).map_err(|err| DeckError::UnserializableCommand {
            event: self.event.clone(),
            reason: err.to_string(),
        })
    }
}
